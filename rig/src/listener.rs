//! Notification surface for UI, input mapping and audio cues.
//!
//! Listeners are registered explicitly on the `Session`. Every method
//! has a default so implementors only override what they care about.

use glam::Vec3;
use tracing::{debug, info};

use crate::gesture::GestureKind;
use crate::skeleton::SkeletonJoint;
use crate::source::UserId;

/// Receives user and gesture notifications from a `Session`.
pub trait GestureListener {
    /// A user was bound to `slot` and calibrated.
    fn user_detected(&mut self, _user_id: UserId, _slot: usize) {}

    /// The user bound to `slot` was lost.
    fn user_lost(&mut self, _user_id: UserId, _slot: usize) {}

    /// A gesture is under way.
    fn gesture_in_progress(
        &mut self,
        _user_id: UserId,
        _slot: usize,
        _kind: GestureKind,
        _progress: f32,
        _pivot: Option<SkeletonJoint>,
        _screen_pos: Vec3,
    ) {
    }

    /// A gesture completed. Return true to reset all of the user's gestures.
    fn gesture_completed(
        &mut self,
        _user_id: UserId,
        _slot: usize,
        _kind: GestureKind,
        _pivot: Option<SkeletonJoint>,
        _screen_pos: Vec3,
    ) -> bool {
        true
    }

    /// A gesture was cancelled. Return true to reset that gesture.
    fn gesture_cancelled(
        &mut self,
        _user_id: UserId,
        _slot: usize,
        _kind: GestureKind,
        _pivot: Option<SkeletonJoint>,
    ) -> bool {
        true
    }
}

/// Listener that reports every notification through `tracing`.
#[derive(Debug, Default)]
pub struct LogListener {
    pub completed: u32,
    pub cancelled: u32,
}

impl LogListener {
    pub fn new() -> Self {
        Self::default()
    }
}

fn pivot_str(pivot: Option<SkeletonJoint>) -> &'static str {
    pivot.map(|j| j.as_str()).unwrap_or("none")
}

impl GestureListener for LogListener {
    fn user_detected(&mut self, user_id: UserId, slot: usize) {
        info!(user_id, slot, "user detected");
    }

    fn user_lost(&mut self, user_id: UserId, slot: usize) {
        info!(user_id, slot, "user lost");
    }

    fn gesture_in_progress(
        &mut self,
        user_id: UserId,
        slot: usize,
        kind: GestureKind,
        progress: f32,
        pivot: Option<SkeletonJoint>,
        _screen_pos: Vec3,
    ) {
        debug!(
            user_id,
            slot,
            "{} in progress {:.2} ({})",
            kind,
            progress,
            pivot_str(pivot)
        );
    }

    fn gesture_completed(
        &mut self,
        user_id: UserId,
        slot: usize,
        kind: GestureKind,
        pivot: Option<SkeletonJoint>,
        screen_pos: Vec3,
    ) -> bool {
        self.completed += 1;
        info!(
            user_id,
            slot,
            "{} completed ({}) at ({:.2}, {:.2}, {:.2})",
            kind,
            pivot_str(pivot),
            screen_pos.x,
            screen_pos.y,
            screen_pos.z
        );
        true
    }

    fn gesture_cancelled(
        &mut self,
        user_id: UserId,
        slot: usize,
        kind: GestureKind,
        pivot: Option<SkeletonJoint>,
    ) -> bool {
        self.cancelled += 1;
        info!(user_id, slot, "{} cancelled ({})", kind, pivot_str(pivot));
        true
    }
}

// ── Test helpers ───────────────────────────────────────────

/// Listener that records every call as a short string.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    log: std::rc::Rc<std::cell::RefCell<Vec<String>>>,
}

#[cfg(test)]
impl Recorder {
    pub(crate) fn entries(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub(crate) fn contains(&self, entry: &str) -> bool {
        self.log.borrow().iter().any(|e| e == entry)
    }
}

#[cfg(test)]
impl GestureListener for Recorder {
    fn user_detected(&mut self, user_id: UserId, slot: usize) {
        self.log.borrow_mut().push(format!("detected {} {}", user_id, slot));
    }

    fn user_lost(&mut self, user_id: UserId, slot: usize) {
        self.log.borrow_mut().push(format!("lost {} {}", user_id, slot));
    }

    fn gesture_completed(
        &mut self,
        user_id: UserId,
        _slot: usize,
        kind: GestureKind,
        _pivot: Option<SkeletonJoint>,
        _screen_pos: Vec3,
    ) -> bool {
        self.log.borrow_mut().push(format!("completed {} {}", user_id, kind));
        true
    }

    fn gesture_cancelled(
        &mut self,
        user_id: UserId,
        _slot: usize,
        kind: GestureKind,
        _pivot: Option<SkeletonJoint>,
    ) -> bool {
        self.log.borrow_mut().push(format!("cancelled {} {}", user_id, kind));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;
    impl GestureListener for Silent {}

    #[test]
    fn test_defaults_request_reset() {
        let mut l = Silent;
        assert!(l.gesture_completed(1, 0, GestureKind::Wave, None, Vec3::ZERO));
        assert!(l.gesture_cancelled(1, 0, GestureKind::Wave, None));
    }

    #[test]
    fn test_log_listener_counts() {
        let mut l = LogListener::new();
        l.gesture_completed(1, 0, GestureKind::SwipeLeft, Some(SkeletonJoint::RightHand), Vec3::ZERO);
        l.gesture_cancelled(1, 0, GestureKind::Push, None);
        l.gesture_cancelled(1, 0, GestureKind::Pull, None);
        assert_eq!(l.completed, 1);
        assert_eq!(l.cancelled, 2);
    }
}
