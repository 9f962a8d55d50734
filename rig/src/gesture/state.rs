//! Persistent per (user, gesture) record.

use glam::Vec3;

use super::kind::GestureKind;
use crate::skeleton::SkeletonJoint;
use crate::source::UserId;

/// State of one tracked gesture for one user.
///
/// Owned by the user's `GestureRegistry`; the engine mutates it in place.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureState {
    /// Owning raw user id. Zeroed after a calibration pose completes.
    pub user_id: UserId,
    pub kind: GestureKind,
    /// Kind-specific phase counter; 0 is idle.
    pub phase: u32,
    /// Joint driving the current phase.
    pub pivot: Option<SkeletonJoint>,
    /// Position (or two-hand vector) recorded when the phase armed.
    pub anchor: Vec3,
    /// Time the anchor was last recorded.
    pub anchor_time: f64,
    /// Scalar measure at arming (hand spread, wheel angle).
    pub origin: f32,
    /// Furthest travel reached since arming.
    pub extent: f32,
    /// Locked direction sign for bidirectional measures.
    pub direction: f32,
    /// Normalized completion in [0, 1].
    pub progress: f32,
    pub complete: bool,
    pub cancelled: bool,
    /// Screen-space point for cursor-style output; z carries zoom factor or wheel angle.
    pub screen_pos: Vec3,
    /// Kinds that suppress this one while they have progress.
    pub conflicts: Vec<GestureKind>,
    /// Evaluation is skipped before this time.
    pub start_tracking_at: f64,
}

impl GestureState {
    /// A fresh idle record.
    pub fn new(user_id: UserId, kind: GestureKind) -> Self {
        Self {
            user_id,
            kind,
            phase: 0,
            pivot: None,
            anchor: Vec3::ZERO,
            anchor_time: 0.0,
            origin: 0.0,
            extent: 0.0,
            direction: 0.0,
            progress: 0.0,
            complete: false,
            cancelled: false,
            screen_pos: Vec3::ZERO,
            conflicts: kind.conflicts().to_vec(),
            start_tracking_at: 0.0,
        }
    }

    /// Return to idle. Evaluation resumes at `resume_at`.
    pub fn rearm(&mut self, resume_at: f64) {
        let user_id = self.user_id;
        let kind = self.kind;
        *self = Self::new(user_id, kind);
        self.start_tracking_at = resume_at;
    }

    /// Move from idle into the first active phase.
    pub(crate) fn arm(&mut self, pivot: SkeletonJoint, anchor: Vec3, now: f64) {
        self.phase = 1;
        self.pivot = Some(pivot);
        self.anchor = anchor;
        self.anchor_time = now;
        self.extent = 0.0;
        self.direction = 0.0;
        self.progress = 0.0;
    }

    /// Drop back to idle without cancelling.
    pub(crate) fn idle(&mut self) {
        self.phase = 0;
        self.pivot = None;
        self.extent = 0.0;
        self.direction = 0.0;
        self.progress = 0.0;
    }

    /// Completed or cancelled.
    pub fn is_terminal(&self) -> bool {
        self.complete || self.cancelled
    }

    /// Raise progress to `value`. Never lowers it; completes at 1.
    pub(crate) fn advance(&mut self, value: f32) {
        let value = value.clamp(0.0, 1.0);
        if value > self.progress {
            self.progress = value;
        }
        if self.progress >= 1.0 {
            self.complete = true;
        }
    }

    /// Cancel, freezing progress at its current value.
    pub(crate) fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Seconds since the anchor was recorded.
    pub(crate) fn elapsed(&self, now: f64) -> f32 {
        (now - self.anchor_time).max(0.0) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_idle() {
        let state = GestureState::new(3, GestureKind::ZoomIn);
        assert_eq!(state.phase, 0);
        assert_eq!(state.progress, 0.0);
        assert!(!state.is_terminal());
        assert_eq!(state.conflicts, vec![GestureKind::ZoomOut, GestureKind::Wheel]);
    }

    #[test]
    fn test_advance_is_monotonic() {
        let mut state = GestureState::new(1, GestureKind::SwipeLeft);
        state.advance(0.4);
        state.advance(0.2);
        assert!((state.progress - 0.4).abs() < 1e-6);
        state.advance(1.7);
        assert_eq!(state.progress, 1.0);
        assert!(state.complete);
    }

    #[test]
    fn test_cancel_freezes_progress() {
        let mut state = GestureState::new(1, GestureKind::Push);
        state.advance(0.5);
        state.cancel();
        assert!(state.cancelled);
        assert!((state.progress - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_rearm_clears_everything() {
        let mut state = GestureState::new(2, GestureKind::Wave);
        state.arm(SkeletonJoint::RightHand, Vec3::ONE, 1.0);
        state.advance(1.0);
        state.rearm(5.0);
        assert_eq!(state.user_id, 2);
        assert_eq!(state.phase, 0);
        assert_eq!(state.progress, 0.0);
        assert!(!state.complete);
        assert!(!state.cancelled);
        assert_eq!(state.pivot, None);
        assert_eq!(state.start_tracking_at, 5.0);
    }
}
