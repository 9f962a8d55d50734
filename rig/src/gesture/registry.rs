//! Per-user gesture arena.
//!
//! One `GestureRegistry` per player slot holds the ordered gesture
//! records for the bound user. It applies conflict suppression and the
//! post-completion cool-down, and turns engine transitions into
//! `GestureEvent`s for the listeners.

use glam::Vec3;
use tracing::debug;

use super::engine::{GestureConfig, GestureEngine, Transition};
use super::kind::GestureKind;
use super::state::GestureState;
use crate::skeleton::{JointSnapshot, SkeletonJoint};
use crate::source::UserId;

// ── Events ─────────────────────────────────────────────────

/// Notifications produced by one registry evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEvent {
    /// Active gesture at or above the notify threshold.
    InProgress {
        kind: GestureKind,
        progress: f32,
        pivot: Option<SkeletonJoint>,
        screen_pos: Vec3,
    },
    /// Gesture completed this frame.
    Completed {
        kind: GestureKind,
        pivot: Option<SkeletonJoint>,
        screen_pos: Vec3,
    },
    /// Gesture cancelled this frame.
    Cancelled {
        kind: GestureKind,
        pivot: Option<SkeletonJoint>,
    },
}

impl GestureEvent {
    pub fn kind(&self) -> GestureKind {
        match self {
            Self::InProgress { kind, .. } | Self::Completed { kind, .. } | Self::Cancelled { kind, .. } => {
                *kind
            }
        }
    }
}

// ── Registry ───────────────────────────────────────────────

/// Ordered gesture records for one user.
#[derive(Debug, Clone)]
pub struct GestureRegistry {
    user_id: UserId,
    records: Vec<GestureState>,
    /// No gesture evaluates before this time (set on completion).
    tracking_resumes_at: f64,
    cooldown: f64,
    debounce: f64,
    notify_threshold: f32,
}

impl GestureRegistry {
    pub fn new(user_id: UserId, config: &GestureConfig) -> Self {
        Self {
            user_id,
            records: Vec::new(),
            tracking_resumes_at: 0.0,
            cooldown: config.min_time_between_gestures,
            debounce: config.min_time_between_same_gestures,
            notify_threshold: config.progress_notify_threshold,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Start tracking `kind`. Tracking an existing kind re-arms it.
    pub fn track(&mut self, kind: GestureKind, now: f64) {
        if let Some(record) = self.get_mut(kind) {
            record.rearm(now);
            return;
        }
        debug!("user {} tracking {}", self.user_id, kind);
        self.records.push(GestureState::new(self.user_id, kind));
    }

    /// Stop tracking `kind`. Returns true if it was tracked.
    pub fn untrack(&mut self, kind: GestureKind) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.kind != kind);
        self.records.len() < before
    }

    /// Drop every record and the cool-down.
    pub fn clear(&mut self) {
        self.records.clear();
        self.tracking_resumes_at = 0.0;
    }

    /// Re-arm one gesture. Returns false if it is not tracked.
    pub fn reset(&mut self, kind: GestureKind, now: f64) -> bool {
        let resume_at = now + self.debounce;
        match self.get_mut(kind) {
            Some(record) => {
                record.rearm(resume_at);
                true
            }
            None => false,
        }
    }

    /// Re-arm every gesture.
    pub fn reset_all(&mut self, now: f64) {
        let resume_at = now + self.debounce;
        for record in &mut self.records {
            record.rearm(resume_at);
        }
    }

    pub fn get(&self, kind: GestureKind) -> Option<&GestureState> {
        self.records.iter().find(|r| r.kind == kind)
    }

    fn get_mut(&mut self, kind: GestureKind) -> Option<&mut GestureState> {
        self.records.iter_mut().find(|r| r.kind == kind)
    }

    pub fn is_tracking(&self, kind: GestureKind) -> bool {
        self.get(kind).is_some()
    }

    /// Whether `kind` has completed. Optionally re-arms all of the user's gestures.
    pub fn is_complete(&mut self, kind: GestureKind, reset_on_complete: bool, now: f64) -> bool {
        let complete = self.get(kind).is_some_and(|r| r.complete);
        if complete && reset_on_complete {
            self.reset_all(now);
        }
        complete
    }

    pub fn is_cancelled(&self, kind: GestureKind) -> bool {
        self.get(kind).is_some_and(|r| r.cancelled)
    }

    /// Progress of `kind`, 0 when untracked.
    pub fn progress(&self, kind: GestureKind) -> f32 {
        self.get(kind).map(|r| r.progress).unwrap_or(0.0)
    }

    /// Screen position of `kind`, zero when untracked.
    pub fn screen_pos(&self, kind: GestureKind) -> Vec3 {
        self.get(kind).map(|r| r.screen_pos).unwrap_or(Vec3::ZERO)
    }

    /// Tracked kinds in registration order.
    pub fn kinds(&self) -> Vec<GestureKind> {
        self.records.iter().map(|r| r.kind).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn tracking_resumes_at(&self) -> f64 {
        self.tracking_resumes_at
    }

    /// Whether any gesture conflicting with `kind` has progress.
    fn is_suppressed(&self, record: &GestureState) -> bool {
        record.conflicts.iter().any(|c| {
            self.records
                .iter()
                .any(|other| other.kind == *c && other.progress > 0.0)
        })
    }

    /// Evaluate every record against one snapshot, in registration order.
    pub fn evaluate(&mut self, engine: &GestureEngine, snapshot: &JointSnapshot, now: f64) -> Vec<GestureEvent> {
        let mut events = Vec::new();
        if now < self.tracking_resumes_at {
            return events;
        }

        for i in 0..self.records.len() {
            if self.is_suppressed(&self.records[i]) {
                continue;
            }

            let record = &mut self.records[i];
            match engine.evaluate(record, snapshot, now) {
                Transition::Skipped => {}
                Transition::Tracking => {
                    if record.phase > 0 && record.progress >= self.notify_threshold {
                        events.push(GestureEvent::InProgress {
                            kind: record.kind,
                            progress: record.progress,
                            pivot: record.pivot,
                            screen_pos: record.screen_pos,
                        });
                    }
                }
                Transition::Completed => {
                    events.push(GestureEvent::Completed {
                        kind: record.kind,
                        pivot: record.pivot,
                        screen_pos: record.screen_pos,
                    });
                    self.tracking_resumes_at = now + self.cooldown;
                }
                Transition::Cancelled => {
                    events.push(GestureEvent::Cancelled {
                        kind: record.kind,
                        pivot: record.pivot,
                    });
                }
            }
        }

        events
    }

    /// Generate s-expression for the user's gesture records.
    pub fn status_sexp(&self) -> String {
        let gestures = if self.records.is_empty() {
            "nil".to_string()
        } else {
            let items: Vec<String> = self
                .records
                .iter()
                .map(|r| {
                    format!(
                        "(:kind {} :phase {} :progress {:.2} :complete {} :cancelled {})",
                        r.kind,
                        r.phase,
                        r.progress,
                        if r.complete { "t" } else { "nil" },
                        if r.cancelled { "t" } else { "nil" },
                    )
                })
                .collect();
            format!("({})", items.join(" "))
        };
        format!(
            "(:user {} :resumes-at {:.2} :gestures {})",
            self.user_id, self.tracking_resumes_at, gestures
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::standing_pose;
    use crate::skeleton::SkeletonJoint::*;

    const USER: u32 = 1;

    fn hands_at(spread: f32) -> JointSnapshot {
        let mut s = standing_pose(USER);
        s.set_position(LeftHand, Vec3::new(-spread / 2.0, 1.3, 2.0));
        s.set_position(RightHand, Vec3::new(spread / 2.0, 1.3, 2.0));
        s
    }

    fn right_hand_at(x: f32, y: f32) -> JointSnapshot {
        let mut s = standing_pose(USER);
        s.set_position(RightHand, Vec3::new(x, y, 2.0));
        s
    }

    fn registry() -> GestureRegistry {
        GestureRegistry::new(USER, &GestureConfig::default())
    }

    #[test]
    fn test_track_and_untrack() {
        let mut reg = registry();
        reg.track(GestureKind::SwipeLeft, 0.0);
        reg.track(GestureKind::ZoomIn, 0.0);
        reg.track(GestureKind::SwipeLeft, 0.0);
        assert_eq!(reg.kinds(), vec![GestureKind::SwipeLeft, GestureKind::ZoomIn]);
        assert!(reg.untrack(GestureKind::SwipeLeft));
        assert!(!reg.untrack(GestureKind::SwipeLeft));
        assert!(!reg.is_tracking(GestureKind::SwipeLeft));
        reg.clear();
        assert!(reg.is_empty());
    }

    #[test]
    fn test_untracked_queries_are_zero() {
        let mut reg = registry();
        assert_eq!(reg.progress(GestureKind::Wave), 0.0);
        assert_eq!(reg.screen_pos(GestureKind::Wave), Vec3::ZERO);
        assert!(!reg.is_complete(GestureKind::Wave, true, 0.0));
        assert!(!reg.is_cancelled(GestureKind::Wave));
        assert!(!reg.reset(GestureKind::Wave, 0.0));
    }

    #[test]
    fn test_zoom_in_completes_then_cooldown() {
        let engine = GestureEngine::default();
        let mut reg = registry();
        reg.track(GestureKind::ZoomIn, 0.0);
        reg.track(GestureKind::RaiseRightHand, 0.0);

        reg.evaluate(&engine, &hands_at(0.2), 0.0);
        let events = reg.evaluate(&engine, &hands_at(0.4), 0.1);
        assert!(
            events.iter().any(|e| matches!(e, GestureEvent::InProgress { kind: GestureKind::ZoomIn, .. })),
            "expected in-progress, got {:?}",
            events
        );

        let events = reg.evaluate(&engine, &hands_at(0.6), 0.2);
        assert!(
            events.iter().any(|e| matches!(e, GestureEvent::Completed { kind: GestureKind::ZoomIn, .. })),
            "expected completion, got {:?}",
            events
        );
        assert!((reg.tracking_resumes_at() - 0.9).abs() < 1e-9);
        assert_eq!(reg.progress(GestureKind::ZoomIn), 1.0);

        // completion fires once
        let raised = right_hand_at(0.2, 1.8);
        assert!(reg.evaluate(&engine, &raised, 0.5).is_empty());
        assert_eq!(reg.get(GestureKind::RaiseRightHand).map(|r| r.phase), Some(0));

        // cool-down over: other gestures evaluate again, the completed one stays put
        reg.evaluate(&engine, &raised, 0.9);
        assert_eq!(reg.get(GestureKind::RaiseRightHand).map(|r| r.phase), Some(1));
        assert!(reg.is_complete(GestureKind::ZoomIn, false, 0.9));
    }

    #[test]
    fn test_conflicting_gesture_not_evaluated() {
        let engine = GestureEngine::default();
        let mut reg = registry();
        reg.track(GestureKind::ZoomIn, 0.0);
        reg.track(GestureKind::ZoomOut, 0.0);
        reg.track(GestureKind::Wheel, 0.0);

        reg.evaluate(&engine, &hands_at(0.2), 0.0);
        let zoom_out_before = reg.get(GestureKind::ZoomOut).cloned();
        let wheel_before = reg.get(GestureKind::Wheel).cloned();

        reg.evaluate(&engine, &hands_at(0.4), 0.1);
        assert!(reg.progress(GestureKind::ZoomIn) > 0.0);
        assert_eq!(reg.get(GestureKind::ZoomOut).cloned(), zoom_out_before);
        assert_eq!(reg.get(GestureKind::Wheel).cloned(), wheel_before);
    }

    #[test]
    fn test_wheel_jitter_does_not_starve_zoom() {
        let engine = GestureEngine::default();
        let mut reg = registry();
        reg.track(GestureKind::Wheel, 0.0);
        reg.track(GestureKind::ZoomIn, 0.0);

        let tilted = |rise: f32| {
            let mut s = hands_at(0.2);
            s.set_position(LeftHand, Vec3::new(-0.1, 1.3 - rise, 2.0));
            s.set_position(RightHand, Vec3::new(0.1, 1.3 + rise, 2.0));
            s
        };

        reg.evaluate(&engine, &hands_at(0.2), 0.0);
        for i in 1..=5 {
            let rise = if i % 2 == 0 { -0.0002 } else { 0.0002 };
            reg.evaluate(&engine, &tilted(rise), i as f64 * 0.1);
        }
        assert_eq!(reg.progress(GestureKind::Wheel), 0.0);

        reg.evaluate(&engine, &hands_at(0.3), 0.6);
        assert!(reg.progress(GestureKind::ZoomIn) > 0.0);
        reg.evaluate(&engine, &hands_at(0.45), 0.7);
        let events = reg.evaluate(&engine, &hands_at(0.55), 0.8);
        assert!(events
            .iter()
            .any(|e| matches!(e, GestureEvent::Completed { kind: GestureKind::ZoomIn, .. })));
        assert!(reg.is_complete(GestureKind::ZoomIn, false, 0.8));
        assert_eq!(reg.progress(GestureKind::Wheel), 0.0);
    }

    #[test]
    fn test_cancel_notified_once() {
        let engine = GestureEngine::default();
        let mut reg = registry();
        reg.track(GestureKind::SwipeLeft, 0.0);

        reg.evaluate(&engine, &right_hand_at(0.3, 1.3), 0.0);
        reg.evaluate(&engine, &right_hand_at(0.15, 1.3), 0.1);
        let events = reg.evaluate(&engine, &right_hand_at(0.3, 1.3), 0.2);
        assert_eq!(
            events,
            vec![GestureEvent::Cancelled {
                kind: GestureKind::SwipeLeft,
                pivot: Some(RightHand),
            }]
        );
        assert!(reg.evaluate(&engine, &right_hand_at(0.3, 1.3), 0.3).is_empty());
        assert!(reg.is_cancelled(GestureKind::SwipeLeft));
    }

    #[test]
    fn test_reset_on_complete_rearms_all() {
        let engine = GestureEngine::default();
        let mut reg = registry();
        reg.track(GestureKind::RaiseRightHand, 0.0);
        reg.track(GestureKind::SwipeLeft, 0.0);

        let raised = right_hand_at(0.2, 1.8);
        reg.evaluate(&engine, &raised, 0.0);
        reg.evaluate(&engine, &raised, 1.1);
        assert!(reg.is_complete(GestureKind::RaiseRightHand, true, 1.2));
        assert!(!reg.is_complete(GestureKind::RaiseRightHand, false, 1.2));
        assert_eq!(reg.progress(GestureKind::RaiseRightHand), 0.0);
        assert!(reg.kinds().iter().all(|k| reg.get(*k).map(|r| r.phase) == Some(0)));
    }

    #[test]
    fn test_reset_applies_debounce() {
        let engine = GestureEngine::default();
        let mut config = GestureConfig::default();
        config.min_time_between_same_gestures = 0.5;
        let mut reg = GestureRegistry::new(USER, &config);
        reg.track(GestureKind::RaiseRightHand, 0.0);

        assert!(reg.reset(GestureKind::RaiseRightHand, 1.0));
        let raised = right_hand_at(0.2, 1.8);
        reg.evaluate(&engine, &raised, 1.2);
        assert_eq!(reg.get(GestureKind::RaiseRightHand).map(|r| r.phase), Some(0));
        reg.evaluate(&engine, &raised, 1.5);
        assert_eq!(reg.get(GestureKind::RaiseRightHand).map(|r| r.phase), Some(1));
    }

    #[test]
    fn test_below_threshold_not_notified() {
        let engine = GestureEngine::default();
        let mut reg = registry();
        reg.track(GestureKind::RaiseRightHand, 0.0);
        let raised = right_hand_at(0.2, 1.8);
        assert!(reg.evaluate(&engine, &raised, 0.0).is_empty());
        assert!(reg.evaluate(&engine, &raised, 0.05).is_empty());
        let events = reg.evaluate(&engine, &raised, 0.3);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), GestureKind::RaiseRightHand);
    }

    #[test]
    fn test_status_sexp() {
        let mut reg = registry();
        assert!(reg.status_sexp().contains(":gestures nil"));
        reg.track(GestureKind::Wave, 0.0);
        let sexp = reg.status_sexp();
        assert!(sexp.starts_with("(:user 1"));
        assert!(sexp.contains("(:kind wave :phase 0 :progress 0.00 :complete nil :cancelled nil)"));
    }
}
