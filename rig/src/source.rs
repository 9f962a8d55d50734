//! Sensor boundary: the joint stream the core pulls from once per tick.
//!
//! `JointFrameSource` is everything the core needs from a depth-sensor
//! binding. `ScriptedSource` is an in-memory implementation used by the
//! tests and the headless simulator.

use std::collections::{HashMap, VecDeque};

use glam::{Quat, Vec3};
use tracing::debug;

use crate::skeleton::{JointSnapshot, SkeletonJoint, JOINT_COUNT};

/// Raw user id assigned by the sensor. 0 means "no user".
pub type UserId = u32;

// ── User events ────────────────────────────────────────────

/// Per-user lifecycle events reported by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserEventKind {
    Appeared,
    CalibrationStarted,
    CalibrationSucceeded,
    CalibrationFailed,
    Lost,
}

impl UserEventKind {
    /// Decode the raw per-user state code a sensor binding reports.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Appeared),
            2 => Some(Self::CalibrationStarted),
            3 => Some(Self::CalibrationSucceeded),
            4 => Some(Self::CalibrationFailed),
            5 => Some(Self::Lost),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Appeared => "appeared",
            Self::CalibrationStarted => "calibration-started",
            Self::CalibrationSucceeded => "calibration-succeeded",
            Self::CalibrationFailed => "calibration-failed",
            Self::Lost => "lost",
        }
    }
}

/// A lifecycle event for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserEvent {
    pub user_id: UserId,
    pub kind: UserEventKind,
}

// ── Source trait ───────────────────────────────────────────

/// Synchronous, per-tick joint data provider.
///
/// Implementations wrap a concrete sensor SDK. All queries are
/// non-blocking and return `None` (or zero confidence) for users or
/// joints the sensor does not currently see.
pub trait JointFrameSource {
    /// Joint position in meters, relative to the sensor.
    fn joint_position(&self, user_id: UserId, joint: SkeletonJoint) -> Option<Vec3>;

    /// Joint orientation.
    fn joint_orientation(&self, user_id: UserId, joint: SkeletonJoint) -> Option<Quat>;

    /// Position confidence in [0, 1].
    fn position_confidence(&self, user_id: UserId, joint: SkeletonJoint) -> f32;

    /// Orientation confidence in [0, 1].
    fn orientation_confidence(&self, user_id: UserId, joint: SkeletonJoint) -> f32;

    /// Drain the lifecycle events produced since the last poll.
    fn poll_user_events(&mut self) -> Vec<UserEvent>;

    /// Start or stop looking for new users. No-op for sources without discovery control.
    fn set_user_discovery(&mut self, _enabled: bool) {}
}

// ── Scripted source ────────────────────────────────────────

/// Scripted data for a single joint.
#[derive(Debug, Clone, Copy)]
struct ScriptedJoint {
    position: Option<Vec3>,
    orientation: Option<Quat>,
    position_confidence: f32,
    orientation_confidence: f32,
}

impl Default for ScriptedJoint {
    fn default() -> Self {
        Self {
            position: None,
            orientation: None,
            position_confidence: 0.0,
            orientation_confidence: 0.0,
        }
    }
}

/// In-memory `JointFrameSource` driven by explicit setters.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    users: HashMap<UserId, [ScriptedJoint; JOINT_COUNT]>,
    events: VecDeque<UserEvent>,
    discovering: bool,
    /// Number of times discovery was switched on or off.
    pub discovery_changes: u32,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn joints_mut(&mut self, user_id: UserId) -> &mut [ScriptedJoint; JOINT_COUNT] {
        self.users
            .entry(user_id)
            .or_insert_with(|| [ScriptedJoint::default(); JOINT_COUNT])
    }

    /// Queue a lifecycle event for the next poll.
    pub fn push_event(&mut self, user_id: UserId, kind: UserEventKind) {
        self.events.push_back(UserEvent { user_id, kind });
    }

    /// Set a joint position with full confidence.
    pub fn set_joint(&mut self, user_id: UserId, joint: SkeletonJoint, position: Vec3) {
        let j = &mut self.joints_mut(user_id)[joint.index()];
        j.position = Some(position);
        j.position_confidence = 1.0;
    }

    /// Set a joint orientation with full confidence.
    pub fn set_joint_orientation(&mut self, user_id: UserId, joint: SkeletonJoint, orientation: Quat) {
        let j = &mut self.joints_mut(user_id)[joint.index()];
        j.orientation = Some(orientation);
        j.orientation_confidence = 1.0;
    }

    /// Override the position confidence of a joint.
    pub fn set_position_confidence(&mut self, user_id: UserId, joint: SkeletonJoint, confidence: f32) {
        self.joints_mut(user_id)[joint.index()].position_confidence = confidence.clamp(0.0, 1.0);
    }

    /// Override the orientation confidence of a joint.
    pub fn set_orientation_confidence(&mut self, user_id: UserId, joint: SkeletonJoint, confidence: f32) {
        self.joints_mut(user_id)[joint.index()].orientation_confidence = confidence.clamp(0.0, 1.0);
    }

    /// Replace a user's joints with the contents of a snapshot.
    ///
    /// Tracked joints get full confidence; untracked joints get none.
    pub fn set_snapshot(&mut self, snapshot: &JointSnapshot) {
        let joints = self.joints_mut(snapshot.user_id);
        for joint in SkeletonJoint::ALL {
            let sample = snapshot.sample(joint);
            let j = &mut joints[joint.index()];
            j.position = Some(sample.position);
            j.position_confidence = if sample.tracked { 1.0 } else { 0.0 };
            j.orientation = sample.orientation;
            j.orientation_confidence = if sample.orientation.is_some() { 1.0 } else { 0.0 };
        }
    }

    /// Drop all joint data for a user.
    pub fn remove_user(&mut self, user_id: UserId) {
        self.users.remove(&user_id);
    }

    /// Whether the core currently asks for user discovery.
    pub fn is_discovering(&self) -> bool {
        self.discovering
    }

    fn joint(&self, user_id: UserId, joint: SkeletonJoint) -> Option<&ScriptedJoint> {
        self.users.get(&user_id).map(|joints| &joints[joint.index()])
    }
}

impl JointFrameSource for ScriptedSource {
    fn joint_position(&self, user_id: UserId, joint: SkeletonJoint) -> Option<Vec3> {
        self.joint(user_id, joint).and_then(|j| j.position)
    }

    fn joint_orientation(&self, user_id: UserId, joint: SkeletonJoint) -> Option<Quat> {
        self.joint(user_id, joint).and_then(|j| j.orientation)
    }

    fn position_confidence(&self, user_id: UserId, joint: SkeletonJoint) -> f32 {
        self.joint(user_id, joint)
            .map(|j| j.position_confidence)
            .unwrap_or(0.0)
    }

    fn orientation_confidence(&self, user_id: UserId, joint: SkeletonJoint) -> f32 {
        self.joint(user_id, joint)
            .map(|j| j.orientation_confidence)
            .unwrap_or(0.0)
    }

    fn poll_user_events(&mut self) -> Vec<UserEvent> {
        self.events.drain(..).collect()
    }

    fn set_user_discovery(&mut self, enabled: bool) {
        if self.discovering != enabled {
            debug!("scripted source discovery -> {}", enabled);
            self.discovering = enabled;
            self.discovery_changes += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_codes() {
        assert_eq!(UserEventKind::from_code(1), Some(UserEventKind::Appeared));
        assert_eq!(UserEventKind::from_code(3), Some(UserEventKind::CalibrationSucceeded));
        assert_eq!(UserEventKind::from_code(5), Some(UserEventKind::Lost));
        assert_eq!(UserEventKind::from_code(0), None);
        assert_eq!(UserEventKind::from_code(6), None);
    }

    #[test]
    fn test_poll_drains_in_order() {
        let mut source = ScriptedSource::new();
        source.push_event(3, UserEventKind::Appeared);
        source.push_event(3, UserEventKind::CalibrationStarted);
        let events = source.poll_user_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, UserEventKind::Appeared);
        assert_eq!(events[1].kind, UserEventKind::CalibrationStarted);
        assert!(source.poll_user_events().is_empty());
    }

    #[test]
    fn test_unknown_user_untracked() {
        let source = ScriptedSource::new();
        assert_eq!(source.joint_position(9, SkeletonJoint::Head), None);
        assert_eq!(source.position_confidence(9, SkeletonJoint::Head), 0.0);
    }

    #[test]
    fn test_remove_user() {
        let mut source = ScriptedSource::new();
        source.set_joint(2, SkeletonJoint::Hips, Vec3::ONE);
        source.remove_user(2);
        assert_eq!(source.joint_position(2, SkeletonJoint::Hips), None);
    }

    #[test]
    fn test_discovery_changes_counted_once() {
        let mut source = ScriptedSource::new();
        source.set_user_discovery(true);
        source.set_user_discovery(true);
        source.set_user_discovery(false);
        assert_eq!(source.discovery_changes, 2);
        assert!(!source.is_discovering());
    }
}
