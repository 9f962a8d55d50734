//! Full-body skeleton joints and per-frame joint snapshots.
//!
//! Models the 15 canonical joints reported by the depth sensor, the
//! left/right mirror table, and the `JointSnapshot` rebuilt every frame
//! from a `JointFrameSource`.
//!
//! Frame convention: meters, +x toward the user's right, +y up,
//! +z away from the sensor.

use glam::{Quat, Vec3};

use crate::source::{JointFrameSource, UserId};

// ── Joint definitions ──────────────────────────────────────

/// The 15 skeleton joints, in sensor index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkeletonJoint {
    Head,
    Neck,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftHand,
    RightHand,
    Hips,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftFoot,
    RightFoot,
}

/// Total number of skeleton joints.
pub const JOINT_COUNT: usize = 15;

/// Minimum confidence for a joint position or orientation to count as tracked.
pub const TRACKING_CONFIDENCE: f32 = 0.5;

impl SkeletonJoint {
    /// All joints, indexed by `index()`.
    pub const ALL: [SkeletonJoint; JOINT_COUNT] = [
        Self::Head,
        Self::Neck,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftHand,
        Self::RightHand,
        Self::Hips,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftFoot,
        Self::RightFoot,
    ];

    /// All joints with every parent ahead of its children.
    pub const HIERARCHY: [SkeletonJoint; JOINT_COUNT] = [
        Self::Hips,
        Self::Neck,
        Self::Head,
        Self::LeftShoulder,
        Self::LeftElbow,
        Self::LeftHand,
        Self::RightShoulder,
        Self::RightElbow,
        Self::RightHand,
        Self::LeftHip,
        Self::LeftKnee,
        Self::LeftFoot,
        Self::RightHip,
        Self::RightKnee,
        Self::RightFoot,
    ];

    /// Convert joint enum to array index (0-14).
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Joint for an array index, if in range.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// String representation for config and status output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Neck => "neck",
            Self::LeftShoulder => "left-shoulder",
            Self::RightShoulder => "right-shoulder",
            Self::LeftElbow => "left-elbow",
            Self::RightElbow => "right-elbow",
            Self::LeftHand => "left-hand",
            Self::RightHand => "right-hand",
            Self::Hips => "hips",
            Self::LeftHip => "left-hip",
            Self::RightHip => "right-hip",
            Self::LeftKnee => "left-knee",
            Self::RightKnee => "right-knee",
            Self::LeftFoot => "left-foot",
            Self::RightFoot => "right-foot",
        }
    }

    /// Parse a joint from its `as_str` name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|j| j.as_str() == name)
    }

    /// The joint on the opposite side of the body. Center joints map to themselves.
    pub fn mirrored(&self) -> Self {
        match self {
            Self::LeftShoulder => Self::RightShoulder,
            Self::RightShoulder => Self::LeftShoulder,
            Self::LeftElbow => Self::RightElbow,
            Self::RightElbow => Self::LeftElbow,
            Self::LeftHand => Self::RightHand,
            Self::RightHand => Self::LeftHand,
            Self::LeftHip => Self::RightHip,
            Self::RightHip => Self::LeftHip,
            Self::LeftKnee => Self::RightKnee,
            Self::RightKnee => Self::LeftKnee,
            Self::LeftFoot => Self::RightFoot,
            Self::RightFoot => Self::LeftFoot,
            Self::Head | Self::Neck | Self::Hips => *self,
        }
    }

    /// Leg joints, skipped by avatar retargeting in near mode.
    pub fn is_leg(&self) -> bool {
        matches!(
            self,
            Self::LeftHip
                | Self::RightHip
                | Self::LeftKnee
                | Self::RightKnee
                | Self::LeftFoot
                | Self::RightFoot
        )
    }
}

// ── Joint sample ───────────────────────────────────────────

/// One joint's data for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointSample {
    /// Position in meters.
    pub position: Vec3,
    /// Position confidence passed the tracking threshold.
    pub tracked: bool,
    /// Orientation, present only when tracked and not identity.
    pub orientation: Option<Quat>,
}

impl Default for JointSample {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            tracked: false,
            orientation: None,
        }
    }
}

// ── Snapshot ───────────────────────────────────────────────

/// All joints of one user for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct JointSnapshot {
    /// Raw sensor user id this snapshot belongs to.
    pub user_id: UserId,
    joints: [JointSample; JOINT_COUNT],
}

impl JointSnapshot {
    /// A snapshot with every joint untracked.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            joints: [JointSample::default(); JOINT_COUNT],
        }
    }

    /// Pull one frame for `user_id` from the sensor.
    ///
    /// Positions are gated at `TRACKING_CONFIDENCE` and lifted by
    /// `sensor_height` on y. Orientations are gated independently and an
    /// identity quaternion is treated as "no orientation".
    pub fn capture(source: &dyn JointFrameSource, user_id: UserId, sensor_height: f32) -> Self {
        let mut snapshot = Self::empty(user_id);

        for joint in SkeletonJoint::ALL {
            let sample = &mut snapshot.joints[joint.index()];

            if source.position_confidence(user_id, joint) >= TRACKING_CONFIDENCE {
                if let Some(pos) = source.joint_position(user_id, joint) {
                    sample.position = pos + Vec3::new(0.0, sensor_height, 0.0);
                    sample.tracked = true;
                }
            }

            if source.orientation_confidence(user_id, joint) >= TRACKING_CONFIDENCE {
                sample.orientation = source
                    .joint_orientation(user_id, joint)
                    .filter(|q| !is_identity(*q));
            }
        }

        snapshot
    }

    /// Sample for a joint.
    pub fn sample(&self, joint: SkeletonJoint) -> &JointSample {
        &self.joints[joint.index()]
    }

    /// Position of a joint, or None when untracked.
    pub fn position(&self, joint: SkeletonJoint) -> Option<Vec3> {
        let s = &self.joints[joint.index()];
        s.tracked.then_some(s.position)
    }

    /// Whether the joint position is tracked this frame.
    pub fn is_tracked(&self, joint: SkeletonJoint) -> bool {
        self.joints[joint.index()].tracked
    }

    /// Orientation of a joint, or None when untracked.
    pub fn orientation(&self, joint: SkeletonJoint) -> Option<Quat> {
        self.joints[joint.index()].orientation
    }

    /// Set a tracked position.
    pub fn set_position(&mut self, joint: SkeletonJoint, position: Vec3) {
        let s = &mut self.joints[joint.index()];
        s.position = position;
        s.tracked = true;
    }

    /// Set an orientation. Identity clears it.
    pub fn set_orientation(&mut self, joint: SkeletonJoint, orientation: Quat) {
        self.joints[joint.index()].orientation = (!is_identity(orientation)).then_some(orientation);
    }

    /// Mark a joint untracked (position and orientation).
    pub fn clear(&mut self, joint: SkeletonJoint) {
        self.joints[joint.index()] = JointSample::default();
    }

    /// Number of joints with a tracked position.
    pub fn tracked_count(&self) -> usize {
        self.joints.iter().filter(|s| s.tracked).count()
    }
}

/// Whether a quaternion is (numerically) the identity rotation.
pub fn is_identity(q: Quat) -> bool {
    q.abs_diff_eq(Quat::IDENTITY, 1e-6) || q.abs_diff_eq(-Quat::IDENTITY, 1e-6)
}

// ── Reference poses ────────────────────────────────────────

/// A user standing 2 m from the sensor, arms down, every joint tracked.
///
/// Positions are in the lifted frame (hips at 1 m); subtract the sensor
/// height before feeding them to a source.
pub fn standing_pose(user_id: UserId) -> JointSnapshot {
    use SkeletonJoint::*;
    let mut snapshot = JointSnapshot::empty(user_id);
    let joints = [
        (Head, 0.0, 1.7),
        (Neck, 0.0, 1.5),
        (LeftShoulder, -0.2, 1.45),
        (RightShoulder, 0.2, 1.45),
        (LeftElbow, -0.22, 1.15),
        (RightElbow, 0.22, 1.15),
        (LeftHand, -0.15, 0.85),
        (RightHand, 0.15, 0.85),
        (Hips, 0.0, 1.0),
        (LeftHip, -0.1, 0.95),
        (RightHip, 0.1, 0.95),
        (LeftKnee, -0.1, 0.5),
        (RightKnee, 0.1, 0.5),
        (LeftFoot, -0.1, 0.05),
        (RightFoot, 0.1, 0.05),
    ];
    for (joint, x, y) in joints {
        snapshot.set_position(joint, Vec3::new(x, y, 2.0));
    }
    snapshot
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ScriptedSource;

    #[test]
    fn test_joint_count() {
        assert_eq!(SkeletonJoint::ALL.len(), JOINT_COUNT);
        for (i, joint) in SkeletonJoint::ALL.iter().enumerate() {
            assert_eq!(joint.index(), i);
            assert_eq!(SkeletonJoint::from_index(i), Some(*joint));
        }
        assert_eq!(SkeletonJoint::from_index(JOINT_COUNT), None);
    }

    #[test]
    fn test_mirror_is_involution() {
        for joint in SkeletonJoint::ALL {
            assert_eq!(joint.mirrored().mirrored(), joint);
        }
    }

    #[test]
    fn test_hierarchy_covers_every_joint_once() {
        let mut seen = [false; JOINT_COUNT];
        for joint in SkeletonJoint::HIERARCHY {
            assert!(!seen[joint.index()], "{} listed twice", joint.as_str());
            seen[joint.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));

        let pos = |j: SkeletonJoint| SkeletonJoint::HIERARCHY.iter().position(|h| *h == j);
        assert!(pos(SkeletonJoint::Hips) < pos(SkeletonJoint::Neck));
        assert!(pos(SkeletonJoint::Neck) < pos(SkeletonJoint::Head));
        assert!(pos(SkeletonJoint::Neck) < pos(SkeletonJoint::RightShoulder));
        assert!(pos(SkeletonJoint::LeftElbow) < pos(SkeletonJoint::LeftHand));
        assert!(pos(SkeletonJoint::RightKnee) < pos(SkeletonJoint::RightFoot));
    }

    #[test]
    fn test_mirror_center_joints_fixed() {
        assert_eq!(SkeletonJoint::Head.mirrored(), SkeletonJoint::Head);
        assert_eq!(SkeletonJoint::Neck.mirrored(), SkeletonJoint::Neck);
        assert_eq!(SkeletonJoint::Hips.mirrored(), SkeletonJoint::Hips);
        assert_eq!(SkeletonJoint::LeftHand.mirrored(), SkeletonJoint::RightHand);
        assert_eq!(SkeletonJoint::RightFoot.mirrored(), SkeletonJoint::LeftFoot);
    }

    #[test]
    fn test_name_roundtrip() {
        for joint in SkeletonJoint::ALL {
            assert_eq!(SkeletonJoint::from_name(joint.as_str()), Some(joint));
        }
        assert_eq!(SkeletonJoint::from_name("tail"), None);
    }

    #[test]
    fn test_capture_gates_on_confidence() {
        let mut source = ScriptedSource::new();
        source.set_joint(1, SkeletonJoint::Head, Vec3::new(0.0, 0.6, 2.0));
        source.set_joint(1, SkeletonJoint::RightHand, Vec3::new(0.3, 0.0, 2.0));
        source.set_position_confidence(1, SkeletonJoint::RightHand, 0.3);

        let snapshot = JointSnapshot::capture(&source, 1, 1.0);
        let head = snapshot.position(SkeletonJoint::Head).unwrap();
        assert!((head.y - 1.6).abs() < 1e-6, "sensor height not applied");
        assert!(!snapshot.is_tracked(SkeletonJoint::RightHand));
        assert!(!snapshot.is_tracked(SkeletonJoint::LeftFoot));
        assert_eq!(snapshot.tracked_count(), 1);
    }

    #[test]
    fn test_capture_confidence_boundary_is_tracked() {
        let mut source = ScriptedSource::new();
        source.set_joint(1, SkeletonJoint::Neck, Vec3::ZERO);
        source.set_position_confidence(1, SkeletonJoint::Neck, 0.5);
        let snapshot = JointSnapshot::capture(&source, 1, 0.0);
        assert!(snapshot.is_tracked(SkeletonJoint::Neck));
    }

    #[test]
    fn test_identity_orientation_dropped() {
        let mut source = ScriptedSource::new();
        source.set_joint(1, SkeletonJoint::Neck, Vec3::ZERO);
        source.set_joint_orientation(1, SkeletonJoint::Neck, Quat::IDENTITY);
        source.set_joint(1, SkeletonJoint::Head, Vec3::ZERO);
        source.set_joint_orientation(1, SkeletonJoint::Head, Quat::from_rotation_y(0.5));

        let snapshot = JointSnapshot::capture(&source, 1, 0.0);
        assert!(snapshot.orientation(SkeletonJoint::Neck).is_none());
        assert!(snapshot.orientation(SkeletonJoint::Head).is_some());
    }

    #[test]
    fn test_set_and_clear() {
        let mut snapshot = JointSnapshot::empty(4);
        snapshot.set_position(SkeletonJoint::Hips, Vec3::new(0.0, 1.0, 2.0));
        assert!(snapshot.is_tracked(SkeletonJoint::Hips));
        snapshot.clear(SkeletonJoint::Hips);
        assert_eq!(snapshot.position(SkeletonJoint::Hips), None);
    }

    #[test]
    fn test_leg_joints() {
        let legs = SkeletonJoint::ALL.iter().filter(|j| j.is_leg()).count();
        assert_eq!(legs, 6);
        assert!(!SkeletonJoint::Hips.is_leg());
    }
}
