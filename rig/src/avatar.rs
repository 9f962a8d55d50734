//! Skeleton-to-avatar retargeting.
//!
//! An `AvatarRig` maps the 15 skeleton joints onto bones of a host
//! scene graph. After `bind` and `capture_rest_pose`, each frame's joint
//! orientations are composed with the captured rest pose and eased
//! toward with a slerp, and the hips position drives the root bone.
//!
//! Rotations applied under an offset node are re-expressed in its frame
//! by adding Euler angles (Y, X, Z order) rather than composing
//! quaternions. Existing rigs are tuned against that behavior, so it is
//! kept as is.

use glam::{EulerRot, Quat, Vec3};
use tracing::{debug, info};

use crate::config::RigConfig;
use crate::scene::{BoneTransforms, NodeId};
use crate::skeleton::{JointSnapshot, SkeletonJoint, JOINT_COUNT};

/// Root position blend rate, per second.
pub const MOVE_BLEND_RATE: f32 = 3.0;

/// Retargeting state for one avatar.
#[derive(Debug, Clone)]
pub struct AvatarRig {
    config: RigConfig,
    /// Skip leg bones.
    near_mode: bool,
    bones: [Option<NodeId>; JOINT_COUNT],
    /// World rotation of each bone at capture time, with the offset node zeroed.
    rest_pose: [Option<Quat>; JOINT_COUNT],
    root: Option<NodeId>,
    offset_node: Option<NodeId>,
    /// Offset node rotation at capture time.
    offset_rotation: Quat,
    /// Scaled hips position recorded on the first root update after calibration.
    position_offset: Option<Vec3>,
}

impl AvatarRig {
    pub fn new(config: RigConfig) -> Self {
        Self {
            config,
            near_mode: false,
            bones: [None; JOINT_COUNT],
            rest_pose: [None; JOINT_COUNT],
            root: None,
            offset_node: None,
            offset_rotation: Quat::IDENTITY,
            position_offset: None,
        }
    }

    /// Use `node` as the positional root.
    pub fn with_root(mut self, node: NodeId) -> Self {
        self.root = Some(node);
        self
    }

    /// Use `node` as the reference frame for retargeted rotations.
    pub fn with_offset_node(mut self, node: NodeId) -> Self {
        self.offset_node = Some(node);
        self
    }

    pub fn set_near_mode(&mut self, near_mode: bool) {
        self.near_mode = near_mode;
    }

    pub fn config(&self) -> &RigConfig {
        &self.config
    }

    pub fn bone(&self, joint: SkeletonJoint) -> Option<NodeId> {
        self.bones[joint.index()]
    }

    pub fn rest_pose(&self, joint: SkeletonJoint) -> Option<Quat> {
        self.rest_pose[joint.index()]
    }

    pub fn is_bound(&self) -> bool {
        self.bones.iter().any(|b| b.is_some())
    }

    /// Store bone handles by joint. Joints left out are skipped from then on.
    /// Clears any previously captured rest pose.
    pub fn bind(&mut self, bones: &[(SkeletonJoint, NodeId)]) {
        self.bones = [None; JOINT_COUNT];
        self.rest_pose = [None; JOINT_COUNT];
        for (joint, node) in bones {
            self.bones[joint.index()] = Some(*node);
        }
        debug!("avatar bound {} bones", bones.len());
    }

    /// Record every bound bone's world rotation as its rest pose.
    ///
    /// The offset node is zeroed while capturing and restored afterwards.
    pub fn capture_rest_pose(&mut self, scene: &mut dyn BoneTransforms) {
        if let Some(offset) = self.offset_node {
            self.offset_rotation = scene.rotation(offset).unwrap_or(Quat::IDENTITY);
            scene.set_rotation(offset, Quat::IDENTITY);
        }

        let mut captured = 0;
        for (i, bone) in self.bones.iter().enumerate() {
            self.rest_pose[i] = bone.and_then(|b| scene.rotation(b));
            if self.rest_pose[i].is_some() {
                captured += 1;
            }
        }

        if let Some(offset) = self.offset_node {
            scene.set_rotation(offset, self.offset_rotation);
        }
        info!("captured rest pose for {} bones", captured);
    }

    /// Ease every bound bone toward the snapshot's joint orientations.
    ///
    /// Bones are written parents first, so a child's world rotation is
    /// not moved by its parent's write later in the same frame.
    pub fn retarget(&mut self, scene: &mut dyn BoneTransforms, snapshot: &JointSnapshot, dt: f32) {
        let t = (dt * self.config.smooth_factor).clamp(0.0, 1.0);
        let offset = self.offset_node.and_then(|n| scene.rotation(n));

        for bone_joint in SkeletonJoint::HIERARCHY {
            self.retarget_bone(scene, snapshot, bone_joint, offset, t);
        }
    }

    fn retarget_bone(
        &self,
        scene: &mut dyn BoneTransforms,
        snapshot: &JointSnapshot,
        bone_joint: SkeletonJoint,
        offset: Option<Quat>,
        t: f32,
    ) -> Option<()> {
        if self.near_mode && bone_joint.is_leg() {
            return None;
        }
        let joint = if self.config.mirrored { bone_joint.mirrored() } else { bone_joint };

        let bone = self.bones[bone_joint.index()]?;
        let rest = self.rest_pose[bone_joint.index()]?;
        let orientation = snapshot.orientation(joint)?;

        let mut target = orientation * rest;
        if let Some(offset) = offset {
            target = euler_sum(target, offset);
        }

        let current = scene.rotation(bone)?;
        scene.set_rotation(bone, current.slerp(target, t));
        Some(())
    }

    /// Move the root bone with the hips.
    ///
    /// The first call after calibration records the position offset so the
    /// avatar starts at the origin.
    pub fn retarget_root(&mut self, scene: &mut dyn BoneTransforms, snapshot: &JointSnapshot, dt: f32) {
        let Some(root) = self.root else { return };
        let Some(hips) = snapshot.position(SkeletonJoint::Hips) else { return };

        let x = if self.config.mirrored { -hips.x } else { hips.x };
        let scaled = Vec3::new(x, hips.y, -hips.z) * self.config.move_rate as f32;
        let offset = *self.position_offset.get_or_insert(scaled);

        let mut target = scaled - offset;
        if !self.config.vertical_movement {
            target.y = 0.0;
        }

        let current = scene.local_position(root).unwrap_or(Vec3::ZERO);
        let t = (MOVE_BLEND_RATE * dt).clamp(0.0, 1.0);
        scene.set_local_position(root, current.lerp(target, t));
    }

    /// Per-frame update: bone rotations, then root motion.
    pub fn update(&mut self, scene: &mut dyn BoneTransforms, snapshot: &JointSnapshot, dt: f32) {
        self.retarget(scene, snapshot, dt);
        self.retarget_root(scene, snapshot, dt);
    }

    /// A user was bound to this rig's slot: restore the offset node and
    /// re-record the position offset on the next root update.
    pub fn successful_calibration(&mut self, scene: &mut dyn BoneTransforms) {
        if let Some(offset) = self.offset_node {
            scene.set_rotation(offset, self.offset_rotation);
        }
        self.position_offset = None;
    }

    /// Put every bound bone back at its rest rotation and the root at the origin.
    pub fn reset_to_rest_pose(&mut self, scene: &mut dyn BoneTransforms) {
        if let Some(offset) = self.offset_node {
            scene.set_rotation(offset, Quat::IDENTITY);
        }

        for joint in SkeletonJoint::HIERARCHY {
            let i = joint.index();
            if let (Some(bone), Some(rest)) = (self.bones[i], self.rest_pose[i]) {
                scene.set_rotation(bone, rest);
            }
        }

        if let Some(root) = self.root {
            scene.set_local_position(root, Vec3::ZERO);
        }

        if let Some(offset) = self.offset_node {
            scene.set_rotation(offset, self.offset_rotation);
        }
    }

    /// Generate s-expression for IPC-style status.
    pub fn status_sexp(&self) -> String {
        let bound = self.bones.iter().filter(|b| b.is_some()).count();
        let rest = self.rest_pose.iter().filter(|r| r.is_some()).count();
        format!(
            "(:bones {} :rest-pose {} :mirrored {} :near-mode {} :offset-calibrated {})",
            bound,
            rest,
            if self.config.mirrored { "t" } else { "nil" },
            if self.near_mode { "t" } else { "nil" },
            if self.position_offset.is_some() { "t" } else { "nil" },
        )
    }
}

/// Combine two rotations by adding their Y-X-Z Euler angles.
pub fn euler_sum(a: Quat, b: Quat) -> Quat {
    let (ay, ax, az) = a.to_euler(EulerRot::YXZ);
    let (by, bx, bz) = b.to_euler(EulerRot::YXZ);
    Quat::from_euler(EulerRot::YXZ, ay + by, ax + bx, az + bz)
}

// ── Tests ──────────────────────────────────────────────────
