//! Host scene-graph boundary.
//!
//! Avatar rigs reference bones by `NodeId` and never own them.
//! `BoneTransforms` is what a rig needs from the host engine;
//! `SceneGraph` is a small in-memory parent/child transform table that
//! implements it for the simulator and tests.

use glam::{Quat, Vec3};

use crate::skeleton::SkeletonJoint;

/// Handle to a node in the host scene graph.
pub type NodeId = usize;

/// Transform access a rig needs from the host scene.
///
/// Rotations are world-space; positions are local to the parent.
/// Unknown nodes read as `None` and ignore writes.
pub trait BoneTransforms {
    fn rotation(&self, node: NodeId) -> Option<Quat>;
    fn set_rotation(&mut self, node: NodeId, rotation: Quat);
    fn local_position(&self, node: NodeId) -> Option<Vec3>;
    fn set_local_position(&mut self, node: NodeId, position: Vec3);
}

// ── Scene graph ────────────────────────────────────────────

#[derive(Debug, Clone)]
struct SceneNode {
    name: String,
    parent: Option<NodeId>,
    local_rotation: Quat,
    local_position: Vec3,
}

/// In-memory transform hierarchy.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. A parent id that does not exist makes it a root.
    pub fn add_node(&mut self, name: &str, parent: Option<NodeId>, local_position: Vec3) -> NodeId {
        let parent = parent.filter(|p| *p < self.nodes.len());
        self.nodes.push(SceneNode {
            name: name.to_string(),
            parent,
            local_rotation: Quat::IDENTITY,
            local_position,
        });
        self.nodes.len() - 1
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find a node by name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name)
    }

    pub fn name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node).map(|n| n.name.as_str())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).and_then(|n| n.parent)
    }

    pub fn local_rotation(&self, node: NodeId) -> Option<Quat> {
        self.nodes.get(node).map(|n| n.local_rotation)
    }

    pub fn set_local_rotation(&mut self, node: NodeId, rotation: Quat) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.local_rotation = rotation.normalize();
        }
    }

    /// World rotation of the parent, identity for roots.
    fn parent_rotation(&self, node: NodeId) -> Quat {
        self.parent(node)
            .and_then(|p| self.rotation(p))
            .unwrap_or(Quat::IDENTITY)
    }
}

impl BoneTransforms for SceneGraph {
    fn rotation(&self, node: NodeId) -> Option<Quat> {
        let n = self.nodes.get(node)?;
        Some(self.parent_rotation(node) * n.local_rotation)
    }

    fn set_rotation(&mut self, node: NodeId, rotation: Quat) {
        let parent = self.parent_rotation(node);
        if let Some(n) = self.nodes.get_mut(node) {
            n.local_rotation = (parent.inverse() * rotation).normalize();
        }
    }

    fn local_position(&self, node: NodeId) -> Option<Vec3> {
        self.nodes.get(node).map(|n| n.local_position)
    }

    fn set_local_position(&mut self, node: NodeId, position: Vec3) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.local_position = position;
        }
    }
}

// ── Humanoid ───────────────────────────────────────────────

/// Node handles of a humanoid built by `SceneGraph::humanoid`.
#[derive(Debug, Clone)]
pub struct Humanoid {
    /// Positional root moved by root motion.
    pub root: NodeId,
    /// Reference frame for retargeted rotations.
    pub offset: NodeId,
    /// Bone for each skeleton joint.
    pub bones: Vec<(SkeletonJoint, NodeId)>,
}

impl SceneGraph {
    /// Build a humanoid bone hierarchy: root, offset node, then one bone per joint.
    pub fn humanoid() -> (Self, Humanoid) {
        use crate::skeleton::SkeletonJoint::*;

        let mut scene = Self::new();
        let root = scene.add_node("root", None, Vec3::ZERO);
        let offset = scene.add_node("offset", Some(root), Vec3::ZERO);

        let hips = scene.add_node("hips", Some(offset), Vec3::new(0.0, 1.0, 0.0));
        let neck = scene.add_node("neck", Some(hips), Vec3::new(0.0, 0.5, 0.0));
        let head = scene.add_node("head", Some(neck), Vec3::new(0.0, 0.2, 0.0));

        let l_upper = scene.add_node("left-upper-arm", Some(neck), Vec3::new(-0.2, -0.05, 0.0));
        let l_elbow = scene.add_node("left-elbow", Some(l_upper), Vec3::new(0.0, -0.3, 0.0));
        let l_hand = scene.add_node("left-hand", Some(l_elbow), Vec3::new(0.0, -0.3, 0.0));
        let r_upper = scene.add_node("right-upper-arm", Some(neck), Vec3::new(0.2, -0.05, 0.0));
        let r_elbow = scene.add_node("right-elbow", Some(r_upper), Vec3::new(0.0, -0.3, 0.0));
        let r_hand = scene.add_node("right-hand", Some(r_elbow), Vec3::new(0.0, -0.3, 0.0));

        let l_thigh = scene.add_node("left-thigh", Some(hips), Vec3::new(-0.1, -0.05, 0.0));
        let l_knee = scene.add_node("left-knee", Some(l_thigh), Vec3::new(0.0, -0.45, 0.0));
        let l_foot = scene.add_node("left-foot", Some(l_knee), Vec3::new(0.0, -0.45, 0.0));
        let r_thigh = scene.add_node("right-thigh", Some(hips), Vec3::new(0.1, -0.05, 0.0));
        let r_knee = scene.add_node("right-knee", Some(r_thigh), Vec3::new(0.0, -0.45, 0.0));
        let r_foot = scene.add_node("right-foot", Some(r_knee), Vec3::new(0.0, -0.45, 0.0));

        let bones = vec![
            (Hips, hips),
            (Neck, neck),
            (Head, head),
            (LeftShoulder, l_upper),
            (LeftElbow, l_elbow),
            (LeftHand, l_hand),
            (RightShoulder, r_upper),
            (RightElbow, r_elbow),
            (RightHand, r_hand),
            (LeftHip, l_thigh),
            (LeftKnee, l_knee),
            (LeftFoot, l_foot),
            (RightHip, r_thigh),
            (RightKnee, r_knee),
            (RightFoot, r_foot),
        ];

        (scene, Humanoid { root, offset, bones })
    }
}
