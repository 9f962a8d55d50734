//! Gesture recognition and avatar retargeting over a full-body skeleton stream.
//!
//! The sensor sits behind `JointFrameSource` and the host scene graph
//! behind `BoneTransforms`. A `Session` ties them together: it assigns
//! calibrated users to two player slots, runs their gesture registries
//! and drives the avatar rigs bound to each slot once per tick.

pub mod avatar;
pub mod config;
pub mod error;
pub mod gesture;
pub mod listener;
pub mod scene;
pub mod session;
pub mod sexp;
pub mod sim;
pub mod skeleton;
pub mod source;

pub use avatar::AvatarRig;
pub use config::{PlayerConfig, RigConfig, SessionConfig};
pub use error::{Result, RigError};
pub use gesture::{GestureConfig, GestureEngine, GestureEvent, GestureKind, GestureRegistry, GestureState};
pub use listener::{GestureListener, LogListener};
pub use scene::{BoneTransforms, NodeId, SceneGraph};
pub use session::{PlayerSlot, Session, SlotState};
pub use skeleton::{JointSnapshot, SkeletonJoint};
pub use source::{JointFrameSource, ScriptedSource, UserEvent, UserEventKind, UserId};
