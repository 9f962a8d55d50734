//! Full-body gesture recognition.
//!
//! `GestureKind` names what can be recognized, `GestureState` is the
//! persistent record for one (user, gesture) pair, `GestureEngine`
//! advances a record one frame at a time and `GestureRegistry` owns a
//! user's records.

mod engine;
mod kind;
mod registry;
mod state;

pub use engine::{GestureConfig, GestureEngine, Transition};
pub use kind::GestureKind;
pub use registry::{GestureEvent, GestureRegistry};
pub use state::GestureState;
