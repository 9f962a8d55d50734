//! Error types for configuration and registration.
//!
//! Per-frame paths (gesture evaluation, retargeting, lifecycle events)
//! never fail; only the calls that take caller-supplied configuration
//! return a `RigError`.

use crate::source::UserId;

/// Result type alias for rig operations.
pub type Result<T> = std::result::Result<T, RigError>;

/// Configuration and registration failures.
#[derive(Debug, thiserror::Error)]
pub enum RigError {
    /// A gesture name that does not map to any `GestureKind`.
    #[error("unknown gesture kind: {0}")]
    UnknownGesture(String),
    /// A player slot index beyond the two-slot capacity.
    #[error("player slot {0} exceeds the two-slot capacity")]
    SlotCapacity(usize),
    /// A per-user call for a raw id that no slot holds.
    #[error("user {0} is not bound to a player slot")]
    UserNotBound(UserId),
    /// A configuration value outside its allowed range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// Configuration text that is not a valid s-expression.
    #[error("malformed s-expression: {0}")]
    Parse(#[from] lexpr::parse::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            RigError::UnknownGesture("moonwalk".into()).to_string(),
            "unknown gesture kind: moonwalk"
        );
        assert_eq!(
            RigError::SlotCapacity(2).to_string(),
            "player slot 2 exceeds the two-slot capacity"
        );
        assert_eq!(
            RigError::UserNotBound(7).to_string(),
            "user 7 is not bound to a player slot"
        );
    }

    #[test]
    fn test_parse_error_converts() {
        let err: RigError = lexpr::from_str("(:a").unwrap_err().into();
        assert!(matches!(err, RigError::Parse(_)));
        assert!(err.to_string().starts_with("malformed s-expression"));
    }
}
