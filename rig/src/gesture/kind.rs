//! Gesture catalogue: kinds, names, required joints and conflict sets.

use std::fmt;
use std::str::FromStr;

use crate::error::RigError;
use crate::skeleton::SkeletonJoint;

/// Every gesture the engine can recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GestureKind {
    /// Right hand held above the right shoulder.
    RaiseRightHand,
    /// Left hand held above the left shoulder.
    RaiseLeftHand,
    /// Both arms raised with elbows at shoulder height.
    Psi,
    /// Both arms extended sideways at shoulder height.
    Tpose,
    /// Both hands held low and away from the hips.
    Stop,
    Wave,
    /// A raised hand held still.
    Click,
    SwipeLeft,
    SwipeRight,
    SwipeUp,
    SwipeDown,
    RightHandCursor,
    LeftHandCursor,
    /// Hands moving apart.
    ZoomIn,
    /// Hands moving together.
    ZoomOut,
    /// Hand-to-hand axis rotating like a steering wheel.
    Wheel,
    Jump,
    Squat,
    Push,
    Pull,
}

impl GestureKind {
    /// All kinds in declaration order.
    pub const ALL: [GestureKind; 20] = [
        Self::RaiseRightHand,
        Self::RaiseLeftHand,
        Self::Psi,
        Self::Tpose,
        Self::Stop,
        Self::Wave,
        Self::Click,
        Self::SwipeLeft,
        Self::SwipeRight,
        Self::SwipeUp,
        Self::SwipeDown,
        Self::RightHandCursor,
        Self::LeftHandCursor,
        Self::ZoomIn,
        Self::ZoomOut,
        Self::Wheel,
        Self::Jump,
        Self::Squat,
        Self::Push,
        Self::Pull,
    ];

    /// Kebab-case name used in config and status output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RaiseRightHand => "raise-right-hand",
            Self::RaiseLeftHand => "raise-left-hand",
            Self::Psi => "psi",
            Self::Tpose => "tpose",
            Self::Stop => "stop",
            Self::Wave => "wave",
            Self::Click => "click",
            Self::SwipeLeft => "swipe-left",
            Self::SwipeRight => "swipe-right",
            Self::SwipeUp => "swipe-up",
            Self::SwipeDown => "swipe-down",
            Self::RightHandCursor => "right-hand-cursor",
            Self::LeftHandCursor => "left-hand-cursor",
            Self::ZoomIn => "zoom-in",
            Self::ZoomOut => "zoom-out",
            Self::Wheel => "wheel",
            Self::Jump => "jump",
            Self::Squat => "squat",
            Self::Push => "push",
            Self::Pull => "pull",
        }
    }

    /// Joints the evaluator reads for this kind.
    pub fn required_joints(&self) -> &'static [SkeletonJoint] {
        use crate::skeleton::SkeletonJoint::*;
        match self {
            Self::RaiseRightHand => &[RightHand, RightShoulder],
            Self::RaiseLeftHand => &[LeftHand, LeftShoulder],
            Self::Psi | Self::Tpose => &[
                LeftHand,
                RightHand,
                LeftElbow,
                RightElbow,
                LeftShoulder,
                RightShoulder,
            ],
            Self::Stop => &[LeftHand, RightHand, Hips],
            Self::Wave => &[RightHand, RightElbow],
            Self::Click => &[LeftHand, RightHand, Hips],
            Self::SwipeLeft => &[RightHand, Hips],
            Self::SwipeRight => &[LeftHand, Hips],
            Self::SwipeUp | Self::SwipeDown | Self::Push | Self::Pull => {
                &[LeftHand, RightHand, Hips]
            }
            Self::RightHandCursor => &[RightHand, RightShoulder, Hips],
            Self::LeftHandCursor => &[LeftHand, LeftShoulder, Hips],
            Self::ZoomIn | Self::ZoomOut | Self::Wheel => &[LeftHand, RightHand, Hips],
            Self::Jump | Self::Squat => &[Hips],
        }
    }

    /// Kinds that may not be evaluated while this one has progress.
    pub fn conflicts(&self) -> &'static [GestureKind] {
        match self {
            Self::ZoomIn => &[Self::ZoomOut, Self::Wheel],
            Self::ZoomOut => &[Self::ZoomIn, Self::Wheel],
            Self::Wheel => &[Self::ZoomIn, Self::ZoomOut],
            _ => &[],
        }
    }

    /// Static hold poses, usable as calibration poses.
    pub fn is_pose(&self) -> bool {
        matches!(
            self,
            Self::RaiseRightHand | Self::RaiseLeftHand | Self::Psi | Self::Tpose | Self::Stop
        )
    }

    /// Continuous cursor kinds that never complete.
    pub fn is_cursor(&self) -> bool {
        matches!(self, Self::RightHandCursor | Self::LeftHandCursor)
    }
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GestureKind {
    type Err = RigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix(':').unwrap_or(s);
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == name)
            .ok_or_else(|| RigError::UnknownGesture(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_roundtrip() {
        for kind in GestureKind::ALL {
            assert_eq!(kind.as_str().parse::<GestureKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_parse_keyword_form() {
        assert_eq!(":swipe-left".parse::<GestureKind>().unwrap(), GestureKind::SwipeLeft);
    }

    #[test]
    fn test_unknown_name_rejected() {
        let err = "moonwalk".parse::<GestureKind>().unwrap_err();
        assert!(matches!(err, RigError::UnknownGesture(ref n) if n == "moonwalk"));
    }

    #[test]
    fn test_conflicts_are_symmetric() {
        for kind in GestureKind::ALL {
            for other in kind.conflicts() {
                assert!(
                    other.conflicts().contains(&kind),
                    "{} lists {} but not the reverse",
                    kind,
                    other
                );
            }
        }
        assert!(GestureKind::SwipeLeft.conflicts().is_empty());
    }

    #[test]
    fn test_every_kind_needs_joints() {
        for kind in GestureKind::ALL {
            assert!(!kind.required_joints().is_empty(), "{}", kind);
        }
    }

    #[test]
    fn test_families() {
        assert!(GestureKind::Psi.is_pose());
        assert!(!GestureKind::Click.is_pose());
        assert!(GestureKind::LeftHandCursor.is_cursor());
        assert!(!GestureKind::Wheel.is_cursor());
    }
}
