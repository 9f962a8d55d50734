//! Scripted performer for the headless simulator.
//!
//! A `Performer` plays one user in front of a `ScriptedSource`: it walks
//! in, calibrates with the psi pose, swipes left, zooms in, walks around
//! and leaves. Each call to `step` writes that moment's skeleton and
//! queues the lifecycle events for the acts it enters.

use std::f32::consts::TAU;

use glam::{Quat, Vec3};
use tracing::debug;

use crate::skeleton::{standing_pose, JointSnapshot, SkeletonJoint};
use crate::source::{ScriptedSource, UserEventKind, UserId};

/// One part of the choreography.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Act {
    Absent,
    Enter,
    CalibrationPose,
    Rest,
    SwipeLeft,
    ZoomIn,
    Walk,
    Leave,
}

impl Act {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Enter => "enter",
            Self::CalibrationPose => "calibration-pose",
            Self::Rest => "rest",
            Self::SwipeLeft => "swipe-left",
            Self::ZoomIn => "zoom-in",
            Self::Walk => "walk",
            Self::Leave => "leave",
        }
    }
}

/// Start time (s) of each act.
const SCRIPT: [(f64, Act); 9] = [
    (0.0, Act::Enter),
    (0.5, Act::CalibrationPose),
    (2.0, Act::Rest),
    (2.5, Act::SwipeLeft),
    (3.0, Act::Rest),
    (4.0, Act::ZoomIn),
    (4.5, Act::Rest),
    (5.0, Act::Walk),
    (7.0, Act::Leave),
];

/// Total length of the choreography (s).
pub const SCRIPT_LENGTH: f64 = 7.0;

/// Act at time `t` with its start and duration.
fn act_at(t: f64) -> (Act, f64, f64) {
    let mut current = (Act::Absent, 0.0, 0.0);
    for (i, (start, act)) in SCRIPT.iter().enumerate() {
        if t < *start {
            break;
        }
        let end = SCRIPT.get(i + 1).map(|(s, _)| *s).unwrap_or(*start);
        current = (*act, *start, end - start);
    }
    current
}

/// Simulated user.
#[derive(Debug)]
pub struct Performer {
    user_id: UserId,
    sensor_height: f32,
    act: Act,
}

impl Performer {
    pub fn new(user_id: UserId, sensor_height: f32) -> Self {
        Self {
            user_id,
            sensor_height,
            act: Act::Absent,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn act(&self) -> Act {
        self.act
    }

    pub fn is_done(&self) -> bool {
        self.act == Act::Leave
    }

    /// Write the skeleton for time `t` and queue events for a new act.
    pub fn step(&mut self, source: &mut ScriptedSource, t: f64) -> Act {
        let (act, start, duration) = act_at(t);
        if act != self.act {
            debug!("performer {}: {} -> {}", self.user_id, self.act.as_str(), act.as_str());
            self.enter(source, act);
            self.act = act;
        }

        if matches!(act, Act::Absent | Act::Leave) {
            return act;
        }

        let f = if duration > 0.0 {
            ((t - start) / duration).clamp(0.0, 1.0) as f32
        } else {
            0.0
        };
        let pose = self.pose(act, f);
        source.set_snapshot(&self.to_sensor(&pose));
        act
    }

    fn enter(&self, source: &mut ScriptedSource, act: Act) {
        match act {
            Act::Enter => {
                source.push_event(self.user_id, UserEventKind::Appeared);
                source.push_event(self.user_id, UserEventKind::CalibrationStarted);
            }
            Act::CalibrationPose => {
                source.push_event(self.user_id, UserEventKind::CalibrationSucceeded);
            }
            Act::Leave => {
                source.push_event(self.user_id, UserEventKind::Lost);
                source.remove_user(self.user_id);
            }
            _ => {}
        }
    }

    /// Skeleton for `act` at fraction `f` of its duration, in the lifted frame.
    pub fn pose(&self, act: Act, f: f32) -> JointSnapshot {
        use crate::skeleton::SkeletonJoint::*;
        let mut s = standing_pose(self.user_id);

        match act {
            Act::CalibrationPose => {
                s.set_position(LeftElbow, Vec3::new(-0.45, 1.45, 2.0));
                s.set_position(RightElbow, Vec3::new(0.45, 1.45, 2.0));
                s.set_position(LeftHand, Vec3::new(-0.45, 1.8, 2.0));
                s.set_position(RightHand, Vec3::new(0.45, 1.8, 2.0));
            }
            Act::SwipeLeft => {
                s.set_position(RightHand, Vec3::new(0.35 - 0.45 * f, 1.3, 2.0));
            }
            Act::ZoomIn => {
                let half = 0.1 + 0.3 * f;
                s.set_position(LeftHand, Vec3::new(-half, 1.3, 2.0));
                s.set_position(RightHand, Vec3::new(half, 1.3, 2.0));
            }
            Act::Walk => {
                let offset = Vec3::new(0.4 * (TAU * f).sin(), 0.02 * (2.0 * TAU * f).sin(), -0.5 * f);
                for joint in SkeletonJoint::ALL {
                    if let Some(p) = s.position(joint) {
                        s.set_position(joint, p + offset);
                    }
                }
                let swing = 0.4 * (2.0 * TAU * f).sin();
                s.set_orientation(LeftElbow, Quat::from_rotation_x(swing));
                s.set_orientation(RightElbow, Quat::from_rotation_x(-swing));
                s.set_orientation(LeftKnee, Quat::from_rotation_x(-swing));
                s.set_orientation(RightKnee, Quat::from_rotation_x(swing));
            }
            _ => {}
        }
        s
    }

    /// Shift a lifted-frame pose back into sensor coordinates.
    fn to_sensor(&self, pose: &JointSnapshot) -> JointSnapshot {
        let mut out = pose.clone();
        for joint in SkeletonJoint::ALL {
            if let Some(p) = pose.position(joint) {
                out.set_position(joint, p - Vec3::new(0.0, self.sensor_height, 0.0));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::AvatarRig;
    use crate::config::{RigConfig, SessionConfig};
    use crate::gesture::GestureKind;
    use crate::listener::Recorder;
    use crate::scene::{BoneTransforms, SceneGraph};
    use crate::session::Session;
    use crate::source::{JointFrameSource, UserEvent};

    #[test]
    fn test_act_timeline() {
        assert_eq!(act_at(0.0).0, Act::Enter);
        assert_eq!(act_at(0.49).0, Act::Enter);
        assert_eq!(act_at(1.0).0, Act::CalibrationPose);
        let (act, start, duration) = act_at(2.75);
        assert_eq!(act, Act::SwipeLeft);
        assert!((start - 2.5).abs() < 1e-9);
        assert!((duration - 0.5).abs() < 1e-9);
        assert_eq!(act_at(9.0).0, Act::Leave);
    }

    #[test]
    fn test_events_queued_once_per_act() {
        let mut source = ScriptedSource::new();
        let mut performer = Performer::new(1, 1.0);
        performer.step(&mut source, 0.0);
        performer.step(&mut source, 0.1);
        performer.step(&mut source, 0.6);
        let kinds: Vec<UserEventKind> = source.poll_user_events().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                UserEventKind::Appeared,
                UserEventKind::CalibrationStarted,
                UserEventKind::CalibrationSucceeded
            ]
        );

        performer.step(&mut source, 7.5);
        assert!(performer.is_done());
        assert_eq!(
            source.poll_user_events(),
            vec![UserEvent {
                user_id: 1,
                kind: UserEventKind::Lost
            }]
        );
        assert_eq!(source.joint_position(1, SkeletonJoint::Hips), None);
    }

    #[test]
    fn test_sensor_frame_offset() {
        let mut source = ScriptedSource::new();
        let mut performer = Performer::new(2, 1.0);
        performer.step(&mut source, 0.0);
        let hips = source.joint_position(2, SkeletonJoint::Hips).unwrap();
        assert!(hips.y.abs() < 1e-6);
    }

    #[test]
    fn test_full_session() {
        let mut config = SessionConfig::default();
        config.players[0].calibration_pose = Some(GestureKind::Psi);
        config.players[0].gestures = vec![GestureKind::SwipeLeft, GestureKind::ZoomIn];

        let (mut scene, humanoid) = SceneGraph::humanoid();
        let mut rig = AvatarRig::new(RigConfig::default())
            .with_root(humanoid.root)
            .with_offset_node(humanoid.offset);
        rig.bind(&humanoid.bones);
        rig.capture_rest_pose(&mut scene);

        let mut session = Session::new(config).unwrap();
        session.add_rig(0, rig).unwrap();
        let recorder = Recorder::default();
        session.add_listener(Box::new(recorder.clone()));

        let mut source = ScriptedSource::new();
        let mut performer = Performer::new(1, session.config().sensor_height);
        session.start(&mut source);

        let fps = 30.0;
        let mut max_root = 0.0f32;
        for frame in 0..(8.0 * fps) as u32 {
            let t = frame as f64 / fps;
            performer.step(&mut source, t);
            session.tick(&mut source, &mut scene, t, (1.0 / fps) as f32);
            if let Some(p) = scene.local_position(humanoid.root) {
                max_root = max_root.max(p.length());
            }
            if frame == (2.2 * fps) as u32 {
                assert_eq!(session.player_id(0), 1, "not calibrated by 2.2 s");
                assert!(!session.is_discovering());
            }
        }

        assert!(recorder.contains("detected 1 0"));
        assert!(recorder.contains("completed 1 swipe-left"));
        assert!(recorder.contains("completed 1 zoom-in"));
        assert!(recorder.contains("lost 1 0"));
        assert!(max_root > 0.1, "root never moved: {}", max_root);
        assert_eq!(scene.local_position(humanoid.root), Some(Vec3::ZERO));
        assert_eq!(session.player_id(0), 0);
        assert!(session.is_discovering());
        assert!(source.is_discovering());
    }
}
