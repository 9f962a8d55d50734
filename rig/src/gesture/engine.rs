//! Per-gesture state machine.
//!
//! `GestureEngine` advances one `GestureState` per call from a
//! `JointSnapshot`. It keeps no state of its own between calls; every
//! phase, anchor and progress value lives in the record.
//!
//! Families:
//! - hold poses (raise, psi, tpose, stop) and click: held time / duration
//! - directional motions (swipes, push/pull, jump/squat): travel along an axis
//! - two-hand measures (zoom in/out, wheel): spread or rotation of the hand axis
//! - wave: three alternating swings past the elbow
//! - hand cursors: continuous, never complete

use glam::Vec3;
use tracing::debug;

use super::kind::GestureKind;
use super::state::GestureState;
use crate::skeleton::{JointSnapshot, SkeletonJoint};

// ── Config ─────────────────────────────────────────────────

/// Thresholds and timing for gesture recognition.
#[derive(Debug, Clone)]
pub struct GestureConfig {
    /// Seconds a pose must be held to complete.
    pub pose_duration: f32,
    /// Height (m) a hand must clear its shoulder by to count as raised.
    pub raise_threshold: f32,
    /// Positional slack (m) for pose alignment checks.
    pub pose_tolerance: f32,
    /// Minimum outward reach (m) of each hand past its shoulder in a T-pose.
    pub arm_extension: f32,
    /// Minimum outward spread (m) of each hand from the hips in the stop pose.
    pub arm_spread: f32,
    /// Radius (m) a clicking hand must stay within.
    pub click_radius: f32,
    /// Seconds a click must be held.
    pub click_duration: f32,
    /// Travel (m) to complete a swipe.
    pub swipe_distance: f32,
    /// Travel (m) to complete a push or pull.
    pub push_distance: f32,
    /// Hips travel (m) to complete a jump or squat.
    pub jump_distance: f32,
    /// Travel (m) a motion or zoom must exceed before it counts as started.
    pub travel_dead_zone: f32,
    /// Backward travel (m) from the furthest point that cancels a motion.
    pub reversal_tolerance: f32,
    /// Sideways drift (m) that cancels a directional motion.
    pub off_axis_tolerance: f32,
    /// Seconds a motion may take once travel has begun.
    pub motion_window: f32,
    /// Change in hand spread (m) to complete a zoom.
    pub zoom_distance: f32,
    /// Rotation (degrees) of the hand axis to complete a wheel.
    pub wheel_angle_deg: f32,
    /// Rotation (degrees) a wheel must exceed before its direction locks.
    pub wheel_dead_zone_deg: f32,
    /// Backward rotation (degrees) that cancels a wheel.
    pub wheel_reversal_deg: f32,
    /// Horizontal swing (m) past the elbow that counts as a wave stroke.
    pub wave_amplitude: f32,
    /// Progress reported while a hand cursor is active.
    pub cursor_progress: f32,
    /// Width (m) of the box a hand cursor maps onto the screen.
    pub cursor_box_width: f32,
    /// Height (m) of the box a hand cursor maps onto the screen.
    pub cursor_box_height: f32,
    /// Cool-down (s) after any completion before the user's gestures evaluate again.
    pub min_time_between_gestures: f64,
    /// Debounce (s) after a gesture is reset before it evaluates again.
    pub min_time_between_same_gestures: f64,
    /// Progress at which in-progress notifications start.
    pub progress_notify_threshold: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            pose_duration: 1.0,
            raise_threshold: 0.1,
            pose_tolerance: 0.1,
            arm_extension: 0.3,
            arm_spread: 0.2,
            click_radius: 0.08,
            click_duration: 2.5,
            swipe_distance: 0.3,
            push_distance: 0.2,
            jump_distance: 0.15,
            travel_dead_zone: 0.02,
            reversal_tolerance: 0.05,
            off_axis_tolerance: 0.15,
            motion_window: 1.5,
            zoom_distance: 0.3,
            wheel_angle_deg: 45.0,
            wheel_dead_zone_deg: 2.0,
            wheel_reversal_deg: 7.5,
            wave_amplitude: 0.1,
            cursor_progress: 0.7,
            cursor_box_width: 0.6,
            cursor_box_height: 0.4,
            min_time_between_gestures: 0.7,
            min_time_between_same_gestures: 0.0,
            progress_notify_threshold: 0.1,
        }
    }
}

impl GestureConfig {
    /// Generate s-expression for the active thresholds.
    pub fn config_sexp(&self) -> String {
        format!(
            "(:pose-duration {:.2} :raise-threshold {:.3} :pose-tolerance {:.3} :click-radius {:.3} :click-duration {:.2} :swipe-distance {:.3} :push-distance {:.3} :jump-distance {:.3} :travel-dead-zone {:.3} :zoom-distance {:.3} :wheel-angle-deg {:.1} :wheel-dead-zone-deg {:.1} :wave-amplitude {:.3} :motion-window {:.2} :min-time-between-gestures {:.2} :min-time-between-same-gestures {:.2} :progress-notify-threshold {:.2})",
            self.pose_duration,
            self.raise_threshold,
            self.pose_tolerance,
            self.click_radius,
            self.click_duration,
            self.swipe_distance,
            self.push_distance,
            self.jump_distance,
            self.travel_dead_zone,
            self.zoom_distance,
            self.wheel_angle_deg,
            self.wheel_dead_zone_deg,
            self.wave_amplitude,
            self.motion_window,
            self.min_time_between_gestures,
            self.min_time_between_same_gestures,
            self.progress_notify_threshold,
        )
    }
}

// ── Transitions ────────────────────────────────────────────

/// Outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Not evaluated: terminal, debounced, or required joints untracked.
    Skipped,
    /// Evaluated and still active or idle.
    Tracking,
    /// Completed on this call.
    Completed,
    /// Cancelled on this call.
    Cancelled,
}

// ── Engine ─────────────────────────────────────────────────

/// Stateless gesture evaluator.
#[derive(Debug, Clone, Default)]
pub struct GestureEngine {
    pub config: GestureConfig,
}

impl GestureEngine {
    pub fn new(config: GestureConfig) -> Self {
        Self { config }
    }

    /// Advance `state` by one frame.
    ///
    /// Terminal records are left untouched until re-armed. Untracked
    /// joints freeze the record for this frame.
    pub fn evaluate(&self, state: &mut GestureState, snapshot: &JointSnapshot, now: f64) -> Transition {
        if state.is_terminal() || now < state.start_tracking_at {
            return Transition::Skipped;
        }

        let evaluated = match state.kind {
            GestureKind::RaiseRightHand
            | GestureKind::RaiseLeftHand
            | GestureKind::Psi
            | GestureKind::Tpose
            | GestureKind::Stop => self.eval_pose(state, snapshot, now),
            GestureKind::Click => self.eval_click(state, snapshot, now),
            GestureKind::Wave => self.eval_wave(state, snapshot, now),
            GestureKind::RightHandCursor | GestureKind::LeftHandCursor => {
                self.eval_cursor(state, snapshot)
            }
            GestureKind::ZoomIn | GestureKind::ZoomOut | GestureKind::Wheel => {
                self.eval_two_hand(state, snapshot, now)
            }
            GestureKind::SwipeLeft
            | GestureKind::SwipeRight
            | GestureKind::SwipeUp
            | GestureKind::SwipeDown
            | GestureKind::Push
            | GestureKind::Pull
            | GestureKind::Jump
            | GestureKind::Squat => self.eval_motion(state, snapshot, now),
        };

        if evaluated.is_none() {
            return Transition::Skipped;
        }

        if state.complete {
            debug!("gesture {} complete for user {}", state.kind, state.user_id);
            Transition::Completed
        } else if state.cancelled {
            debug!(
                "gesture {} cancelled for user {} at {:.2}",
                state.kind, state.user_id, state.progress
            );
            Transition::Cancelled
        } else {
            Transition::Tracking
        }
    }

    /// Run a calibration-pose record for the snapshot's user.
    ///
    /// The record is rebuilt when it belongs to another user and re-armed
    /// after a cancelled attempt. On completion its user id is zeroed so
    /// the next call starts over, and `true` is returned.
    pub fn check_calibration_pose(
        &self,
        state: &mut GestureState,
        snapshot: &JointSnapshot,
        now: f64,
    ) -> bool {
        if state.user_id != snapshot.user_id {
            *state = GestureState::new(snapshot.user_id, state.kind);
        } else if state.cancelled {
            state.rearm(now + self.config.min_time_between_same_gestures);
        }

        self.evaluate(state, snapshot, now);

        if state.complete {
            state.user_id = 0;
            return true;
        }
        false
    }

    // ── Families ──────────────────────────────────────────

    fn eval_pose(&self, state: &mut GestureState, s: &JointSnapshot, now: f64) -> Option<()> {
        let held = self.pose_held(state.kind, s)?;

        if state.phase == 0 {
            if held {
                let pivot = pose_pivot(state.kind);
                state.arm(pivot, s.position(pivot)?, now);
            }
        } else if held {
            state.advance(state.elapsed(now) / self.config.pose_duration);
        } else {
            state.cancel();
        }
        Some(())
    }

    /// Whether the pose is currently struck. None when a joint is untracked.
    fn pose_held(&self, kind: GestureKind, s: &JointSnapshot) -> Option<bool> {
        use crate::skeleton::SkeletonJoint::*;
        let c = &self.config;
        let tol = c.pose_tolerance;

        let held = match kind {
            GestureKind::RaiseRightHand => {
                s.position(RightHand)?.y > s.position(RightShoulder)?.y + c.raise_threshold
            }
            GestureKind::RaiseLeftHand => {
                s.position(LeftHand)?.y > s.position(LeftShoulder)?.y + c.raise_threshold
            }
            GestureKind::Psi => {
                let (lh, rh) = (s.position(LeftHand)?, s.position(RightHand)?);
                let (le, re) = (s.position(LeftElbow)?, s.position(RightElbow)?);
                let (ls, rs) = (s.position(LeftShoulder)?, s.position(RightShoulder)?);
                lh.y > ls.y + c.raise_threshold
                    && rh.y > rs.y + c.raise_threshold
                    && (le.y - ls.y).abs() <= tol
                    && (re.y - rs.y).abs() <= tol
                    && (lh.x - le.x).abs() <= tol
                    && (rh.x - re.x).abs() <= tol
            }
            GestureKind::Tpose => {
                let (lh, rh) = (s.position(LeftHand)?, s.position(RightHand)?);
                let (le, re) = (s.position(LeftElbow)?, s.position(RightElbow)?);
                let (ls, rs) = (s.position(LeftShoulder)?, s.position(RightShoulder)?);
                (lh.y - ls.y).abs() <= tol
                    && (rh.y - rs.y).abs() <= tol
                    && (le.y - ls.y).abs() <= tol
                    && (re.y - rs.y).abs() <= tol
                    && rh.x >= rs.x + c.arm_extension
                    && lh.x <= ls.x - c.arm_extension
            }
            GestureKind::Stop => {
                let (lh, rh) = (s.position(LeftHand)?, s.position(RightHand)?);
                let hips = s.position(Hips)?;
                lh.y < hips.y
                    && rh.y < hips.y
                    && rh.x >= hips.x + c.arm_spread
                    && lh.x <= hips.x - c.arm_spread
            }
            _ => false,
        };
        Some(held)
    }

    fn eval_click(&self, state: &mut GestureState, s: &JointSnapshot, now: f64) -> Option<()> {
        let hips = s.position(SkeletonJoint::Hips)?;

        if state.phase == 0 {
            let hands = [SkeletonJoint::RightHand, SkeletonJoint::LeftHand];
            if let Some(hand) = raised_hand(s, &hands, hips) {
                state.arm(hand, s.position(hand)?, now);
                if let Some(point) = self.cursor_point(hand, s) {
                    state.screen_pos = point;
                }
            }
            return Some(());
        }

        let pivot = state.pivot?;
        let pos = s.position(pivot)?;
        if pos.y <= hips.y || pos.distance(state.anchor) > self.config.click_radius {
            state.cancel();
            return Some(());
        }

        if let Some(point) = self.cursor_point(pivot, s) {
            state.screen_pos = point;
        }
        state.advance(state.elapsed(now) / self.config.click_duration);
        Some(())
    }

    fn eval_cursor(&self, state: &mut GestureState, s: &JointSnapshot) -> Option<()> {
        let hand = match state.kind {
            GestureKind::LeftHandCursor => SkeletonJoint::LeftHand,
            _ => SkeletonJoint::RightHand,
        };
        let pos = s.position(hand)?;
        let hips = s.position(SkeletonJoint::Hips)?;

        if pos.y > hips.y {
            let point = self.cursor_point(hand, s)?;
            state.phase = 1;
            state.pivot = Some(hand);
            state.progress = self.config.cursor_progress;
            state.screen_pos = point;
        } else {
            state.idle();
        }
        Some(())
    }

    fn eval_motion(&self, state: &mut GestureState, s: &JointSnapshot, now: f64) -> Option<()> {
        use crate::skeleton::SkeletonJoint::*;
        let c = &self.config;
        let (dir, target) = match state.kind {
            GestureKind::SwipeLeft => (Vec3::NEG_X, c.swipe_distance),
            GestureKind::SwipeRight => (Vec3::X, c.swipe_distance),
            GestureKind::SwipeUp => (Vec3::Y, c.swipe_distance),
            GestureKind::SwipeDown => (Vec3::NEG_Y, c.swipe_distance),
            GestureKind::Push => (Vec3::NEG_Z, c.push_distance),
            GestureKind::Pull => (Vec3::Z, c.push_distance),
            GestureKind::Jump => (Vec3::Y, c.jump_distance),
            GestureKind::Squat => (Vec3::NEG_Y, c.jump_distance),
            _ => return None,
        };
        let hips = s.position(Hips)?;
        let hand_driven = !matches!(state.kind, GestureKind::Jump | GestureKind::Squat);

        if state.phase == 0 {
            let pivot = match state.kind {
                GestureKind::SwipeLeft => raised_hand(s, &[RightHand], hips),
                GestureKind::SwipeRight => raised_hand(s, &[LeftHand], hips),
                GestureKind::Jump | GestureKind::Squat => Some(Hips),
                _ => raised_hand(s, &[RightHand, LeftHand], hips),
            };
            if let Some(pivot) = pivot {
                state.arm(pivot, s.position(pivot)?, now);
            }
            return Some(());
        }

        let pos = s.position(state.pivot?)?;
        if hand_driven && pos.y <= hips.y {
            if state.extent > 0.0 {
                state.cancel();
            } else {
                state.idle();
            }
            return Some(());
        }

        let delta = pos - state.anchor;
        let along = delta.dot(dir);
        let off_axis = (delta - dir * along).length();

        // no forward travel yet: the anchor follows the joint
        if state.extent <= 0.0 {
            if along <= 0.0 || off_axis > c.off_axis_tolerance {
                state.anchor = pos;
                state.anchor_time = now;
                return Some(());
            }
            if along <= c.travel_dead_zone {
                state.anchor_time = now;
                return Some(());
            }
        }

        if state.elapsed(now) > c.motion_window
            || off_axis > c.off_axis_tolerance
            || along < state.extent - c.reversal_tolerance
        {
            state.cancel();
            return Some(());
        }

        state.extent = state.extent.max(along);
        state.advance(state.extent / target);
        Some(())
    }

    fn eval_two_hand(&self, state: &mut GestureState, s: &JointSnapshot, now: f64) -> Option<()> {
        let c = &self.config;
        let hips = s.position(SkeletonJoint::Hips)?;
        let lh = s.position(SkeletonJoint::LeftHand)?;
        let rh = s.position(SkeletonJoint::RightHand)?;
        let both_raised = lh.y > hips.y && rh.y > hips.y;

        let axis = rh - lh;
        let spread = axis.length();
        let angle = axis.y.atan2(axis.x).to_degrees();
        let is_wheel = state.kind == GestureKind::Wheel;
        let measure = if is_wheel { angle } else { spread };

        if state.phase == 0 {
            if both_raised {
                state.arm(SkeletonJoint::RightHand, axis, now);
                state.origin = measure;
                state.screen_pos = Vec3::new(0.0, 0.0, if is_wheel { 0.0 } else { 1.0 });
            }
            return Some(());
        }

        if !both_raised {
            if state.extent > 0.0 {
                state.cancel();
            } else {
                state.idle();
            }
            return Some(());
        }

        let (raw, target, tolerance, dead_zone) = match state.kind {
            GestureKind::ZoomIn => (
                spread - state.origin,
                c.zoom_distance,
                c.reversal_tolerance,
                c.travel_dead_zone,
            ),
            GestureKind::ZoomOut => (
                state.origin - spread,
                c.zoom_distance,
                c.reversal_tolerance,
                c.travel_dead_zone,
            ),
            _ => (
                wrap_degrees(angle - state.origin),
                c.wheel_angle_deg,
                c.wheel_reversal_deg,
                c.wheel_dead_zone_deg,
            ),
        };

        // jitter inside the dead zone neither starts travel nor locks a direction
        if state.extent <= 0.0 {
            if !is_wheel && raw <= 0.0 {
                state.anchor = axis;
                state.anchor_time = now;
                state.origin = measure;
                return Some(());
            }
            if raw.abs() <= dead_zone {
                state.anchor_time = now;
                return Some(());
            }
            if is_wheel {
                state.direction = raw.signum();
            }
        }
        let travel = if is_wheel { raw * state.direction } else { raw };

        if state.elapsed(now) > c.motion_window || travel < state.extent - tolerance {
            state.cancel();
            return Some(());
        }

        state.screen_pos.z = if is_wheel {
            wrap_degrees(angle - state.origin)
        } else {
            spread / state.origin.max(f32::EPSILON)
        };
        state.extent = state.extent.max(travel);
        state.advance(state.extent / target);
        Some(())
    }

    fn eval_wave(&self, state: &mut GestureState, s: &JointSnapshot, now: f64) -> Option<()> {
        let hand = s.position(SkeletonJoint::RightHand)?;
        let elbow = s.position(SkeletonJoint::RightElbow)?;
        let raised = hand.y > elbow.y;

        if state.phase == 0 {
            if raised {
                state.arm(SkeletonJoint::RightHand, hand, now);
            }
            return Some(());
        }

        if !raised {
            state.cancel();
            return Some(());
        }

        let swings = state.phase - 1;
        let offset = hand.x - elbow.x;
        let amp = self.config.wave_amplitude;
        let reached = match swings {
            0 | 2 => offset >= amp,
            1 => offset <= -amp,
            _ => false,
        };

        if reached {
            state.phase += 1;
            state.anchor = hand;
            state.anchor_time = now;
            state.advance((state.phase - 1) as f32 / 3.0);
        } else if swings == 0 {
            state.anchor_time = now;
        } else if state.elapsed(now) > self.config.motion_window {
            state.cancel();
        }
        Some(())
    }

    /// Project a hand into the cursor box centered on its shoulder, normalized to [0, 1].
    fn cursor_point(&self, hand: SkeletonJoint, s: &JointSnapshot) -> Option<Vec3> {
        let shoulder = match hand {
            SkeletonJoint::LeftHand => SkeletonJoint::LeftShoulder,
            _ => SkeletonJoint::RightShoulder,
        };
        let h = s.position(hand)?;
        let sh = s.position(shoulder)?;
        let x = (h.x - sh.x) / self.config.cursor_box_width + 0.5;
        let y = (h.y - sh.y) / self.config.cursor_box_height + 0.5;
        Some(Vec3::new(x.clamp(0.0, 1.0), y.clamp(0.0, 1.0), 0.0))
    }
}

/// Joint that drives a hold pose.
fn pose_pivot(kind: GestureKind) -> SkeletonJoint {
    match kind {
        GestureKind::RaiseLeftHand => SkeletonJoint::LeftHand,
        GestureKind::Stop => SkeletonJoint::Hips,
        _ => SkeletonJoint::RightHand,
    }
}

/// First of `hands` that is tracked and above the hips.
fn raised_hand(s: &JointSnapshot, hands: &[SkeletonJoint], hips: Vec3) -> Option<SkeletonJoint> {
    hands
        .iter()
        .copied()
        .find(|hand| s.position(*hand).is_some_and(|p| p.y > hips.y))
}

/// Wrap an angle to [-180, 180).
fn wrap_degrees(deg: f32) -> f32 {
    (deg + 180.0).rem_euclid(360.0) - 180.0
}

// ── Tests ──────────────────────────────────────────────────
