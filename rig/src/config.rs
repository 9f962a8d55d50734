//! Static session configuration.
//!
//! Everything here is supplied once at bind time. Configs can be built in
//! code from the `Default` impls or loaded from an s-expression plist:
//!
//! ```text
//! (:two-users nil :sensor-height 1.0 :min-time-between-gestures 0.7
//!  :player1 (:calibration-pose :psi :gestures (:swipe-left :click))
//!  :rig (:mirrored t :smooth-factor 5.0 :move-rate 1))
//! ```

use lexpr::Value;
use tracing::debug;

use crate::error::{Result, RigError};
use crate::gesture::{GestureConfig, GestureKind};
use crate::sexp::{self, bool_str};

/// Number of player slots.
pub const MAX_PLAYERS: usize = 2;

// ── Rig ────────────────────────────────────────────────────

/// Retargeting options for one avatar rig.
#[derive(Debug, Clone, PartialEq)]
pub struct RigConfig {
    /// Swap left and right joints and flip x.
    pub mirrored: bool,
    /// Let the root follow the hips vertically.
    pub vertical_movement: bool,
    /// Rotation easing rate; the slerp factor is `dt * smooth_factor`.
    pub smooth_factor: f32,
    /// Scale from sensor meters to scene units for root motion.
    pub move_rate: u32,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            mirrored: false,
            vertical_movement: false,
            smooth_factor: 5.0,
            move_rate: 1,
        }
    }
}

impl RigConfig {
    pub fn validate(&self) -> Result<()> {
        if self.smooth_factor.is_nan() || self.smooth_factor <= 0.0 {
            return Err(RigError::InvalidConfig(format!(
                "smooth-factor must be positive, got {}",
                self.smooth_factor
            )));
        }
        if self.move_rate < 1 {
            return Err(RigError::InvalidConfig("move-rate must be at least 1".into()));
        }
        Ok(())
    }

    fn apply_sexp(&mut self, value: &Value) -> Result<()> {
        if let Some(v) = sexp::get_bool(value, "mirrored") {
            self.mirrored = v;
        }
        if let Some(v) = sexp::get_bool(value, "vertical-movement") {
            self.vertical_movement = v;
        }
        if let Some(v) = sexp::get_float(value, "smooth-factor") {
            self.smooth_factor = v as f32;
        }
        if let Some(v) = sexp::get_int(value, "move-rate") {
            self.move_rate = u32::try_from(v)
                .map_err(|_| RigError::InvalidConfig(format!("move-rate out of range: {}", v)))?;
        }
        Ok(())
    }

    pub fn config_sexp(&self) -> String {
        format!(
            "(:mirrored {} :vertical-movement {} :smooth-factor {:.2} :move-rate {})",
            bool_str(self.mirrored),
            bool_str(self.vertical_movement),
            self.smooth_factor,
            self.move_rate,
        )
    }
}

// ── Player ─────────────────────────────────────────────────

/// Per-slot gesture setup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerConfig {
    /// Pose that confirms calibration. None binds on sensor calibration alone.
    pub calibration_pose: Option<GestureKind>,
    /// Gestures tracked once the slot is bound.
    pub gestures: Vec<GestureKind>,
}

impl PlayerConfig {
    fn from_sexp(value: &Value) -> Result<Self> {
        let calibration_pose = match sexp::get_keyword(value, "calibration-pose") {
            None => None,
            Some(name) if name == "nil" => None,
            Some(name) => Some(name.parse()?),
        };
        let gestures = sexp::get_list(value, "gestures")
            .unwrap_or_default()
            .iter()
            .map(|name| name.parse())
            .collect::<Result<Vec<GestureKind>>>()?;
        Ok(Self {
            calibration_pose,
            gestures,
        })
    }

    fn config_sexp(&self) -> String {
        let pose = self
            .calibration_pose
            .map(|k| format!(":{}", k))
            .unwrap_or_else(|| "nil".to_string());
        let gestures = if self.gestures.is_empty() {
            "nil".to_string()
        } else {
            let names: Vec<String> = self.gestures.iter().map(|k| format!(":{}", k)).collect();
            format!("({})", names.join(" "))
        };
        format!("(:calibration-pose {} :gestures {})", pose, gestures)
    }
}

// ── Session ────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bind a second player slot.
    pub two_users: bool,
    /// Skip leg bones when retargeting.
    pub near_mode: bool,
    /// Added to every joint's y when snapshots are captured (m).
    pub sensor_height: f32,
    pub players: [PlayerConfig; MAX_PLAYERS],
    pub rig: RigConfig,
    pub gesture: GestureConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            two_users: false,
            near_mode: false,
            sensor_height: 1.0,
            players: Default::default(),
            rig: RigConfig::default(),
            gesture: GestureConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Number of slots that must be bound before discovery stops.
    pub fn required_players(&self) -> usize {
        if self.two_users {
            2
        } else {
            1
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.rig.validate()?;
        if self.gesture.pose_duration <= 0.0 {
            return Err(RigError::InvalidConfig("pose-duration must be positive".into()));
        }
        if self.gesture.min_time_between_gestures < 0.0 {
            return Err(RigError::InvalidConfig(
                "min-time-between-gestures must not be negative".into(),
            ));
        }
        if self.gesture.travel_dead_zone < 0.0 || self.gesture.wheel_dead_zone_deg < 0.0 {
            return Err(RigError::InvalidConfig("dead zones must not be negative".into()));
        }
        Ok(())
    }

    /// Parse and validate a config plist.
    pub fn from_sexp(text: &str) -> Result<Self> {
        let value = lexpr::from_str(text)?;
        let mut config = Self::default();

        for key in sexp::keys(&value) {
            if let Some(n) = key.strip_prefix("player").and_then(|n| n.parse::<usize>().ok()) {
                if n == 0 || n > MAX_PLAYERS {
                    return Err(RigError::SlotCapacity(n));
                }
            }
        }

        if let Some(v) = sexp::get_bool(&value, "two-users") {
            config.two_users = v;
        }
        if let Some(v) = sexp::get_bool(&value, "near-mode") {
            config.near_mode = v;
        }
        if let Some(v) = sexp::get_float(&value, "sensor-height") {
            config.sensor_height = v as f32;
        }
        if let Some(v) = sexp::get_float(&value, "min-time-between-gestures") {
            config.gesture.min_time_between_gestures = v;
        }
        if let Some(v) = sexp::get_float(&value, "min-time-between-same-gestures") {
            config.gesture.min_time_between_same_gestures = v;
        }
        if let Some(v) = sexp::get_float(&value, "pose-duration") {
            config.gesture.pose_duration = v as f32;
        }
        if let Some(v) = sexp::get_float(&value, "progress-notify-threshold") {
            config.gesture.progress_notify_threshold = v as f32;
        }
        if let Some(v) = sexp::get_float(&value, "travel-dead-zone") {
            config.gesture.travel_dead_zone = v as f32;
        }
        if let Some(v) = sexp::get_float(&value, "wheel-dead-zone-deg") {
            config.gesture.wheel_dead_zone_deg = v as f32;
        }

        for (i, player) in config.players.iter_mut().enumerate() {
            if let Some(v) = sexp::get_value(&value, &format!("player{}", i + 1)) {
                *player = PlayerConfig::from_sexp(v)?;
            }
        }
        if let Some(v) = sexp::get_value(&value, "rig") {
            config.rig.apply_sexp(v)?;
        }

        config.validate()?;
        debug!("loaded config: {}", config.config_sexp());
        Ok(config)
    }

    /// Generate s-expression for the whole configuration.
    pub fn config_sexp(&self) -> String {
        format!(
            "(:two-users {} :near-mode {} :sensor-height {:.2} :player1 {} :player2 {} :rig {} :gesture {})",
            bool_str(self.two_users),
            bool_str(self.near_mode),
            self.sensor_height,
            self.players[0].config_sexp(),
            self.players[1].config_sexp(),
            self.rig.config_sexp(),
            self.gesture.config_sexp(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = SessionConfig::default();
        assert!(!c.two_users);
        assert_eq!(c.required_players(), 1);
        assert!((c.sensor_height - 1.0).abs() < 1e-6);
        assert!((c.rig.smooth_factor - 5.0).abs() < 1e-6);
        assert_eq!(c.rig.move_rate, 1);
        assert!(c.players[0].calibration_pose.is_none());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_from_sexp() {
        let c = SessionConfig::from_sexp(
            "(:two-users t :sensor-height 0.8 :min-time-between-gestures 0.5
              :player1 (:calibration-pose :psi :gestures (:swipe-left :click))
              :player2 (:gestures (:wave))
              :rig (:mirrored t :smooth-factor 4.0 :move-rate 2))",
        )
        .unwrap();
        assert!(c.two_users);
        assert_eq!(c.required_players(), 2);
        assert!((c.sensor_height - 0.8).abs() < 1e-6);
        assert!((c.gesture.min_time_between_gestures - 0.5).abs() < 1e-9);
        assert_eq!(c.players[0].calibration_pose, Some(GestureKind::Psi));
        assert_eq!(
            c.players[0].gestures,
            vec![GestureKind::SwipeLeft, GestureKind::Click]
        );
        assert_eq!(c.players[1].calibration_pose, None);
        assert_eq!(c.players[1].gestures, vec![GestureKind::Wave]);
        assert!(c.rig.mirrored);
        assert!((c.rig.smooth_factor - 4.0).abs() < 1e-6);
        assert_eq!(c.rig.move_rate, 2);
    }

    #[test]
    fn test_unknown_gesture_rejected() {
        let err = SessionConfig::from_sexp("(:player1 (:gestures (:moonwalk)))").unwrap_err();
        assert!(matches!(err, RigError::UnknownGesture(ref s) if s == "moonwalk"));
    }

    #[test]
    fn test_third_player_rejected() {
        let err = SessionConfig::from_sexp("(:player3 (:gestures nil))").unwrap_err();
        assert!(matches!(err, RigError::SlotCapacity(3)));
    }

    #[test]
    fn test_invalid_rig_values() {
        assert!(matches!(
            SessionConfig::from_sexp("(:rig (:smooth-factor 0.0))"),
            Err(RigError::InvalidConfig(_))
        ));
        assert!(matches!(
            SessionConfig::from_sexp("(:rig (:move-rate 0))"),
            Err(RigError::InvalidConfig(_))
        ));
        assert!(matches!(
            SessionConfig::from_sexp("(:rig (:move-rate -2))"),
            Err(RigError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_dead_zones() {
        let c = SessionConfig::from_sexp("(:travel-dead-zone 0.03 :wheel-dead-zone-deg 4.0)").unwrap();
        assert!((c.gesture.travel_dead_zone - 0.03).abs() < 1e-6);
        assert!((c.gesture.wheel_dead_zone_deg - 4.0).abs() < 1e-6);
        assert!(matches!(
            SessionConfig::from_sexp("(:travel-dead-zone -0.01)"),
            Err(RigError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_malformed_text() {
        assert!(matches!(
            SessionConfig::from_sexp("(:two-users"),
            Err(RigError::Parse(_))
        ));
    }

    #[test]
    fn test_config_sexp_round_trips() {
        let mut c = SessionConfig::default();
        c.players[0].calibration_pose = Some(GestureKind::RaiseRightHand);
        c.players[0].gestures = vec![GestureKind::ZoomIn, GestureKind::Wheel];
        c.rig.mirrored = true;

        let text = c.config_sexp();
        assert!(text.contains(":calibration-pose :raise-right-hand"));
        assert!(text.contains(":gestures (:zoom-in :wheel)"));

        let back = SessionConfig::from_sexp(&text).unwrap();
        assert_eq!(back.players, c.players);
        assert_eq!(back.rig, c.rig);
    }
}
