//! User session: calibration, player slots and per-frame dispatch.
//!
//! A `Session` maps raw sensor user ids onto two player slots. Sensor
//! calibration puts a user on the pending list; each tick the pending
//! list is walked newest-first and a user is bound to the first free
//! slot once that slot's calibration pose (if any) is held. Bound slots
//! drive their avatar rigs and gesture registries every tick.
//!
//! All mutation happens on the caller's thread inside `tick` or the
//! lifecycle calls it makes; nothing here is shared.

use glam::Vec3;
use tracing::{debug, info, warn};

use crate::avatar::AvatarRig;
use crate::config::{SessionConfig, MAX_PLAYERS};
use crate::error::{Result, RigError};
use crate::gesture::{GestureEngine, GestureEvent, GestureKind, GestureRegistry, GestureState};
use crate::listener::GestureListener;
use crate::scene::BoneTransforms;
use crate::sexp::bool_str;
use crate::skeleton::{JointSnapshot, SkeletonJoint};
use crate::source::{JointFrameSource, UserEvent, UserEventKind, UserId};

// ── Slots ──────────────────────────────────────────────────

/// Lifecycle of a player slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No user and nobody waiting for it.
    Unbound,
    /// Free, with a calibrated user waiting on the calibration pose.
    PendingPose,
    /// Bound to a calibrated user.
    Calibrated,
}

impl SlotState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unbound => "unbound",
            Self::PendingPose => "pending-pose",
            Self::Calibrated => "calibrated",
        }
    }
}

/// One logical player.
#[derive(Debug)]
pub struct PlayerSlot {
    /// Bound raw user id, 0 when free.
    user_id: UserId,
    gestures: GestureRegistry,
    calibration_pose: Option<GestureState>,
    rigs: Vec<AvatarRig>,
    /// Last snapshot captured for the bound user.
    snapshot: Option<JointSnapshot>,
}

impl PlayerSlot {
    fn new(session: &SessionConfig, index: usize) -> Self {
        Self {
            user_id: 0,
            gestures: GestureRegistry::new(0, &session.gesture),
            calibration_pose: session.players[index]
                .calibration_pose
                .map(|kind| GestureState::new(0, kind)),
            rigs: Vec::new(),
            snapshot: None,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Bound slots are calibrated: a user is only bound once calibration succeeds.
    pub fn is_calibrated(&self) -> bool {
        !self.is_free()
    }

    pub fn is_free(&self) -> bool {
        self.user_id == 0
    }

    pub fn gestures(&self) -> &GestureRegistry {
        &self.gestures
    }

    pub fn calibration_pose(&self) -> Option<&GestureState> {
        self.calibration_pose.as_ref()
    }

    pub fn rigs(&self) -> &[AvatarRig] {
        &self.rigs
    }
}

// ── Session ────────────────────────────────────────────────

/// Calibration and slot manager.
pub struct Session {
    config: SessionConfig,
    engine: GestureEngine,
    slots: [PlayerSlot; MAX_PLAYERS],
    /// Users calibrated by the sensor, waiting for pose confirmation.
    pending: Vec<UserId>,
    /// Users seen by the sensor and not yet lost.
    users: Vec<UserId>,
    discovering: bool,
    /// Discovery state last pushed to the source.
    discovery_applied: Option<bool>,
    listeners: Vec<Box<dyn GestureListener>>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let slots = [PlayerSlot::new(&config, 0), PlayerSlot::new(&config, 1)];
        info!(
            "session created (two-users={}, near-mode={})",
            config.two_users, config.near_mode
        );
        Ok(Self {
            engine: GestureEngine::new(config.gesture.clone()),
            config,
            slots,
            pending: Vec::new(),
            users: Vec::new(),
            discovering: true,
            discovery_applied: None,
            listeners: Vec::new(),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn engine(&self) -> &GestureEngine {
        &self.engine
    }

    /// Register a listener for user and gesture notifications.
    pub fn add_listener(&mut self, listener: Box<dyn GestureListener>) {
        self.listeners.push(listener);
    }

    /// Attach a rig to a player slot. The rig should already be bound
    /// and have its rest pose captured.
    pub fn add_rig(&mut self, slot: usize, mut rig: AvatarRig) -> Result<()> {
        rig.config().validate()?;
        let Some(player) = self.slots.get_mut(slot) else {
            return Err(RigError::SlotCapacity(slot));
        };
        rig.set_near_mode(self.config.near_mode);
        player.rigs.push(rig);
        debug!("rig added to slot {}", slot);
        Ok(())
    }

    pub fn slot(&self, slot: usize) -> Option<&PlayerSlot> {
        self.slots.get(slot)
    }

    /// Skip leg bones on every rig.
    pub fn set_near_mode(&mut self, near_mode: bool) {
        self.config.near_mode = near_mode;
        for rig in self.slots.iter_mut().flat_map(|s| s.rigs.iter_mut()) {
            rig.set_near_mode(near_mode);
        }
    }

    // ── Lifecycle ─────────────────────────────────────────

    /// Ask the sensor for users.
    pub fn start(&mut self, source: &mut dyn JointFrameSource) {
        self.discovering = !self.all_players_calibrated();
        self.sync_discovery(source);
        info!("session started, discovery {}", if self.discovering { "on" } else { "off" });
    }

    pub fn on_user_appeared(&mut self, user_id: UserId) {
        if !self.users.contains(&user_id) {
            self.users.push(user_id);
        }
        info!(user_id, "user appeared");
    }

    pub fn on_calibration_started(&mut self, user_id: UserId) {
        info!(user_id, "calibration started");
    }

    pub fn on_calibration_failed(&mut self, user_id: UserId) {
        warn!(user_id, "calibration failed");
    }

    /// Sensor calibration succeeded: queue the user for pose confirmation.
    pub fn on_calibration_succeeded_pre_pose(&mut self, user_id: UserId) {
        info!(user_id, "calibration succeeded, waiting for pose");
        if !self.pending.contains(&user_id) {
            self.pending.push(user_id);
        }
    }

    /// Try to bind a pending user. Returns true once the user is bound.
    ///
    /// Slot 0 is tried while it is free; slot 1 only in two-user mode
    /// once slot 0 is taken.
    pub fn on_calibration_succeeded_post_pose(
        &mut self,
        snapshot: &JointSnapshot,
        scene: &mut dyn BoneTransforms,
        now: f64,
    ) -> bool {
        let user_id = snapshot.user_id;
        if self.slot_of(user_id).is_some() {
            return true;
        }

        let index = if self.slots[0].is_free() {
            0
        } else if self.config.two_users && self.slots[1].is_free() {
            1
        } else {
            return false;
        };

        let slot = &mut self.slots[index];
        let posed = match slot.calibration_pose.as_mut() {
            Some(pose) => self.engine.check_calibration_pose(pose, snapshot, now),
            None => true,
        };
        if !posed {
            return false;
        }

        self.bind_slot(index, user_id, scene, now);
        true
    }

    fn bind_slot(&mut self, index: usize, user_id: UserId, scene: &mut dyn BoneTransforms, now: f64) {
        let slot = &mut self.slots[index];
        slot.user_id = user_id;
        slot.gestures = GestureRegistry::new(user_id, &self.config.gesture);
        for kind in &self.config.players[index].gestures {
            slot.gestures.track(*kind, now);
        }
        for rig in &mut slot.rigs {
            rig.successful_calibration(scene);
        }
        info!(user_id, slot = index, "player calibrated");

        for listener in &mut self.listeners {
            listener.user_detected(user_id, index);
        }
        self.update_discovery();
    }

    /// Unbind a lost user, return its rigs to rest and re-arm discovery if needed.
    pub fn on_user_lost(&mut self, user_id: UserId, scene: &mut dyn BoneTransforms) {
        info!(user_id, "user lost");

        for index in 0..MAX_PLAYERS {
            let slot = &mut self.slots[index];
            if slot.is_free() || slot.user_id != user_id {
                continue;
            }

            slot.user_id = 0;
            slot.gestures = GestureRegistry::new(0, &self.config.gesture);
            slot.snapshot = None;
            if let Some(pose) = slot.calibration_pose.as_mut() {
                *pose = GestureState::new(0, pose.kind);
            }
            for rig in &mut slot.rigs {
                rig.reset_to_rest_pose(scene);
            }
            info!(user_id, slot = index, "player unbound");

            for listener in &mut self.listeners {
                listener.user_lost(user_id, index);
            }
        }

        self.pending.retain(|u| *u != user_id);
        self.users.retain(|u| *u != user_id);
        self.update_discovery();
    }

    /// Run pose confirmation for every pending user, newest first.
    pub fn process_pending(
        &mut self,
        source: &dyn JointFrameSource,
        scene: &mut dyn BoneTransforms,
        now: f64,
    ) {
        for i in (0..self.pending.len()).rev() {
            let user_id = self.pending[i];
            let snapshot = JointSnapshot::capture(source, user_id, self.config.sensor_height);
            if self.on_calibration_succeeded_post_pose(&snapshot, scene, now) {
                self.pending.remove(i);
            }
        }
    }

    fn handle_event(&mut self, event: UserEvent, scene: &mut dyn BoneTransforms) {
        match event.kind {
            UserEventKind::Appeared => self.on_user_appeared(event.user_id),
            UserEventKind::CalibrationStarted => self.on_calibration_started(event.user_id),
            UserEventKind::CalibrationSucceeded => {
                self.on_calibration_succeeded_pre_pose(event.user_id)
            }
            UserEventKind::CalibrationFailed => self.on_calibration_failed(event.user_id),
            UserEventKind::Lost => self.on_user_lost(event.user_id, scene),
        }
    }

    /// One frame: lifecycle events, pose confirmation, then rigs and
    /// gestures for every calibrated slot.
    pub fn tick(
        &mut self,
        source: &mut dyn JointFrameSource,
        scene: &mut dyn BoneTransforms,
        now: f64,
        dt: f32,
    ) {
        for event in source.poll_user_events() {
            self.handle_event(event, scene);
        }

        if !self.pending.is_empty() {
            self.process_pending(source, scene, now);
        }

        for index in 0..MAX_PLAYERS {
            if self.slots[index].is_calibrated() {
                self.update_slot(index, source, scene, now, dt);
            }
        }

        self.sync_discovery(source);
    }

    fn update_slot(
        &mut self,
        index: usize,
        source: &dyn JointFrameSource,
        scene: &mut dyn BoneTransforms,
        now: f64,
        dt: f32,
    ) {
        let slot = &mut self.slots[index];
        let user_id = slot.user_id;
        let snapshot = JointSnapshot::capture(source, user_id, self.config.sensor_height);

        for rig in &mut slot.rigs {
            rig.update(scene, &snapshot, dt);
        }

        let events = slot.gestures.evaluate(&self.engine, &snapshot, now);
        slot.snapshot = Some(snapshot);

        for event in events {
            match event {
                GestureEvent::InProgress {
                    kind,
                    progress,
                    pivot,
                    screen_pos,
                } => {
                    for listener in &mut self.listeners {
                        listener.gesture_in_progress(user_id, index, kind, progress, pivot, screen_pos);
                    }
                }
                GestureEvent::Completed {
                    kind,
                    pivot,
                    screen_pos,
                } => {
                    info!(user_id, slot = index, "gesture {} completed", kind);
                    let mut reset = false;
                    for listener in &mut self.listeners {
                        reset |= listener.gesture_completed(user_id, index, kind, pivot, screen_pos);
                    }
                    if reset {
                        slot.gestures.reset_all(now);
                    }
                }
                GestureEvent::Cancelled { kind, pivot } => {
                    info!(user_id, slot = index, "gesture {} cancelled", kind);
                    let mut reset = false;
                    for listener in &mut self.listeners {
                        reset |= listener.gesture_cancelled(user_id, index, kind, pivot);
                    }
                    if reset {
                        slot.gestures.reset(kind, now);
                    }
                }
            }
        }
    }

    // ── Discovery ─────────────────────────────────────────

    fn update_discovery(&mut self) {
        let all = self.all_players_calibrated();
        if all && self.discovering {
            info!("all players calibrated, stopping user discovery");
            self.discovering = false;
        } else if !all && !self.discovering {
            info!("waiting for users, starting user discovery");
            self.discovering = true;
        }
    }

    fn sync_discovery(&mut self, source: &mut dyn JointFrameSource) {
        if self.discovery_applied != Some(self.discovering) {
            source.set_user_discovery(self.discovering);
            self.discovery_applied = Some(self.discovering);
        }
    }

    // ── Host calls ────────────────────────────────────────

    /// Treat every bound or known user as lost so detection starts over.
    pub fn clear_users(&mut self, scene: &mut dyn BoneTransforms) {
        let mut users: Vec<UserId> = self.users.clone();
        for slot in &self.slots {
            if !slot.is_free() && !users.contains(&slot.user_id) {
                users.push(slot.user_id);
            }
        }
        for user_id in users.into_iter().rev() {
            self.on_user_lost(user_id, scene);
        }
    }

    /// Return every rig to its rest pose and capture it again.
    pub fn reset_rigs(&mut self, scene: &mut dyn BoneTransforms) {
        for rig in self.slots.iter_mut().flat_map(|s| s.rigs.iter_mut()) {
            rig.reset_to_rest_pose(scene);
            rig.capture_rest_pose(scene);
        }
    }

    fn slot_of(&self, user_id: UserId) -> Option<usize> {
        if user_id == 0 {
            return None;
        }
        self.slots.iter().position(|s| s.user_id == user_id)
    }

    fn registry_mut(&mut self, user_id: UserId) -> Result<&mut GestureRegistry> {
        let index = self.slot_of(user_id).ok_or(RigError::UserNotBound(user_id))?;
        Ok(&mut self.slots[index].gestures)
    }

    fn registry(&self, user_id: UserId) -> Option<&GestureRegistry> {
        self.slot_of(user_id).map(|i| &self.slots[i].gestures)
    }

    /// Start tracking a gesture for a bound user.
    pub fn track_gesture(&mut self, user_id: UserId, kind: GestureKind, now: f64) -> Result<()> {
        self.registry_mut(user_id)?.track(kind, now);
        Ok(())
    }

    /// Start tracking a gesture given by name (`swipe-left` or `:swipe-left`).
    pub fn track_gesture_named(&mut self, user_id: UserId, name: &str, now: f64) -> Result<()> {
        let kind: GestureKind = name.parse()?;
        self.track_gesture(user_id, kind, now)
    }

    pub fn untrack_gesture(&mut self, user_id: UserId, kind: GestureKind) -> Result<bool> {
        Ok(self.registry_mut(user_id)?.untrack(kind))
    }

    pub fn reset_gesture(&mut self, user_id: UserId, kind: GestureKind, now: f64) -> Result<bool> {
        Ok(self.registry_mut(user_id)?.reset(kind, now))
    }

    pub fn reset_player_gestures(&mut self, user_id: UserId, now: f64) -> Result<()> {
        self.registry_mut(user_id)?.reset_all(now);
        Ok(())
    }

    pub fn clear_gestures(&mut self, user_id: UserId) -> Result<()> {
        self.registry_mut(user_id)?.clear();
        Ok(())
    }

    pub fn is_gesture_complete(
        &mut self,
        user_id: UserId,
        kind: GestureKind,
        reset_on_complete: bool,
        now: f64,
    ) -> bool {
        match self.registry_mut(user_id) {
            Ok(registry) => registry.is_complete(kind, reset_on_complete, now),
            Err(_) => false,
        }
    }

    pub fn is_gesture_cancelled(&self, user_id: UserId, kind: GestureKind) -> bool {
        self.registry(user_id).is_some_and(|r| r.is_cancelled(kind))
    }

    pub fn is_tracking_gesture(&self, user_id: UserId, kind: GestureKind) -> bool {
        self.registry(user_id).is_some_and(|r| r.is_tracking(kind))
    }

    pub fn gesture_progress(&self, user_id: UserId, kind: GestureKind) -> f32 {
        self.registry(user_id).map(|r| r.progress(kind)).unwrap_or(0.0)
    }

    pub fn gesture_screen_pos(&self, user_id: UserId, kind: GestureKind) -> Vec3 {
        self.registry(user_id).map(|r| r.screen_pos(kind)).unwrap_or(Vec3::ZERO)
    }

    // ── Queries ───────────────────────────────────────────

    /// Raw user id bound to `slot`, 0 when free.
    pub fn player_id(&self, slot: usize) -> UserId {
        self.slots.get(slot).map(|s| s.user_id).unwrap_or(0)
    }

    pub fn is_player_calibrated(&self, user_id: UserId) -> bool {
        self.slot_of(user_id).is_some_and(|i| self.slots[i].is_calibrated())
    }

    pub fn calibrated_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_calibrated()).count()
    }

    pub fn all_players_calibrated(&self) -> bool {
        self.calibrated_count() >= self.config.required_players()
    }

    pub fn is_discovering(&self) -> bool {
        self.discovering
    }

    pub fn pending_users(&self) -> &[UserId] {
        &self.pending
    }

    pub fn users(&self) -> &[UserId] {
        &self.users
    }

    pub fn slot_state(&self, slot: usize) -> SlotState {
        let Some(player) = self.slots.get(slot) else {
            return SlotState::Unbound;
        };
        if player.is_calibrated() {
            return SlotState::Calibrated;
        }
        let targeted = match slot {
            0 => true,
            _ => self.config.two_users && !self.slots[0].is_free(),
        };
        if targeted && !self.pending.is_empty() {
            SlotState::PendingPose
        } else {
            SlotState::Unbound
        }
    }

    /// Hips position of a bound user from the last tick.
    pub fn user_position(&self, user_id: UserId) -> Option<Vec3> {
        let index = self.slot_of(user_id)?;
        self.slots[index]
            .snapshot
            .as_ref()
            .and_then(|s| s.position(SkeletonJoint::Hips))
    }

    /// Generate s-expression for IPC-style status.
    pub fn status_sexp(&self) -> String {
        let pending = if self.pending.is_empty() {
            "nil".to_string()
        } else {
            let ids: Vec<String> = self.pending.iter().map(|u| u.to_string()).collect();
            format!("({})", ids.join(" "))
        };
        let slots: Vec<String> = (0..MAX_PLAYERS)
            .map(|i| {
                let slot = &self.slots[i];
                let rigs: Vec<String> = slot.rigs.iter().map(|r| r.status_sexp()).collect();
                format!(
                    "(:slot {} :user {} :state {} :rigs ({}) :registry {})",
                    i,
                    slot.user_id,
                    self.slot_state(i).as_str(),
                    rigs.join(" "),
                    slot.gestures.status_sexp(),
                )
            })
            .collect();
        format!(
            "(:discovering {} :all-calibrated {} :pending {} :slots ({}))",
            bool_str(self.discovering),
            bool_str(self.all_players_calibrated()),
            pending,
            slots.join(" "),
        )
    }
}
