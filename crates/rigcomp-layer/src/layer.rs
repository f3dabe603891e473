//! The interception layer itself.
//!
//! Sits between the application and the runtime. On the way up it
//! composes the tracked rig delta into every location involving a view
//! space, so the application renders as if the headset had not moved
//! with the rig. On the way down it reverses the same delta on the
//! submitted layers, so the compositor's own late reprojection still
//! sees poses consistent with the physical headset.

use crate::cache::PoseCache;
use crate::feedback::{FeedbackEvent, FeedbackSink};
use crate::overlay::Overlay;
use crate::runtime::{
    ActionSetHandle, ActionHandle, Binding, CompositionLayer, FrameEndInfo, ReferenceSpaceKind,
    Runtime, RuntimeError, SpaceHandle, SpaceLocation, View,
};
use glam::{Quat, Vec3};
use parking_lot::Mutex;
use rigcomp_config::{LayerConfig, TrackerType};
use rigcomp_math::Pose;
use rigcomp_tracker::{
    create_tracker, DisplayTime, MotionTracker, TrackerContext, TrackerError,
};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum LayerError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// Compensation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompensationState {
    /// Calibrated or not, but not applying any delta.
    Idle,
    /// Applying the tracker delta every frame.
    Active,
    /// Tracker reads are failing; still applying the last known-good
    /// behavior while the recovery timer runs.
    Recovering,
    /// Recovery timed out. Compensation stays off until the user
    /// activates again.
    Disabled,
}

struct FrameCaches {
    delta: PoseCache<Pose>,
    eyes: PoseCache<Vec<Pose>>,
}

pub struct CompensationLayer<R: Runtime> {
    runtime: R,
    config: LayerConfig,
    tracker: Box<dyn MotionTracker>,
    overlay: Option<Box<dyn Overlay>>,
    feedback: Box<dyn FeedbackSink>,

    enabled: bool,
    /// A pose action gets bound, either as the tracker itself or for
    /// the center-of-rotation debug display.
    physical_enabled: bool,
    state: CompensationState,

    /// Every view space the application (or the layer) created.
    view_spaces: HashSet<SpaceHandle>,
    reference_space: Option<SpaceHandle>,
    stage_space: Option<SpaceHandle>,
    view_space: Option<SpaceHandle>,
    tracker_space: Option<SpaceHandle>,
    action_set: Option<ActionSetHandle>,
    pose_action: Option<ActionHandle>,
    action_set_attached: bool,
    profile_suggested: bool,

    /// Set when a new local space appears (runtime recentering);
    /// suppresses compensation until the frame after next submit.
    recenter_in_progress: bool,
    local_space_created: bool,
    last_frame_time: DisplayTime,

    recovery_start: DisplayTime,
    /// Nanoseconds of tracker silence tolerated before shutdown.
    /// Negative disables the timeout.
    recovery_wait: DisplayTime,

    caches: Mutex<FrameCaches>,
    /// Last delta actually applied; reused while the tracker is in
    /// recovery so compensation degrades to a freeze, not a snap.
    last_applied: Pose,
    /// Per-eye poses relative to the view space, captured once.
    eye_offsets: Vec<Pose>,
    test_rotation_start: DisplayTime,
}

/// Borrow of the layer's runtime plumbing handed to the tracker, so
/// tracker queries go through the same downstream calls without the
/// tracker holding a reference back to the layer.
struct LayerContext<'a, R: Runtime> {
    runtime: &'a mut R,
    reference_space: Option<SpaceHandle>,
    stage_space: Option<SpaceHandle>,
    view_space: Option<SpaceHandle>,
    action_set: Option<ActionSetHandle>,
    pose_action: Option<ActionHandle>,
    tracker_space: Option<SpaceHandle>,
}

impl<R: Runtime> TrackerContext for LayerContext<'_, R> {
    fn locate_view(&mut self, time: DisplayTime) -> Result<Pose, TrackerError> {
        let view = self
            .view_space
            .ok_or_else(|| TrackerError::Runtime("view space not created".into()))?;
        let reference = self
            .reference_space
            .ok_or_else(|| TrackerError::Runtime("reference space not created".into()))?;
        let location = self
            .runtime
            .locate_space(view, reference, time)
            .map_err(|e| TrackerError::Runtime(e.to_string()))?;
        if !location.valid {
            return Err(TrackerError::NoData);
        }
        Ok(location.pose)
    }

    fn locate_controller(&mut self, time: DisplayTime) -> Result<Pose, TrackerError> {
        let set = self
            .action_set
            .ok_or_else(|| TrackerError::Runtime("tracker action set not created".into()))?;
        let action = self
            .pose_action
            .ok_or_else(|| TrackerError::Runtime("tracker pose action not created".into()))?;
        let space = self
            .tracker_space
            .ok_or_else(|| TrackerError::Runtime("tracker space not created".into()))?;
        let reference = self
            .reference_space
            .ok_or_else(|| TrackerError::Runtime("reference space not created".into()))?;

        self.runtime
            .sync_actions(&[set])
            .map_err(|e| TrackerError::Runtime(e.to_string()))?;
        if !self
            .runtime
            .action_pose_active(action)
            .map_err(|e| TrackerError::Runtime(e.to_string()))?
        {
            return Err(TrackerError::InactiveAction);
        }
        let location = self
            .runtime
            .locate_space(space, reference, time)
            .map_err(|e| TrackerError::Runtime(e.to_string()))?;
        if !location.valid {
            return Err(TrackerError::NoData);
        }
        Ok(location.pose)
    }

    fn locate_stage(&mut self, time: DisplayTime) -> Result<Pose, TrackerError> {
        let stage = self
            .stage_space
            .ok_or_else(|| TrackerError::Runtime("stage space not created".into()))?;
        let reference = self
            .reference_space
            .ok_or_else(|| TrackerError::Runtime("reference space not created".into()))?;
        let location = self
            .runtime
            .locate_space(stage, reference, time)
            .map_err(|e| TrackerError::Runtime(e.to_string()))?;
        if !location.valid {
            return Err(TrackerError::NoData);
        }
        Ok(location.pose)
    }
}

macro_rules! tracker_ctx {
    ($self:ident) => {
        LayerContext {
            runtime: &mut $self.runtime,
            reference_space: $self.reference_space,
            stage_space: $self.stage_space,
            view_space: $self.view_space,
            action_set: $self.action_set,
            pose_action: $self.pose_action,
            tracker_space: $self.tracker_space,
        }
    };
}

impl<R: Runtime> CompensationLayer<R> {
    pub fn new(
        runtime: R,
        config: LayerConfig,
        overlay: Option<Box<dyn Overlay>>,
        feedback: Box<dyn FeedbackSink>,
    ) -> Result<Self, LayerError> {
        let enabled = config.enabled;
        let physical_enabled =
            config.physical_tracker || config.tracker_type == TrackerType::Controller;
        let recovery_wait = if config.tracker_timeout_s < 0.0 {
            -1
        } else {
            (config.tracker_timeout_s as f64 * 1e9) as DisplayTime
        };
        let tolerance = (config.cache_tolerance_ms as f64 * 1e6) as DisplayTime;

        let tracker = create_tracker(&config);
        let mut layer = Self {
            runtime,
            tracker,
            overlay,
            feedback,
            enabled,
            physical_enabled,
            state: CompensationState::Idle,
            view_spaces: HashSet::new(),
            reference_space: None,
            stage_space: None,
            view_space: None,
            tracker_space: None,
            action_set: None,
            pose_action: None,
            action_set_attached: false,
            profile_suggested: false,
            recenter_in_progress: false,
            local_space_created: false,
            last_frame_time: 0,
            recovery_start: 0,
            recovery_wait,
            caches: Mutex::new(FrameCaches {
                delta: PoseCache::new("delta", tolerance),
                eyes: PoseCache::new("eyes", tolerance),
            }),
            eye_offsets: Vec::new(),
            last_applied: Pose::IDENTITY,
            test_rotation_start: 0,
            config,
        };

        if layer.enabled {
            layer.create_tracker_actions()?;
            let view = layer.create_reference_space(ReferenceSpaceKind::View, Pose::IDENTITY)?;
            layer.view_space = Some(view);
            info!(
                timeout_ns = layer.recovery_wait,
                tolerance_ns = tolerance,
                "motion compensation layer initialized"
            );
        } else {
            info!("motion compensation disabled in config, passing all calls through");
        }
        Ok(layer)
    }

    pub fn state(&self) -> CompensationState {
        self.state
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut R {
        &mut self.runtime
    }

    pub fn tracker(&self) -> &dyn MotionTracker {
        self.tracker.as_ref()
    }

    fn compensating(&self) -> bool {
        matches!(
            self.state,
            CompensationState::Active | CompensationState::Recovering
        )
    }

    fn create_tracker_actions(&mut self) -> Result<(), RuntimeError> {
        if !self.physical_enabled {
            return Ok(());
        }
        let set = self.runtime.create_action_set("rigcomp_tracker")?;
        let action = self.runtime.create_pose_action(set, "tracker_pose")?;
        let space = self.runtime.create_action_space(action)?;
        self.action_set = Some(set);
        self.pose_action = Some(action);
        self.tracker_space = Some(space);
        Ok(())
    }

    /// Intercepted reference space creation. View spaces are recorded
    /// for delta injection; a new local space means the runtime
    /// recentered and the calibration has to move with it.
    pub fn create_reference_space(
        &mut self,
        kind: ReferenceSpaceKind,
        pose_in_space: Pose,
    ) -> Result<SpaceHandle, RuntimeError> {
        let space = self.runtime.create_reference_space(kind, pose_in_space)?;
        if !self.enabled {
            return Ok(space);
        }
        match kind {
            ReferenceSpaceKind::View => {
                info!(?space, "creation of view space detected");
                self.view_spaces.insert(space);
            }
            ReferenceSpaceKind::Local => {
                info!(?space, "creation of local reference space detected");
                self.recenter_in_progress = true;
                self.local_space_created = true;
                if self.tracker.core().calibrated() {
                    if let Some(old) = self.reference_space {
                        match self.runtime.locate_space(old, space, self.last_frame_time) {
                            Ok(location) if location.valid => {
                                self.tracker.core_mut().adjust_reference_pose(location.pose);
                            }
                            _ => error!(
                                "unable to re-express reference pose in new local space"
                            ),
                        }
                    }
                }
                self.reference_space = Some(space);
            }
            ReferenceSpaceKind::Stage => {}
        }
        Ok(space)
    }

    pub fn destroy_space(&mut self, space: SpaceHandle) -> Result<(), RuntimeError> {
        // Handles are never reused by the runtimes we sit on, so a
        // destroyed view space can stay in the registry harmlessly.
        self.runtime.destroy_space(space)
    }

    /// Intercepted space location. When exactly one side is a view
    /// space, the tracker delta is composed in so the application sees
    /// the rig-compensated head pose.
    pub fn locate_space(
        &mut self,
        space: SpaceHandle,
        base: SpaceHandle,
        time: DisplayTime,
    ) -> Result<SpaceLocation, RuntimeError> {
        let mut location = self.runtime.locate_space(space, base, time)?;
        if !self.enabled || !self.compensating() {
            return Ok(location);
        }
        let space_is_view = self.view_spaces.contains(&space);
        let base_is_view = self.view_spaces.contains(&base);
        // View-to-view and world-to-world locations cancel out.
        if space_is_view == base_is_view {
            return Ok(location);
        }
        if self.recenter_in_progress {
            return Ok(location);
        }

        let delta = if self.config.test_rotation {
            self.note_tracker_success();
            Some(self.test_rotation_delta(time))
        } else {
            let result = self
                .tracker
                .get_pose_delta(&mut tracker_ctx!(self), time);
            match result {
                Ok(delta) => {
                    self.note_tracker_success();
                    Some(delta)
                }
                Err(e) => {
                    self.note_tracker_failure(time, &e);
                    None
                }
            }
        };
        let applied = match delta {
            Some(delta) if self.compensating() => {
                self.last_applied = delta;
                delta
            }
            // Recovery holds the last good delta; after shutdown a
            // neutral delta keeps locate and end-frame consistent.
            _ if self.compensating() => self.last_applied,
            _ => Pose::IDENTITY,
        };
        if space_is_view {
            location.pose = location.pose.compose(applied);
        } else {
            location.pose = applied.invert().compose(location.pose);
        }
        self.caches.lock().delta.add_sample(time, applied);
        Ok(location)
    }

    /// Intercepted view location. Eye poses are rebuilt from the
    /// compensated head pose; the originals are cached for frame-end
    /// reversal when the eye cache is enabled.
    pub fn locate_views(
        &mut self,
        space: SpaceHandle,
        time: DisplayTime,
    ) -> Result<Vec<View>, RuntimeError> {
        let mut views = self.runtime.locate_views(space, time)?;
        if !self.enabled || !self.compensating() {
            return Ok(views);
        }

        self.caches
            .lock()
            .eyes
            .add_sample(time, views.iter().map(|v| v.pose).collect());

        let view_space = match self.view_space {
            Some(space) => space,
            None => return Ok(views),
        };
        if self.eye_offsets.is_empty() {
            // Eye-to-view offsets are constant for a session; capture
            // them on the first compensated frame.
            let offsets = self.runtime.locate_views(view_space, time)?;
            self.eye_offsets = offsets.into_iter().map(|v| v.pose).collect();
        }

        let head = self.locate_space(view_space, space, time)?;
        for (view, offset) in views.iter_mut().zip(self.eye_offsets.iter()) {
            view.pose = offset.compose(head.pose);
        }
        Ok(views)
    }

    /// Intercepted action sync: the layer's own set rides along with
    /// the application's.
    pub fn sync_actions(&mut self, sets: &[ActionSetHandle]) -> Result<(), RuntimeError> {
        if !self.enabled || !self.physical_enabled {
            return self.runtime.sync_actions(sets);
        }
        let mut all = sets.to_vec();
        if let Some(set) = self.action_set {
            all.push(set);
        }
        self.runtime.sync_actions(&all)
    }

    /// Intercepted binding suggestion. The tracker pose action is bound
    /// to the configured hand's grip pose, overriding whatever the
    /// application wanted on that path.
    pub fn suggest_bindings(
        &mut self,
        profile: &str,
        bindings: &[Binding],
    ) -> Result<(), RuntimeError> {
        if !self.enabled || !self.physical_enabled {
            return self.runtime.suggest_bindings(profile, bindings);
        }
        if self.action_set_attached {
            // The runtime refuses new bindings for a live action set.
            // Recreate ours so a late suggestion can still land.
            if let Some(space) = self.tracker_space.take() {
                self.runtime.destroy_space(space)?;
            }
            if let Some(set) = self.action_set.take() {
                self.runtime.destroy_action_set(set)?;
            }
            self.pose_action = None;
            self.create_tracker_actions()?;
            self.action_set_attached = false;
            self.profile_suggested = false;
            info!("recreated tracker action set for late binding suggestion");
        }
        let action = match self.pose_action {
            Some(action) => action,
            None => return self.runtime.suggest_bindings(profile, bindings),
        };

        let hand_input = format!("/user/hand/{}/input", self.config.controller_side.as_str());
        let pose_path = format!("{hand_input}/grip/pose");
        let mut chained: Vec<Binding> = bindings.to_vec();
        let mut profile_uses_hand = false;
        let mut overridden = false;
        for binding in &mut chained {
            if binding.path.starts_with(&hand_input) {
                profile_uses_hand = true;
                if binding.path == pose_path {
                    binding.action = action;
                    overridden = true;
                }
            }
        }
        if profile_uses_hand && !overridden {
            chained.push(Binding {
                action,
                path: pose_path.clone(),
            });
        }
        if profile_uses_hand {
            self.profile_suggested = true;
            info!(profile, path = %pose_path, "tracker pose bound");
        }
        self.runtime.suggest_bindings(profile, &chained)
    }

    /// Intercepted action set attach. If no suitable profile was ever
    /// suggested, fall back to the simple controller profile so the
    /// tracker action works at all.
    pub fn attach_action_sets(&mut self, sets: &[ActionSetHandle]) -> Result<(), RuntimeError> {
        if !self.enabled || !self.physical_enabled {
            return self.runtime.attach_action_sets(sets);
        }
        if !self.profile_suggested {
            if let Some(action) = self.pose_action {
                let profile = "/interaction_profiles/khr/simple_controller";
                let path = format!(
                    "/user/hand/{}/input/grip/pose",
                    self.config.controller_side.as_str()
                );
                self.runtime
                    .suggest_bindings(profile, &[Binding { action, path }])?;
                self.profile_suggested = true;
                info!(profile, "suggested fallback tracker binding");
            }
        }
        let mut all = sets.to_vec();
        if let Some(set) = self.action_set {
            all.push(set);
        }
        self.runtime.attach_action_sets(&all)?;
        self.action_set_attached = true;
        info!("tracker action set attached");
        Ok(())
    }

    pub fn begin_frame(&mut self, display_time: DisplayTime) -> Result<(), RuntimeError> {
        self.runtime.begin_frame(display_time)
    }

    /// Intercepted frame submission: reverse the delta applied at
    /// locate time so the compositor reprojects against real headset
    /// poses.
    pub fn end_frame(&mut self, frame: FrameEndInfo) -> Result<(), RuntimeError> {
        if !self.enabled {
            return self.runtime.end_frame(frame);
        }
        let time = frame.display_time;
        self.last_frame_time = time;

        let compensated_frame = self.compensating() && !self.recenter_in_progress;
        // The recenter guard holds through the submit after the one
        // where the new local space appeared.
        if self.recenter_in_progress && !self.local_space_created {
            self.recenter_in_progress = false;
            info!("recentering complete, compensation resumes");
        }
        self.local_space_created = false;

        let (reversed, cached_eyes) = if compensated_frame {
            let mut caches = self.caches.lock();
            let delta = match caches.delta.get_sample(time) {
                Some(delta) => delta,
                None => {
                    warn!(time, "no tracker delta cached for submitted frame");
                    Pose::IDENTITY
                }
            };
            caches.delta.cleanup(time);
            let eyes = if self.config.use_eye_cache {
                caches.eyes.get_sample(time)
            } else {
                None
            };
            caches.eyes.cleanup(time);
            (delta.invert(), eyes)
        } else {
            (Pose::IDENTITY, None)
        };

        if let Some(overlay) = self.overlay.as_mut() {
            if self.config.overlay_enabled {
                overlay.draw_overlay(
                    &frame,
                    self.tracker.core().reference_pose(),
                    reversed,
                    compensated_frame,
                );
            }
        }
        if !compensated_frame {
            return self.runtime.end_frame(frame);
        }

        let mut reset_layers = Vec::with_capacity(frame.layers.len());
        for layer in frame.layers {
            match layer {
                CompositionLayer::Projection { space, views } => {
                    let views = views
                        .into_iter()
                        .enumerate()
                        .map(|(index, mut view)| {
                            view.pose = match &cached_eyes {
                                Some(eyes) if index < eyes.len() => eyes[index],
                                _ => view.pose.compose(reversed),
                            };
                            view
                        })
                        .collect();
                    reset_layers.push(CompositionLayer::Projection { space, views });
                }
                CompositionLayer::Quad { space, pose, extent }
                    if !self.view_spaces.contains(&space) =>
                {
                    reset_layers.push(CompositionLayer::Quad {
                        space,
                        pose: pose.compose(reversed),
                        extent,
                    });
                }
                // Head-locked quads were never compensated.
                other => reset_layers.push(other),
            }
        }
        self.runtime.end_frame(FrameEndInfo {
            display_time: time,
            layers: reset_layers,
        })
    }

    /// Calibrate against the current tracker pose and start
    /// compensating.
    pub fn activate(&mut self, time: DisplayTime) -> Result<(), LayerError> {
        if !self.enabled {
            warn!("activation requested but the layer is disabled in config");
            return Ok(());
        }
        self.lazy_init(time)?;
        match self
            .tracker
            .reset_reference_pose(&mut tracker_ctx!(self), time)
        {
            Ok(()) => {
                self.state = CompensationState::Active;
                self.recovery_start = 0;
                self.last_applied = Pose::IDENTITY;
                self.test_rotation_start = time;
                self.feedback.notify(FeedbackEvent::Activated);
                info!("motion compensation activated");
                Ok(())
            }
            Err(e) => {
                error!(%e, "activation failed, tracker could not calibrate");
                self.state = CompensationState::Idle;
                Err(e.into())
            }
        }
    }

    pub fn deactivate(&mut self) {
        if self.compensating() {
            self.state = CompensationState::Idle;
            self.feedback.notify(FeedbackEvent::Deactivated);
            info!("motion compensation deactivated");
        }
    }

    /// Re-establish the reference pose. Applied immediately while
    /// compensating, otherwise queued for the next delta computation.
    pub fn recalibrate(&mut self, time: DisplayTime) -> Result<(), LayerError> {
        if !self.enabled {
            return Ok(());
        }
        if self.compensating() {
            self.tracker
                .reset_reference_pose(&mut tracker_ctx!(self), time)?;
            self.feedback.notify(FeedbackEvent::CalibrationChanged);
            info!("tracker recalibrated");
        } else {
            self.tracker.core_mut().request_reference_reset();
            info!("tracker recalibration queued for next activation");
        }
        Ok(())
    }

    /// Adjust one filter's strength by the standard step, keep the
    /// config in sync and report the clamped value.
    pub fn adjust_filter_strength(&mut self, translation: bool, increase: bool) -> f32 {
        let applied = self
            .tracker
            .core_mut()
            .nudge_filter_strength(translation, increase);
        if translation {
            self.config.translation_filter.strength = applied;
        } else {
            self.config.rotation_filter.strength = applied;
        }
        self.feedback.notify(FeedbackEvent::FilterStrengthChanged);
        applied
    }

    /// Rebuild the filter chains from the current config. Discards
    /// smoothing history.
    pub fn reload_filters(&mut self) {
        self.tracker.core_mut().load_filters(&self.config);
    }

    /// Persist the current center-of-rotation calibration into the
    /// config, anchored to the stage space. The host is responsible for
    /// writing the config to disk.
    pub fn save_calibration(&mut self) -> Result<(), TrackerError> {
        let time = self.last_frame_time;
        self.tracker
            .save_reference_pose(&mut tracker_ctx!(self), time, &mut self.config)
    }

    /// Move the virtual tracker's center of rotation.
    pub fn change_offset(&mut self, delta: Vec3) -> Result<(), TrackerError> {
        self.tracker.change_offset(delta, &mut self.config)
    }

    /// Rotate the virtual tracker's center of rotation around the
    /// vertical axis by one degree.
    pub fn change_rotation(&mut self, clockwise: bool) -> Result<(), TrackerError> {
        self.tracker.change_rotation(clockwise)
    }

    /// Toggle the center-of-rotation debug display mode.
    pub fn toggle_debug_mode(&mut self, time: DisplayTime) -> Result<bool, LayerError> {
        self.tracker
            .toggle_debug_mode(&mut tracker_ctx!(self), time)
            .map_err(Into::into)
    }

    /// Deferred setup that needs a live session: reference and stage
    /// spaces, action set attachment, tracker connection.
    fn lazy_init(&mut self, time: DisplayTime) -> Result<(), LayerError> {
        if self.reference_space.is_none() {
            info!("creating local reference space on first use");
            self.create_reference_space(ReferenceSpaceKind::Local, Pose::IDENTITY)?;
        }
        if self.config.tracker_type.is_virtual() && self.stage_space.is_none() {
            let stage = self
                .runtime
                .create_reference_space(ReferenceSpaceKind::Stage, Pose::IDENTITY)?;
            self.stage_space = Some(stage);
        }
        if self.physical_enabled && !self.action_set_attached {
            // The application never attached: attach our set alone so
            // the pose action can sync.
            self.attach_action_sets(&[])?;
        }
        self.tracker.lazy_init(&mut tracker_ctx!(self), time)?;
        Ok(())
    }

    fn note_tracker_success(&mut self) {
        if self.state == CompensationState::Recovering {
            info!("tracker connection recovered");
            self.state = CompensationState::Active;
        }
    }

    fn note_tracker_failure(&mut self, time: DisplayTime, error: &TrackerError) {
        match self.state {
            CompensationState::Active => {
                error!(%error, "tracker pose unavailable, entering recovery");
                self.state = CompensationState::Recovering;
                self.recovery_start = time;
            }
            CompensationState::Recovering
                if self.recovery_wait >= 0
                    && time.saturating_sub(self.recovery_start) > self.recovery_wait =>
            {
                error!("tracker connection lost, compensation disabled");
                self.state = CompensationState::Disabled;
                self.feedback.notify(FeedbackEvent::ConnectionLost);
            }
            _ => {}
        }
    }

    /// Slow synthetic yaw sweep used to verify the injection path
    /// without rig hardware.
    fn test_rotation_delta(&self, time: DisplayTime) -> Pose {
        let elapsed_ms = ((time - self.test_rotation_start) / 1_000_000) % 10_000;
        let angle = std::f32::consts::PI * 2.0e-4 * elapsed_ms as f32;
        Pose::from_rotation(Quat::from_rotation_y(angle))
    }
}
