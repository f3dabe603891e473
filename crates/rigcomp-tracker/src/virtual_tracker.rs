//! Telemetry-feed trackers and the virtual center-of-rotation anchor
//! they share.
//!
//! Unlike the controller tracker, feed trackers have no physical zero
//! pose: the reference is synthesized from the headset's view pose
//! projected onto the floor plane, offset to the rig's pivot, and the
//! feed's rotation/translation is composed onto it.

use crate::feed::{
    parse_six_dof_record, parse_yaw_record, FeedReader, SixDofRecord, YawRecord,
    SIX_DOF_FEED_NAME, SIX_DOF_RECORD_SIZE, YAW_FEED_NAME, YAW_RECORD_SIZE,
};
use crate::{DisplayTime, MotionTracker, TrackerContext, TrackerCore, TrackerError};
use glam::Vec3;
use rigcomp_config::{CorPose, LayerConfig};
use rigcomp_math::{quat_from_yaw_pitch_roll, yaw_from_flat_forward, Pose};
use tracing::{debug, error, info, warn};

/// Shared center-of-rotation state for trackers whose reference pose is
/// synthesized rather than measured.
pub struct VirtualAnchor {
    /// Pivot offsets relative to the calibrated head pose, meters.
    offset_forward: f32,
    offset_down: f32,
    offset_right: f32,
    /// Use the persisted pose instead of deriving one from the headset.
    load_cor_from_config: bool,
    persisted_cor: CorPose,
    /// Visual calibration mode: reference orientation follows the live
    /// controller so the pivot can be aligned by eye.
    debug_mode: bool,
    original_ref_pose: Pose,
}

impl VirtualAnchor {
    pub fn from_config(config: &LayerConfig) -> Self {
        info!(
            forward_cm = config.offsets.forward_cm,
            down_cm = config.offsets.down_cm,
            right_cm = config.offsets.right_cm,
            from_config = config.use_cor_pose,
            "center of rotation configured"
        );
        Self {
            offset_forward: config.offsets.forward_cm / 100.0,
            offset_down: config.offsets.down_cm / 100.0,
            offset_right: config.offsets.right_cm / 100.0,
            load_cor_from_config: config.use_cor_pose,
            persisted_cor: config.cor_pose,
            debug_mode: false,
            original_ref_pose: Pose::IDENTITY,
        }
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    /// Establish the reference pose, either from the persisted
    /// calibration or from the current head pose.
    pub fn reset_reference(
        &mut self,
        core: &mut TrackerCore,
        ctx: &mut dyn TrackerContext,
        time: DisplayTime,
    ) -> Result<(), TrackerError> {
        let result = if self.load_cor_from_config {
            self.load_reference(core, ctx, time)
        } else {
            self.derive_reference(core, ctx, time)
        };
        if result.is_err() {
            core.invalidate_calibration();
        }
        result
    }

    /// Derive the reference from the head pose: forward/right vectors
    /// flattened onto the floor plane, configured offsets applied, and
    /// a yaw-only orientation (the rig has no roll/pitch reference).
    fn derive_reference(
        &mut self,
        core: &mut TrackerCore,
        ctx: &mut dyn TrackerContext,
        time: DisplayTime,
    ) -> Result<(), TrackerError> {
        let head = ctx.locate_view(time).map_err(|e| {
            error!(?e, "unable to locate view space for calibration");
            e
        })?;

        let mut forward = head.orientation * Vec3::NEG_Z;
        forward.y = 0.0;
        if forward.length_squared() < 1e-6 {
            // Head looking straight up/down leaves no horizontal
            // direction to calibrate from.
            error!("view forward vector has no horizontal component");
            return Err(TrackerError::NoData);
        }
        forward = forward.normalize();
        let right = Vec3::new(-forward.z, 0.0, forward.x);

        let offset = forward * self.offset_forward + right * self.offset_right
            - Vec3::new(0.0, self.offset_down, 0.0);

        let mut reference = Pose::new(
            quat_from_yaw_pitch_roll(yaw_from_flat_forward(forward), 0.0, 0.0),
            head.position + offset,
        );

        if self.debug_mode {
            self.original_ref_pose = reference;
            match ctx.locate_controller(time) {
                Ok(controller) => reference.orientation = controller.orientation,
                Err(e) => warn!(?e, "debug mode: controller orientation unavailable"),
            }
        }
        core.set_reference_pose(reference);
        Ok(())
    }

    /// Load the reference pose persisted by a previous calibration.
    /// Persisted poses are anchored to the stage space, so they have to
    /// be re-expressed in the current reference space first.
    fn load_reference(
        &mut self,
        core: &mut TrackerCore,
        ctx: &mut dyn TrackerContext,
        time: DisplayTime,
    ) -> Result<(), TrackerError> {
        let persisted = self.persisted_cor.to_pose();
        if !persisted.is_normalized() {
            error!("persisted center-of-rotation orientation is invalid");
            return Err(TrackerError::InvalidReferencePose);
        }
        let stage_to_local = ctx.locate_stage(time).map_err(|e| {
            error!(?e, "unable to locate stage space to restore calibration");
            e
        })?;
        let mut reference = persisted.compose(stage_to_local);
        info!("reference pose loaded from config");
        if self.debug_mode {
            self.original_ref_pose = reference;
            match ctx.locate_controller(time) {
                Ok(controller) => reference.orientation = controller.orientation,
                Err(e) => warn!(?e, "debug mode: controller orientation unavailable"),
            }
        }
        core.set_reference_pose(reference);
        Ok(())
    }

    /// Persist the calibration in stage coordinates, so it stays valid
    /// across recentering and between sessions with different local
    /// space origins.
    pub fn save_reference(
        &self,
        core: &TrackerCore,
        ctx: &mut dyn TrackerContext,
        time: DisplayTime,
        config: &mut LayerConfig,
    ) -> Result<(), TrackerError> {
        if !core.calibrated() {
            return Err(TrackerError::NotCalibrated);
        }
        let stage_to_local = ctx.locate_stage(time).map_err(|e| {
            error!(?e, "unable to locate stage space to persist calibration");
            e
        })?;
        let in_stage = core.reference_pose().compose(stage_to_local.invert());
        config.cor_pose = CorPose::from_pose(in_stage);
        info!("center-of-rotation pose saved to config");
        Ok(())
    }

    /// Shift the pivot. `delta` is expressed in the reference frame:
    /// +z forward, +y up, +x left (matching the adjustment hotkeys).
    pub fn change_offset(
        &mut self,
        core: &mut TrackerCore,
        delta: Vec3,
        config: &mut LayerConfig,
    ) -> Result<(), TrackerError> {
        if self.debug_mode {
            error!("unable to change offset while center-of-rotation debug mode is active");
            return Err(TrackerError::Unsupported);
        }
        self.offset_forward += delta.z;
        self.offset_down -= delta.y;
        self.offset_right -= delta.x;
        config.offsets.forward_cm = self.offset_forward * 100.0;
        config.offsets.down_cm = self.offset_down * 100.0;
        config.offsets.right_cm = self.offset_right * 100.0;
        info!(
            forward = self.offset_forward,
            down = self.offset_down,
            right = self.offset_right,
            "offset modified"
        );
        // Keep smoothing history: this is a nudge, not a recalibration.
        let adjusted = Pose::from_translation(delta).compose(core.reference_pose());
        core.override_reference_pose(adjusted);
        Ok(())
    }

    pub fn change_rotation(
        &mut self,
        core: &mut TrackerCore,
        clockwise: bool,
    ) -> Result<(), TrackerError> {
        if self.debug_mode {
            error!("unable to change rotation while center-of-rotation debug mode is active");
            return Err(TrackerError::Unsupported);
        }
        let step = 1.0_f32.to_radians() * if clockwise { -1.0 } else { 1.0 };
        let adjustment = Pose::from_rotation(quat_from_yaw_pitch_roll(step, 0.0, 0.0));
        core.set_reference_pose(adjustment.compose(core.reference_pose()));
        info!(clockwise, "center-of-rotation orientation rotated");
        Ok(())
    }

    /// Toggle visual calibration: swap the reference orientation for
    /// the live controller's, preserving the calibrated position, so
    /// the pivot can be lined up without losing it.
    pub fn toggle_debug_mode(
        &mut self,
        core: &mut TrackerCore,
        ctx: &mut dyn TrackerContext,
        time: DisplayTime,
    ) -> Result<bool, TrackerError> {
        if !self.debug_mode {
            if !core.calibrated() {
                self.reset_reference(core, ctx, time)?;
            }
            let controller = ctx.locate_controller(time).map_err(|e| {
                error!(?e, "unable to activate center-of-rotation debug mode");
                e
            })?;
            self.original_ref_pose = core.reference_pose();
            let mut reference = core.reference_pose();
            reference.orientation = controller.orientation;
            core.set_reference_pose(reference);
            self.debug_mode = true;
            info!("center-of-rotation debug mode activated");
        } else {
            core.set_reference_pose(self.original_ref_pose);
            self.debug_mode = false;
            info!("center-of-rotation debug mode deactivated");
        }
        Ok(self.debug_mode)
    }
}

/// Debug-mode pose: live controller orientation, translation pinned to
/// the reference so only rotation shows up in the delta.
fn debug_pose(
    core: &TrackerCore,
    ctx: &mut dyn TrackerContext,
    time: DisplayTime,
) -> Result<Pose, TrackerError> {
    let mut pose = ctx.locate_controller(time)?;
    let reference = core.reference_pose();
    pose.position = reference.orientation * reference.position;
    Ok(pose)
}

/// Rotation-only rig pose from a yaw-engine record, composed onto the
/// reference. Angles arrive in degrees; pitch and yaw are negated by
/// the feed's sign convention.
fn yaw_record_to_pose(record: &YawRecord, reference: Pose) -> Pose {
    let rotation = quat_from_yaw_pitch_roll(
        -record.yaw.to_radians(),
        -record.pitch.to_radians(),
        record.roll.to_radians(),
    );
    Pose::from_rotation(rotation).compose(reference)
}

/// Field conventions of the two known six-DoF publishers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigFlavor {
    Srs,
    Flypt,
}

/// Full 6-DoF rig pose from a rig record, composed onto the reference.
/// Angles in degrees, linear axes in millimeters; SRS flips roll.
fn six_dof_record_to_pose(record: &SixDofRecord, flavor: RigFlavor, reference: Pose) -> Pose {
    let roll_sign = if flavor == RigFlavor::Srs { -1.0 } else { 1.0 };
    let rotation = quat_from_yaw_pitch_roll(
        (record.yaw as f32).to_radians(),
        -(record.pitch as f32).to_radians(),
        roll_sign * (record.roll as f32).to_radians(),
    );
    let translation = Vec3::new(
        record.sway as f32 / -1000.0,
        record.heave as f32 / 1000.0,
        record.surge as f32 / 1000.0,
    );
    Pose::new(rotation, translation).compose(reference)
}

/// Tracker fed by the Yaw Game Engine shared-memory region.
/// Rotation-only: the rig reports yaw/pitch/roll and no translation.
pub struct YawFeedTracker {
    core: TrackerCore,
    anchor: VirtualAnchor,
    feed: FeedReader,
}

impl YawFeedTracker {
    pub fn new(config: &LayerConfig) -> Self {
        Self {
            core: TrackerCore::new(config),
            anchor: VirtualAnchor::from_config(config),
            feed: FeedReader::new(YAW_FEED_NAME),
        }
    }
}

impl MotionTracker for YawFeedTracker {
    fn core(&self) -> &TrackerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TrackerCore {
        &mut self.core
    }

    fn lazy_init(
        &mut self,
        _ctx: &mut dyn TrackerContext,
        _time: DisplayTime,
    ) -> Result<(), TrackerError> {
        if self.core.skip_lazy_init {
            return Ok(());
        }
        match self.feed.open() {
            Ok(()) => {
                self.core.skip_lazy_init = true;
                Ok(())
            }
            Err(e) => {
                error!(
                    feed = self.feed.name(),
                    ?e,
                    "unable to open telemetry feed; check that the game engine is running \
                     and motion compensation is activated"
                );
                Err(TrackerError::NoData)
            }
        }
    }

    fn get_pose(
        &mut self,
        ctx: &mut dyn TrackerContext,
        time: DisplayTime,
    ) -> Result<Pose, TrackerError> {
        if self.anchor.debug_mode() {
            return debug_pose(&self.core, ctx, time);
        }
        let bytes = self.feed.read::<YAW_RECORD_SIZE>().map_err(|e| {
            debug!(?e, "yaw feed read failed");
            TrackerError::NoData
        })?;
        let record = parse_yaw_record(&bytes);
        debug!(
            yaw = record.yaw,
            pitch = record.pitch,
            roll = record.roll,
            battery = record.battery,
            "yaw feed record"
        );
        Ok(yaw_record_to_pose(&record, self.core.reference_pose()))
    }

    fn reset_reference_pose(
        &mut self,
        ctx: &mut dyn TrackerContext,
        time: DisplayTime,
    ) -> Result<(), TrackerError> {
        self.anchor.reset_reference(&mut self.core, ctx, time)
    }

    fn save_reference_pose(
        &self,
        ctx: &mut dyn TrackerContext,
        time: DisplayTime,
        config: &mut LayerConfig,
    ) -> Result<(), TrackerError> {
        self.anchor.save_reference(&self.core, ctx, time, config)
    }

    fn change_offset(
        &mut self,
        delta: Vec3,
        config: &mut LayerConfig,
    ) -> Result<(), TrackerError> {
        self.anchor.change_offset(&mut self.core, delta, config)
    }

    fn change_rotation(&mut self, clockwise: bool) -> Result<(), TrackerError> {
        self.anchor.change_rotation(&mut self.core, clockwise)
    }

    fn toggle_debug_mode(
        &mut self,
        ctx: &mut dyn TrackerContext,
        time: DisplayTime,
    ) -> Result<bool, TrackerError> {
        self.anchor.toggle_debug_mode(&mut self.core, ctx, time)
    }
}

/// Tracker fed by a six-DoF rig's shared-memory region.
pub struct SixDofFeedTracker {
    core: TrackerCore,
    anchor: VirtualAnchor,
    feed: FeedReader,
    flavor: RigFlavor,
}

impl SixDofFeedTracker {
    pub fn srs(config: &LayerConfig) -> Self {
        Self::with_flavor(config, RigFlavor::Srs)
    }

    pub fn flypt(config: &LayerConfig) -> Self {
        Self::with_flavor(config, RigFlavor::Flypt)
    }

    fn with_flavor(config: &LayerConfig, flavor: RigFlavor) -> Self {
        Self {
            core: TrackerCore::new(config),
            anchor: VirtualAnchor::from_config(config),
            feed: FeedReader::new(SIX_DOF_FEED_NAME),
            flavor,
        }
    }
}

impl MotionTracker for SixDofFeedTracker {
    fn core(&self) -> &TrackerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TrackerCore {
        &mut self.core
    }

    fn lazy_init(
        &mut self,
        _ctx: &mut dyn TrackerContext,
        _time: DisplayTime,
    ) -> Result<(), TrackerError> {
        if self.core.skip_lazy_init {
            return Ok(());
        }
        match self.feed.open() {
            Ok(()) => {
                self.core.skip_lazy_init = true;
                Ok(())
            }
            Err(e) => {
                error!(
                    feed = self.feed.name(),
                    ?e,
                    "unable to open telemetry feed; check that the motion software is \
                     running and motion compensation is activated"
                );
                Err(TrackerError::NoData)
            }
        }
    }

    fn get_pose(
        &mut self,
        ctx: &mut dyn TrackerContext,
        time: DisplayTime,
    ) -> Result<Pose, TrackerError> {
        if self.anchor.debug_mode() {
            return debug_pose(&self.core, ctx, time);
        }
        let bytes = self.feed.read::<SIX_DOF_RECORD_SIZE>().map_err(|e| {
            debug!(?e, "rig feed read failed");
            TrackerError::NoData
        })?;
        let record = parse_six_dof_record(&bytes);
        debug!(
            yaw = record.yaw,
            pitch = record.pitch,
            roll = record.roll,
            sway = record.sway,
            surge = record.surge,
            heave = record.heave,
            "rig feed record"
        );
        Ok(six_dof_record_to_pose(
            &record,
            self.flavor,
            self.core.reference_pose(),
        ))
    }

    fn reset_reference_pose(
        &mut self,
        ctx: &mut dyn TrackerContext,
        time: DisplayTime,
    ) -> Result<(), TrackerError> {
        self.anchor.reset_reference(&mut self.core, ctx, time)
    }

    fn save_reference_pose(
        &self,
        ctx: &mut dyn TrackerContext,
        time: DisplayTime,
        config: &mut LayerConfig,
    ) -> Result<(), TrackerError> {
        self.anchor.save_reference(&self.core, ctx, time, config)
    }

    fn change_offset(
        &mut self,
        delta: Vec3,
        config: &mut LayerConfig,
    ) -> Result<(), TrackerError> {
        self.anchor.change_offset(&mut self.core, delta, config)
    }

    fn change_rotation(&mut self, clockwise: bool) -> Result<(), TrackerError> {
        self.anchor.change_rotation(&mut self.core, clockwise)
    }

    fn toggle_debug_mode(
        &mut self,
        ctx: &mut dyn TrackerContext,
        time: DisplayTime,
    ) -> Result<bool, TrackerError> {
        self.anchor.toggle_debug_mode(&mut self.core, ctx, time)
    }
}
