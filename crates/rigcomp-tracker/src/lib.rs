//! Tracker abstraction: polymorphic sources of a 6-DoF rig pose.
//!
//! Every variant composes the same [`TrackerCore`] (reference pose,
//! calibration flag, filter pair, per-timestamp memoization) and differs
//! only in where its raw pose comes from: a motion-controller action, a
//! shared-memory telemetry feed, or a synthesized center-of-rotation.

pub mod controller;
pub mod feed;
pub mod virtual_tracker;

pub use controller::ControllerTracker;
pub use virtual_tracker::{SixDofFeedTracker, YawFeedTracker};

use rigcomp_config::{LayerConfig, TrackerType};
use rigcomp_filter::{EmaFilter, FilterOrder, SlerpFilter};
use rigcomp_math::Pose;
use thiserror::Error;
use tracing::info;

/// Monotonic display timestamp in nanoseconds, as handed out by the
/// runtime's frame timing. All tracker timeouts live in this domain,
/// never wall clock.
pub type DisplayTime = i64;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// The data source produced no usable sample this frame. Transient;
    /// the caller retries next frame and runs its recovery timer.
    #[error("tracker data source has no valid data")]
    NoData,
    /// The pose action exists but the runtime reports it inactive
    /// (controller off, not yet bound).
    #[error("tracker pose action is not active")]
    InactiveAction,
    #[error("tracker is not calibrated")]
    NotCalibrated,
    /// A persisted calibration pose failed validation.
    #[error("persisted reference pose is not normalized")]
    InvalidReferencePose,
    /// The operation does not exist on this tracker variant.
    #[error("operation not supported by this tracker type")]
    Unsupported,
    /// A downstream runtime call failed while querying the tracker.
    #[error("runtime call failed: {0}")]
    Runtime(String),
}

/// Read-only window into the interception layer that trackers query
/// through, instead of holding a back-pointer to it.
pub trait TrackerContext {
    /// Pose of the headset's view space in the current reference space.
    fn locate_view(&mut self, time: DisplayTime) -> Result<Pose, TrackerError>;

    /// Pose of the bound controller/tracker in the current reference
    /// space. Implies an action-set sync and an active-state check.
    fn locate_controller(&mut self, time: DisplayTime) -> Result<Pose, TrackerError>;

    /// Pose of the floor-anchored stage space in the current reference
    /// space. Only available once a virtual tracker has initialized.
    fn locate_stage(&mut self, time: DisplayTime) -> Result<Pose, TrackerError>;
}

/// State shared by every tracker variant. Composed, not inherited.
pub struct TrackerCore {
    reference_pose: Pose,
    calibrated: bool,
    reset_pending: bool,
    skip_lazy_init: bool,
    trans_filter: EmaFilter,
    rot_filter: SlerpFilter,
    last_delta: Option<(DisplayTime, Pose)>,
}

impl TrackerCore {
    pub fn new(config: &LayerConfig) -> Self {
        let mut core = Self {
            reference_pose: Pose::IDENTITY,
            calibrated: false,
            reset_pending: false,
            skip_lazy_init: false,
            trans_filter: EmaFilter::new(FilterOrder::Double, 0.0),
            rot_filter: SlerpFilter::new(FilterOrder::Double, 0.0),
            last_delta: None,
        };
        core.load_filters(config);
        core
    }

    /// (Re)build the filter chains from config. Discards all smoothing
    /// history; also the only way to change the filter order.
    pub fn load_filters(&mut self, config: &LayerConfig) {
        let trans_order =
            FilterOrder::from_config(config.translation_filter.order, FilterOrder::Double);
        let rot_order = FilterOrder::from_config(config.rotation_filter.order, FilterOrder::Double);

        self.trans_filter = EmaFilter::new(trans_order, config.translation_filter.strength);
        self.rot_filter = SlerpFilter::new(rot_order, config.rotation_filter.strength);
        self.last_delta = None;

        info!(
            stages = trans_order.stages(),
            strength = self.trans_filter.strength(),
            "translational filter configured"
        );
        info!(
            stages = rot_order.stages(),
            strength = self.rot_filter.strength(),
            "rotational filter configured"
        );
    }

    pub fn reference_pose(&self) -> Pose {
        self.reference_pose
    }

    pub fn calibrated(&self) -> bool {
        self.calibrated
    }

    /// Ask for the reference pose to be re-established on the next
    /// delta computation.
    pub fn request_reference_reset(&mut self) {
        self.reset_pending = true;
    }

    pub fn set_reference_pose(&mut self, pose: Pose) {
        // Seed the filters at the reference so the first frames after
        // calibration carry no smoothing transient from old data.
        self.trans_filter.reset(pose.position);
        self.rot_filter.reset(pose.orientation);
        self.reference_pose = pose;
        self.calibrated = true;
        self.last_delta = None;
        info!("tracker reference pose set");
    }

    /// Re-express the reference pose after the surrounding reference
    /// space changed: `transform` locates the old space in the new one.
    pub fn adjust_reference_pose(&mut self, transform: Pose) {
        self.set_reference_pose(self.reference_pose.compose(transform));
    }

    /// Replace the reference pose without reseeding the filters. Used
    /// for incremental center-of-rotation adjustments where a smoothing
    /// transient is acceptable and history should be kept.
    pub fn override_reference_pose(&mut self, pose: Pose) {
        self.reference_pose = pose;
        self.last_delta = None;
    }

    pub fn invalidate_calibration(&mut self) {
        self.calibrated = false;
    }

    /// Adjust one filter's strength by the standard step and return the
    /// clamped result.
    pub fn nudge_filter_strength(&mut self, translation: bool, increase: bool) -> f32 {
        let applied = if translation {
            let wanted = rigcomp_filter::nudged_strength(self.trans_filter.strength(), increase);
            self.trans_filter.set_strength(wanted)
        } else {
            let wanted = rigcomp_filter::nudged_strength(self.rot_filter.strength(), increase);
            self.rot_filter.set_strength(wanted)
        };
        info!(
            translation,
            increase, strength = applied, "filter strength adjusted"
        );
        applied
    }

    fn filter(&mut self, raw: Pose) -> Pose {
        Pose::new(
            self.rot_filter.filter(raw.orientation),
            self.trans_filter.filter(raw.position),
        )
    }
}

/// Capability set every tracker variant implements. `get_pose_delta` is
/// shared logic; variants supply `get_pose` and calibration.
pub trait MotionTracker {
    fn core(&self) -> &TrackerCore;
    fn core_mut(&mut self) -> &mut TrackerCore;

    /// One-time connection work deferred until a session timestamp is
    /// available (opening feeds, creating spaces). Idempotent after the
    /// first success.
    fn lazy_init(
        &mut self,
        _ctx: &mut dyn TrackerContext,
        _time: DisplayTime,
    ) -> Result<(), TrackerError> {
        self.core_mut().skip_lazy_init = true;
        Ok(())
    }

    /// Raw, unfiltered pose of the motion source in the reference
    /// space.
    fn get_pose(
        &mut self,
        ctx: &mut dyn TrackerContext,
        time: DisplayTime,
    ) -> Result<Pose, TrackerError>;

    /// Establish a fresh reference ("zero") pose.
    fn reset_reference_pose(
        &mut self,
        ctx: &mut dyn TrackerContext,
        time: DisplayTime,
    ) -> Result<(), TrackerError>;

    /// Filtered delta from the current pose back to the reference pose,
    /// memoized per timestamp so one frame never filters twice.
    fn get_pose_delta(
        &mut self,
        ctx: &mut dyn TrackerContext,
        time: DisplayTime,
    ) -> Result<Pose, TrackerError> {
        if let Some((last_time, delta)) = self.core().last_delta {
            if last_time == time {
                return Ok(delta);
            }
        }
        if self.core().reset_pending {
            self.reset_reference_pose(ctx, time)?;
            self.core_mut().reset_pending = false;
        }
        let raw = self.get_pose(ctx, time)?;
        let core = self.core_mut();
        let filtered = core.filter(raw);
        let delta = filtered.delta_to(core.reference_pose);
        core.last_delta = Some((time, delta));
        Ok(delta)
    }

    /// Persist the current calibration, expressed relative to the
    /// stage space so it survives recentering. Only meaningful for
    /// trackers with a synthesized center of rotation.
    fn save_reference_pose(
        &self,
        _ctx: &mut dyn TrackerContext,
        _time: DisplayTime,
        _config: &mut LayerConfig,
    ) -> Result<(), TrackerError> {
        Err(TrackerError::Unsupported)
    }

    /// Move the center of rotation by a translation expressed in the
    /// reference frame.
    fn change_offset(
        &mut self,
        _delta: glam::Vec3,
        _config: &mut LayerConfig,
    ) -> Result<(), TrackerError> {
        Err(TrackerError::Unsupported)
    }

    /// Rotate the center of rotation around the vertical axis by one
    /// degree.
    fn change_rotation(&mut self, _clockwise: bool) -> Result<(), TrackerError> {
        Err(TrackerError::Unsupported)
    }

    /// Toggle the visual center-of-rotation calibration mode. Returns
    /// the new mode.
    fn toggle_debug_mode(
        &mut self,
        _ctx: &mut dyn TrackerContext,
        _time: DisplayTime,
    ) -> Result<bool, TrackerError> {
        Err(TrackerError::Unsupported)
    }
}

/// Build the tracker matching the configured type.
pub fn create_tracker(config: &LayerConfig) -> Box<dyn MotionTracker> {
    match config.tracker_type {
        TrackerType::Controller => {
            info!("using motion controller as tracker");
            Box::new(ControllerTracker::new(config))
        }
        TrackerType::Yaw => {
            info!("using Yaw Game Engine telemetry feed as tracker");
            Box::new(YawFeedTracker::new(config))
        }
        TrackerType::Srs => {
            info!("using SRS telemetry feed as tracker");
            Box::new(SixDofFeedTracker::srs(config))
        }
        TrackerType::Flypt => {
            info!("using FlyPT Mover telemetry feed as tracker");
            Box::new(SixDofFeedTracker::flypt(config))
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Scriptable context standing in for the interception layer.
    pub struct StubContext {
        pub view_pose: Result<Pose, ()>,
        pub controller_pose: Result<Pose, ()>,
        pub stage_pose: Result<Pose, ()>,
        pub controller_queries: usize,
    }

    impl StubContext {
        pub fn new() -> Self {
            Self {
                view_pose: Ok(Pose::IDENTITY),
                controller_pose: Ok(Pose::IDENTITY),
                stage_pose: Ok(Pose::IDENTITY),
                controller_queries: 0,
            }
        }
    }

    impl TrackerContext for StubContext {
        fn locate_view(&mut self, _time: DisplayTime) -> Result<Pose, TrackerError> {
            self.view_pose.map_err(|_| TrackerError::NoData)
        }

        fn locate_controller(&mut self, _time: DisplayTime) -> Result<Pose, TrackerError> {
            self.controller_queries += 1;
            self.controller_pose.map_err(|_| TrackerError::InactiveAction)
        }

        fn locate_stage(&mut self, _time: DisplayTime) -> Result<Pose, TrackerError> {
            self.stage_pose.map_err(|_| TrackerError::NoData)
        }
    }
}
