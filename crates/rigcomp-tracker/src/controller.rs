use crate::{DisplayTime, MotionTracker, TrackerContext, TrackerCore, TrackerError};
use rigcomp_config::LayerConfig;
use rigcomp_math::Pose;
use tracing::error;

/// Tracker driven by a pose action bound to a physical motion
/// controller or tracker puck mounted on the rig.
pub struct ControllerTracker {
    core: TrackerCore,
}

impl ControllerTracker {
    pub fn new(config: &LayerConfig) -> Self {
        Self {
            core: TrackerCore::new(config),
        }
    }
}

impl MotionTracker for ControllerTracker {
    fn core(&self) -> &TrackerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TrackerCore {
        &mut self.core
    }

    fn get_pose(
        &mut self,
        ctx: &mut dyn TrackerContext,
        time: DisplayTime,
    ) -> Result<Pose, TrackerError> {
        ctx.locate_controller(time)
    }

    fn reset_reference_pose(
        &mut self,
        ctx: &mut dyn TrackerContext,
        time: DisplayTime,
    ) -> Result<(), TrackerError> {
        match ctx.locate_controller(time) {
            Ok(pose) => {
                self.core.set_reference_pose(pose);
                Ok(())
            }
            Err(e) => {
                error!(?e, "unable to get current controller pose for calibration");
                self.core.invalidate_calibration();
                Err(e)
            }
        }
    }
}
