//! Hook for a host-drawn debug overlay.
//!
//! Rendering lives with the host; the layer only hands over the data
//! an overlay needs each frame (reference marker pose, the reversal
//! about to be applied, whether compensation is live).

use crate::runtime::FrameEndInfo;
use rigcomp_math::Pose;

pub trait Overlay {
    /// Called once per submitted frame, before the reversal is applied
    /// to the application's layers.
    fn draw_overlay(
        &mut self,
        frame: &FrameEndInfo,
        reference_pose: Pose,
        reversed_delta: Pose,
        active: bool,
    );
}
