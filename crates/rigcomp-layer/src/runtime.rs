//! Boundary to the underlying XR runtime.
//!
//! The interception layer sits between the application and whatever
//! actually talks to the headset. Everything it needs from below is
//! expressed through [`Runtime`], so the layer logic can be driven by
//! the real runtime in production and by [`crate::mock::MockRuntime`]
//! in tests and the demo harness.

use rigcomp_math::Pose;
use rigcomp_tracker::DisplayTime;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpaceHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionSetHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionHandle(pub u64);

/// Well-known reference space categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSpaceKind {
    /// Head-locked space following the display.
    View,
    /// Seated-origin space; recreated when the user recenters.
    Local,
    /// Floor-level room space.
    Stage,
}

/// Result of locating one space in another.
#[derive(Debug, Clone, Copy)]
pub struct SpaceLocation {
    pub pose: Pose,
    /// Both orientation and position tracked and usable.
    pub valid: bool,
}

/// Asymmetric per-eye frustum, angles in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldOfView {
    pub angle_left: f32,
    pub angle_right: f32,
    pub angle_up: f32,
    pub angle_down: f32,
}

impl Default for FieldOfView {
    fn default() -> Self {
        let quarter = std::f32::consts::FRAC_PI_4;
        Self {
            angle_left: -quarter,
            angle_right: quarter,
            angle_up: quarter,
            angle_down: -quarter,
        }
    }
}

/// One eye's render pose and frustum for a frame.
#[derive(Debug, Clone, Copy)]
pub struct View {
    pub pose: Pose,
    pub fov: FieldOfView,
}

/// One rendered view inside a projection layer submission.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionView {
    pub pose: Pose,
    pub fov: FieldOfView,
}

/// Composition layer as submitted by the application at frame end.
#[derive(Debug, Clone)]
pub enum CompositionLayer {
    /// Stereo projection of the rendered scene.
    Projection {
        space: SpaceHandle,
        views: Vec<ProjectionView>,
    },
    /// Flat quad (menus, HUDs) positioned in some space.
    Quad {
        space: SpaceHandle,
        pose: Pose,
        extent: (f32, f32),
    },
}

/// Everything the application hands over when it submits a frame.
#[derive(Debug, Clone)]
pub struct FrameEndInfo {
    pub display_time: DisplayTime,
    pub layers: Vec<CompositionLayer>,
}

/// A suggested (action, input path) pair for an interaction profile.
#[derive(Debug, Clone)]
pub struct Binding {
    pub action: ActionHandle,
    pub path: String,
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("handle does not refer to a live object")]
    InvalidHandle,
    #[error("action sets were already attached to the session")]
    ActionSetsAlreadyAttached,
    #[error("runtime rejected the call: {0}")]
    Rejected(String),
}

/// Downstream XR runtime surface, reduced to the calls the
/// compensation layer intercepts or issues itself.
pub trait Runtime {
    fn create_reference_space(
        &mut self,
        kind: ReferenceSpaceKind,
        pose_in_space: Pose,
    ) -> Result<SpaceHandle, RuntimeError>;

    fn destroy_space(&mut self, space: SpaceHandle) -> Result<(), RuntimeError>;

    fn locate_space(
        &mut self,
        space: SpaceHandle,
        base: SpaceHandle,
        time: DisplayTime,
    ) -> Result<SpaceLocation, RuntimeError>;

    /// Per-eye render poses expressed in `space`.
    fn locate_views(
        &mut self,
        space: SpaceHandle,
        time: DisplayTime,
    ) -> Result<Vec<View>, RuntimeError>;

    fn create_action_set(&mut self, name: &str) -> Result<ActionSetHandle, RuntimeError>;

    fn destroy_action_set(&mut self, set: ActionSetHandle) -> Result<(), RuntimeError>;

    fn create_pose_action(
        &mut self,
        set: ActionSetHandle,
        name: &str,
    ) -> Result<ActionHandle, RuntimeError>;

    fn create_action_space(&mut self, action: ActionHandle) -> Result<SpaceHandle, RuntimeError>;

    fn suggest_bindings(
        &mut self,
        profile: &str,
        bindings: &[Binding],
    ) -> Result<(), RuntimeError>;

    fn attach_action_sets(&mut self, sets: &[ActionSetHandle]) -> Result<(), RuntimeError>;

    fn sync_actions(&mut self, sets: &[ActionSetHandle]) -> Result<(), RuntimeError>;

    /// Whether the pose action currently delivers tracked data.
    fn action_pose_active(&mut self, action: ActionHandle) -> Result<bool, RuntimeError>;

    fn begin_frame(&mut self, display_time: DisplayTime) -> Result<(), RuntimeError>;

    fn end_frame(&mut self, frame: FrameEndInfo) -> Result<(), RuntimeError>;
}
