//! Interception layer injecting a motion-rig pose delta into an XR
//! application's tracking queries and reversing it again at frame
//! submission.

pub mod cache;
pub mod feedback;
pub mod layer;
pub mod mock;
pub mod overlay;
pub mod runtime;

pub use feedback::{FeedbackEvent, FeedbackSink, LogFeedback};
pub use layer::{CompensationLayer, CompensationState, LayerError};
pub use overlay::Overlay;
pub use runtime::{
    ActionHandle, ActionSetHandle, Binding, CompositionLayer, FieldOfView, FrameEndInfo,
    ProjectionView, ReferenceSpaceKind, Runtime, RuntimeError, SpaceHandle, SpaceLocation, View,
};
