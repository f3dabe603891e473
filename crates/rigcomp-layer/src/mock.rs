//! Scriptable in-process runtime for tests and the demo harness.
//!
//! Holds a world frame that coincides with the first local space.
//! Tests drive it by setting headset and controller poses in that
//! frame and inspecting what got submitted.

use crate::runtime::{
    ActionHandle, ActionSetHandle, Binding, CompositionLayer, FieldOfView, FrameEndInfo,
    ProjectionView, ReferenceSpaceKind, Runtime, RuntimeError, SpaceHandle, SpaceLocation, View,
};
use glam::Vec3;
use rigcomp_math::Pose;
use rigcomp_tracker::DisplayTime;
use std::collections::HashMap;

enum SpaceKind {
    /// Space with a fixed pose in the world frame (local, stage).
    Fixed(Pose),
    /// Head-locked space: `offset` composed onto the live headset pose.
    View(Pose),
    /// Space attached to a pose action; follows the controller.
    Action,
}

pub struct MockRuntime {
    next_handle: u64,
    spaces: HashMap<u64, SpaceKind>,
    action_sets: HashMap<u64, String>,
    hmd_in_world: Pose,
    controller_in_world: Pose,
    action_active: bool,
    eye_offsets: [Pose; 2],
    pub submitted: Vec<FrameEndInfo>,
    pub suggested: Vec<(String, Vec<Binding>)>,
    pub attached_sets: Vec<Vec<ActionSetHandle>>,
    pub sync_calls: usize,
}

impl MockRuntime {
    pub fn new() -> Self {
        let ipd_half = 0.032;
        Self {
            next_handle: 1,
            spaces: HashMap::new(),
            action_sets: HashMap::new(),
            hmd_in_world: Pose::IDENTITY,
            controller_in_world: Pose::IDENTITY,
            action_active: true,
            eye_offsets: [
                Pose::from_translation(Vec3::new(-ipd_half, 0.0, 0.0)),
                Pose::from_translation(Vec3::new(ipd_half, 0.0, 0.0)),
            ],
            submitted: Vec::new(),
            suggested: Vec::new(),
            attached_sets: Vec::new(),
            sync_calls: 0,
        }
    }

    pub fn set_hmd_pose(&mut self, pose: Pose) {
        self.hmd_in_world = pose;
    }

    pub fn set_controller_pose(&mut self, pose: Pose) {
        self.controller_in_world = pose;
    }

    pub fn set_action_active(&mut self, active: bool) {
        self.action_active = active;
    }

    pub fn eye_offsets(&self) -> [Pose; 2] {
        self.eye_offsets
    }

    fn alloc(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    /// Pose of a space in the world frame.
    fn space_in_world(&self, space: SpaceHandle) -> Result<Pose, RuntimeError> {
        match self.spaces.get(&space.0) {
            Some(SpaceKind::Fixed(pose)) => Ok(*pose),
            Some(SpaceKind::View(offset)) => Ok(offset.compose(self.hmd_in_world)),
            Some(SpaceKind::Action) => Ok(self.controller_in_world),
            None => Err(RuntimeError::InvalidHandle),
        }
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime for MockRuntime {
    fn create_reference_space(
        &mut self,
        kind: ReferenceSpaceKind,
        pose_in_space: Pose,
    ) -> Result<SpaceHandle, RuntimeError> {
        let handle = self.alloc();
        let entry = match kind {
            // View spaces track the headset; only the offset is fixed.
            ReferenceSpaceKind::View => SpaceKind::View(pose_in_space),
            // The world frame doubles as the canonical local/stage
            // origin.
            ReferenceSpaceKind::Local | ReferenceSpaceKind::Stage => {
                SpaceKind::Fixed(pose_in_space)
            }
        };
        self.spaces.insert(handle, entry);
        Ok(SpaceHandle(handle))
    }

    fn destroy_space(&mut self, space: SpaceHandle) -> Result<(), RuntimeError> {
        self.spaces
            .remove(&space.0)
            .map(|_| ())
            .ok_or(RuntimeError::InvalidHandle)
    }

    fn locate_space(
        &mut self,
        space: SpaceHandle,
        base: SpaceHandle,
        _time: DisplayTime,
    ) -> Result<SpaceLocation, RuntimeError> {
        let space_world = self.space_in_world(space)?;
        let base_world = self.space_in_world(base)?;
        Ok(SpaceLocation {
            pose: space_world.compose(base_world.invert()),
            valid: true,
        })
    }

    fn locate_views(
        &mut self,
        space: SpaceHandle,
        _time: DisplayTime,
    ) -> Result<Vec<View>, RuntimeError> {
        let base_world = self.space_in_world(space)?;
        let hmd_in_space = self.hmd_in_world.compose(base_world.invert());
        Ok(self
            .eye_offsets
            .iter()
            .map(|offset| View {
                pose: offset.compose(hmd_in_space),
                fov: FieldOfView::default(),
            })
            .collect())
    }

    fn create_action_set(&mut self, name: &str) -> Result<ActionSetHandle, RuntimeError> {
        let handle = self.alloc();
        self.action_sets.insert(handle, name.to_string());
        Ok(ActionSetHandle(handle))
    }

    fn destroy_action_set(&mut self, set: ActionSetHandle) -> Result<(), RuntimeError> {
        self.action_sets
            .remove(&set.0)
            .map(|_| ())
            .ok_or(RuntimeError::InvalidHandle)
    }

    fn create_pose_action(
        &mut self,
        set: ActionSetHandle,
        _name: &str,
    ) -> Result<ActionHandle, RuntimeError> {
        if !self.action_sets.contains_key(&set.0) {
            return Err(RuntimeError::InvalidHandle);
        }
        Ok(ActionHandle(self.alloc()))
    }

    fn create_action_space(&mut self, _action: ActionHandle) -> Result<SpaceHandle, RuntimeError> {
        let handle = self.alloc();
        self.spaces.insert(handle, SpaceKind::Action);
        Ok(SpaceHandle(handle))
    }

    fn suggest_bindings(
        &mut self,
        profile: &str,
        bindings: &[Binding],
    ) -> Result<(), RuntimeError> {
        self.suggested.push((profile.to_string(), bindings.to_vec()));
        Ok(())
    }

    fn attach_action_sets(&mut self, sets: &[ActionSetHandle]) -> Result<(), RuntimeError> {
        self.attached_sets.push(sets.to_vec());
        Ok(())
    }

    fn sync_actions(&mut self, _sets: &[ActionSetHandle]) -> Result<(), RuntimeError> {
        self.sync_calls += 1;
        Ok(())
    }

    fn action_pose_active(&mut self, _action: ActionHandle) -> Result<bool, RuntimeError> {
        Ok(self.action_active)
    }

    fn begin_frame(&mut self, _display_time: DisplayTime) -> Result<(), RuntimeError> {
        Ok(())
    }

    fn end_frame(&mut self, frame: FrameEndInfo) -> Result<(), RuntimeError> {
        self.submitted.push(frame);
        Ok(())
    }
}

/// Uncompensated projection views for a frame, as an application that
/// just located its views would submit them.
pub fn projection_views(views: &[View]) -> Vec<ProjectionView> {
    views
        .iter()
        .map(|view| ProjectionView {
            pose: view.pose,
            fov: view.fov,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn locating_a_space_in_itself_is_identity() {
        let mut runtime = MockRuntime::new();
        let local = runtime
            .create_reference_space(ReferenceSpaceKind::Local, Pose::IDENTITY)
            .unwrap();
        let location = runtime.locate_space(local, local, 0).unwrap();
        assert!(location.valid);
        assert!((location.pose.position - Vec3::ZERO).length() < 1e-6);
    }

    #[test]
    fn action_space_tracks_the_controller() {
        let mut runtime = MockRuntime::new();
        let local = runtime
            .create_reference_space(ReferenceSpaceKind::Local, Pose::IDENTITY)
            .unwrap();
        let set = runtime.create_action_set("test").unwrap();
        let action = runtime.create_pose_action(set, "pose").unwrap();
        let space = runtime.create_action_space(action).unwrap();

        let pose = Pose::new(Quat::from_rotation_y(0.3), Vec3::new(0.1, 0.9, -0.2));
        runtime.set_controller_pose(pose);
        let location = runtime.locate_space(space, local, 0).unwrap();
        assert!((location.pose.position - pose.position).length() < 1e-6);
    }

    #[test]
    fn views_ride_on_the_headset() {
        let mut runtime = MockRuntime::new();
        let local = runtime
            .create_reference_space(ReferenceSpaceKind::Local, Pose::IDENTITY)
            .unwrap();
        let hmd = Pose::from_translation(Vec3::new(0.0, 1.7, 0.0));
        runtime.set_hmd_pose(hmd);
        let views = runtime.locate_views(local, 0).unwrap();
        assert_eq!(views.len(), 2);
        let center = (views[0].pose.position + views[1].pose.position) * 0.5;
        assert!((center - hmd.position).length() < 1e-6);
    }
}
