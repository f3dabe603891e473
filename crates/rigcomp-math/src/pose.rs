use crate::QUAT_NORMALIZED_EPSILON;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Rigid 3D transform: unit-quaternion orientation plus position.
///
/// All pose math in the workspace goes through `compose`/`invert` so
/// that every consumer uses one fixed composition order. `compose(a, b)`
/// applies `a` first, then `b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub orientation: Quat,
    pub position: Vec3,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        orientation: Quat::IDENTITY,
        position: Vec3::ZERO,
    };

    pub fn new(orientation: Quat, position: Vec3) -> Self {
        Self {
            orientation,
            position,
        }
    }

    pub fn from_rotation(orientation: Quat) -> Self {
        Self {
            orientation,
            position: Vec3::ZERO,
        }
    }

    pub fn from_translation(position: Vec3) -> Self {
        Self {
            orientation: Quat::IDENTITY,
            position,
        }
    }

    /// Apply `self`, then `other`.
    ///
    /// As a matrix product this is `M(other) * M(self)`; the returned
    /// pose transforms a point by `self` first.
    #[must_use]
    pub fn compose(self, other: Pose) -> Pose {
        Pose {
            orientation: (other.orientation * self.orientation).normalize(),
            position: other.orientation * self.position + other.position,
        }
    }

    /// Inverse transform: `compose(p, p.invert())` is the identity.
    #[must_use]
    pub fn invert(self) -> Pose {
        let inv_orientation = self.orientation.conjugate();
        Pose {
            orientation: inv_orientation,
            position: -(inv_orientation * self.position),
        }
    }

    /// Relative transform carrying `self` onto `target`:
    /// `compose(self, delta) == target`.
    #[must_use]
    pub fn delta_to(self, target: Pose) -> Pose {
        self.invert().compose(target)
    }

    /// Transform a point by this pose.
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.orientation * point + self.position
    }

    /// Whether the orientation is still a unit quaternion (within a
    /// loose tolerance). Poses read from config files or shared memory
    /// must pass this before use.
    pub fn is_normalized(&self) -> bool {
        (self.orientation.length_squared() - 1.0).abs() < QUAT_NORMALIZED_EPSILON
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Pose, b: Pose, tol: f32) -> bool {
        // Quaternions double-cover rotations; compare up to sign.
        let dot = a.orientation.dot(b.orientation).abs();
        dot > 1.0 - tol && (a.position - b.position).length() < tol
    }

    fn sample_pose() -> Pose {
        Pose::new(
            Quat::from_euler(glam::EulerRot::YXZ, 0.7, -0.2, 0.1),
            Vec3::new(1.5, -0.3, 2.0),
        )
    }

    #[test]
    fn invert_round_trip() {
        let p = sample_pose();
        assert!(approx_eq(p.compose(p.invert()), Pose::IDENTITY, 1e-5));
        assert!(approx_eq(p.invert().compose(p), Pose::IDENTITY, 1e-5));
    }

    #[test]
    fn compose_then_reverse_is_noop() {
        // Applying a delta and then its exact inverse must return the
        // base pose unchanged: the end-to-end compensation contract.
        let base = sample_pose();
        let delta = Pose::new(
            Quat::from_rotation_y(0.3),
            Vec3::new(0.02, -0.05, 0.01),
        );
        let compensated = base.compose(delta);
        assert!(approx_eq(compensated.compose(delta.invert()), base, 1e-5));
    }

    #[test]
    fn delta_reconstructs_reference() {
        let current = sample_pose();
        let reference = Pose::new(Quat::from_rotation_x(0.25), Vec3::new(0.0, 1.1, -0.4));
        let delta = current.delta_to(reference);
        assert!(approx_eq(current.compose(delta), reference, 1e-5));
    }

    #[test]
    fn compose_order_is_fixed() {
        // Rotation-then-translation is not commutative; pin the order.
        let rot = Pose::from_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let trans = Pose::from_translation(Vec3::new(1.0, 0.0, 0.0));

        // rot applied first: the translation is unaffected by it.
        let a = rot.compose(trans);
        assert!((a.position - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-6);

        // trans applied first: the rotation carries the offset around.
        let b = trans.compose(rot);
        assert!((b.position - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn transform_point_matches_compose() {
        let p = sample_pose();
        let point = Vec3::new(0.3, 0.4, -0.2);
        let via_pose = Pose::from_translation(point).compose(p).position;
        assert!((p.transform_point(point) - via_pose).length() < 1e-6);
    }

    #[test]
    fn normalization_check() {
        let mut p = sample_pose();
        assert!(p.is_normalized());
        p.orientation = Quat::from_xyzw(1.0, 1.0, 1.0, 1.0);
        assert!(!p.is_normalized());
    }
}
