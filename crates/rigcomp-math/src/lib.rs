mod pose;

pub use pose::Pose;

use glam::{EulerRot, Quat, Vec3};

/// Tolerance for "is this quaternion still a unit quaternion" checks.
///
/// Loose enough to accept values that went through a config file round
/// trip, tight enough to reject garbage.
pub const QUAT_NORMALIZED_EPSILON: f32 = 1e-3;

/// Build a rotation from yaw/pitch/roll angles (radians).
///
/// Matches the intrinsic Y-X-Z order the motion software uses for its
/// telemetry records: roll about Z first, then pitch about X, then yaw
/// about Y. The feed trackers depend on this exact order.
pub fn quat_from_yaw_pitch_roll(yaw: f32, pitch: f32, roll: f32) -> Quat {
    Quat::from_euler(EulerRot::YXZ, yaw, pitch, roll)
}

/// Yaw-only rotation derived from a forward vector projected onto the
/// horizontal plane. Used when calibrating a reference pose that has no
/// roll/pitch reference of its own.
pub fn yaw_from_flat_forward(forward: Vec3) -> f32 {
    forward.x.atan2(forward.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaw_rotates_forward_vector() {
        let q = quat_from_yaw_pitch_roll(90.0_f32.to_radians(), 0.0, 0.0);
        let rotated = q * Vec3::NEG_Z;
        assert!((rotated - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn euler_order_is_yaw_last() {
        // With Y-X-Z order, a combined yaw+pitch applies pitch in the
        // yawed frame: -Z pitched up 90 degrees ends at +Y regardless
        // of yaw.
        let q = quat_from_yaw_pitch_roll(37.0_f32.to_radians(), 90.0_f32.to_radians(), 0.0);
        let rotated = q * Vec3::NEG_Z;
        assert!((rotated - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn flat_forward_yaw() {
        assert!((yaw_from_flat_forward(Vec3::new(0.0, 0.0, 1.0)) - 0.0).abs() < 1e-6);
        let yaw = yaw_from_flat_forward(Vec3::new(1.0, 0.0, 0.0));
        assert!((yaw - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }
}
