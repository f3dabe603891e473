use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    /// Master switch. When false the layer passes every call through
    /// untouched.
    pub enabled: bool,
    /// Whether to set up the physical tracker action binding. Disable
    /// when running purely from a telemetry feed on a rig without a
    /// mounted controller.
    pub physical_tracker: bool,
    /// Which motion data source drives the compensation.
    pub tracker_type: TrackerType,
    /// Which hand's controller acts as the physical tracker.
    pub controller_side: ControllerSide,
    /// Translation smoothing.
    pub translation_filter: FilterConfig,
    /// Rotation smoothing.
    pub rotation_filter: FilterConfig,
    /// Seconds without a valid tracker read before compensation shuts
    /// itself off. Negative disables the timeout.
    pub tracker_timeout_s: f32,
    /// Tolerance window for matching cached poses between the locate
    /// and end-frame calls of one visual frame (milliseconds).
    pub cache_tolerance_ms: f32,
    /// Reverse eye poses from the cache instead of recomputing them by
    /// inverse at frame end.
    pub use_eye_cache: bool,
    /// Virtual tracker placement relative to the calibrated head pose.
    pub offsets: OffsetConfig,
    /// Load the persisted center-of-rotation pose instead of deriving
    /// one from the headset at calibration time.
    pub use_cor_pose: bool,
    /// Persisted center-of-rotation pose (written on calibration save).
    pub cor_pose: CorPose,
    /// Debug: feed a slow synthetic yaw rotation instead of tracker
    /// data.
    pub test_rotation: bool,
    /// Whether the host application should draw the debug overlay.
    pub overlay_enabled: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            physical_tracker: true,
            tracker_type: TrackerType::Controller,
            controller_side: ControllerSide::Left,
            translation_filter: FilterConfig::default(),
            rotation_filter: FilterConfig::default(),
            tracker_timeout_s: 1.0,
            cache_tolerance_ms: 2.0,
            use_eye_cache: false,
            offsets: OffsetConfig::default(),
            use_cor_pose: false,
            cor_pose: CorPose::default(),
            test_rotation: false,
            overlay_enabled: false,
        }
    }
}

/// Motion data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerType {
    /// Pose action bound to a physical controller or tracker puck.
    Controller,
    /// Yaw Game Engine telemetry feed (rotation only).
    Yaw,
    /// Six-DoF rig telemetry feed, SRS field conventions.
    Srs,
    /// Six-DoF rig telemetry feed, FlyPT Mover field conventions.
    Flypt,
}

impl TrackerType {
    /// Feed trackers synthesize their reference pose from the headset
    /// instead of reading one from hardware.
    pub fn is_virtual(self) -> bool {
        !matches!(self, TrackerType::Controller)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerSide {
    Left,
    Right,
}

impl ControllerSide {
    pub fn as_str(self) -> &'static str {
        match self {
            ControllerSide::Left => "left",
            ControllerSide::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Number of cascaded smoothing stages (1-3).
    pub order: u32,
    /// Per-stage smoothing strength in [0, 1).
    pub strength: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            order: 2,
            strength: 0.0,
        }
    }
}

/// Center-of-rotation placement relative to the calibrated head pose,
/// in centimeters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct OffsetConfig {
    pub forward_cm: f32,
    pub down_cm: f32,
    pub right_cm: f32,
}

impl Default for OffsetConfig {
    fn default() -> Self {
        Self {
            forward_cm: 0.0,
            down_cm: 0.0,
            right_cm: 0.0,
        }
    }
}

/// Persisted center-of-rotation pose.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CorPose {
    #[serde(with = "vec3_serde")]
    pub position: Vec3,
    #[serde(with = "quat_serde")]
    pub orientation: Quat,
}

impl Default for CorPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

impl CorPose {
    pub fn to_pose(self) -> rigcomp_math::Pose {
        rigcomp_math::Pose::new(self.orientation, self.position)
    }

    pub fn from_pose(pose: rigcomp_math::Pose) -> Self {
        Self {
            position: pose.position,
            orientation: pose.orientation,
        }
    }
}

// Serde helpers for glam types: store as plain arrays for a cleaner
// TOML representation.

mod vec3_serde {
    use glam::Vec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &Vec3, s: S) -> Result<S::Ok, S::Error> {
        [v.x, v.y, v.z].serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec3, D::Error> {
        let [x, y, z] = <[f32; 3]>::deserialize(d)?;
        Ok(Vec3::new(x, y, z))
    }
}

mod quat_serde {
    use glam::Quat;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(q: &Quat, s: S) -> Result<S::Ok, S::Error> {
        [q.x, q.y, q.z, q.w].serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Quat, D::Error> {
        let [x, y, z, w] = <[f32; 4]>::deserialize(d)?;
        Ok(Quat::from_xyzw(x, y, z, w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let config = LayerConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: LayerConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.tracker_type, TrackerType::Controller);
        assert_eq!(back.translation_filter.order, 2);
        assert!((back.tracker_timeout_s - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        // A partial file must still parse; absent features keep their
        // defaults instead of failing the whole load.
        let back: LayerConfig = toml::from_str("tracker_type = \"srs\"\n").unwrap();
        assert_eq!(back.tracker_type, TrackerType::Srs);
        assert!(back.enabled);
        assert!((back.cache_tolerance_ms - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn cor_pose_round_trip() {
        let pose = rigcomp_math::Pose::new(
            Quat::from_rotation_y(0.5).normalize(),
            Vec3::new(0.1, -1.2, 0.3),
        );
        let cor = CorPose::from_pose(pose);
        let text = toml::to_string_pretty(&cor).unwrap();
        let back: CorPose = toml::from_str(&text).unwrap();
        assert!((back.to_pose().position - pose.position).length() < 1e-6);
        assert!(back.to_pose().orientation.dot(pose.orientation) > 1.0 - 1e-6);
    }

    #[test]
    fn tracker_type_names_match_wire_values() {
        assert_eq!(
            toml::to_string(&LayerConfig {
                tracker_type: TrackerType::Flypt,
                ..Default::default()
            })
            .unwrap()
            .contains("tracker_type = \"flypt\""),
            true
        );
    }
}
