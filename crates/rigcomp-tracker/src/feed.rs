//! Shared-memory telemetry feeds.
//!
//! The motion software publishes fixed-size binary records into a named
//! shared-memory region. Field order and units are part of the wire
//! contract and must match the publisher byte for byte. Reads are
//! best-effort and non-blocking: any failure is reported as "no data"
//! and retried by the caller on the next frame.

use memmap2::Mmap;
use std::fs::File;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// Region name of the Yaw Game Engine feed.
pub const YAW_FEED_NAME: &str = "YawVRGEFile";
/// Region name shared by the six-DoF rig feeds.
pub const SIX_DOF_FEED_NAME: &str = "motionRigPose";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("shared memory region '{name}' unavailable: {source}")]
    Unavailable {
        name: String,
        source: std::io::Error,
    },
    #[error("record truncated: got {got} bytes, need {need}")]
    Truncated { got: usize, need: usize },
}

/// Lazily-opened reader over a named shared-memory region.
///
/// The region is exposed as a file of the same name under the system
/// temp directory by the motion software's bridge. Opening is deferred
/// to `open` so the layer can come up before the motion software does.
pub struct FeedReader {
    name: &'static str,
    map: Option<Mmap>,
}

impl FeedReader {
    pub fn new(name: &'static str) -> Self {
        Self { name, map: None }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn region_path(&self) -> PathBuf {
        std::env::temp_dir().join(self.name)
    }

    pub fn is_open(&self) -> bool {
        self.map.is_some()
    }

    /// Map the region. Safe to call again after failure.
    pub fn open(&mut self) -> Result<(), FeedError> {
        let path = self.region_path();
        let file = File::open(&path).map_err(|source| FeedError::Unavailable {
            name: self.name.to_string(),
            source,
        })?;
        // The publisher updates the region in place; we only ever read.
        let map = unsafe { Mmap::map(&file) }.map_err(|source| FeedError::Unavailable {
            name: self.name.to_string(),
            source,
        })?;
        debug!(name = self.name, ?path, "telemetry feed mapped");
        self.map = Some(map);
        Ok(())
    }

    /// Copy the current record out of the region. A single non-blocking
    /// read; no retry, no synchronization with the publisher.
    pub fn read<const N: usize>(&self) -> Result<[u8; N], FeedError> {
        let map = self.map.as_ref().ok_or_else(|| FeedError::Unavailable {
            name: self.name.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotConnected, "region not mapped"),
        })?;
        if map.len() < N {
            return Err(FeedError::Truncated {
                got: map.len(),
                need: N,
            });
        }
        let mut record = [0u8; N];
        record.copy_from_slice(&map[..N]);
        Ok(record)
    }
}

/// Yaw Game Engine record: 36 bytes.
///
/// Layout (little endian):
/// ```text
///  0  f32 yaw (degrees)          12 f32 battery
///  4  f32 pitch (degrees)        16 f32 rotationHeight
///  8  f32 roll (degrees)         20 f32 rotationForwardHead
/// 24  u8  sixDof                 25 u8  usePos
/// 26  2 bytes padding
/// 28  f32 autoX                  32 f32 autoY
/// ```
#[derive(Debug, Clone, Copy)]
pub struct YawRecord {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    pub battery: f32,
    pub rotation_height: f32,
    pub rotation_forward_head: f32,
    pub six_dof: bool,
    pub use_pos: bool,
    pub auto_x: f32,
    pub auto_y: f32,
}

pub const YAW_RECORD_SIZE: usize = 36;

pub fn parse_yaw_record(bytes: &[u8; YAW_RECORD_SIZE]) -> YawRecord {
    let f = |offset: usize| -> f32 {
        f32::from_le_bytes(bytes[offset..offset + 4].try_into().expect("fixed slice"))
    };
    YawRecord {
        yaw: f(0),
        pitch: f(4),
        roll: f(8),
        battery: f(12),
        rotation_height: f(16),
        rotation_forward_head: f(20),
        six_dof: bytes[24] != 0,
        use_pos: bytes[25] != 0,
        auto_x: f(28),
        auto_y: f(32),
    }
}

/// Six-DoF rig record: 48 bytes, six little-endian f64 fields.
///
/// Angles in degrees, linear axes in millimeters.
#[derive(Debug, Clone, Copy)]
pub struct SixDofRecord {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    pub sway: f64,
    pub surge: f64,
    pub heave: f64,
}

pub const SIX_DOF_RECORD_SIZE: usize = 48;

pub fn parse_six_dof_record(bytes: &[u8; SIX_DOF_RECORD_SIZE]) -> SixDofRecord {
    let f = |offset: usize| -> f64 {
        f64::from_le_bytes(bytes[offset..offset + 8].try_into().expect("fixed slice"))
    };
    SixDofRecord {
        yaw: f(0),
        pitch: f(8),
        roll: f(16),
        sway: f(24),
        surge: f(32),
        heave: f(40),
    }
}


#[cfg(test)]
mod tests {
    use super::test_records::*;
    use super::*;

    #[test]
    fn parse_yaw_record_fields() {
        let bytes = make_yaw_record(10.0, -5.5, 2.25);
        let record = parse_yaw_record(&bytes);
        assert!((record.yaw - 10.0).abs() < 1e-6);
        assert!((record.pitch + 5.5).abs() < 1e-6);
        assert!((record.roll - 2.25).abs() < 1e-6);
        assert!((record.battery - 87.5).abs() < 1e-6);
        assert!(record.six_dof);
        assert!(!record.use_pos);
    }

    #[test]
    fn parse_six_dof_record_fields() {
        let bytes = make_six_dof_record(1.0, 2.0, 3.0, 40.0, 50.0, 60.0);
        let record = parse_six_dof_record(&bytes);
        assert!((record.yaw - 1.0).abs() < 1e-12);
        assert!((record.pitch - 2.0).abs() < 1e-12);
        assert!((record.roll - 3.0).abs() < 1e-12);
        assert!((record.sway - 40.0).abs() < 1e-12);
        assert!((record.surge - 50.0).abs() < 1e-12);
        assert!((record.heave - 60.0).abs() < 1e-12);
    }

    #[test]
    fn unmapped_reader_reports_unavailable() {
        let reader = FeedReader::new("rigcomp-test-nonexistent");
        assert!(matches!(
            reader.read::<YAW_RECORD_SIZE>(),
            Err(FeedError::Unavailable { .. })
        ));
    }

    #[test]
    fn open_missing_region_fails_cleanly() {
        let mut reader = FeedReader::new("rigcomp-test-missing-region");
        assert!(reader.open().is_err());
        assert!(!reader.is_open());
    }

    #[test]
    fn read_from_mapped_file() {
        let name = "rigcomp-test-feed";
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, make_yaw_record(45.0, 0.0, 0.0)).unwrap();

        let mut reader = FeedReader::new(name);
        reader.open().unwrap();
        let record = parse_yaw_record(&reader.read::<YAW_RECORD_SIZE>().unwrap());
        assert!((record.yaw - 45.0).abs() < 1e-6);

        std::fs::remove_file(&path).ok();
    }
}
