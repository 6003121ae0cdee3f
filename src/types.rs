// src/types.rs

use serde::{Deserialize, Serialize};

/// Number of angular zones reported by the sensor (3x3 grid).
pub const NUM_ZONES: usize = 9;

/// Targets resolved per zone per measurement.
pub const NUM_TARGETS: usize = 2;

/// Zone watched by the motion detector (center of the 3x3 grid).
pub const CENTER_ZONE_IDX: usize = 4;

/// "No object detected" marker. Never a physical distance.
pub const SENTINEL_DISTANCE_MM: i32 = -1;

/// One target pair for a single zone: up to two objects, each with a
/// confidence and a slant distance in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ZoneReading {
    pub confidence0: i32,
    pub distance0_mm: i32,
    pub confidence1: i32,
    pub distance1_mm: i32,
}

/// One decoded sensor measurement. Immutable once decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub timestamp_ms: i64,
    pub ambient_light: i32,
    pub zones: [ZoneReading; NUM_ZONES],
}

/// Direction of travel relative to the sensor, derived from the sign of
/// the distance change over a run. Distance decreasing = approaching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Approaching,
    Departing,
}

impl Direction {
    /// Direction of the step `previous -> current`.
    pub fn from_step(previous_mm: i32, current_mm: i32) -> Direction {
        if current_mm < previous_mm {
            Direction::Approaching
        } else {
            Direction::Departing
        }
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sensor: SensorConfig,
    pub buffer: BufferConfig,
    pub detection: DetectionConfig,
    pub source: SourceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Perpendicular distance from the sensor to the watched path, in mm.
    pub dist_to_path_mm: f64,
    /// Zone whose distance stream feeds the detector.
    pub detection_zone: usize,
    /// Initial per-zone distance selection: "target_0", "confidence" or
    /// "average". Swappable at runtime through the controller.
    pub zone_policy: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Fixed sample capacity of the ring buffer.
    pub capacity: usize,
    /// Samples returned per windowed read.
    pub span: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum points for a run to become a monotonic series.
    pub min_samples: usize,
    /// Adjacent samples further apart than this (mm) break a run.
    pub max_dd_mm: i32,
    /// Series further apart than this (ms) belong to separate motions.
    pub max_series_time_delta_ms: i64,
    /// A completed motion stays "current" for this long after its end.
    pub motion_validity_ms: i64,
    /// Motions at or above this speed are classified and published.
    pub bicycle_velocity_threshold_kmh: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// "tcp" or "csv".
    pub kind: String,
    pub host: String,
    pub port: u16,
    pub csv_path: String,
    /// Pace CSV replay to the recorded inter-sample timing.
    pub csv_live_mode: bool,
    /// Skip CSV records older than this timestamp.
    pub csv_start_time_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            dist_to_path_mm: 1500.0,
            detection_zone: CENTER_ZONE_IDX,
            zone_policy: "target_0".to_string(),
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: 4096,
            span: 160,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_samples: 3,
            max_dd_mm: 200,
            max_series_time_delta_ms: 200,
            motion_validity_ms: 3000,
            bicycle_velocity_threshold_kmh: 5.0,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: "csv".to_string(),
            host: "192.168.1.57".to_string(),
            port: 8080,
            csv_path: "out/data.csv".to_string(),
            csv_live_mode: false,
            csv_start_time_ms: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sensor: SensorConfig::default(),
            buffer: BufferConfig::default(),
            detection: DetectionConfig::default(),
            source: SourceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Sample with every zone set to the given single-target distance.
    pub fn sample(timestamp_ms: i64, distance_mm: i32) -> Sample {
        let zone = ZoneReading {
            confidence0: 255,
            distance0_mm: distance_mm,
            confidence1: 0,
            distance1_mm: SENTINEL_DISTANCE_MM,
        };
        Sample {
            timestamp_ms,
            ambient_light: 0,
            zones: [zone; NUM_ZONES],
        }
    }
}
