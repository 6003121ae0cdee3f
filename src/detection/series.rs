// src/detection/series.rs
//
// A monotonic series is a maximal run of non-sentinel single-zone
// distance samples moving consistently in one direction, with adjacent
// samples no further apart than `max_dd_mm`. The series carries the
// geometric velocity estimate for that run.

use crate::types::Direction;
use tracing::debug;

/// Immutable run of `(timestamp_ms, distance_mm)` samples.
#[derive(Debug, Clone)]
pub struct MonotonicSeries {
    samples: Vec<(i64, i32)>,
    pub time_start: i64,
    pub time_end: i64,
    pub dist_start_mm: i32,
    pub dist_end_mm: i32,
    pub dist_avg_mm: f64,
    pub direction: Direction,
    /// Unsigned average along-path speed over the run, km/h. Zero when
    /// no sample pair yields a usable estimate.
    pub velocity_kmh: f64,
}

impl MonotonicSeries {
    /// Build a series from a closed run. Returns `None` when the run is
    /// too short or contains an oversized jump; such runs are discarded,
    /// never represented.
    pub fn build(
        samples: Vec<(i64, i32)>,
        min_samples: usize,
        max_dd_mm: i32,
        dist_to_path_mm: f64,
    ) -> Option<MonotonicSeries> {
        if samples.len() < min_samples.max(1) {
            return None;
        }

        let jump = samples
            .windows(2)
            .any(|pair| (pair[1].1 - pair[0].1).abs() >= max_dd_mm);
        if jump {
            return None;
        }

        let (time_start, dist_start_mm) = samples[0];
        let (time_end, dist_end_mm) = samples[samples.len() - 1];
        let dist_avg_mm =
            samples.iter().map(|&(_, d)| d as f64).sum::<f64>() / samples.len() as f64;
        let direction = Direction::from_step(dist_start_mm, dist_end_mm);
        let velocity_kmh = average_velocity_kmh(&samples, dist_to_path_mm);

        Some(MonotonicSeries {
            samples,
            time_start,
            time_end,
            dist_start_mm,
            dist_end_mm,
            dist_avg_mm,
            direction,
            velocity_kmh,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[(i64, i32)] {
        &self.samples
    }
}

/// Per-pair slant-corrected velocity, averaged over the run.
///
/// Given slant distances d1 at t1 and d2 at t2 and the perpendicular
/// sensor-to-path distance L, the along-path speed is
///   v = (d2 / sqrt(d2^2 - L^2)) * ((d2 - d1) / (t2 - t1)) * 3.6  [km/h]
/// with d in mm and t in ms. Pairs with a zero time delta or with
/// d2^2 <= L^2 (reading inconsistent with the path geometry) are
/// skipped rather than propagated.
fn average_velocity_kmh(samples: &[(i64, i32)], dist_to_path_mm: f64) -> f64 {
    let mut velocities = Vec::with_capacity(samples.len().saturating_sub(1));

    for pair in samples.windows(2) {
        let (t1, d1) = pair[0];
        let (t2, d2) = pair[1];

        let dt = (t2 - t1) as f64;
        let d2_mm = d2 as f64;
        let slant_sq = d2_mm * d2_mm - dist_to_path_mm * dist_to_path_mm;

        if dt == 0.0 || slant_sq <= 0.0 {
            debug!(
                t2,
                d2, "skipping degenerate velocity pair (zero dt or imaginary root)"
            );
            continue;
        }

        let dd = (d2 - d1) as f64;
        velocities.push(d2_mm / slant_sq.sqrt() * (dd / dt) * 3.6);
    }

    if velocities.is_empty() {
        return 0.0;
    }
    (velocities.iter().sum::<f64>() / velocities.len() as f64).abs()
}
