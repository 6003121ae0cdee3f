// src/detection/motion.rs
//
// A motion is one object's traversal of the field of view: one or more
// time-adjacent monotonic series that, after dropping minority-direction
// outliers, share a single direction.

use super::series::MonotonicSeries;
use crate::types::Direction;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Motion {
    series: Vec<MonotonicSeries>,
    pub num_series: usize,
    pub num_samples_total: usize,
    pub time_start: i64,
    pub time_end: i64,
    pub time_total_ms: i64,
    pub dist_start_mm: i32,
    pub dist_end_mm: i32,
    pub dist_avg_mm: f64,
    pub direction: Direction,
    /// Unsigned mean of the member series velocities, km/h.
    pub velocity_kmh: f64,
}

impl Motion {
    /// Merge pending series into one motion. Member series whose
    /// direction differs from the longest series are dropped; a time
    /// gap above `max_series_time_delta_ms` between incoming neighbors
    /// is an anomaly worth logging, not a failure. Returns `None` only
    /// for an empty input.
    pub fn from_series(
        series: Vec<MonotonicSeries>,
        max_series_time_delta_ms: i64,
    ) -> Option<Motion> {
        // Adjacency is validated on the full input; a gap opened by
        // dropping an outlier below is not re-reported.
        for pair in series.windows(2) {
            let gap = (pair[1].time_start - pair[0].time_end).abs();
            if gap > max_series_time_delta_ms {
                warn!(
                    gap_ms = gap,
                    "motion contains series further apart than the merge threshold"
                );
            }
        }

        let dominant = dominant_direction(&series)?;
        let series: Vec<MonotonicSeries> = series
            .into_iter()
            .filter(|s| s.direction == dominant)
            .collect();

        let first = series.first()?;
        let last = series.last()?;
        let time_start = first.time_start;
        let time_end = last.time_end;
        let dist_start_mm = first.dist_start_mm;
        let dist_end_mm = last.dist_end_mm;
        let dist_avg_mm =
            series.iter().map(|s| s.dist_avg_mm).sum::<f64>() / series.len() as f64;
        let velocity_kmh =
            series.iter().map(|s| s.velocity_kmh).sum::<f64>() / series.len() as f64;

        Some(Motion {
            num_series: series.len(),
            num_samples_total: series.iter().map(|s| s.len()).sum(),
            time_start,
            time_end,
            time_total_ms: time_end - time_start,
            dist_start_mm,
            dist_end_mm,
            dist_avg_mm,
            direction: dominant,
            velocity_kmh,
            series,
        })
    }

    /// Speed with the traversal sign: positive approaching, negative
    /// departing.
    pub fn signed_velocity_kmh(&self) -> f64 {
        match self.direction {
            Direction::Approaching => self.velocity_kmh,
            Direction::Departing => -self.velocity_kmh,
        }
    }

    pub fn series(&self) -> &[MonotonicSeries] {
        &self.series
    }
}

/// Direction of the longest member series. Ties keep the first-found
/// maximum so the result does not depend on iteration quirks.
fn dominant_direction(series: &[MonotonicSeries]) -> Option<Direction> {
    let mut longest: Option<&MonotonicSeries> = None;
    for s in series {
        match longest {
            Some(best) if s.len() <= best.len() => {}
            _ => longest = Some(s),
        }
    }
    longest.map(|s| s.direction)
}

#[cfg(test)]
mod tests {
    use super::*;

    const L: f64 = 1500.0;

    fn series(t0: i64, distances: &[i32]) -> MonotonicSeries {
        let samples: Vec<(i64, i32)> = distances
            .iter()
            .enumerate()
            .map(|(i, &d)| (t0 + i as i64 * 100, d))
            .collect();
        MonotonicSeries::build(samples, 1, 1000, L).unwrap()
    }

    #[test]
    fn test_empty_input_yields_no_motion() {
        assert!(Motion::from_series(Vec::new(), 200).is_none());
    }

    #[test]
    fn test_outlier_direction_series_are_dropped() {
        let motion = Motion::from_series(
            vec![
                series(0, &[2600, 2400, 2200]),      // approaching, len 3
                series(400, &[2200, 2300]),          // departing, len 2 (outlier)
                series(700, &[2100, 1900, 1700, 1500]), // approaching, len 4
            ],
            400,
        )
        .unwrap();

        assert_eq!(motion.direction, Direction::Approaching);
        assert_eq!(motion.num_series, 2);
        assert!(motion
            .series()
            .iter()
            .all(|s| s.direction == motion.direction));
        assert_eq!(motion.num_samples_total, 7);
        assert_eq!(motion.time_start, 0);
        assert_eq!(motion.time_end, 1000);
        assert_eq!(motion.dist_start_mm, 2600);
        assert_eq!(motion.dist_end_mm, 1500);
    }

    #[test]
    fn test_outlier_between_adjacent_series_merges_cleanly() {
        // The dropped outlier sits between two approaching series; the
        // gap it leaves behind does not disturb the merged aggregates.
        let motion = Motion::from_series(
            vec![
                series(0, &[2600, 2400, 2200]),
                series(300, &[2200, 2300]), // departing outlier
                series(600, &[2100, 1900]),
            ],
            400,
        )
        .unwrap();

        assert_eq!(motion.num_series, 2);
        assert_eq!(motion.direction, Direction::Approaching);
        assert_eq!(motion.time_start, 0);
        assert_eq!(motion.time_end, 700);
        assert_eq!(motion.num_samples_total, 5);
    }

    #[test]
    fn test_tied_longest_series_keeps_first_found() {
        let motion = Motion::from_series(
            vec![
                series(0, &[2000, 2200, 2400]),   // departing, len 3
                series(400, &[2400, 2200, 2000]), // approaching, len 3
            ],
            400,
        )
        .unwrap();
        assert_eq!(motion.direction, Direction::Departing);
        assert_eq!(motion.num_series, 1);
    }

    #[test]
    fn test_velocity_is_mean_of_member_series() {
        let a = series(0, &[2600, 2400, 2200]);
        let b = series(400, &[2100, 1900, 1700]);
        let expected = (a.velocity_kmh + b.velocity_kmh) / 2.0;
        let motion = Motion::from_series(vec![a, b], 400).unwrap();
        assert!((motion.velocity_kmh - expected).abs() < 1e-9);
        assert!(motion.signed_velocity_kmh() > 0.0);
    }

    #[test]
    fn test_departing_motion_has_negative_signed_velocity() {
        let motion = Motion::from_series(vec![series(0, &[2000, 2200, 2400])], 400).unwrap();
        assert_eq!(motion.direction, Direction::Departing);
        assert!(motion.signed_velocity_kmh() < 0.0);
    }
}
