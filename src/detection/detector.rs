// src/detection/detector.rs
//
// Online segmentation of the selected-zone distance stream.
//
// The detector keeps one open run of consecutive non-sentinel samples.
// A sentinel, a direction reversal, or an oversized distance jump
// closes the run; runs that survive the length/jump checks become
// monotonic series. Series separated by more than the merge threshold
// are flushed into a Motion, which stays "current" for a short validity
// window and is published when fast enough to classify.

use super::motion::Motion;
use super::series::MonotonicSeries;
use crate::events::{DetectorEvent, EventBus};
use crate::types::{DetectionConfig, Direction, SENTINEL_DISTANCE_MM};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

pub struct MotionDetector {
    config: DetectionConfig,
    dist_to_path_mm: f64,

    current_run: Vec<(i64, i32)>,
    run_direction: Option<Direction>,
    pending_series: Vec<MonotonicSeries>,

    // Written only here; read by the presentation thread as a snapshot.
    current_motion: Mutex<Option<Motion>>,
    events: Arc<Mutex<EventBus>>,
}

impl MotionDetector {
    pub fn new(config: DetectionConfig, dist_to_path_mm: f64, events: Arc<Mutex<EventBus>>) -> Self {
        Self {
            config,
            dist_to_path_mm,
            current_run: Vec::new(),
            run_direction: None,
            pending_series: Vec::new(),
            current_motion: Mutex::new(None),
            events,
        }
    }

    /// Feed one selected-zone sample in arrival order.
    pub fn append(&mut self, timestamp_ms: i64, distance_mm: i32) {
        self.expire_current_motion(timestamp_ms);

        // A pending motion is complete once enough time passed since its
        // last series without a new run opening. Sentinel samples advance
        // the clock too.
        if self.current_run.is_empty() {
            if let Some(last) = self.pending_series.last() {
                if timestamp_ms - last.time_end > self.config.max_series_time_delta_ms {
                    self.flush_pending_series();
                }
            }
        }

        if distance_mm == SENTINEL_DISTANCE_MM {
            self.close_run();
            return;
        }

        if self.current_run.is_empty() {
            self.current_run.push((timestamp_ms, distance_mm));
            return;
        }

        let last_distance = self.current_run[self.current_run.len() - 1].1;
        let jump = self.current_run.len() >= 2
            && (distance_mm - last_distance).abs() >= self.config.max_dd_mm;
        if jump {
            self.close_run();
            self.current_run.push((timestamp_ms, distance_mm));
            return;
        }

        // A plateau keeps the run and its direction; the run direction
        // is set by the first non-zero distance step.
        if distance_mm == last_distance {
            self.current_run.push((timestamp_ms, distance_mm));
            return;
        }

        let step = Direction::from_step(last_distance, distance_mm);
        match self.run_direction {
            None => {
                self.run_direction = Some(step);
                self.current_run.push((timestamp_ms, distance_mm));
            }
            Some(direction) if direction == step => {
                self.current_run.push((timestamp_ms, distance_mm));
            }
            Some(_) => {
                self.close_run();
                self.current_run.push((timestamp_ms, distance_mm));
            }
        }
    }

    /// Batch re-entry after a replay cursor change: reset everything and
    /// stream the window as if it had arrived live.
    pub fn update_data(&mut self, window: &[(i64, i32)]) {
        self.reset();
        for &(timestamp_ms, distance_mm) in window {
            self.append(timestamp_ms, distance_mm);
        }
    }

    pub fn reset(&mut self) {
        self.current_run.clear();
        self.run_direction = None;
        self.pending_series.clear();
        *self.lock_motion() = None;
    }

    /// Snapshot of the motion currently in its validity window.
    pub fn current_motion(&self) -> Option<Motion> {
        self.lock_motion().clone()
    }

    /// Series closed but not yet merged into a motion.
    pub fn pending_series(&self) -> &[MonotonicSeries] {
        &self.pending_series
    }

    /// Close the open run; keep it as a series when it qualifies. The
    /// run and its direction are discarded either way.
    fn close_run(&mut self) {
        if self.current_run.is_empty() {
            return;
        }

        let run = std::mem::take(&mut self.current_run);
        self.run_direction = None;

        if let Some(series) = MonotonicSeries::build(
            run,
            self.config.min_samples,
            self.config.max_dd_mm,
            self.dist_to_path_mm,
        ) {
            self.pending_series.push(series);
        }
    }

    fn flush_pending_series(&mut self) {
        let pending = std::mem::take(&mut self.pending_series);
        let Some(motion) = Motion::from_series(pending, self.config.max_series_time_delta_ms)
        else {
            return;
        };

        if motion.velocity_kmh >= self.config.bicycle_velocity_threshold_kmh {
            info!(
                velocity_kmh = motion.velocity_kmh,
                direction = ?motion.direction,
                "motion classified"
            );
            self.lock_events().publish(DetectorEvent::MotionClassified {
                direction: motion.direction,
                velocity_kmh: motion.signed_velocity_kmh(),
                time_start: motion.time_start,
                time_end: motion.time_end,
            });
        }

        *self.lock_motion() = Some(motion);
    }

    /// Drop the current motion once its validity window has passed, or
    /// when time moved backwards (replay jumped before it).
    fn expire_current_motion(&self, timestamp_ms: i64) {
        let mut current = self.lock_motion();
        if let Some(motion) = current.as_ref() {
            let age = timestamp_ms - motion.time_end;
            if age > self.config.motion_validity_ms || age < 0 {
                debug!(age_ms = age, "current motion expired");
                *current = None;
            }
        }
    }

    fn lock_motion(&self) -> std::sync::MutexGuard<'_, Option<Motion>> {
        match self.current_motion.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_events(&self) -> std::sync::MutexGuard<'_, EventBus> {
        match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
