// src/collector/csv.rs
//
// Worker for recorded data: one CSV line per sample. Malformed lines
// are skipped with a running count; optionally the replay is paced to
// the recorded inter-sample timing so the pipeline behaves as it would
// against the live sensor.

use super::decoder;
use super::{Gate, SampleSender};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub struct CsvCollector {
    path: String,
    /// Sleep between samples to reproduce the recorded timing.
    live_mode: bool,
    /// Records older than this timestamp are skipped.
    start_time_ms: i64,
}

impl CsvCollector {
    pub fn new(path: impl Into<String>, live_mode: bool, start_time_ms: i64) -> Self {
        Self {
            path: path.into(),
            live_mode,
            start_time_ms,
        }
    }

    pub fn spawn(self, gate: Arc<Gate>, sink: SampleSender) -> Result<JoinHandle<Result<()>>> {
        let handle = thread::Builder::new()
            .name("csv-collector".to_string())
            .spawn(move || self.run(&gate, &sink))
            .context("spawning csv collector thread")?;
        Ok(handle)
    }

    fn run(&self, gate: &Gate, sink: &SampleSender) -> Result<()> {
        let file =
            File::open(&self.path).with_context(|| format!("opening CSV file {}", self.path))?;
        info!(path = %self.path, "opened CSV file");

        let reader = BufReader::new(file);
        let mut pacer = Pacer::new();
        let mut skipped_lines: u64 = 0;

        for line in reader.lines() {
            gate.wait_until_open();

            let line = line.context("reading CSV line")?;
            if line.trim().is_empty() {
                continue;
            }

            let sample = match decoder::parse_csv_line(&line) {
                Ok(sample) => sample,
                Err(e) => {
                    skipped_lines += 1;
                    warn!("skipping malformed CSV line: {e}");
                    continue;
                }
            };

            if sample.timestamp_ms < self.start_time_ms {
                continue;
            }

            if self.live_mode {
                pacer.pace(sample.timestamp_ms);
            }

            if sink.send(sample).is_err() {
                info!("sample channel closed, stopping csv collector");
                return Ok(());
            }
        }

        info!(skipped_lines, "reached end of CSV file");
        Ok(())
    }
}

/// Reproduces recorded inter-sample delays during replay.
struct Pacer {
    last_timestamp_ms: Option<i64>,
    last_dispatch: Option<Instant>,
}

impl Pacer {
    fn new() -> Self {
        Self {
            last_timestamp_ms: None,
            last_dispatch: None,
        }
    }

    fn pace(&mut self, timestamp_ms: i64) {
        if let (Some(last_ts), Some(last_at)) = (self.last_timestamp_ms, self.last_dispatch) {
            let recorded_gap = Duration::from_millis((timestamp_ms - last_ts).max(0) as u64);
            let elapsed = last_at.elapsed();
            if recorded_gap > elapsed {
                thread::sleep(recorded_gap - elapsed);
            } else {
                warn!("data is being processed too slowly to keep recorded pace");
            }
        }

        self.last_timestamp_ms = Some(timestamp_ms);
        self.last_dispatch = Some(Instant::now());
    }
}
