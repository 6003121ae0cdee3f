// src/main.rs

mod buffer;
mod collector;
mod config;
mod controller;
mod detection;
mod events;
mod types;

use anyhow::{bail, Result};
use buffer::SampleBuffer;
use collector::{CsvCollector, Gate, TcpCollector};
use controller::Controller;
use detection::{MotionDetector, ZonePolicy};
use events::{DetectorEvent, EventBus};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Decoded samples waiting between the collector and the core. Small on
/// purpose: the collector should block, not buffer, when the core lags.
const SAMPLE_CHANNEL_BOUND: usize = 1024;

/// Detector events waiting for the presentation pass.
const EVENT_QUEUE_BOUND: usize = 64;

fn main() -> Result<()> {
    let config = types::Config::load("config.yaml")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .init();

    info!("ToF lane monitor starting");
    info!(
        "Detection thresholds: min_samples={}, max_dd={}mm, merge_gap={}ms, validity={}ms",
        config.detection.min_samples,
        config.detection.max_dd_mm,
        config.detection.max_series_time_delta_ms,
        config.detection.motion_validity_ms
    );

    if config.sensor.detection_zone >= types::NUM_ZONES {
        bail!(
            "detection_zone {} out of range (0..{})",
            config.sensor.detection_zone,
            types::NUM_ZONES
        );
    }
    let Some(policy) = ZonePolicy::from_name(&config.sensor.zone_policy) else {
        bail!("unknown zone_policy {:?}", config.sensor.zone_policy);
    };

    let gate = Arc::new(Gate::new(true));
    let events = Arc::new(Mutex::new(EventBus::new(EVENT_QUEUE_BOUND)));
    let buffer = Arc::new(SampleBuffer::new(config.buffer.capacity, config.buffer.span));
    let detector = MotionDetector::new(
        config.detection.clone(),
        config.sensor.dist_to_path_mm,
        Arc::clone(&events),
    );
    let controller = Arc::new(Controller::new(
        Arc::clone(&buffer),
        detector,
        Arc::clone(&gate),
        policy,
        config.sensor.detection_zone,
    ));

    let (tx, rx) = mpsc::sync_channel(SAMPLE_CHANNEL_BOUND);

    let worker = match config.source.kind.as_str() {
        "tcp" => {
            info!(
                "Source: live sensor at {}:{}",
                config.source.host, config.source.port
            );
            TcpCollector::new(config.source.host.clone(), config.source.port)
                .spawn(Arc::clone(&gate), tx)?
        }
        "csv" => {
            info!("Source: recorded data at {}", config.source.csv_path);
            CsvCollector::new(
                config.source.csv_path.clone(),
                config.source.csv_live_mode,
                config.source.csv_start_time_ms,
            )
            .spawn(Arc::clone(&gate), tx)?
        }
        other => bail!("unknown source kind {other:?} (expected \"tcp\" or \"csv\")"),
    };

    spawn_presentation(Arc::clone(&controller), Arc::clone(&events));

    // The core consumes samples on the main thread until the source is
    // exhausted or fails.
    for sample in rx {
        controller.handle_sample(sample);
    }

    match worker.join() {
        Ok(Ok(())) => info!("collector finished"),
        Ok(Err(e)) => warn!("collector stopped with error: {e:#}"),
        Err(_) => warn!("collector thread panicked"),
    }

    let window = controller.current_window();
    info!(samples = window.samples.len(), "final window");
    Ok(())
}

/// Periodic status pass: the stand-in for a display refresh. Logs the
/// visible window, the current motion, and any classified events.
fn spawn_presentation(controller: Arc<Controller>, events: Arc<Mutex<EventBus>>) {
    thread::spawn(move || loop {
        thread::sleep(Duration::from_secs(1));

        let drained = match events.lock() {
            Ok(mut bus) => bus.drain(),
            Err(poisoned) => poisoned.into_inner().drain(),
        };
        for event in drained {
            let DetectorEvent::MotionClassified {
                direction,
                velocity_kmh,
                time_start,
                time_end,
            } = event;
            info!(
                ?direction,
                velocity_kmh,
                time_start,
                time_end,
                "classified motion"
            );
        }

        let window = controller.current_window();
        let mode = if window.live { "live" } else { "replay" };
        match controller.current_motion() {
            Some(motion) => info!(
                mode,
                samples = window.samples.len(),
                direction = ?motion.direction,
                velocity_kmh = motion.velocity_kmh,
                "status"
            ),
            None => info!(mode, samples = window.samples.len(), "status"),
        }
    });
}
