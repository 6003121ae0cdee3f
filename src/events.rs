// src/events.rs
//
// Decoupled event queue. The detector publishes classified motions
// here instead of reaching into consumer state; the presentation side
// drains at its own pace.

use crate::types::Direction;
use std::collections::VecDeque;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub enum DetectorEvent {
    /// A completed motion met the classification velocity threshold.
    MotionClassified {
        direction: Direction,
        velocity_kmh: f64,
        time_start: i64,
        time_end: i64,
    },
}

pub struct EventBus {
    events: VecDeque<DetectorEvent>,
    max_pending: usize,
}

impl EventBus {
    pub fn new(max_pending: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_pending),
            max_pending,
        }
    }

    pub fn publish(&mut self, event: DetectorEvent) {
        if self.events.len() >= self.max_pending {
            warn!(
                "Event bus full ({} events), dropping oldest",
                self.max_pending
            );
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<DetectorEvent> {
        self.events.drain(..).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.events.len()
    }
}
