// src/collector/mod.rs
//
// Ingestion workers. One dedicated thread per active source blocks on
// its transport, decodes samples, and pushes them into a bounded
// channel toward the core. A shared gate lets the operator pause
// consumption without dropping the connection.

pub mod decoder;

mod csv;
mod tcp;

pub use csv::CsvCollector;
pub use tcp::TcpCollector;

use crate::types::Sample;
use std::sync::mpsc::SyncSender;
use std::sync::{Condvar, Mutex};

/// Bounded producer side of the sample stream.
pub type SampleSender = SyncSender<Sample>;

/// Start/stop gate for ingestion workers. Workers wait on the gate
/// before decoding each message; closing it pauses them at the next
/// message boundary, opening it resumes them immediately.
pub struct Gate {
    open: Mutex<bool>,
    signal: Condvar,
}

impl Gate {
    pub fn new(open: bool) -> Self {
        Self {
            open: Mutex::new(open),
            signal: Condvar::new(),
        }
    }

    pub fn open(&self) {
        *self.lock() = true;
        self.signal.notify_all();
    }

    pub fn close(&self) {
        *self.lock() = false;
    }

    pub fn is_open(&self) -> bool {
        *self.lock()
    }

    /// Block until the gate is open. State changes made before this
    /// call are visible to the check (mutex ordering).
    pub fn wait_until_open(&self) {
        let mut open = self.lock();
        while !*open {
            open = match self.signal.wait(open) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, bool> {
        match self.open.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
