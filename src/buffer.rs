// src/buffer.rs
//
// Fixed-capacity circular sample store with dual-cursor live/replay
// semantics. A single producer appends decoded samples; the operator
// side moves a read cursor that is either pinned to the newest data
// (live mode) or to a historical logical index (replay mode).
//
// Logical indices count samples ever appended and never wrap; only the
// most recent `capacity` of them remain retrievable. Physical slot for
// logical index i is `i % capacity`.

use crate::types::Sample;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Read cursor position. `Live` tracks the write head automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Live,
    At(i64),
}

/// Result of a windowed read: the visible slice, oldest first, and
/// whether the buffer is currently in live mode.
#[derive(Debug, Clone)]
pub struct Window {
    pub samples: Vec<Sample>,
    pub live: bool,
}

struct Inner {
    slots: Vec<Option<Sample>>,
    /// Logical index of the newest sample, -1 while empty.
    write_index: i64,
    cursor: Cursor,
}

pub struct SampleBuffer {
    inner: Mutex<Inner>,
    capacity: i64,
    span: i64,
}

impl SampleBuffer {
    /// `capacity` is the total sample store, `span` the number of
    /// samples returned per windowed read.
    pub fn new(capacity: usize, span: usize) -> Self {
        assert!(capacity > 0 && span > 0);
        Self {
            inner: Mutex::new(Inner {
                slots: vec![None; capacity],
                write_index: -1,
                cursor: Cursor::Live,
            }),
            capacity: capacity as i64,
            span: span as i64,
        }
    }

    /// Append one sample, evicting the oldest retrievable sample once
    /// the buffer is full. Overwriting is policy, not an error.
    pub fn append(&self, sample: Sample) {
        let mut inner = self.lock();
        inner.write_index += 1;
        let slot = (inner.write_index % self.capacity) as usize;
        inner.slots[slot] = Some(sample);
    }

    /// Move the cursor to `percent` of the currently retrievable range:
    /// 0 lands on the oldest sample, 100 on the newest.
    pub fn seek(&self, percent: u8) {
        if percent > 100 {
            warn!("seek ignored: percent {} out of range", percent);
            return;
        }

        let mut inner = self.lock();
        if inner.write_index < 0 {
            debug!("seek ignored: buffer is empty");
            return;
        }

        let oldest = self.oldest(&inner);
        let newest = inner.write_index;
        let length = newest - oldest + 1;
        let target = (oldest + percent as i64 * length / 100).min(newest);
        inner.cursor = Cursor::At(target);
    }

    /// Step one sample back. Leaving live mode lands one position
    /// behind the write head; in replay mode the cursor clamps at the
    /// oldest retrievable sample.
    pub fn rewind(&self) {
        let mut inner = self.lock();
        if inner.write_index < 0 {
            debug!("rewind ignored: buffer is empty");
            return;
        }

        let oldest = self.oldest(&inner);
        inner.cursor = match inner.cursor {
            Cursor::Live => Cursor::At((inner.write_index - 1).max(oldest)),
            Cursor::At(idx) => Cursor::At((idx - 1).max(oldest)),
        };
    }

    /// Step one sample forward. Stepping past the newest sample
    /// switches back to live mode; the cursor never wraps around to
    /// the oldest data. In live mode this is a no-op.
    pub fn fast_forward(&self) {
        let mut inner = self.lock();
        if inner.write_index < 0 {
            debug!("fast_forward ignored: buffer is empty");
            return;
        }

        if let Cursor::At(idx) = inner.cursor {
            inner.cursor = if idx >= inner.write_index {
                Cursor::Live
            } else {
                Cursor::At(idx + 1)
            };
        }
    }

    /// Return to live mode.
    pub fn reset(&self) {
        self.lock().cursor = Cursor::Live;
    }

    pub fn is_live(&self) -> bool {
        self.lock().cursor == Cursor::Live
    }

    /// Jump the cursor to the adjacent motion segment. `has_motion`
    /// decides per sample whether an object is present (selected zone
    /// distance is not the sentinel).
    ///
    /// Scans in `direction` (+1 forward, -1 backward): first past the
    /// segment containing the cursor, then across the gap to the next
    /// segment. Scanning forward additionally runs to the end of that
    /// segment, so forward jumps land on segment ends while backward
    /// jumps land on the boundary first encountered.
    pub fn skip_to_next_motion<F>(&self, direction: i64, has_motion: F)
    where
        F: Fn(&Sample) -> bool,
    {
        if direction != 1 && direction != -1 {
            warn!("skip_to_next_motion ignored: direction {} invalid", direction);
            return;
        }

        let mut inner = self.lock();
        if inner.write_index < 0 {
            debug!("skip_to_next_motion ignored: buffer is empty");
            return;
        }

        let idx = match inner.cursor {
            Cursor::Live => {
                debug!("skip_to_next_motion ignored: buffer is live");
                return;
            }
            Cursor::At(idx) => idx,
        };

        let oldest = self.oldest(&inner);
        let newest = inner.write_index;
        let in_range = |i: i64| i >= oldest && i <= newest;
        let motion_at = |inner: &Inner, i: i64| {
            inner.slots[(i % self.capacity) as usize]
                .as_ref()
                .map(&has_motion)
                .unwrap_or(false)
        };

        // Leave the segment the cursor is currently inside.
        let mut i = idx;
        while in_range(i) && motion_at(&inner, i) {
            i += direction;
        }

        // Cross the gap to the next segment.
        while in_range(i) && !motion_at(&inner, i) {
            i += direction;
        }

        if !in_range(i) {
            // No further segment; park at the scanned edge.
            inner.cursor = Cursor::At(i.clamp(oldest, newest));
            debug!("skip_to_next_motion: no segment found, cursor at edge");
            return;
        }

        // Forward jumps land on the end of the segment.
        if direction == 1 {
            while i < newest && motion_at(&inner, i + 1) {
                i += 1;
            }
        }

        inner.cursor = Cursor::At(i);
    }

    /// The last `span` samples ending at the cursor (or at the write
    /// head in live mode), oldest first. Empty until data arrives.
    pub fn read_window(&self) -> Window {
        let inner = self.lock();
        let live = inner.cursor == Cursor::Live;

        if inner.write_index < 0 {
            return Window {
                samples: Vec::new(),
                live,
            };
        }

        let end = match inner.cursor {
            Cursor::Live => inner.write_index,
            // A pinned cursor can be evicted by ongoing appends; reads
            // clamp to the oldest retrievable sample.
            Cursor::At(idx) => idx.clamp(self.oldest(&inner), inner.write_index),
        };
        let start = (end - self.span + 1).max(self.oldest(&inner));

        let mut samples = Vec::with_capacity((end - start + 1) as usize);
        let lo = (start % self.capacity) as usize;
        let hi = (end % self.capacity) as usize;
        if lo <= hi {
            samples.extend(inner.slots[lo..=hi].iter().flatten().copied());
        } else {
            // Physical range wraps past slot 0: two contiguous segments.
            samples.extend(inner.slots[lo..].iter().flatten().copied());
            samples.extend(inner.slots[..=hi].iter().flatten().copied());
        }

        Window { samples, live }
    }

    fn oldest(&self, inner: &Inner) -> i64 {
        (inner.write_index - self.capacity + 1).max(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
