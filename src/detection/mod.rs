// src/detection/mod.rs
//
// Online motion detection over a single-zone distance stream.
//
// Signal flow:
//   Sample stream → zone_policy (one distance per sample)
//                 → detector (monotonic run segmentation)
//                 → series (velocity per run)
//                 → motion (merged runs, classified events)

mod detector;
mod motion;
mod series;
mod zone_policy;

pub use detector::MotionDetector;
pub use motion::Motion;
pub use series::MonotonicSeries;
pub use zone_policy::ZonePolicy;
