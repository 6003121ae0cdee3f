// src/detection/zone_policy.rs
//
// Per-zone selection of one representative distance out of the two
// target readings. The strategy set is small and fixed, so this is a
// closed enum dispatched by match rather than a trait hierarchy.

use crate::types::{Sample, ZoneReading, SENTINEL_DISTANCE_MM};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZonePolicy {
    /// Always the first target.
    #[default]
    TargetZero,
    /// The target with the higher confidence; ties go to target zero.
    Confidence,
    /// Mean of both targets; with one sentinel, the other target.
    Average,
}

impl ZonePolicy {
    pub fn from_name(name: &str) -> Option<ZonePolicy> {
        match name {
            "target_0" => Some(ZonePolicy::TargetZero),
            "confidence" => Some(ZonePolicy::Confidence),
            "average" => Some(ZonePolicy::Average),
            _ => None,
        }
    }

    /// Representative distance for one zone reading.
    pub fn select(&self, zone: &ZoneReading) -> i32 {
        match self {
            ZonePolicy::TargetZero => zone.distance0_mm,
            ZonePolicy::Confidence => {
                if zone.confidence0 >= zone.confidence1 {
                    zone.distance0_mm
                } else {
                    zone.distance1_mm
                }
            }
            ZonePolicy::Average => match (
                zone.distance0_mm == SENTINEL_DISTANCE_MM,
                zone.distance1_mm == SENTINEL_DISTANCE_MM,
            ) {
                (false, false) => (zone.distance0_mm + zone.distance1_mm) / 2,
                (false, true) => zone.distance0_mm,
                (true, false) => zone.distance1_mm,
                (true, true) => SENTINEL_DISTANCE_MM,
            },
        }
    }

    /// Distance of the configured detection zone.
    pub fn select_zone(&self, sample: &Sample, zone_idx: usize) -> i32 {
        self.select(&sample.zones[zone_idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(confidence0: i32, distance0_mm: i32, confidence1: i32, distance1_mm: i32) -> ZoneReading {
        ZoneReading {
            confidence0,
            distance0_mm,
            confidence1,
            distance1_mm,
        }
    }

    #[test]
    fn test_target_zero_ignores_confidence() {
        assert_eq!(ZonePolicy::TargetZero.select(&zone(10, 2000, 250, 1500)), 2000);
    }

    #[test]
    fn test_confidence_picks_stronger_target() {
        assert_eq!(ZonePolicy::Confidence.select(&zone(10, 2000, 250, 1500)), 1500);
        assert_eq!(ZonePolicy::Confidence.select(&zone(250, 2000, 10, 1500)), 2000);
        // Tie goes to target zero
        assert_eq!(ZonePolicy::Confidence.select(&zone(100, 2000, 100, 1500)), 2000);
    }

    #[test]
    fn test_average_of_two_valid_targets() {
        assert_eq!(ZonePolicy::Average.select(&zone(100, 2000, 100, 1500)), 1750);
    }

    #[test]
    fn test_average_with_one_sentinel_returns_the_other() {
        assert_eq!(ZonePolicy::Average.select(&zone(100, -1, 100, 1500)), 1500);
        assert_eq!(ZonePolicy::Average.select(&zone(100, 2000, 100, -1)), 2000);
    }

    #[test]
    fn test_average_with_both_sentinel_stays_sentinel() {
        assert_eq!(ZonePolicy::Average.select(&zone(0, -1, 0, -1)), -1);
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(ZonePolicy::from_name("confidence"), Some(ZonePolicy::Confidence));
        assert_eq!(ZonePolicy::from_name("target_0"), Some(ZonePolicy::TargetZero));
        assert_eq!(ZonePolicy::from_name("average"), Some(ZonePolicy::Average));
        assert_eq!(ZonePolicy::from_name("bogus"), None);
    }
}
