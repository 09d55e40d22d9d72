//! Core data types for the gridfan driver

use serde::{Deserialize, Serialize};

/// Point-in-time telemetry for one fan channel
///
/// Derived from two consecutive reads, recomputed on every poll and never
/// cached by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanTelemetry {
    /// Tachometer reading in revolutions per minute
    pub rpm: u32,
    /// Power draw in tenths of a watt
    pub wattage_deciwatts: u32,
}

impl FanTelemetry {
    /// Whether a fan appears to be connected on this channel
    ///
    /// A channel with both readings at exactly zero is treated as empty; any
    /// nonzero reading on either means something is drawing power or spinning.
    pub fn is_connected(&self) -> bool {
        self.rpm != 0 || self.wattage_deciwatts != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_truth_table() {
        let cases = [
            (0, 0, false),
            (1200, 0, true),
            (0, 25, true),
            (1200, 25, true),
        ];
        for (rpm, wattage_deciwatts, expected) in cases {
            let t = FanTelemetry {
                rpm,
                wattage_deciwatts,
            };
            assert_eq!(
                t.is_connected(),
                expected,
                "rpm={} wattage={}",
                rpm,
                wattage_deciwatts
            );
        }
    }

    #[test]
    fn test_telemetry_serialization() {
        let t = FanTelemetry {
            rpm: 1450,
            wattage_deciwatts: 32,
        };
        let serialized = toml::to_string(&t).unwrap();
        assert!(serialized.contains("rpm = 1450"));

        let parsed: FanTelemetry = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed, t);
    }
}
