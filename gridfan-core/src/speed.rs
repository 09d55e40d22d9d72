//! Speed normalization and voltage conversions
//!
//! The Grid+ v2 drives fans by voltage, 4.0-12.0 V in half-volt steps. The
//! public API speaks percent; these functions enforce the controller's value
//! domain (multiples of 5 in 20-100) and translate between the two scales.

use crate::board::{BoardConfig, DefaultBoard};

const MIN_PERCENT: u8 = DefaultBoard::MIN_SPEED_PERCENT;
const MAX_PERCENT: u8 = DefaultBoard::MAX_SPEED_PERCENT;
const STEP: u8 = DefaultBoard::SPEED_STEP;

/// Base voltage at the minimum speed, in whole volts
const BASE_VOLTS: u8 = 4;

/// Normalize a requested speed to a value the controller accepts
///
/// Pure and total: out-of-domain input is corrected, never rejected, so
/// upstream automation can pass arbitrary computed values safely.
///
/// - Values below 20 are raised to 20 (the controller rejects finer-grained
///   low speeds), values above 100 are lowered to 100.
/// - The result is rounded down to the nearest multiple of 5.
///
/// Idempotent: `normalize_speed(normalize_speed(p)) == normalize_speed(p)`.
pub fn normalize_speed(requested: i32) -> u8 {
    let clamped = requested.clamp(MIN_PERCENT as i32, MAX_PERCENT as i32) as u8;
    clamped - clamped % STEP
}

/// Convert a normalized percent into the controller's two-byte voltage encoding
///
/// 20% is 4.0 V and each 5% step adds 0.5 V. The high byte is whole volts in
/// binary; the low byte is `0x00` for a whole volt or `0x50` for a half.
///
/// Callers must pass a value produced by [`normalize_speed`].
pub fn speed_to_voltage_bytes(percent: u8) -> (u8, u8) {
    let steps = (percent - MIN_PERCENT) / STEP;
    let volts = BASE_VOLTS + steps / 2;
    let half = if steps % 2 == 1 { 0x50 } else { 0x00 };
    (volts, half)
}

/// Convert an applied voltage reading (in centivolts) to a percentage
///
/// The controller reports values slightly outside its nominal 4-12 V range;
/// those are pinned to the domain edges. A reading of exactly zero means the
/// channel is off.
pub fn voltage_to_percent(centivolts: u32) -> u8 {
    if centivolts == 0 {
        0
    } else if centivolts <= 400 {
        MIN_PERCENT
    } else if centivolts >= 1200 {
        MAX_PERCENT
    } else {
        // Linear over 4.00-12.00 V onto 20-100%, rounding to nearest
        let above_base = centivolts - 400;
        MIN_PERCENT + ((above_base + 5) / 10) as u8
    }
}

/// Decode one of the controller's packed-BCD telemetry bytes
///
/// Returns `None` when either nibble exceeds 9.
pub fn bcd_byte(byte: u8) -> Option<u32> {
    let high = (byte >> 4) as u32;
    let low = (byte & 0x0F) as u32;
    if high > 9 || low > 9 {
        return None;
    }
    Some(high * 10 + low)
}
