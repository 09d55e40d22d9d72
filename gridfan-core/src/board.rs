//! Board definitions for supported fan controllers
//!
//! The `BoardConfig` trait captures a controller's fixed characteristics as
//! associated constants, resolved at compile time. The Grid+ v2 is the only
//! board currently supported; its firmware parameters (baud rate, channel
//! count, speed domain) are fixed and not user-configurable.

/// Hardware board configuration trait
///
/// # Example
///
/// ```
/// use gridfan_core::board::{BoardConfig, GridPlusV2};
///
/// const CHANNELS: u8 = GridPlusV2::FAN_COUNT;
/// const NAME: &str = GridPlusV2::NAME;
/// ```
pub trait BoardConfig: Send + Sync + 'static {
    /// Human-readable board name
    const NAME: &'static str;

    /// Number of fan channels, addressed 1-based (`1..=FAN_COUNT`)
    const FAN_COUNT: u8;

    /// Serial communication baud rate
    const BAUD_RATE: u32;

    /// Read timeout in milliseconds
    const READ_TIMEOUT_MS: u64;

    /// Write timeout in milliseconds
    const WRITE_TIMEOUT_MS: u64;

    /// Lowest speed the controller accepts, in percent
    const MIN_SPEED_PERCENT: u8;

    /// Highest speed the controller accepts, in percent
    const MAX_SPEED_PERCENT: u8;

    /// Speed granularity in percent (one half-volt step)
    const SPEED_STEP: u8;

    /// Well-known udev symlink name for the device
    const DEVICE_NAME: &'static str;
}

/// NZXT Grid+ v2 board configuration
///
/// - 6 fan channels, addressed 1-6
/// - 4800 baud serial communication
/// - Voltage-controlled: 4.0-12.0 V in 0.5 V steps, which maps to
///   20-100% in 5% steps
#[derive(Debug)]
pub struct GridPlusV2;

impl BoardConfig for GridPlusV2 {
    const NAME: &'static str = "NZXT Grid+ v2";
    const FAN_COUNT: u8 = 6;
    const BAUD_RATE: u32 = 4800;
    const READ_TIMEOUT_MS: u64 = 2000;
    const WRITE_TIMEOUT_MS: u64 = 4000;
    const MIN_SPEED_PERCENT: u8 = 20;
    const MAX_SPEED_PERCENT: u8 = 100;
    const SPEED_STEP: u8 = 5;
    const DEVICE_NAME: &'static str = "GridPlus0";
}

/// Default board used when no type parameter is given
pub type DefaultBoard = GridPlusV2;
