//! gridfan-core
//!
//! Shared types, board constants, and configuration for the NZXT Grid+ v2
//! fan controller driver. This crate performs no I/O; the serial transport
//! and the protocol driver live in `gridfan-hardware`.

pub mod board;
pub mod config;
pub mod error;
pub mod speed;
pub mod types;

// Re-export commonly used types
pub use board::{BoardConfig, DefaultBoard, GridPlusV2};
pub use config::{default_config_path, DriverConfig};
pub use error::*;
pub use speed::{normalize_speed, speed_to_voltage_bytes, voltage_to_percent};
pub use types::FanTelemetry;
