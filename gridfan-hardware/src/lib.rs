//! gridfan-hardware
//!
//! Hardware abstraction crate for the NZXT Grid+ v2 fan controller. Contains
//! the frame codec, the low-level serial transport, and the stateful protocol
//! driver. This crate is the single point of contact between client code and
//! the physical device.
//
//! Public API:
//! - `fan_controller::GridFanController` — stateful protocol driver
//! - `serial_driver::SerialDriver` — low-level serial transport
//! - `protocol::{Command, Response}` — wire-level frame codec

pub mod fan_controller;
pub mod protocol;
pub mod serial_driver;

pub use fan_controller::{DriverState, GridFanController};
pub use protocol::{Command, Response};
pub use serial_driver::{FrameTransport, SerialDriver};
