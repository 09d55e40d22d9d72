//! Error types for the gridfan driver

use thiserror::Error;

/// Core error type for driver operations
///
/// The taxonomy distinguishes three caller-facing categories:
/// - fix your setup: [`DeviceNotFound`], [`PermissionDenied`], [`NotInitialized`]
/// - ask again later: [`Timeout`], [`DeviceError`]
/// - your input was invalid: [`InvalidChannel`]
///
/// [`DeviceNotFound`]: GridFanError::DeviceNotFound
/// [`PermissionDenied`]: GridFanError::PermissionDenied
/// [`NotInitialized`]: GridFanError::NotInitialized
/// [`Timeout`]: GridFanError::Timeout
/// [`DeviceError`]: GridFanError::DeviceError
/// [`InvalidChannel`]: GridFanError::InvalidChannel
#[derive(Error, Debug)]
pub enum GridFanError {
    /// No device at the configured path
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Caller lacks read/write access to the device
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Serial port errors not covered by a more specific variant
    #[error("Serial port error: {0}")]
    Serial(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout waiting on the controller
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Response byte count did not match the expected frame length
    #[error("Malformed frame: expected {expected} bytes, got {actual}")]
    MalformedFrame { expected: usize, actual: usize },

    /// The controller kept answering with its in-band error byte
    #[error("Controller error after {attempts} attempts (last response: {last_response:02X?})")]
    DeviceError {
        attempts: u32,
        last_response: Vec<u8>,
    },

    /// Fan channel out of range
    #[error("Invalid fan channel: {channel} (must be 1-{max})")]
    InvalidChannel { channel: u8, max: u8 },

    /// Driver used before `init()` completed
    #[error("Driver not initialized: call init() first")]
    NotInitialized,

    /// Response bytes could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for driver operations
pub type Result<T> = std::result::Result<T, GridFanError>;

impl From<toml::de::Error> for GridFanError {
    fn from(err: toml::de::Error) -> Self {
        GridFanError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GridFanError::DeviceNotFound("/dev/GridPlus0".to_string());
        assert_eq!(format!("{}", err), "Device not found: /dev/GridPlus0");

        let err = GridFanError::InvalidChannel { channel: 7, max: 6 };
        assert_eq!(format!("{}", err), "Invalid fan channel: 7 (must be 1-6)");

        let err = GridFanError::MalformedFrame {
            expected: 5,
            actual: 3,
        };
        assert_eq!(
            format!("{}", err),
            "Malformed frame: expected 5 bytes, got 3"
        );

        let err = GridFanError::NotInitialized;
        assert_eq!(
            format!("{}", err),
            "Driver not initialized: call init() first"
        );
    }

    #[test]
    fn test_device_error_carries_last_response() {
        let err = GridFanError::DeviceError {
            attempts: 3,
            last_response: vec![0x02],
        };
        let msg = format!("{}", err);
        assert!(msg.contains("3 attempts"));
        assert!(msg.contains("02"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken pipe");
        let err: GridFanError = io_err.into();

        match err {
            GridFanError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe),
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("not [ valid").unwrap_err();
        let err: GridFanError = toml_err.into();
        assert!(matches!(err, GridFanError::Config(_)));
    }
}
