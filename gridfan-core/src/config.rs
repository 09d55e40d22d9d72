//! Driver configuration
//!
//! The controller is normally reachable through a stable udev symlink
//! (`/dev/GridPlus0`), but both the name and the directory are injectable so
//! systems with a different naming scheme, or tests substituting a simulated
//! device, can point the driver elsewhere.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::board::{BoardConfig, DefaultBoard};

/// Returns the default path for the driver configuration file.
///
/// Uses XDG config directory if available:
/// - Linux/macOS: `~/.config/gridfan/config.toml`
/// - Fallback: `/etc/gridfan/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/etc"))
        .join("gridfan")
        .join("config.toml")
}

fn default_device_name() -> String {
    DefaultBoard::DEVICE_NAME.to_string()
}

fn default_device_dir() -> PathBuf {
    PathBuf::from("/dev")
}

fn default_read_timeout_ms() -> u64 {
    DefaultBoard::READ_TIMEOUT_MS
}

fn default_write_timeout_ms() -> u64 {
    DefaultBoard::WRITE_TIMEOUT_MS
}

/// Driver configuration
///
/// Loaded once before the serial port is opened and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Device node name, e.g. `GridPlus0`
    #[serde(default = "default_device_name")]
    pub device_name: String,

    /// Directory the device node resides in, e.g. `/dev`
    #[serde(default = "default_device_dir")]
    pub device_dir: PathBuf,

    /// Read timeout in milliseconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Write timeout in milliseconds
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            device_dir: default_device_dir(),
            read_timeout_ms: default_read_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

impl DriverConfig {
    /// Create a configuration for a device at an explicit location.
    pub fn with_device(device_name: impl Into<String>, device_dir: impl Into<PathBuf>) -> Self {
        Self {
            device_name: device_name.into(),
            device_dir: device_dir.into(),
            ..Default::default()
        }
    }

    /// Full path to the device node.
    pub fn device_path(&self) -> PathBuf {
        self.device_dir.join(&self.device_name)
    }

    /// Parse DriverConfig from TOML string.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize DriverConfig to TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DriverConfig::default();
        assert_eq!(config.device_name, "GridPlus0");
        assert_eq!(config.device_path(), PathBuf::from("/dev/GridPlus0"));
        assert_eq!(config.read_timeout_ms, 2000);
        assert_eq!(config.write_timeout_ms, 4000);
    }

    #[test]
    fn test_with_device_overrides_path() {
        let config = DriverConfig::with_device("ttyUSB3", "/dev/serial/by-id");
        assert_eq!(
            config.device_path(),
            PathBuf::from("/dev/serial/by-id/ttyUSB3")
        );
        // Timeouts keep their defaults
        assert_eq!(config.read_timeout_ms, 2000);
    }

    #[test]
    fn test_config_toml_round_trip() {
        let config = DriverConfig::with_device("GridPlus1", "/dev");
        let toml_str = config.to_toml().unwrap();
        assert!(toml_str.contains("device_name"));

        let parsed = DriverConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed.device_name, "GridPlus1");
    }

    #[test]
    fn test_config_partial_toml_uses_defaults() {
        let parsed = DriverConfig::from_toml(r#"device_name = "GridPlus2""#).unwrap();
        assert_eq!(parsed.device_name, "GridPlus2");
        assert_eq!(parsed.device_dir, PathBuf::from("/dev"));
        assert_eq!(parsed.read_timeout_ms, 2000);
    }

    #[test]
    fn test_default_config_path_is_toml() {
        let path = default_config_path();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("toml"));
        assert!(path.ends_with("gridfan/config.toml"));
    }
}
