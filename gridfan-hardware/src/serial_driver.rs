//! Serial transport for low-level controller communication
//!
//! Owns the serial connection to the Grid+ v2 and provides raw frame write
//! and read-with-timeout. No other module performs I/O against the device.

use async_trait::async_trait;
use gridfan_core::{BoardConfig, DefaultBoard, DriverConfig, GridFanError, Result};
use std::marker::PhantomData;
use std::time::Duration;
use tokio::time::timeout;
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, error, warn};

use crate::protocol::RESPONSE_ERROR;

/// Trait for serial transport abstraction
///
/// This trait enables testing of `GridFanController` without real hardware
/// by allowing mock implementations.
#[async_trait]
pub trait FrameTransport: Send {
    /// Write a frame and read back up to `response_len` bytes
    ///
    /// The returned buffer may be shorter than `response_len`: the in-band
    /// error byte arrives alone, and a corrupted line may go quiet after a
    /// partial frame. The codec is responsible for judging the byte count.
    async fn exchange(&mut self, frame: &[u8], response_len: usize) -> Result<Vec<u8>>;

    /// Clear the input buffer
    fn clear_input_buffer(&mut self) -> Result<()>;

    /// Get the device path, if this transport has one
    fn port_path(&self) -> Option<&str>;
}

/// Serial transport for hardware communication
#[derive(Debug)]
pub struct SerialDriver<B: BoardConfig = DefaultBoard> {
    port: SerialStream,
    port_path: String,
    read_timeout: Duration,
    write_timeout: Duration,
    _board: PhantomData<B>,
}

impl<B: BoardConfig> SerialDriver<B> {
    /// Open the device at the given path with the board's line discipline
    ///
    /// Fails with `DeviceNotFound` if the path does not exist and
    /// `PermissionDenied` if the caller lacks read/write access.
    pub fn new(port_path: &str) -> Result<Self> {
        Self::open(port_path, B::READ_TIMEOUT_MS, B::WRITE_TIMEOUT_MS)
    }

    /// Open the device described by a [`DriverConfig`]
    pub fn from_config(config: &DriverConfig) -> Result<Self> {
        let path = config.device_path();
        let path = path.to_str().ok_or_else(|| {
            GridFanError::Config(format!("device path is not valid UTF-8: {:?}", path))
        })?;
        Self::open(path, config.read_timeout_ms, config.write_timeout_ms)
    }

    fn open(port_path: &str, read_timeout_ms: u64, write_timeout_ms: u64) -> Result<Self> {
        debug!("Opening serial port: {}", port_path);

        let port = tokio_serial::new(port_path, B::BAUD_RATE)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| {
                error!("Failed to open serial port {}: {}", port_path, e);
                match e.kind() {
                    tokio_serial::ErrorKind::NoDevice
                    | tokio_serial::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
                        GridFanError::DeviceNotFound(port_path.to_string())
                    }
                    tokio_serial::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
                        GridFanError::PermissionDenied(port_path.to_string())
                    }
                    _ => GridFanError::Serial(format!("Failed to open serial port: {}", e)),
                }
            })?;

        debug!("Serial port opened successfully");

        Ok(Self {
            port,
            port_path: port_path.to_string(),
            read_timeout: Duration::from_millis(read_timeout_ms),
            write_timeout: Duration::from_millis(write_timeout_ms),
            _board: PhantomData,
        })
    }

    /// Write one complete frame
    async fn send(&mut self, frame: &[u8]) -> Result<()> {
        use tokio::io::AsyncWriteExt;

        debug!("TX: {:02X?}", frame);

        timeout(self.write_timeout, self.port.write_all(frame))
            .await
            .map_err(|_| {
                error!("Write timeout");
                GridFanError::Timeout("Write operation timed out".to_string())
            })?
            .map_err(|e| {
                error!("Write failed: {}", e);
                GridFanError::Serial(format!("Write failed: {}", e))
            })?;

        timeout(self.write_timeout, self.port.flush())
            .await
            .map_err(|_| GridFanError::Timeout("Flush operation timed out".to_string()))?
            .map_err(|e| GridFanError::Serial(format!("Flush failed: {}", e)))?;

        Ok(())
    }

    /// Read up to `expected` bytes, bounded by the read timeout
    ///
    /// The error byte short-circuits the read since it arrives in place of a
    /// full frame. Zero bytes within the timeout is a `Timeout`; a partial
    /// frame is returned as-is for the codec to reject.
    async fn read_frame(&mut self, expected: usize) -> Result<Vec<u8>> {
        use tokio::io::AsyncReadExt;

        let mut buf = vec![0u8; expected];
        let mut filled = 0usize;

        let port = &mut self.port;
        let result = timeout(self.read_timeout, async {
            while filled < expected {
                let n = port.read(&mut buf[filled..]).await?;
                if n == 0 {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "serial port returned EOF",
                    ));
                }
                filled += n;
                if buf[0] == RESPONSE_ERROR {
                    break;
                }
            }
            Ok(())
        })
        .await;

        match result {
            Ok(Ok(())) => {
                buf.truncate(filled);
                debug!("RX: {:02X?}", buf);
                Ok(buf)
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                // EOF means the device vanished (USB unplug, power loss)
                warn!("Serial port returned EOF - device may have been disconnected");
                Err(GridFanError::Serial(
                    "Serial port returned EOF - device may have been unplugged".to_string(),
                ))
            }
            Ok(Err(e)) => {
                error!("Read error: {}", e);
                Err(GridFanError::Io(e))
            }
            Err(_) => {
                if filled == 0 {
                    error!("Read timeout");
                    Err(GridFanError::Timeout(
                        "Controller did not respond within the read timeout".to_string(),
                    ))
                } else {
                    buf.truncate(filled);
                    warn!("Partial response before timeout: {:02X?}", buf);
                    Ok(buf)
                }
            }
        }
    }

    fn clear_input_buffer_impl(&mut self) -> Result<()> {
        self.port
            .clear(tokio_serial::ClearBuffer::Input)
            .map_err(|e| {
                warn!("Failed to clear input buffer: {}", e);
                GridFanError::Serial(format!("Failed to clear buffer: {}", e))
            })
    }
}

#[async_trait]
impl<B: BoardConfig> FrameTransport for SerialDriver<B> {
    async fn exchange(&mut self, frame: &[u8], response_len: usize) -> Result<Vec<u8>> {
        // Drop any stale bytes from a previous desynced exchange
        self.clear_input_buffer_impl()?;

        self.send(frame).await?;
        self.read_frame(response_len).await
    }

    fn clear_input_buffer(&mut self) -> Result<()> {
        self.clear_input_buffer_impl()
    }

    fn port_path(&self) -> Option<&str> {
        Some(&self.port_path)
    }
}
