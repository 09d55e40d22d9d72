//! Grid+ v2 protocol driver
//!
//! Stateful orchestration of device communication: the initialization
//! handshake, the bounded retry policy for the controller's in-band error
//! byte, and the per-fan operations. This is the primary public contract of
//! the crate.
//!
//! Exchanges are half-duplex by construction: the transport mutex is held for
//! one full command/response exchange including retries, so concurrent
//! callers serialize per driver instance.

use crate::protocol::{self, Command, Response};
use crate::serial_driver::{FrameTransport, SerialDriver};
use gridfan_core::{
    normalize_speed, voltage_to_percent, BoardConfig, FanTelemetry, GridFanError, Result,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Total attempts for one command before the error byte is surfaced
const MAX_COMMAND_ATTEMPTS: u32 = 3;

/// Ping attempts during the initialization handshake
///
/// The controller dozes after a power cycle and can take a while to answer,
/// so the wake sequence pings it repeatedly.
const INIT_ATTEMPTS: u32 = 30;

/// Pause between initialization pings
const INIT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Driver lifecycle state
///
/// `Ready` is terminal-success; there is no failed terminal state. Failures
/// surface per call, and the transient retry loop runs inside one exchange
/// without leaving `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Transport open, handshake not yet performed
    Uninitialized,
    /// Wake sequence in flight
    Initializing,
    /// Handshake acknowledged; operations are meaningful
    Ready,
}

/// Grid+ v2 fan controller driver
///
/// Generic over the transport type, allowing real hardware (`SerialDriver`)
/// or mock transports for testing.
///
/// Operations other than [`init`](Self::init) fail with `NotInitialized`
/// until the handshake has completed; the driver never auto-initializes.
pub struct GridFanController<T: FrameTransport + ?Sized = dyn FrameTransport> {
    transport: Arc<Mutex<Box<T>>>,
    state: DriverState,
    fan_count: u8,
}

impl<B: BoardConfig> GridFanController<SerialDriver<B>> {
    /// Create a new controller driver over an open serial transport
    pub fn new(driver: SerialDriver<B>) -> Self {
        Self {
            transport: Arc::new(Mutex::new(Box::new(driver))),
            state: DriverState::Uninitialized,
            fan_count: B::FAN_COUNT,
        }
    }
}

impl<T: FrameTransport + ?Sized> GridFanController<T> {
    /// Create a controller driver with a boxed transport
    ///
    /// This is primarily useful for testing with mock transports.
    pub fn with_transport(transport: Box<T>, fan_count: u8) -> Self {
        Self {
            transport: Arc::new(Mutex::new(transport)),
            state: DriverState::Uninitialized,
            fan_count,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Number of fan channels on the board
    pub fn fan_count(&self) -> u8 {
        self.fan_count
    }

    fn validate_channel(&self, channel: u8) -> Result<()> {
        if channel < 1 || channel > self.fan_count {
            return Err(GridFanError::InvalidChannel {
                channel,
                max: self.fan_count,
            });
        }
        Ok(())
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.state != DriverState::Ready {
            return Err(GridFanError::NotInitialized);
        }
        Ok(())
    }

    /// Wake the controller and transition the driver to `Ready`
    ///
    /// Must be invoked once per device power cycle before other operations.
    /// Pings the controller up to 30 times; any reply at all, including the
    /// in-band error byte, proves the line is live. Timeouts between pings
    /// are expected while the controller wakes; a malformed frame is a
    /// protocol mismatch and propagates immediately.
    pub async fn init(&mut self) -> Result<()> {
        self.state = DriverState::Initializing;
        info!("Initializing controller");

        let command = Command::Init;
        let frame = command.encode();

        let transport = Arc::clone(&self.transport);
        let mut transport = transport.lock().await;

        for attempt in 1..=INIT_ATTEMPTS {
            if attempt > 1 {
                tokio::time::sleep(INIT_RETRY_DELAY).await;
            }

            let raw = match transport.exchange(&frame, command.response_len()).await {
                Ok(raw) => raw,
                Err(GridFanError::Timeout(_)) => {
                    debug!("No response to wake ping (attempt {}/{})", attempt, INIT_ATTEMPTS);
                    continue;
                }
                Err(e) => {
                    self.state = DriverState::Uninitialized;
                    return Err(e);
                }
            };

            match protocol::decode(&command, &raw) {
                Ok(Response::Pong) => {
                    info!("Controller awake after {} ping(s)", attempt);
                    self.state = DriverState::Ready;
                    return Ok(());
                }
                Ok(Response::DeviceError) => {
                    // An error byte still proves the controller is listening
                    warn!("Controller answered the wake ping with its error byte");
                    self.state = DriverState::Ready;
                    return Ok(());
                }
                Ok(other) => {
                    self.state = DriverState::Uninitialized;
                    return Err(GridFanError::Parse(format!(
                        "unexpected wake response: {:?}",
                        other
                    )));
                }
                Err(e) => {
                    self.state = DriverState::Uninitialized;
                    return Err(e);
                }
            }
        }

        self.state = DriverState::Uninitialized;
        error!("Giving up after {} wake pings", INIT_ATTEMPTS);
        Err(GridFanError::Timeout(format!(
            "Controller did not respond after {} initialization pings",
            INIT_ATTEMPTS
        )))
    }

    /// Send one command, applying the bounded retry policy
    ///
    /// The retry loop is an explicit attempt counter rather than recursion so
    /// the bound stays auditable. Any decoded error byte re-sends the
    /// identical frame; all other errors propagate immediately. The transport
    /// lock is held for the whole loop.
    async fn execute(&self, command: Command) -> Result<Response> {
        let frame = command.encode();
        let response_len = command.response_len();

        let mut transport = self.transport.lock().await;

        let mut last_raw = Vec::new();
        for attempt in 1..=MAX_COMMAND_ATTEMPTS {
            debug!(
                "Sending {:?} (attempt {}/{})",
                command, attempt, MAX_COMMAND_ATTEMPTS
            );

            let raw = transport.exchange(&frame, response_len).await?;
            match protocol::decode(&command, &raw)? {
                Response::DeviceError => {
                    warn!(
                        "Controller returned error byte for {:?} (attempt {}/{})",
                        command, attempt, MAX_COMMAND_ATTEMPTS
                    );
                    last_raw = raw;
                }
                response => {
                    if attempt > 1 {
                        debug!("Recovered after {} attempts", attempt);
                    }
                    return Ok(response);
                }
            }
        }

        error!("Retries exhausted for {:?}", command);
        Err(GridFanError::DeviceError {
            attempts: MAX_COMMAND_ATTEMPTS,
            last_response: last_raw,
        })
    }

    /// Verify the line is live without altering device state
    pub async fn ping(&self) -> Result<()> {
        self.ensure_ready()?;
        match self.execute(Command::Ping).await? {
            Response::Pong => {
                info!("Pong!");
                Ok(())
            }
            other => Err(unexpected_response(other)),
        }
    }

    /// Get a fan's tachometer reading in RPM
    pub async fn get_fan_rpm(&self, channel: u8) -> Result<u32> {
        self.validate_channel(channel)?;
        self.ensure_ready()?;

        match self.execute(Command::GetRpm { channel }).await? {
            Response::Rpm(rpm) => {
                debug!("Fan {}: {} RPM", channel, rpm);
                Ok(rpm)
            }
            other => Err(unexpected_response(other)),
        }
    }

    /// Get a fan's power draw in tenths of a watt
    pub async fn get_fan_wattage(&self, channel: u8) -> Result<u32> {
        self.validate_channel(channel)?;
        self.ensure_ready()?;

        match self.execute(Command::GetWattage { channel }).await? {
            Response::Wattage(deciwatts) => {
                debug!("Fan {}: {}.{} W", channel, deciwatts / 10, deciwatts % 10);
                Ok(deciwatts)
            }
            other => Err(unexpected_response(other)),
        }
    }

    /// Get the voltage currently applied to a fan, in centivolts
    ///
    /// An empty channel always reads near 12 V: when the controller gets no
    /// tachometer readout it supplies full power to try to wake the fan.
    pub async fn get_fan_voltage(&self, channel: u8) -> Result<u32> {
        self.validate_channel(channel)?;
        self.ensure_ready()?;

        match self.execute(Command::GetVoltage { channel }).await? {
            Response::Voltage(centivolts) => {
                debug!(
                    "Fan {}: {}.{:02} V",
                    channel,
                    centivolts / 100,
                    centivolts % 100
                );
                Ok(centivolts)
            }
            other => Err(unexpected_response(other)),
        }
    }

    /// Get the applied voltage as a percentage of the speed domain
    ///
    /// This reads as voltage percentage, not fan speed percentage.
    pub async fn get_fan_percent(&self, channel: u8) -> Result<u8> {
        let centivolts = self.get_fan_voltage(channel).await?;
        Ok(voltage_to_percent(centivolts))
    }

    /// Set a fan's speed
    ///
    /// The requested percent is normalized to the controller's value domain
    /// (a multiple of 5 in 20-100) before encoding, so arbitrary computed
    /// values are safe to pass.
    pub async fn set_fan(&self, channel: u8, percent: i32) -> Result<()> {
        self.validate_channel(channel)?;
        self.ensure_ready()?;

        let normalized = normalize_speed(percent);
        if i32::from(normalized) != percent {
            debug!(
                "Normalized requested speed {} to {}% for fan {}",
                percent, normalized, channel
            );
        }

        match self
            .execute(Command::SetSpeed {
                channel,
                percent: normalized,
            })
            .await?
        {
            Response::Ack => {
                info!("Fan {} set to {}%", channel, normalized);
                Ok(())
            }
            other => Err(unexpected_response(other)),
        }
    }

    /// Read RPM and wattage for one channel as a single snapshot
    pub async fn get_fan_telemetry(&self, channel: u8) -> Result<FanTelemetry> {
        let rpm = self.get_fan_rpm(channel).await?;
        let wattage_deciwatts = self.get_fan_wattage(channel).await?;
        Ok(FanTelemetry {
            rpm,
            wattage_deciwatts,
        })
    }

    /// Check whether a fan appears to be connected on a channel
    ///
    /// A channel whose RPM and wattage both read exactly zero is treated as
    /// empty. Recomputed on every call, never cached.
    pub async fn is_fan_connected(&self, channel: u8) -> Result<bool> {
        let telemetry = self.get_fan_telemetry(channel).await?;
        debug!(
            "Fan {}: {} RPM, {} dW -> connected={}",
            channel,
            telemetry.rpm,
            telemetry.wattage_deciwatts,
            telemetry.is_connected()
        );
        Ok(telemetry.is_connected())
    }

    /// Get tachometer readings for every channel, in channel order
    pub async fn get_all_fan_rpm(&self) -> Result<Vec<u32>> {
        let mut readings = Vec::with_capacity(self.fan_count as usize);
        for channel in 1..=self.fan_count {
            readings.push(self.get_fan_rpm(channel).await?);
        }
        Ok(readings)
    }

    /// Get power draw for every channel, in channel order
    pub async fn get_all_fan_wattage(&self) -> Result<Vec<u32>> {
        let mut readings = Vec::with_capacity(self.fan_count as usize);
        for channel in 1..=self.fan_count {
            readings.push(self.get_fan_wattage(channel).await?);
        }
        Ok(readings)
    }

    /// Set every fan to one speed
    pub async fn set_all_fans(&self, percent: i32) -> Result<()> {
        for channel in 1..=self.fan_count {
            self.set_fan(channel, percent).await?;
        }
        Ok(())
    }
}

fn unexpected_response(response: Response) -> GridFanError {
    GridFanError::Parse(format!("unexpected response variant: {:?}", response))
}
