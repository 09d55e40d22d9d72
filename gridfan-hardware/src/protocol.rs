//! Frame codec for the Grid+ v2 serial protocol
//!
//! The controller speaks fixed-length binary frames: an opcode byte, then a
//! channel byte and value bytes where applicable. Telemetry responses are five
//! bytes, a `C0 00 00` header followed by two payload bytes; write commands
//! are acknowledged with a single byte. The reserved byte `0x02` is the
//! device's in-band error signal, shared across all response types.

use gridfan_core::{speed::bcd_byte, speed_to_voltage_bytes, GridFanError, Result};

/// In-band error byte, valid in place of any response
pub const RESPONSE_ERROR: u8 = 0x02;
/// Single-byte reply to a ping
pub const RESPONSE_PONG: u8 = 0x21;
/// Single-byte acknowledgment of a speed write
pub const RESPONSE_ACK: u8 = 0x01;
/// Leading bytes of every telemetry response
pub const TELEMETRY_HEADER: [u8; 3] = [0xC0, 0x00, 0x00];

const OPCODE_PING: u8 = 0xC0;
const OPCODE_SET_SPEED: u8 = 0x44;
const OPCODE_GET_VOLTAGE: u8 = 0x84;
const OPCODE_GET_WATTAGE: u8 = 0x85;
const OPCODE_GET_RPM: u8 = 0x8A;

/// Commands understood by the controller
///
/// Immutable once constructed. `Init` frames identically to `Ping`: the
/// controller has no dedicated wake opcode, its initialization handshake is a
/// ping burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Verify the line is live without altering device state
    Ping,
    /// Wake the controller after a power cycle
    Init,
    /// Read the tachometer for one channel
    GetRpm { channel: u8 },
    /// Read the applied voltage for one channel
    GetVoltage { channel: u8 },
    /// Read the power draw for one channel
    GetWattage { channel: u8 },
    /// Apply a speed, as a percent already normalized to the device domain
    SetSpeed { channel: u8, percent: u8 },
}

impl Command {
    /// Encode this command into its outbound frame
    ///
    /// Deterministic: the same command always yields the same bytes.
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            Command::Ping | Command::Init => vec![OPCODE_PING],
            Command::GetRpm { channel } => vec![OPCODE_GET_RPM, channel],
            Command::GetVoltage { channel } => vec![OPCODE_GET_VOLTAGE, channel],
            Command::GetWattage { channel } => vec![OPCODE_GET_WATTAGE, channel],
            Command::SetSpeed { channel, percent } => {
                let (volts, half) = speed_to_voltage_bytes(percent);
                vec![OPCODE_SET_SPEED, channel, 0xC0, 0x00, 0x00, volts, half]
            }
        }
    }

    /// Expected byte length of the response frame for this command
    pub fn response_len(&self) -> usize {
        match self {
            Command::Ping | Command::Init | Command::SetSpeed { .. } => 1,
            Command::GetRpm { .. } | Command::GetVoltage { .. } | Command::GetWattage { .. } => 5,
        }
    }
}

/// Decoded response from the controller
///
/// Ephemeral: exists only for the duration of one exchange. The error byte is
/// a distinct variant so a valid zero reading is never mistaken for a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Reply to `Ping`/`Init`
    Pong,
    /// Acknowledgment of `SetSpeed`
    Ack,
    /// Tachometer reading in RPM
    Rpm(u32),
    /// Applied voltage in centivolts
    Voltage(u32),
    /// Power draw in deciwatts
    Wattage(u32),
    /// The in-band error byte; the driver's retry policy handles this
    DeviceError,
}

/// Decode a raw response frame for the command that was sent
///
/// The error byte is reported as `Ok(Response::DeviceError)` since it is a
/// well-formed, retryable reply. A byte count that does not match the
/// command's expected frame length is a protocol mismatch or corrupted line
/// and fails with `MalformedFrame`, which callers must not blindly retry.
pub fn decode(command: &Command, raw: &[u8]) -> Result<Response> {
    if raw.first() == Some(&RESPONSE_ERROR) {
        return Ok(Response::DeviceError);
    }

    let expected = command.response_len();
    if raw.len() != expected {
        return Err(GridFanError::MalformedFrame {
            expected,
            actual: raw.len(),
        });
    }

    match command {
        Command::Ping | Command::Init => match raw[0] {
            RESPONSE_PONG => Ok(Response::Pong),
            other => Err(GridFanError::Parse(format!(
                "unexpected ping response: {:#04X}",
                other
            ))),
        },
        Command::SetSpeed { channel, .. } => match raw[0] {
            RESPONSE_ACK => Ok(Response::Ack),
            other => Err(GridFanError::Parse(format!(
                "unexpected ack for fan {}: {:#04X}",
                channel, other
            ))),
        },
        Command::GetRpm { .. } => {
            check_telemetry_header(raw)?;
            let rpm = u16::from_be_bytes([raw[3], raw[4]]) as u32;
            Ok(Response::Rpm(rpm))
        }
        Command::GetVoltage { .. } => {
            check_telemetry_header(raw)?;
            // Whole volts are binary, the fractional byte is packed BCD
            let centivolts = bcd_byte(raw[4]).ok_or_else(|| {
                GridFanError::Parse(format!("non-BCD voltage byte: {:#04X}", raw[4]))
            })?;
            Ok(Response::Voltage(raw[3] as u32 * 100 + centivolts))
        }
        Command::GetWattage { .. } => {
            check_telemetry_header(raw)?;
            let deciwatts = bcd_byte(raw[4]).ok_or_else(|| {
                GridFanError::Parse(format!("non-BCD wattage byte: {:#04X}", raw[4]))
            })?;
            Ok(Response::Wattage(deciwatts))
        }
    }
}

fn check_telemetry_header(raw: &[u8]) -> Result<()> {
    if raw[..3] != TELEMETRY_HEADER {
        return Err(GridFanError::Parse(format!(
            "unexpected telemetry header: {:02X?}",
            &raw[..3]
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_ping_and_init() {
        assert_eq!(Command::Ping.encode(), vec![0xC0]);
        assert_eq!(Command::Init.encode(), vec![0xC0]);
    }

    #[test]
    fn test_encode_get_commands() {
        assert_eq!(Command::GetRpm { channel: 1 }.encode(), vec![0x8A, 0x01]);
        assert_eq!(Command::GetRpm { channel: 6 }.encode(), vec![0x8A, 0x06]);
        assert_eq!(
            Command::GetVoltage { channel: 3 }.encode(),
            vec![0x84, 0x03]
        );
        assert_eq!(
            Command::GetWattage { channel: 4 }.encode(),
            vec![0x85, 0x04]
        );
    }

    #[test]
    fn test_encode_set_speed() {
        // 40% -> 6.0 V
        assert_eq!(
            Command::SetSpeed {
                channel: 2,
                percent: 40
            }
            .encode(),
            vec![0x44, 0x02, 0xC0, 0x00, 0x00, 0x06, 0x00]
        );
        // 95% -> 11.5 V
        assert_eq!(
            Command::SetSpeed {
                channel: 6,
                percent: 95
            }
            .encode(),
            vec![0x44, 0x06, 0xC0, 0x00, 0x00, 0x0B, 0x50]
        );
        // 100% -> 12.0 V
        assert_eq!(
            Command::SetSpeed {
                channel: 1,
                percent: 100
            }
            .encode(),
            vec![0x44, 0x01, 0xC0, 0x00, 0x00, 0x0C, 0x00]
        );
    }

    #[test]
    fn test_encode_is_deterministic() {
        let cmd = Command::SetSpeed {
            channel: 3,
            percent: 55,
        };
        assert_eq!(cmd.encode(), cmd.encode());
    }

    #[test]
    fn test_response_lengths() {
        assert_eq!(Command::Ping.response_len(), 1);
        assert_eq!(Command::Init.response_len(), 1);
        assert_eq!(Command::GetRpm { channel: 1 }.response_len(), 5);
        assert_eq!(Command::GetVoltage { channel: 1 }.response_len(), 5);
        assert_eq!(Command::GetWattage { channel: 1 }.response_len(), 5);
        assert_eq!(
            Command::SetSpeed {
                channel: 1,
                percent: 20
            }
            .response_len(),
            1
        );
    }

    #[test]
    fn test_decode_pong() {
        let resp = decode(&Command::Ping, &[0x21]).unwrap();
        assert_eq!(resp, Response::Pong);
    }

    #[test]
    fn test_decode_ack() {
        let cmd = Command::SetSpeed {
            channel: 1,
            percent: 50,
        };
        assert_eq!(decode(&cmd, &[0x01]).unwrap(), Response::Ack);
    }

    #[test]
    fn test_decode_error_byte_for_every_command() {
        let commands = [
            Command::Ping,
            Command::Init,
            Command::GetRpm { channel: 1 },
            Command::GetVoltage { channel: 1 },
            Command::GetWattage { channel: 1 },
            Command::SetSpeed {
                channel: 1,
                percent: 20,
            },
        ];
        for cmd in commands {
            assert_eq!(decode(&cmd, &[0x02]).unwrap(), Response::DeviceError);
        }
    }

    #[test]
    fn test_decode_rpm() {
        // 0x01C2 = 450 RPM
        let resp = decode(&Command::GetRpm { channel: 1 }, &[0xC0, 0x00, 0x00, 0x01, 0xC2]);
        assert_eq!(resp.unwrap(), Response::Rpm(450));
    }

    #[test]
    fn test_decode_rpm_zero_is_not_an_error() {
        let resp = decode(&Command::GetRpm { channel: 1 }, &[0xC0, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(resp.unwrap(), Response::Rpm(0));
    }

    #[test]
    fn test_decode_voltage() {
        // 11 V binary + BCD 0x50 -> 11.50 V
        let resp = decode(
            &Command::GetVoltage { channel: 2 },
            &[0xC0, 0x00, 0x00, 0x0B, 0x50],
        );
        assert_eq!(resp.unwrap(), Response::Voltage(1150));
    }

    #[test]
    fn test_decode_wattage() {
        // BCD 0x25 -> 2.5 W
        let resp = decode(
            &Command::GetWattage { channel: 3 },
            &[0xC0, 0x00, 0x00, 0x00, 0x25],
        );
        assert_eq!(resp.unwrap(), Response::Wattage(25));
    }

    #[test]
    fn test_decode_non_bcd_payload() {
        let resp = decode(
            &Command::GetWattage { channel: 3 },
            &[0xC0, 0x00, 0x00, 0x00, 0xAB],
        );
        assert!(matches!(resp.unwrap_err(), GridFanError::Parse(_)));
    }

    #[test]
    fn test_decode_short_frame_is_malformed() {
        let resp = decode(&Command::GetRpm { channel: 1 }, &[0xC0, 0x00, 0x00]);
        assert!(matches!(
            resp.unwrap_err(),
            GridFanError::MalformedFrame {
                expected: 5,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_decode_overlong_frame_is_malformed() {
        let resp = decode(&Command::Ping, &[0x21, 0x21]);
        assert!(matches!(
            resp.unwrap_err(),
            GridFanError::MalformedFrame {
                expected: 1,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_decode_bad_telemetry_header() {
        let resp = decode(&Command::GetRpm { channel: 1 }, &[0xC1, 0x00, 0x00, 0x01, 0xC2]);
        assert!(matches!(resp.unwrap_err(), GridFanError::Parse(_)));
    }

    #[test]
    fn test_decode_unexpected_pong_byte() {
        let resp = decode(&Command::Ping, &[0x7F]);
        assert!(matches!(resp.unwrap_err(), GridFanError::Parse(_)));
    }
}
