//! Typed response payloads

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::codec::to_hex;
use crate::ProtocolError;

/// Raw attitude and zoom values are tenths of a unit
pub const TENTHS: f32 = 10.0;

fn require(payload: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if payload.len() < expected {
        return Err(ProtocolError::ShortPayload {
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

/// Gimbal attitude in degrees and angular rate in degrees/second
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Attitude {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    pub yaw_rate: f32,
    pub pitch_rate: f32,
    pub roll_rate: f32,
}

impl Attitude {
    pub const SIZE: usize = 12;

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        require(payload, Self::SIZE)?;

        let mut raw = [0i16; 6];
        LittleEndian::read_i16_into(&payload[..Self::SIZE], &mut raw);
        let [yaw, pitch, roll, yaw_rate, pitch_rate, roll_rate] = raw.map(|v| v as f32 / TENTHS);

        Ok(Self {
            yaw,
            pitch,
            roll,
            yaw_rate,
            pitch_rate,
            roll_rate,
        })
    }
}

/// Zoom feedback: unsigned tenths of zoom factor
pub fn parse_zoom_level(payload: &[u8]) -> Result<f32, ProtocolError> {
    require(payload, 2)?;
    Ok(LittleEndian::read_u16(payload) as f32 / TENTHS)
}

/// Single-byte acknowledgement. Meaning is operation specific.
pub fn parse_ack(payload: &[u8]) -> Result<u8, ProtocolError> {
    require(payload, 1)?;
    Ok(payload[0])
}

/// Firmware version words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FirmwareVersion {
    pub camera_board: u32,
    pub gimbal: u32,
    pub zoom: Option<u32>,
}

impl FirmwareVersion {
    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        require(payload, 8)?;

        let zoom = if payload.len() >= 12 {
            Some(LittleEndian::read_u32(&payload[8..12]))
        } else {
            None
        };

        Ok(Self {
            camera_board: LittleEndian::read_u32(&payload[0..4]),
            gimbal: LittleEndian::read_u32(&payload[4..8]),
            zoom,
        })
    }

    /// Render a version word as `major.minor.patch`
    pub fn dotted(word: u32) -> String {
        let [patch, minor, major, _] = word.to_le_bytes();
        format!("{}.{}.{}", major, minor, patch)
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gimbal {} (camera board {}",
            Self::dotted(self.gimbal),
            Self::dotted(self.camera_board)
        )?;
        if let Some(zoom) = self.zoom {
            write!(f, ", zoom {}", Self::dotted(zoom))?;
        }
        write!(f, ")")
    }
}

/// Opaque hardware identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HardwareId(pub Vec<u8>);

impl HardwareId {
    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        require(payload, 1)?;
        Ok(Self(payload.to_vec()))
    }
}

impl fmt::Display for HardwareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_hex(&self.0))
    }
}

/// Recording status reported in gimbal configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordState {
    Off,
    On,
    NoCard,
    DataLoss,
    Unknown(u8),
}

impl From<u8> for RecordState {
    fn from(v: u8) -> Self {
        match v {
            0 => RecordState::Off,
            1 => RecordState::On,
            2 => RecordState::NoCard,
            3 => RecordState::DataLoss,
            other => RecordState::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MountDirection {
    Normal,
    UpsideDown,
    Unknown(u8),
}

impl From<u8> for MountDirection {
    fn from(v: u8) -> Self {
        match v {
            1 => MountDirection::Normal,
            2 => MountDirection::UpsideDown,
            other => MountDirection::Unknown(other),
        }
    }
}

/// Gimbal configuration. Only the trailing two fields are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GimbalInfo {
    pub record_state: RecordState,
    pub mount_direction: MountDirection,
}

impl GimbalInfo {
    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        require(payload, 2)?;
        let n = payload.len();
        Ok(Self {
            record_state: RecordState::from(payload[n - 2]),
            mount_direction: MountDirection::from(payload[n - 1]),
        })
    }
}

/// Result of the last photo/record/mode request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FunctionFeedback {
    Success,
    PhotoFailed,
    HdrOn,
    HdrOff,
    RecordFailed,
    Unknown(u8),
}

impl FunctionFeedback {
    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        parse_ack(payload).map(Self::from)
    }

    pub fn code(self) -> u8 {
        match self {
            FunctionFeedback::Success => 0,
            FunctionFeedback::PhotoFailed => 1,
            FunctionFeedback::HdrOn => 2,
            FunctionFeedback::HdrOff => 3,
            FunctionFeedback::RecordFailed => 4,
            FunctionFeedback::Unknown(code) => code,
        }
    }

    pub fn is_success(self) -> bool {
        self == FunctionFeedback::Success
    }
}

impl From<u8> for FunctionFeedback {
    fn from(v: u8) -> Self {
        match v {
            0 => FunctionFeedback::Success,
            1 => FunctionFeedback::PhotoFailed,
            2 => FunctionFeedback::HdrOn,
            3 => FunctionFeedback::HdrOff,
            4 => FunctionFeedback::RecordFailed,
            other => FunctionFeedback::Unknown(other),
        }
    }
}

/// Gimbal motion modes selectable through the photo/video command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MotionMode {
    Lock,
    Follow,
    Fpv,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attitude_yaw_only() {
        let payload = [
            0x64, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        let att = Attitude::parse(&payload).unwrap();

        assert_eq!(att.yaw, 10.0);
        assert_eq!(att.pitch, 0.0);
        assert_eq!(att.roll, 0.0);
        assert_eq!(att.yaw_rate, 0.0);
        assert_eq!(att.pitch_rate, 0.0);
        assert_eq!(att.roll_rate, 0.0);
    }

    #[test]
    fn test_attitude_negative_values() {
        // pitch = -900 (-90.0 deg), roll_rate = -5 (-0.5 deg/s)
        let payload = [
            0x00, 0x00, 0x7c, 0xfc, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xfb, 0xff,
        ];
        let att = Attitude::parse(&payload).unwrap();

        assert_eq!(att.pitch, -90.0);
        assert_eq!(att.roll_rate, -0.5);
    }

    #[test]
    fn test_attitude_short_payload() {
        let err = Attitude::parse(&[0x64, 0x00]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::ShortPayload {
                expected: 12,
                actual: 2
            }
        );
    }

    #[test]
    fn test_zoom_level() {
        assert_eq!(parse_zoom_level(&[0x0f, 0x00]).unwrap(), 1.5);
        assert_eq!(parse_zoom_level(&[0x2c, 0x01]).unwrap(), 30.0);
        assert!(parse_zoom_level(&[0x0f]).is_err());
    }

    #[test]
    fn test_firmware_version() {
        let payload = [
            0x03, 0x02, 0x01, 0x00, // camera board 1.2.3
            0x06, 0x05, 0x04, 0x00, // gimbal 4.5.6
        ];
        let fw = FirmwareVersion::parse(&payload).unwrap();

        assert_eq!(fw.gimbal, 0x0004_0506);
        assert_eq!(fw.zoom, None);
        assert_eq!(fw.to_string(), "gimbal 4.5.6 (camera board 1.2.3)");
    }

    #[test]
    fn test_firmware_version_with_zoom() {
        let mut payload = vec![0u8; 12];
        payload[8] = 0x09;
        let fw = FirmwareVersion::parse(&payload).unwrap();
        assert_eq!(fw.zoom, Some(9));
    }

    #[test]
    fn test_gimbal_info_reads_trailing_bytes() {
        let info = GimbalInfo::parse(&[0x00, 0x01, 0x00, 0x03, 0x00, 0x02]).unwrap();
        assert_eq!(info.record_state, RecordState::Off);
        assert_eq!(info.mount_direction, MountDirection::UpsideDown);

        let info = GimbalInfo::parse(&[0x01, 0x01]).unwrap();
        assert_eq!(info.record_state, RecordState::On);
        assert_eq!(info.mount_direction, MountDirection::Normal);
    }

    #[test]
    fn test_function_feedback_codes() {
        assert!(FunctionFeedback::parse(&[0]).unwrap().is_success());
        assert_eq!(
            FunctionFeedback::parse(&[4]).unwrap(),
            FunctionFeedback::RecordFailed
        );
        assert_eq!(FunctionFeedback::from(9), FunctionFeedback::Unknown(9));
        assert_eq!(FunctionFeedback::Unknown(9).code(), 9);
        assert!(FunctionFeedback::parse(&[]).is_err());
    }

    #[test]
    fn test_hardware_id_display() {
        let id = HardwareId::parse(&[0x6b, 0x0a, 0xff]).unwrap();
        assert_eq!(id.to_string(), "6b0aff");
    }
}
