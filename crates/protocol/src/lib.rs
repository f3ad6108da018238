//! Gimbal camera control protocol
//!
//! Length-prefixed binary frames carried in UDP datagrams:
//!
//! ```text
//! STX(2) CTRL(1) DATA_LEN(2, LE) SEQ(2) CMD_ID(1) DATA(DATA_LEN) CRC16(2, LE)
//! ```
//!
//! This crate is pure: frame encoding/decoding, the command catalog and the
//! typed response payloads. Sockets live in `gimbal-control`.

mod catalog;
pub mod codec;
mod error;
pub mod payload;

pub use catalog::*;
pub use codec::{
    compute_crc16, crc16_xmodem, decode_frame, encode_frame, parse_frame, to_hex, FrameHeader,
};
pub use error::ProtocolError;
pub use payload::{
    Attitude, FirmwareVersion, FunctionFeedback, GimbalInfo, HardwareId, MotionMode,
    MountDirection, RecordState,
};

/// Start-of-frame marker (`0x5566` on the wire)
pub const STX: [u8; 2] = [0x55, 0x66];

/// Control byte emitted on every request
pub const CTRL: u8 = 0x01;

/// Sequence number emitted on every request. Replies are not correlated by
/// sequence; see `gimbal-control` for the request/response discipline.
pub const SEQ: u16 = 0x0000;

/// Valid range for yaw/pitch rotation speed (percent of max speed)
pub const SPEED_RANGE: std::ops::RangeInclusive<i8> = -100..=100;
