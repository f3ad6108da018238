//! Command catalog: logical operations, their command ids and payload rules

use crate::codec::encode_frame;
use crate::ProtocolError;

/// How an operation's argument is laid out in the DATA field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadRule {
    /// No DATA bytes
    Empty,
    /// One two's-complement byte
    SignedByte,
    /// Two two's-complement bytes (yaw speed, pitch speed)
    SignedPair,
}

/// Argument supplied for a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argument {
    None,
    Byte(i8),
    Pair(i8, i8),
}

/// Logical device operations, in catalog order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    AcquireFirmwareVersion,
    AcquireHardwareId,
    AutoFocus,
    ManualZoom,
    ManualFocus,
    GimbalRotation,
    Center,
    AcquireGimbalInfo,
    FunctionFeedback,
    PhotoVideo,
    AcquireAttitude,
}

/// One catalog row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub operation: Operation,
    pub name: &'static str,
    pub cmd_id: u8,
    pub rule: PayloadRule,
}

/// The command table. Indexed by `Operation as usize`.
pub const CATALOG: [CommandSpec; 11] = [
    CommandSpec {
        operation: Operation::AcquireFirmwareVersion,
        name: "acquire_firmware_version",
        cmd_id: 0x01,
        rule: PayloadRule::Empty,
    },
    CommandSpec {
        operation: Operation::AcquireHardwareId,
        name: "acquire_hardware_id",
        cmd_id: 0x02,
        rule: PayloadRule::Empty,
    },
    CommandSpec {
        operation: Operation::AutoFocus,
        name: "auto_focus",
        cmd_id: 0x04,
        rule: PayloadRule::SignedByte,
    },
    CommandSpec {
        operation: Operation::ManualZoom,
        name: "manual_zoom",
        cmd_id: 0x05,
        rule: PayloadRule::SignedByte,
    },
    CommandSpec {
        operation: Operation::ManualFocus,
        name: "manual_focus",
        cmd_id: 0x06,
        rule: PayloadRule::SignedByte,
    },
    CommandSpec {
        operation: Operation::GimbalRotation,
        name: "gimbal_rotation",
        cmd_id: 0x07,
        rule: PayloadRule::SignedPair,
    },
    CommandSpec {
        operation: Operation::Center,
        name: "center",
        cmd_id: 0x08,
        rule: PayloadRule::SignedByte,
    },
    CommandSpec {
        operation: Operation::AcquireGimbalInfo,
        name: "acquire_gimbal_info",
        cmd_id: 0x0a,
        rule: PayloadRule::Empty,
    },
    CommandSpec {
        operation: Operation::FunctionFeedback,
        name: "function_feedback",
        cmd_id: 0x0b,
        rule: PayloadRule::Empty,
    },
    CommandSpec {
        operation: Operation::PhotoVideo,
        name: "photo_video",
        cmd_id: 0x0c,
        rule: PayloadRule::SignedByte,
    },
    CommandSpec {
        operation: Operation::AcquireAttitude,
        name: "acquire_attitude",
        cmd_id: 0x0d,
        rule: PayloadRule::Empty,
    },
];

impl Operation {
    pub const ALL: [Operation; 11] = [
        Operation::AcquireFirmwareVersion,
        Operation::AcquireHardwareId,
        Operation::AutoFocus,
        Operation::ManualZoom,
        Operation::ManualFocus,
        Operation::GimbalRotation,
        Operation::Center,
        Operation::AcquireGimbalInfo,
        Operation::FunctionFeedback,
        Operation::PhotoVideo,
        Operation::AcquireAttitude,
    ];

    pub fn spec(self) -> &'static CommandSpec {
        &CATALOG[self as usize]
    }

    pub fn cmd_id(self) -> u8 {
        self.spec().cmd_id
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }
}

impl TryFrom<u8> for Operation {
    type Error = ProtocolError;

    fn try_from(cmd_id: u8) -> Result<Self, Self::Error> {
        CATALOG
            .iter()
            .find(|spec| spec.cmd_id == cmd_id)
            .map(|spec| spec.operation)
            .ok_or(ProtocolError::UnknownCommand(cmd_id))
    }
}

/// Lay out `argument` according to `rule`
pub fn encode_payload(rule: PayloadRule, argument: Argument) -> Result<Vec<u8>, ProtocolError> {
    match (rule, argument) {
        (PayloadRule::Empty, Argument::None) => Ok(Vec::new()),
        (PayloadRule::SignedByte, Argument::Byte(v)) => Ok(vec![v as u8]),
        (PayloadRule::SignedPair, Argument::Pair(a, b)) => Ok(vec![a as u8, b as u8]),
        (rule, argument) => Err(ProtocolError::PayloadRule { rule, argument }),
    }
}

/// Manual zoom direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Stop,
    Out,
}

impl ZoomDirection {
    pub fn value(self) -> i8 {
        match self {
            ZoomDirection::In => 1,
            ZoomDirection::Stop => 0,
            ZoomDirection::Out => -1,
        }
    }
}

/// Manual focus direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusDirection {
    /// Long shot
    Far,
    Stop,
    /// Close shot
    Near,
}

impl FocusDirection {
    pub fn value(self) -> i8 {
        match self {
            FocusDirection::Far => 1,
            FocusDirection::Stop => 0,
            FocusDirection::Near => -1,
        }
    }
}

/// Sub-functions multiplexed on the photo/video command
#[repr(i8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoAction {
    TakePhoto = 0,
    ToggleRecording = 2,
    LockMode = 3,
    FollowMode = 4,
    FpvMode = 5,
}

/// A fully specified request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    AcquireFirmwareVersion,
    AcquireHardwareId,
    AutoFocus,
    ManualZoom(ZoomDirection),
    ManualFocus(FocusDirection),
    /// Speeds are percent of max; callers clamp to `SPEED_RANGE`
    GimbalRotation { yaw: i8, pitch: i8 },
    Center,
    AcquireGimbalInfo,
    FunctionFeedback,
    PhotoVideo(PhotoAction),
    AcquireAttitude,
}

impl Command {
    pub fn operation(&self) -> Operation {
        match self {
            Command::AcquireFirmwareVersion => Operation::AcquireFirmwareVersion,
            Command::AcquireHardwareId => Operation::AcquireHardwareId,
            Command::AutoFocus => Operation::AutoFocus,
            Command::ManualZoom(_) => Operation::ManualZoom,
            Command::ManualFocus(_) => Operation::ManualFocus,
            Command::GimbalRotation { .. } => Operation::GimbalRotation,
            Command::Center => Operation::Center,
            Command::AcquireGimbalInfo => Operation::AcquireGimbalInfo,
            Command::FunctionFeedback => Operation::FunctionFeedback,
            Command::PhotoVideo(_) => Operation::PhotoVideo,
            Command::AcquireAttitude => Operation::AcquireAttitude,
        }
    }

    pub fn argument(&self) -> Argument {
        match *self {
            Command::AutoFocus | Command::Center => Argument::Byte(1),
            Command::ManualZoom(dir) => Argument::Byte(dir.value()),
            Command::ManualFocus(dir) => Argument::Byte(dir.value()),
            Command::GimbalRotation { yaw, pitch } => Argument::Pair(yaw, pitch),
            Command::PhotoVideo(action) => Argument::Byte(action as i8),
            Command::AcquireFirmwareVersion
            | Command::AcquireHardwareId
            | Command::AcquireGimbalInfo
            | Command::FunctionFeedback
            | Command::AcquireAttitude => Argument::None,
        }
    }

    pub fn payload(&self) -> Result<Vec<u8>, ProtocolError> {
        encode_payload(self.operation().spec().rule, self.argument())
    }

    /// Encode into a complete wire frame
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        encode_frame(self.operation().cmd_id(), &self.payload()?)
    }
}
