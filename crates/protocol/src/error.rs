//! Protocol-layer errors

use crate::catalog::{Argument, PayloadRule};

/// Errors raised while encoding or decoding control frames.
///
/// None of these are fatal: a caller receiving one should treat the
/// operation's outcome as unknown.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("CRC16 mismatch: computed {expected:#06x}, frame carries {actual:#06x}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Payload too short: need {expected} bytes, got {actual}")]
    ShortPayload { expected: usize, actual: usize },

    #[error("Payload of {0} bytes does not fit the 16-bit length field")]
    PayloadTooLarge(usize),

    #[error("Argument {argument:?} does not match payload rule {rule:?}")]
    PayloadRule { rule: PayloadRule, argument: Argument },

    #[error("Unknown command id {0:#04x}")]
    UnknownCommand(u8),
}

impl ProtocolError {
    /// Whether the frame itself was unusable (corrupt or inconsistent), as
    /// opposed to an encoding mistake on our side.
    pub fn is_corrupt_frame(&self) -> bool {
        matches!(
            self,
            ProtocolError::ChecksumMismatch { .. }
                | ProtocolError::MalformedFrame(_)
                | ProtocolError::ShortPayload { .. }
        )
    }
}
