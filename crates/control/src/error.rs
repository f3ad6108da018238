//! Error types for the control channel

use std::time::Duration;

use gimbal_protocol::{FunctionFeedback, ProtocolError};

/// Result type alias
pub type Result<T> = std::result::Result<T, ControlError>;

/// Control channel errors
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// Transport has not been opened (or was closed)
    #[error("Not connected to the camera")]
    NotConnected,

    /// No datagram arrived within the wait window
    #[error("No reply within {waited:?}")]
    Timeout { waited: Duration },

    /// Reply failed CRC or structural checks, or encoding failed
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Device answered and reported a failure
    #[error("{operation} rejected by device: {feedback:?}")]
    Rejected {
        operation: &'static str,
        feedback: FunctionFeedback,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ControlError {
    /// Whether the device may or may not have acted on the request.
    ///
    /// Timeouts and corrupt replies land here; callers decide whether to
    /// retry.
    pub fn is_unknown_result(&self) -> bool {
        match self {
            ControlError::Timeout { .. } => true,
            ControlError::Protocol(e) => e.is_corrupt_frame(),
            _ => false,
        }
    }
}
