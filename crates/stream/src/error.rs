//! Stream ingest errors

/// Result type alias
pub type Result<T> = std::result::Result<T, StreamError>;

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Pipeline never started or already stopped
    #[error("Not connected to the stream")]
    NotConnected,

    /// Connected, but nothing has decoded yet
    #[error("No frame available yet")]
    NoFrameYet,

    #[error("Already connected to the stream")]
    AlreadyConnected,

    /// The stream could not be opened during `connect`
    #[error("Failed to open {url}: {reason}")]
    Open { url: String, reason: String },

    /// Reader hiccup; logged and retried
    #[error("Transient I/O error: {0}")]
    TransientIo(String),

    /// One packet failed to decode; logged and skipped
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("End of stream")]
    EndOfStream,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to spawn task: {0}")]
    Spawn(#[from] std::io::Error),
}
