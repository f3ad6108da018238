//! Transport layer for the control channel

use crate::error::Result;

mod mock;
mod udp;

pub use mock::MockTransport;
pub use udp::UdpTransport;

/// One-datagram-out, one-datagram-in transport.
///
/// Implementations never correlate replies with requests: `receive` returns
/// whatever datagram arrives next.
pub trait Transport: Send {
    /// Create the underlying handle. Re-opening re-initializes it.
    fn open(&mut self) -> Result<()>;

    /// Drop the underlying handle
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Send one encoded frame
    fn send(&mut self, frame: &[u8]) -> Result<()>;

    /// Block for one datagram, up to the configured wait window.
    ///
    /// Returns `ControlError::Timeout` when nothing arrives.
    fn receive(&mut self) -> Result<Vec<u8>>;
}
