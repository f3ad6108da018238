//! Synchronous control client for the gimbal camera
//!
//! Every operation is one blocking round trip: encode, send one datagram,
//! wait (bounded) for one datagram, verify, parse. Nothing runs in the
//! background and nothing is retried here.

mod config;
mod controller;
mod error;
pub mod transport;

pub use config::{ControlConfig, DEFAULT_HOST, DEFAULT_PORT};
pub use controller::{GimbalController, COMMAND_SETTLE};
pub use error::{ControlError, Result};
pub use transport::{MockTransport, Transport, UdpTransport};

pub use gimbal_protocol as protocol;
