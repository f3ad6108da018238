//! Control channel configuration

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ControlError;

/// Default camera address on the vendor's air unit network
pub const DEFAULT_HOST: &str = "192.168.144.25";

/// Fixed UDP control port
pub const DEFAULT_PORT: u16 = 37260;

/// Control client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub host: String,
    pub port: u16,
    /// How long a single receive waits for a reply
    pub recv_timeout_ms: u64,
    /// Receive buffer size; longer datagrams are truncated
    pub buffer_size: usize,
    /// Log every frame as hex at debug level instead of trace
    pub debug: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            recv_timeout_ms: 1000,
            buffer_size: 1024,
            debug: false,
        }
    }
}

impl ControlConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ControlError> {
        if self.recv_timeout_ms == 0 {
            return Err(ControlError::InvalidConfig(
                "recv_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(ControlError::InvalidConfig(
                "buffer_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Resolve the device endpoint
    pub fn endpoint(&self) -> Result<SocketAddr, ControlError> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                ControlError::InvalidConfig(format!("{}:{} did not resolve", self.host, self.port))
            })
    }
}
