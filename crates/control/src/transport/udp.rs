//! UDP transport

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};

use tracing::{debug, info};

use super::Transport;
use crate::error::{ControlError, Result};
use crate::ControlConfig;

/// Owns one UDP socket aimed at the camera's control port
pub struct UdpTransport {
    config: ControlConfig,
    socket: Option<UdpSocket>,
    endpoint: Option<SocketAddr>,
    buf: Vec<u8>,
}

impl UdpTransport {
    pub fn new(config: ControlConfig) -> Self {
        let buf = vec![0u8; config.buffer_size];
        Self {
            config,
            socket: None,
            endpoint: None,
            buf,
        }
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    /// Local address of the open socket
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    fn socket(&self) -> Result<(&UdpSocket, SocketAddr)> {
        match (&self.socket, self.endpoint) {
            (Some(socket), Some(endpoint)) => Ok((socket, endpoint)),
            _ => Err(ControlError::NotConnected),
        }
    }
}

impl Transport for UdpTransport {
    fn open(&mut self) -> Result<()> {
        self.config.validate()?;
        let endpoint = self.config.endpoint()?;

        let bind_addr = if endpoint.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_read_timeout(Some(self.config.recv_timeout()))?;

        info!(
            "Control socket {} -> {}",
            socket.local_addr()?,
            endpoint
        );

        self.buf.resize(self.config.buffer_size, 0);
        self.socket = Some(socket);
        self.endpoint = Some(endpoint);
        Ok(())
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!("Control socket closed");
        }
        self.endpoint = None;
    }

    fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    fn send(&mut self, frame: &[u8]) -> Result<()> {
        let (socket, endpoint) = self.socket()?;
        socket.send_to(frame, endpoint)?;
        Ok(())
    }

    fn receive(&mut self) -> Result<Vec<u8>> {
        let waited = self.config.recv_timeout();
        let socket = match &self.socket {
            Some(socket) => socket,
            None => return Err(ControlError::NotConnected),
        };

        match socket.recv_from(&mut self.buf) {
            Ok((n, _from)) => Ok(self.buf[..n].to_vec()),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Err(ControlError::Timeout { waited })
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_pair() -> (UdpSocket, UdpTransport) {
        let device = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = device.local_addr().unwrap().port();
        let config = ControlConfig {
            recv_timeout_ms: 100,
            ..ControlConfig::new("127.0.0.1", port)
        };
        (device, UdpTransport::new(config))
    }

    #[test]
    fn test_send_before_open_fails() {
        let (_device, mut transport) = loopback_pair();
        assert!(matches!(
            transport.send(&[0x00]),
            Err(ControlError::NotConnected)
        ));
        assert!(matches!(
            transport.receive(),
            Err(ControlError::NotConnected)
        ));
    }

    #[test]
    fn test_roundtrip_over_loopback() {
        let (device, mut transport) = loopback_pair();
        transport.open().unwrap();

        transport.send(&[0x55, 0x66]).unwrap();

        let mut buf = [0u8; 16];
        let (n, from) = device.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[0x55, 0x66]);

        device.send_to(&[0xaa, 0xbb, 0xcc], from).unwrap();
        assert_eq!(transport.receive().unwrap(), vec![0xaa, 0xbb, 0xcc]);
    }

    #[test]
    fn test_silence_is_timeout() {
        let (_device, mut transport) = loopback_pair();
        transport.open().unwrap();

        let err = transport.receive().unwrap_err();
        assert!(matches!(err, ControlError::Timeout { .. }));
        assert!(err.is_unknown_result());
        // Still usable afterwards
        assert!(transport.is_open());
    }

    #[test]
    fn test_reopen_replaces_socket() {
        let (_device, mut transport) = loopback_pair();
        transport.open().unwrap();
        transport.close();
        assert!(!transport.is_open());
        assert!(transport.local_addr().is_none());

        transport.open().unwrap();
        assert!(transport.is_open());
    }
}
