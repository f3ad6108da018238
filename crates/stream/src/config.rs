//! Stream ingest configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{PixelFormat, StreamError};

pub const DEFAULT_HOST: &str = "192.168.144.25";
pub const DEFAULT_PORT: u16 = 8554;
pub const DEFAULT_NAME: &str = "main.264";

/// Ingest pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub host: String,
    pub port: u16,
    /// Stream path on the RTSP server
    pub name: String,
    /// RTSP lower transport (`tcp` keeps delivery reliable)
    pub rtsp_transport: String,
    /// Demuxer reorder/delay budget in microseconds
    pub max_delay_us: u64,
    /// Upper bound on one blocking network read, in microseconds
    pub io_timeout_us: u64,
    /// Packets held between reader and decoder
    pub buffer_capacity: usize,
    /// How long `disconnect` waits for each task
    pub join_timeout_ms: u64,
    /// Reader pause after a failed read
    pub reader_backoff_ms: u64,
    /// Decoder pause after a failed decode
    pub decoder_backoff_ms: u64,
    /// Decoder wait for a packet before rechecking the stop flag
    pub idle_wait_ms: u64,
    pub pixel_format: PixelFormat,
    /// Log per-packet events at debug level instead of trace
    pub debug: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            name: DEFAULT_NAME.to_string(),
            rtsp_transport: "tcp".to_string(),
            max_delay_us: 500_000,
            io_timeout_us: 2_000_000,
            buffer_capacity: 5,
            join_timeout_ms: 2000,
            reader_backoff_ms: 100,
            decoder_backoff_ms: 10,
            idle_wait_ms: 5,
            pixel_format: PixelFormat::Bgr24,
            debug: false,
        }
    }
}

impl StreamConfig {
    pub fn new(host: impl Into<String>, port: u16, name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            name: name.into(),
            ..Self::default()
        }
    }

    /// `rtsp://<host>:<port>/<name>`
    pub fn url(&self) -> String {
        format!(
            "rtsp://{}:{}/{}",
            self.host,
            self.port,
            self.name.trim_start_matches('/')
        )
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn reader_backoff(&self) -> Duration {
        Duration::from_millis(self.reader_backoff_ms)
    }

    pub fn decoder_backoff(&self) -> Duration {
        Duration::from_millis(self.decoder_backoff_ms)
    }

    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }

    pub fn validate(&self) -> Result<(), StreamError> {
        if self.buffer_capacity == 0 {
            return Err(StreamError::InvalidConfig(
                "buffer_capacity must be at least 1".into(),
            ));
        }
        if self.host.is_empty() {
            return Err(StreamError::InvalidConfig("host is empty".into()));
        }
        if self.idle_wait_ms == 0 {
            return Err(StreamError::InvalidConfig(
                "idle_wait_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_url() {
        assert_eq!(
            StreamConfig::default().url(),
            "rtsp://192.168.144.25:8554/main.264"
        );
    }

    #[test]
    fn test_url_with_leading_slash() {
        let config = StreamConfig::new("10.0.0.2", 554, "/live");
        assert_eq!(config.url(), "rtsp://10.0.0.2:554/live");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: StreamConfig =
            serde_json::from_str(r#"{"host": "127.0.0.1", "pixel_format": "rgb24"}"#).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.pixel_format, PixelFormat::Rgb24);
        assert_eq!(config.buffer_capacity, 5);
        assert_eq!(config.rtsp_transport, "tcp");
        assert_eq!(config.max_delay_us, 500_000);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = StreamConfig {
            buffer_capacity: 0,
            ..StreamConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StreamError::InvalidConfig(_))
        ));
    }
}
