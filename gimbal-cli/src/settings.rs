//! Layered settings: defaults, then an optional JSON file, then flags

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use gimbal_control::ControlConfig;
use gimbal_stream::StreamConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub control: ControlConfig,
    pub stream: StreamConfig,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid settings file {}", path.display()))
    }

    /// Point both channels at one camera address
    pub fn set_host(&mut self, host: &str) {
        self.control.host = host.to_string();
        self.stream.host = host.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_override_defaults() {
        let settings: Settings = serde_json::from_str(
            r#"{
                "control": { "recv_timeout_ms": 250 },
                "stream": { "name": "sub.264", "buffer_capacity": 3 }
            }"#,
        )
        .unwrap();

        assert_eq!(settings.control.recv_timeout_ms, 250);
        assert_eq!(settings.control.port, 37260);
        assert_eq!(settings.stream.name, "sub.264");
        assert_eq!(settings.stream.buffer_capacity, 3);
        assert_eq!(settings.stream.port, 8554);
    }

    #[test]
    fn test_set_host_updates_both() {
        let mut settings = Settings::default();
        settings.set_host("10.1.1.5");
        assert_eq!(settings.control.host, "10.1.1.5");
        assert_eq!(settings.stream.url(), "rtsp://10.1.1.5:8554/main.264");
    }

    #[test]
    fn test_missing_file() {
        let err = Settings::load(Path::new("/nonexistent/gimbal.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
