//! GDS configuration
//!
//! Loaded from TOML. Every section is optional; a missing section falls back
//! to the built-in defaults (SocketCAN on `can0`, 1 s response timeout, the
//! default Ford module table).
//!
//! ```toml
//! [bus]
//! type = "socketcan"
//! interface = "can0"
//!
//! [transport]
//! response_timeout_ms = 1000
//! flow_control_timeout_ms = 1000
//!
//! [[modules]]
//! name = "PCM"
//! request_id = "0x7E0"
//! response_id = "0x7E8"
//!
//! [broadcast]
//! "0x6F6" = "PCM IMMO"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GdsConfig {
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub services: ServiceConfig,
    /// Module table; empty keeps the built-in table
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
    /// Broadcast id (hex string) to display label; empty keeps the built-in labels
    #[serde(default)]
    pub broadcast: BTreeMap<String, String>,
}

impl GdsConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

// =============================================================================
// Bus Configuration
// =============================================================================

/// Bus adapter selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BusConfig {
    /// Raw classic CAN socket (Linux only)
    SocketCan(SocketCanConfig),
    /// In-process simulated ECU
    Mock(MockConfig),
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::SocketCan(SocketCanConfig::default())
    }
}

/// SocketCAN configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketCanConfig {
    /// CAN interface name (e.g., "can0")
    #[serde(default = "default_interface")]
    pub interface: String,
}

impl Default for SocketCanConfig {
    fn default() -> Self {
        Self {
            interface: default_interface(),
        }
    }
}

fn default_interface() -> String {
    "can0".to_string()
}

/// Mock bus configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MockConfig {
    /// Block size the simulated ECU grants in its flow-control frames
    #[serde(default)]
    pub block_size: u8,
    /// Raw STmin byte the simulated ECU grants
    #[serde(default)]
    pub st_min: u8,
    /// Delay before each simulated reply frame
    #[serde(default)]
    pub latency_ms: u64,
}

// =============================================================================
// Transport Configuration
// =============================================================================

/// ISO-TP timing and padding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Deadline for a complete response
    #[serde(default = "default_response_timeout")]
    pub response_timeout_ms: u64,
    /// Deadline for each flow-control frame while sending, independent of
    /// the response deadline
    #[serde(default = "default_flow_control_timeout")]
    pub flow_control_timeout_ms: u64,
    /// Slice used when polling the bus
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Byte used to pad transmitted frames to 8 bytes
    #[serde(default)]
    pub padding: u8,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: default_response_timeout(),
            flow_control_timeout_ms: default_flow_control_timeout(),
            poll_interval_ms: default_poll_interval(),
            padding: 0x00,
        }
    }
}

impl TransportConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn flow_control_timeout(&self) -> Duration {
        Duration::from_millis(self.flow_control_timeout_ms)
    }

    /// Poll slice, never zero
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

fn default_response_timeout() -> u64 {
    1000
}

fn default_flow_control_timeout() -> u64 {
    1000
}

fn default_poll_interval() -> u64 {
    50
}

// =============================================================================
// Service Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Quiet period after a positive ECUReset while the ECU re-initialises
    #[serde(default = "default_reset_grace")]
    pub reset_grace_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            reset_grace_ms: default_reset_grace(),
        }
    }
}

impl ServiceConfig {
    pub fn reset_grace(&self) -> Duration {
        Duration::from_millis(self.reset_grace_ms)
    }
}

fn default_reset_grace() -> u64 {
    750
}

// =============================================================================
// Module Table
// =============================================================================

/// One module entry; ids are strings so "0x7E0" and "2016" both parse
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub name: String,
    pub request_id: String,
    pub response_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = GdsConfig::from_toml_str("").unwrap();
        match &config.bus {
            BusConfig::SocketCan(cfg) => assert_eq!(cfg.interface, "can0"),
            other => panic!("unexpected bus config: {:?}", other),
        }
        assert_eq!(config.transport.response_timeout(), Duration::from_secs(1));
        assert_eq!(
            config.transport.flow_control_timeout(),
            Duration::from_secs(1)
        );
        assert_eq!(config.transport.poll_interval_ms, 50);
        assert_eq!(config.transport.padding, 0x00);
        assert_eq!(config.services.reset_grace(), Duration::from_millis(750));
        assert!(config.modules.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [bus]
            type = "mock"
            block_size = 4
            st_min = 0xF5

            [transport]
            response_timeout_ms = 2500
            padding = 0xAA

            [services]
            reset_grace_ms = 100

            [[modules]]
            name = "TCM"
            request_id = "0x7E1"
            response_id = "0x7E9"

            [broadcast]
            "0x3B3" = "BCM"
        "#;

        let config = GdsConfig::from_toml_str(toml).unwrap();
        match &config.bus {
            BusConfig::Mock(cfg) => {
                assert_eq!(cfg.block_size, 4);
                assert_eq!(cfg.st_min, 0xF5);
                assert_eq!(cfg.latency_ms, 0);
            }
            other => panic!("unexpected bus config: {:?}", other),
        }
        assert_eq!(config.transport.response_timeout_ms, 2500);
        assert_eq!(config.transport.flow_control_timeout_ms, 1000);
        assert_eq!(config.transport.padding, 0xAA);
        assert_eq!(config.services.reset_grace_ms, 100);
        assert_eq!(config.modules[0].name, "TCM");
        assert_eq!(config.broadcast.get("0x3B3").map(String::as_str), Some("BCM"));
    }

    #[test]
    fn test_unknown_bus_type_is_error() {
        let result = GdsConfig::from_toml_str("[bus]\ntype = \"doip\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[bus]\ntype = \"socketcan\"\ninterface = \"vcan0\"").unwrap();

        let config = GdsConfig::load(file.path()).unwrap();
        match config.bus {
            BusConfig::SocketCan(cfg) => assert_eq!(cfg.interface, "vcan0"),
            other => panic!("unexpected bus config: {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let result = GdsConfig::load("/nonexistent/gds.toml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
