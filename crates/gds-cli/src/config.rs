//! Configuration file handling for gds-cli

use anyhow::{Context, Result};
use gds_core::config::{BusConfig, MockConfig, SocketCanConfig};
use gds_core::GdsConfig;
use std::path::{Path, PathBuf};

/// Command-line values that win over the config file
#[derive(Debug, Default)]
pub struct Overrides {
    pub interface: Option<String>,
    pub mock: bool,
    pub timeout_ms: Option<u64>,
}

/// Load the config from `path`, or from the default location if it exists,
/// then apply command-line overrides
pub fn load_config(path: Option<&PathBuf>, overrides: &Overrides) -> Result<GdsConfig> {
    let mut config = match path {
        Some(path) => load_from(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => load_from(&path)?,
            _ => GdsConfig::default(),
        },
    };

    apply_overrides(&mut config, overrides);
    Ok(config)
}

fn load_from(path: &Path) -> Result<GdsConfig> {
    GdsConfig::load(path).with_context(|| format!("Failed to load config file: {}", path.display()))
}

/// Default config file path (~/.config/gds-cli/config.toml on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gds-cli").join("config.toml"))
}

fn apply_overrides(config: &mut GdsConfig, overrides: &Overrides) {
    if overrides.mock {
        config.bus = BusConfig::Mock(MockConfig::default());
    } else if let Some(interface) = &overrides.interface {
        config.bus = BusConfig::SocketCan(SocketCanConfig {
            interface: interface.clone(),
        });
    }

    if let Some(timeout_ms) = overrides.timeout_ms {
        config.transport.response_timeout_ms = timeout_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_overrides_win() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[bus]\ntype = \"socketcan\"\ninterface = \"can1\"\n\n[transport]\nresponse_timeout_ms = 500"
        )
        .unwrap();
        let path = file.path().to_path_buf();

        let config = load_config(Some(&path), &Overrides::default()).unwrap();
        assert!(matches!(&config.bus, BusConfig::SocketCan(c) if c.interface == "can1"));
        assert_eq!(config.transport.response_timeout_ms, 500);

        let overrides = Overrides {
            interface: Some("vcan0".to_string()),
            mock: false,
            timeout_ms: Some(2000),
        };
        let config = load_config(Some(&path), &overrides).unwrap();
        assert!(matches!(&config.bus, BusConfig::SocketCan(c) if c.interface == "vcan0"));
        assert_eq!(config.transport.response_timeout_ms, 2000);
    }

    #[test]
    fn test_mock_override() {
        let mut config = GdsConfig::default();
        apply_overrides(
            &mut config,
            &Overrides {
                mock: true,
                ..Default::default()
            },
        );
        assert!(matches!(config.bus, BusConfig::Mock(_)));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let path = PathBuf::from("/nonexistent/gds.toml");
        assert!(load_config(Some(&path), &Overrides::default()).is_err());
    }
}
