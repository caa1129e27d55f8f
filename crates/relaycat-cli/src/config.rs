//! Optional configuration at `~/.relaycat/config.toml`.
//!
//! CLI flags always override config file values.

use anyhow::{bail, Context, Result};
use relaycat_core::DEFAULT_BUFFER_SIZE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level config file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Relay session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Transfer buffer per copy task. Also the largest UDP datagram relayed
    /// without truncation.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Default log filter when neither `RUST_LOG` nor `-v` is given.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            log_level: default_log_level(),
        }
    }
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file, returning defaults if the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;

        if config.relay.buffer_size == 0 {
            bail!("relay.buffer_size must be greater than 0 in {}", path.display());
        }

        Ok(config)
    }

    /// `~/.relaycat/config.toml`.
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_default();
        home.join(".relaycat").join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_values() {
        let cfg = Config::default();
        assert_eq!(cfg.relay.buffer_size, 1024);
        assert_eq!(cfg.relay.log_level, "info");
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[relay]
buffer_size = 65536
log_level = "debug"
"#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.relay.buffer_size, 65536);
        assert_eq!(cfg.relay.log_level, "debug");
    }

    #[test]
    fn parse_partial_toml_config() {
        let cfg: Config = toml::from_str("[relay]\nlog_level = \"warn\"\n").unwrap();
        assert_eq!(cfg.relay.buffer_size, 1024); // default
        assert_eq!(cfg.relay.log_level, "warn");

        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.relay.buffer_size, 1024);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.relay.buffer_size, 1024);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[relay]\nbuffer_size = 2048").unwrap();
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.relay.buffer_size, 2048);
    }

    #[test]
    fn zero_buffer_size_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[relay]\nbuffer_size = 0").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[relay\nbuffer_size = ").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn default_path_ends_in_relaycat_dir() {
        let path = Config::default_path();
        assert!(path.ends_with(".relaycat/config.toml"));
    }
}
