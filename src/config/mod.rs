//! # Configuration Management Module
//!
//! Loads and writes the console's TOML configuration. Every field has a
//! default, so a partial file (or a file holding only `[meshtastic] port`) is a
//! valid configuration.
//!
//! ## Configuration Structure
//!
//! - [`ConsoleConfig`] - acknowledgment timeout, online threshold, periodic
//!   online report, colours, packet display filter, broadcast channel
//! - [`MeshtasticConfig`] - serial device and link keepalive settings
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use meshconsole::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("meshconsole.toml").await?;
//!     let config = Config::load("meshconsole.toml").await?;
//!     println!("Serial Port: {}", config.meshtastic.port);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [console]
//! ack_timeout_secs = 15
//! online_threshold_secs = 1800
//! online_report_interval_secs = 900
//! color = true
//! hidden_ports = ["ROUTING"]
//! default_channel = 0
//!
//! [meshtastic]
//! port = "/dev/ttyUSB0"
//! baud_rate = 115200
//! config_timeout_secs = 10
//! heartbeat_interval_secs = 300
//!
//! [logging]
//! level = "warn"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub meshtastic: MeshtasticConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// How long a direct message waits for its routing acknowledgment.
    #[serde(default = "default_ack_timeout_secs")]
    pub ack_timeout_secs: u64,
    /// Nodes heard within this window count as online.
    #[serde(default = "default_online_threshold_secs")]
    pub online_threshold_secs: u64,
    /// Interval of the unsolicited online-node report; 0 disables it.
    #[serde(default = "default_online_report_interval_secs")]
    pub online_report_interval_secs: u64,
    #[serde(default = "default_true")]
    pub color: bool,
    /// Packet types not shown in the traffic view (e.g. "ROUTING", "TELEMETRY").
    #[serde(default = "default_hidden_ports")]
    pub hidden_ports: Vec<String>,
    /// Channel index used for broadcasts until `channel set` picks another.
    #[serde(default)]
    pub default_channel: u32,
}

fn default_ack_timeout_secs() -> u64 {
    15
}

fn default_online_threshold_secs() -> u64 {
    30 * 60
}

fn default_online_report_interval_secs() -> u64 {
    15 * 60
}

fn default_true() -> bool {
    true
}

fn default_hidden_ports() -> Vec<String> {
    vec!["ROUTING".to_string()]
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            ack_timeout_secs: default_ack_timeout_secs(),
            online_threshold_secs: default_online_threshold_secs(),
            online_report_interval_secs: default_online_report_interval_secs(),
            color: true,
            hidden_ports: default_hidden_ports(),
            default_channel: 0,
        }
    }
}

impl ConsoleConfig {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_secs(self.ack_timeout_secs)
    }

    pub fn online_threshold(&self) -> Duration {
        Duration::from_secs(self.online_threshold_secs)
    }

    /// `None` when the periodic report is switched off.
    pub fn online_report_interval(&self) -> Option<Duration> {
        if self.online_report_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.online_report_interval_secs))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshtasticConfig {
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// How long to wait for the radio to finish streaming its node database.
    #[serde(default = "default_config_timeout_secs")]
    pub config_timeout_secs: u64,
    /// Keepalive heartbeat interval; 0 disables heartbeats.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
}

fn default_port() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud_rate() -> u32 {
    115200
}

fn default_config_timeout_secs() -> u64 {
    10
}

fn default_heartbeat_interval_secs() -> u64 {
    300
}

impl Default for MeshtasticConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            config_timeout_secs: default_config_timeout_secs(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub async fn load_or_default(path: &str) -> Result<Self> {
        if fs::try_exists(path).await.unwrap_or(false) {
            Self::load(path).await
        } else {
            log::debug!("Config file {} not found; using defaults", path);
            Ok(Self::default())
        }
    }

    /// Write a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.console.ack_timeout(), Duration::from_secs(15));
        assert_eq!(cfg.console.online_threshold(), Duration::from_secs(1800));
        assert_eq!(
            cfg.console.online_report_interval(),
            Some(Duration::from_secs(900))
        );
        assert_eq!(cfg.console.hidden_ports, vec!["ROUTING".to_string()]);
        assert_eq!(cfg.meshtastic.baud_rate, 115200);
        assert_eq!(cfg.logging.level, "warn");
    }

    #[test]
    fn zero_report_interval_disables_report() {
        let cfg: Config = toml::from_str("[console]\nonline_report_interval_secs = 0\n").unwrap();
        assert_eq!(cfg.console.online_report_interval(), None);
        assert_eq!(cfg.console.ack_timeout_secs, 15);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.meshtastic.port, "/dev/ttyUSB0");
        assert!(cfg.console.color);
    }
}
