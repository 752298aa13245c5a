//! Server configuration, loaded from a TOML file.
//!
//! Every field has a default, so an empty file (or a missing section) is
//! a valid configuration.

use crate::state::MatchTiming;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub listen: ListenConfig,
    pub matchmaking: MatchmakingConfig,
    pub sweep: SweepConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Name used in log lines.
    pub name: String,
    /// Port for the status/metrics HTTP endpoint. 0 disables it.
    pub status_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// Address the WebSocket listener binds to.
    pub address: SocketAddr,
    /// Allowed Origin header values for the WebSocket handshake.
    /// Empty means all origins are allowed.
    pub allow_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchmakingConfig {
    /// Delay before an abandoned partner re-enters the waiting pool.
    pub settle_delay_ms: u64,
    /// Further delay before its next match attempt.
    pub rematch_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Seconds between cleanup sweeps.
    pub interval_secs: u64,
    /// Seconds between operational stats log lines.
    pub stats_log_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "duetd".to_string(),
            status_port: 0,
        }
    }
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:8080".parse().expect("valid default address"),
            allow_origins: Vec::new(),
        }
    }
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 500,
            rematch_delay_ms: 1000,
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            stats_log_secs: 60,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}

impl MatchmakingConfig {
    pub fn timing(&self) -> MatchTiming {
        MatchTiming {
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            rematch_delay: Duration::from_millis(self.rematch_delay_ms),
        }
    }
}

impl SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_log_secs)
    }
}
