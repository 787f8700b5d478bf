//! Configuration management for AadhaarChain

use crate::blockchain::DEFAULT_DIFFICULTY;
use crate::error::ChainError;
use crate::miner::{DEFAULT_MAX_NONCE, MAX_DIFFICULTY};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub otp: OtpConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    #[serde(default = "default_max_nonce")]
    pub max_nonce: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            max_nonce: default_max_nonce(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct OtpConfig {
    /// Return the issued code in the API response. Only sensible while no
    /// out-of-band delivery channel exists.
    #[serde(default = "default_reveal_in_response")]
    pub reveal_in_response: bool,
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            reveal_in_response: default_reveal_in_response(),
            purge_interval_secs: default_purge_interval_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_difficulty() -> usize {
    DEFAULT_DIFFICULTY
}

fn default_max_nonce() -> u64 {
    DEFAULT_MAX_NONCE
}

fn default_reveal_in_response() -> bool {
    true
}

fn default_purge_interval_secs() -> u64 {
    30
}

/// Load `config.toml` from the working directory, falling back to defaults
/// when it is absent. `PORT` overrides `server.port`.
pub fn load_config() -> Result<Config, ChainError> {
    let config_str = fs::read_to_string("config.toml").unwrap_or_default();
    let mut config: Config = if config_str.is_empty() {
        Config::default()
    } else {
        toml::from_str(&config_str)?
    };

    apply_env_overrides(&mut config);
    validate(&config)?;
    Ok(config)
}

/// Load an explicit configuration file; a missing file is an error.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let path = path.as_ref();
    let config_str = fs::read_to_string(path).map_err(|e| {
        ChainError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let mut config: Config = toml::from_str(&config_str)?;

    apply_env_overrides(&mut config);
    validate(&config)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
        config.server.port = port;
    }
}

pub fn validate(config: &Config) -> Result<(), ChainError> {
    if config.ledger.difficulty > MAX_DIFFICULTY {
        return Err(ChainError::ConfigError(format!(
            "ledger.difficulty must be at most {}",
            MAX_DIFFICULTY
        )));
    }

    if config.ledger.max_nonce == 0 && config.ledger.difficulty > 0 {
        return Err(ChainError::ConfigError(
            "ledger.max_nonce must be greater than zero".to_string(),
        ));
    }

    if config.server.port == 0 {
        return Err(ChainError::ConfigError("server.port must be set".to_string()));
    }

    if config.otp.purge_interval_secs == 0 {
        return Err(ChainError::ConfigError(
            "otp.purge_interval_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}
