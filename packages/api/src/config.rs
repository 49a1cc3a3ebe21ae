//! Client configuration loading: `rewardsy.toml`, `.env`, then environment overrides.

use std::path::Path;

use store::ClientConfig;
use thiserror::Error;

pub const ENV_API_URL: &str = "REWARDSY_API_URL";
pub const ENV_API_TIMEOUT_SECS: &str = "REWARDSY_API_TIMEOUT_SECS";
pub const ENV_STORAGE_DIR: &str = "REWARDSY_STORAGE_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid value for {var}: {value}")]
    Env { var: &'static str, value: String },
}

/// Load the client configuration.
///
/// Starts from the TOML file at `path` when it exists (a missing file means
/// defaults), then applies `REWARDSY_*` variables from the process environment
/// or a `.env` file.
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    dotenvy::dotenv().ok();
    let config = read_config_file(path)?;
    apply_overrides(config, |var| std::env::var(var).ok())
}

/// Read the TOML file at `path`, or defaults when there is none.
pub fn read_config_file(path: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    match path {
        Some(path) if path.exists() => {
            let text = std::fs::read_to_string(path)?;
            Ok(ClientConfig::from_toml(&text)?)
        }
        _ => Ok(ClientConfig::default()),
    }
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_overrides(
    mut config: ClientConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ClientConfig, ConfigError> {
    if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
        config.api.base_url = url.trim().to_string();
    }

    if let Some(value) = lookup(ENV_API_TIMEOUT_SECS) {
        config.api.timeout_secs = value.trim().parse().map_err(|_| ConfigError::Env {
            var: ENV_API_TIMEOUT_SECS,
            value,
        })?;
    }

    if let Some(dir) = lookup(ENV_STORAGE_DIR) {
        config.storage.dir = dir;
    }

    Ok(config)
}
