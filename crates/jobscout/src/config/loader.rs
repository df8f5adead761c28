use std::path::{Path, PathBuf};

use crate::config::schema::Config;
use crate::error::ConfigError;

/// Environment variable that replaces `api.baseUrl`.
pub const API_URL_ENV: &str = "JOBSCOUT_API_URL";

pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".jobscout").join("config.json"))
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Loads `path` if given, else the default file if it exists, else defaults.
/// The API URL environment override is applied last.
pub fn resolve_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(default) => {
                log::debug!("Using config file {}", default.display());
                load_config(default)?
            }
            None => Config::default(),
        },
    };

    if let Ok(url) = std::env::var(API_URL_ENV) {
        apply_api_url_override(&mut config, &url)?;
    }
    Ok(config)
}

fn apply_api_url_override(config: &mut Config, url: &str) -> Result<(), ConfigError> {
    let url = url.trim();
    if url.is_empty() {
        return Ok(());
    }
    config.api.base_url = url.to_string();
    validate_config(config)
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let base_url = &config.api.base_url;
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::Validation {
            message: format!("api.baseUrl must be an absolute http(s) URL: {}", base_url),
        });
    }
    if base_url.trim_start_matches("http://").trim_start_matches("https://").is_empty() {
        return Err(ConfigError::Validation {
            message: "api.baseUrl has no host".to_string(),
        });
    }

    if !config.api.run_path.starts_with('/') {
        return Err(ConfigError::Validation {
            message: format!("api.runPath must start with '/': {}", config.api.run_path),
        });
    }

    if config.api.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "api.connectTimeoutSecs must be greater than zero".to_string(),
        });
    }

    if config.broadcast_capacity == 0 {
        return Err(ConfigError::Validation {
            message: "broadcastCapacity must be greater than zero".to_string(),
        });
    }

    for (key, name) in [
        ("jobs", &config.collections.jobs),
        ("schedules", &config.collections.schedules),
        ("datasources", &config.collections.datasources),
    ] {
        if name.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: format!("collections.{} must not be empty", key),
            });
        }
    }

    Ok(())
}
