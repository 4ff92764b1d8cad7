//! services/api/src/config.rs
//!
//! Defines the service's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use flower_timer_core::DEFAULT_STORAGE_KEY;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Directory holding the persisted document.
    pub data_dir: PathBuf,
    pub storage_key: String,
    pub log_level: Level,
    /// How often the tick driver wakes up, standing in for a display refresh.
    pub tick_interval: Duration,
    pub cors_origin: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 3000)),
            data_dir: PathBuf::from("./data"),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            log_level: Level::INFO,
            tick_interval: Duration::from_millis(100),
            cors_origin: "http://localhost:3000".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        // --- Server Settings ---
        let bind_address = match lookup("BIND_ADDRESS") {
            Some(raw) => raw.parse::<SocketAddr>().map_err(|e| {
                ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
            })?,
            None => defaults.bind_address,
        };

        let cors_origin = lookup("CORS_ORIGIN").unwrap_or(defaults.cors_origin);

        // --- Storage Settings ---
        let data_dir = lookup("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let storage_key = lookup("STORAGE_KEY").unwrap_or(defaults.storage_key);
        if storage_key.trim().is_empty()
            || storage_key.contains(|c: char| matches!(c, '/' | '\\'))
        {
            return Err(ConfigError::InvalidValue(
                "STORAGE_KEY".to_string(),
                format!("'{}' cannot be used as a file name", storage_key),
            ));
        }

        // --- Timer Settings ---
        let tick_interval = match lookup("TICK_INTERVAL_MS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    return Err(ConfigError::InvalidValue(
                        "TICK_INTERVAL_MS".to_string(),
                        format!("'{}' is not a positive number of milliseconds", raw),
                    ))
                }
            },
            None => defaults.tick_interval,
        };

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            data_dir,
            storage_key,
            log_level,
            tick_interval,
            cors_origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(config.storage_key, "flowerPomodoro");
        assert_eq!(config.tick_interval, Duration::from_millis(100));
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("BIND_ADDRESS", "0.0.0.0:8080"),
            ("DATA_DIR", "/tmp/garden"),
            ("TICK_INTERVAL_MS", "16"),
            ("RUST_LOG", "debug"),
        ]))
        .unwrap();
        assert_eq!(config.bind_address.port(), 8080);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/garden"));
        assert_eq!(config.tick_interval, Duration::from_millis(16));
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for vars in [
            [("TICK_INTERVAL_MS", "0")],
            [("TICK_INTERVAL_MS", "fast")],
            [("BIND_ADDRESS", "nowhere")],
            [("RUST_LOG", "chatty")],
            [("STORAGE_KEY", "../escape")],
        ] {
            let err = Config::from_lookup(lookup(&vars)).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue(..)), "{:?}", vars);
        }
    }
}
