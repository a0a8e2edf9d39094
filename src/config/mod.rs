//! # Configuration Module
//!
//! Deployment settings loaded from environment variables. Contract
//! constants (XP amounts, badge thresholds, the daily challenge goal)
//! are code, not configuration; only values that legitimately vary
//! per deployment live here.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `VIBEPASS_GAME_DATA_ROOT` | Store namespace holding user documents | `users` |
//! | `VIBEPASS_OFFLINE_CACHE_KEY` | Local-storage key for the ticket blob | `ingressosOffline` |
//! | `VIBEPASS_MIN_FREE_SPACE_MB` | Free space required before a download | `200` |

use std::env;
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has a value that does not parse.
    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

/// Settings consumed by the progression engine and the offline cache.
///
/// ## Example
///
/// ```rust
/// use vibepass_core::config::AppConfig;
///
/// let config = AppConfig::default();
/// assert_eq!(config.min_free_space_mb, 200);
/// ```
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Document-store namespace under which per-user game data lives
    /// (`<root>/<userId>/gameData`).
    pub game_data_root: String,

    /// Single fixed local-storage key holding the serialized offline
    /// ticket list.
    pub offline_cache_key: String,

    /// Hard floor of free local storage, in MB, required before an
    /// offline download may be attempted.
    pub min_free_space_mb: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            game_data_root: "users".to_string(),
            offline_cache_key: "ingressosOffline".to_string(),
            min_free_space_mb: 200,
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment, honoring a `.env` file
    /// when present. Unset variables fall back to their defaults.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Load configuration from already-set environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            game_data_root: get_env_or_default("VIBEPASS_GAME_DATA_ROOT", &defaults.game_data_root),
            offline_cache_key: get_env_or_default(
                "VIBEPASS_OFFLINE_CACHE_KEY",
                &defaults.offline_cache_key,
            ),
            min_free_space_mb: get_env_or_default(
                "VIBEPASS_MIN_FREE_SPACE_MB",
                &defaults.min_free_space_mb.to_string(),
            )
            .parse()
            .map_err(|e| {
                ConfigError::ParseError("VIBEPASS_MIN_FREE_SPACE_MB".to_string(), format!("{}", e))
            })?,
        })
    }
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
