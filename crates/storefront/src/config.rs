//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `PALETTE_DATA_DIR` - Directory holding the persisted records (default: `.palette`)
//! - `PALETTE_CATALOG_PATH` - JSON product catalog replacing the built-in one
//! - `PALETTE_LOG_FORMAT` - `pretty` or `json` (default: `pretty`)
//! - `PALETTE_HASH_COST` - Password hashing cost, `standard` or `low` (default: `standard`)

use std::path::PathBuf;

use thiserror::Error;

use crate::services::auth::HashCost;

const DEFAULT_DATA_DIR: &str = ".palette";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, coloured output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("expected pretty or json, got {s}")),
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontConfig {
    /// Directory for the file-backed store
    pub data_dir: PathBuf,
    /// Catalog file; the built-in catalog is used when unset
    pub catalog_path: Option<PathBuf>,
    /// Log output format
    pub log_format: LogFormat,
    /// Work factor for new password hashes
    pub hash_cost: HashCost,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            catalog_path: None,
            log_format: LogFormat::default(),
            hash_cost: HashCost::default(),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let data_dir = PathBuf::from(get_env_or_default(&lookup, "PALETTE_DATA_DIR", DEFAULT_DATA_DIR));

        let catalog_path = get_optional_env(&lookup, "PALETTE_CATALOG_PATH").map(PathBuf::from);

        let log_format = get_env_or_default(&lookup, "PALETTE_LOG_FORMAT", "pretty")
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::InvalidEnvVar("PALETTE_LOG_FORMAT".to_string(), e))?;

        let hash_cost = get_env_or_default(&lookup, "PALETTE_HASH_COST", "standard")
            .parse::<HashCost>()
            .map_err(|e| ConfigError::InvalidEnvVar("PALETTE_HASH_COST".to_string(), e))?;

        Ok(Self {
            data_dir,
            catalog_path,
            log_format,
            hash_cost,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable. Blank values count as unset.
fn get_optional_env(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get_optional_env(lookup, key).unwrap_or_else(|| default.to_string())
}
