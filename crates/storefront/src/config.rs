//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `FORKFUL_DATA_DIR` - Directory for cart snapshots (default: `.forkful`)
//! - `FORKFUL_DELIVERY_FEE` - Delivery fee in paise (default: 4000)
//! - `FORKFUL_TAXES` - Flat taxes in paise (default: 2500)
//! - `FORKFUL_CATALOG_PATH` - YAML menu file (default: bundled menu)
//! - `FORKFUL_PERSISTENCE` - `enabled` or `disabled` (default: enabled)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::path::PathBuf;
use std::str::FromStr;

use forkful_core::{Money, Surcharges};
use thiserror::Error;

const DEFAULT_DATA_DIR: &str = ".forkful";
const DEFAULT_DELIVERY_FEE: &str = "4000";
const DEFAULT_TAXES: &str = "2500";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {}: {}", .0.display(), .1)]
    Unreadable(PathBuf, std::io::Error),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Whether cart snapshots are written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistenceMode {
    /// Snapshots go to the data directory.
    #[default]
    Enabled,
    /// Storage behaves as unavailable; carts live for the session only.
    Disabled,
}

impl FromStr for PersistenceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enabled" => Ok(Self::Enabled),
            "disabled" => Ok(Self::Disabled),
            other => Err(format!("expected 'enabled' or 'disabled', got '{other}'")),
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Directory for cart snapshots
    pub data_dir: PathBuf,
    /// Delivery fee and taxes added to every order
    pub surcharges: Surcharges,
    /// Menu file; the bundled menu is used when unset
    pub catalog_path: Option<PathBuf>,
    /// Whether snapshots are persisted
    pub persistence: PersistenceMode,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            surcharges: Surcharges::new(Money::from_minor(4000), Money::from_minor(2500)),
            catalog_path: None,
            persistence: PersistenceMode::Enabled,
            sentry_dsn: None,
            sentry_environment: None,
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
    /// Returns `ConfigError::InvalidEnvVar` if a variable is set to a value
    /// that cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a variable is set to a value
    /// that cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let data_dir = PathBuf::from(
            optional("FORKFUL_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
        );
        let delivery_fee = parse_money(
            "FORKFUL_DELIVERY_FEE",
            &optional("FORKFUL_DELIVERY_FEE").unwrap_or_else(|| DEFAULT_DELIVERY_FEE.to_string()),
        )?;
        let taxes = parse_money(
            "FORKFUL_TAXES",
            &optional("FORKFUL_TAXES").unwrap_or_else(|| DEFAULT_TAXES.to_string()),
        )?;
        let persistence = optional("FORKFUL_PERSISTENCE")
            .map(|value| {
                value.parse::<PersistenceMode>().map_err(|e| {
                    ConfigError::InvalidEnvVar("FORKFUL_PERSISTENCE".to_string(), e)
                })
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            data_dir,
            surcharges: Surcharges::new(delivery_fee, taxes),
            catalog_path: optional("FORKFUL_CATALOG_PATH").map(PathBuf::from),
            persistence,
            sentry_dsn: optional("SENTRY_DSN"),
            sentry_environment: optional("SENTRY_ENVIRONMENT"),
        })
    }
}

/// Parse a non-negative amount in minor units.
fn parse_money(key: &str, value: &str) -> Result<Money, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Money::from_minor)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
