//! # Marketplace Configuration
//!
//! Typed configuration for the persistence availability layer.
//!
//! ## Sources (lowest to highest precedence)
//!
//! 1. Built-in defaults (`MarketplaceConfig::default()`)
//! 2. `config/marketplace.toml`
//! 3. `config/marketplace.{environment}.toml`
//! 4. `MARKETPLACE__SECTION__KEY` environment variables
//! 5. `DATABASE_URL`
//!
//! An absent or blank database URL is not an error: it permanently disables
//! the database path and the process runs on the fallback store.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use marketplace_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let retry_limit = manager.config().database.retry_limit;
//! let bypass = manager.config().payments.bypass_failed_verification;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/marketplace.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    /// Database connection, retry and health probe settings
    pub database: DatabaseConfig,

    /// Fallback store persistence settings
    pub fallback: FallbackConfig,

    /// Purchase handling policy
    pub payments: PaymentsConfig,
}

impl MarketplaceConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        self.database.validate()?;
        self.fallback.validate()?;
        Ok(())
    }
}

/// Database connection and availability monitor configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection string; `None` means "never try"
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Bound on a single connection attempt, appended to the URL as `connect_timeout`
    pub connect_timeout_seconds: u64,
    /// Bound on acquiring a pooled connection for an ordinary query
    pub acquire_timeout_seconds: u64,
    /// Delay before the first attempt so the rest of the process can finish starting
    pub initial_delay_ms: u64,
    /// Retries after the first failed attempt
    pub retry_limit: u32,
    pub retry_interval_ms: u64,
    /// 1.0 keeps the interval fixed
    pub backoff_multiplier: f64,
    pub max_retry_interval_ms: u64,
    /// 0 disables the post-connect health probe
    pub health_check_interval_seconds: u64,
    /// Consecutive failed probes before the connection is considered lost
    pub health_failure_threshold: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            min_connections: 1,
            connect_timeout_seconds: 2,
            acquire_timeout_seconds: 3,
            initial_delay_ms: 500,
            retry_limit: 20,
            retry_interval_ms: 5_000,
            backoff_multiplier: 1.0,
            max_retry_interval_ms: 60_000,
            health_check_interval_seconds: 30,
            health_failure_threshold: 3,
        }
    }
}

impl DatabaseConfig {
    /// Configured URL, treating blank strings as absent
    pub fn database_url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|url| !url.is_empty())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn max_retry_interval(&self) -> Duration {
        Duration::from_millis(self.max_retry_interval_ms)
    }

    pub fn health_check_interval(&self) -> Option<Duration> {
        (self.health_check_interval_seconds > 0)
            .then(|| Duration::from_secs(self.health_check_interval_seconds))
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                "0",
                "must be greater than 0",
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigurationError::invalid_value(
                "database.min_connections",
                self.min_connections.to_string(),
                "must not exceed max_connections",
            ));
        }
        if self.connect_timeout_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.connect_timeout_seconds",
                "0",
                "a connection attempt needs a bounded, non-zero timeout",
            ));
        }
        if !(self.backoff_multiplier >= 1.0 && self.backoff_multiplier.is_finite()) {
            return Err(ConfigurationError::invalid_value(
                "database.backoff_multiplier",
                self.backoff_multiplier.to_string(),
                "must be a finite value >= 1.0",
            ));
        }
        if self.max_retry_interval_ms < self.retry_interval_ms {
            return Err(ConfigurationError::invalid_value(
                "database.max_retry_interval_ms",
                self.max_retry_interval_ms.to_string(),
                "must be at least retry_interval_ms",
            ));
        }
        if self.health_check_interval_seconds > 0 && self.health_failure_threshold == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.health_failure_threshold",
                "0",
                "must be greater than 0 when the health probe is enabled",
            ));
        }
        Ok(())
    }
}

/// Fallback store persistence configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub data_dir: PathBuf,
    pub blocks_file: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            blocks_file: "mock_blocks.json".to_string(),
        }
    }
}

impl FallbackConfig {
    pub fn blocks_path(&self) -> PathBuf {
        self.data_dir.join(&self.blocks_file)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.blocks_file.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "fallback.blocks_file",
                "",
                "file name must not be empty",
            ));
        }
        Ok(())
    }
}

/// Purchase handling policy
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PaymentsConfig {
    /// Credit the purchase even when store verification fails (logged at warn)
    pub bypass_failed_verification: bool,
    /// Accept purchases without a store token, tagged as test purchases
    pub allow_test_purchases: bool,
    /// Store application package name sent to the verifier
    pub package_name: String,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            bypass_failed_verification: false,
            allow_test_purchases: true,
            package_name: "com.isbitir.app".to_string(),
        }
    }
}
