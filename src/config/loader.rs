//! Configuration Loader
//!
//! Environment-aware loading on top of the `config` crate: layered TOML files,
//! prefixed environment variables, then the conventional `DATABASE_URL`.

use super::error::{ConfigResult, ConfigurationError};
use super::MarketplaceConfig;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Environment variable naming the deployment environment
pub const ENVIRONMENT_VAR: &str = "MARKETPLACE_ENV";
/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_VAR: &str = "MARKETPLACE_CONFIG_DIR";
/// Conventional connection string variable; wins over every file source
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

/// Loaded configuration plus the environment it was resolved for
#[derive(Debug)]
pub struct ConfigManager {
    config: MarketplaceConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        let directory = env::var(CONFIG_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"));
        Self::load_from_directory_with_env(&directory, &Self::detect_environment())
    }

    /// Load configuration from a specific directory with explicit environment
    ///
    /// Useful for tests that must not depend on the process environment name.
    pub fn load_from_directory_with_env(
        config_directory: &Path,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        debug!(
            environment = %environment,
            config_directory = %config_directory.display(),
            "Loading marketplace configuration"
        );

        let mut config: MarketplaceConfig = config::Config::builder()
            .add_source(
                config::File::from(config_directory.join("marketplace.toml")).required(false),
            )
            .add_source(
                config::File::from(config_directory.join(format!("marketplace.{environment}.toml")))
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix("MARKETPLACE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::load_error(environment, e))?
            .try_deserialize()
            .map_err(ConfigurationError::invalid_structure)?;

        if let Ok(url) = env::var(DATABASE_URL_VAR) {
            if !url.trim().is_empty() {
                config.database.url = Some(url);
            }
        }

        config.validate()?;

        crate::log_availability!(info, "CONFIG_LOADED",
            environment: environment,
            database_configured: config.database.database_url().is_some(),
            retry_limit: config.database.retry_limit,
            bypass_failed_verification: config.payments.bypass_failed_verification
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: config_directory.to_path_buf(),
        }))
    }

    /// Wrap an already-built configuration (tests, embedding)
    pub fn from_config(config: MarketplaceConfig, environment: &str) -> ConfigResult<Arc<Self>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: PathBuf::from("config"),
        }))
    }

    pub fn config(&self) -> &MarketplaceConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    pub fn detect_environment() -> String {
        env::var(ENVIRONMENT_VAR).unwrap_or_else(|_| "development".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_environment_file_overrides_base() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("marketplace.toml"),
            "[database]\nretry_limit = 7\n\n[payments]\nallow_test_purchases = false\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("marketplace.staging.toml"),
            "[database]\nretry_limit = 3\n",
        )
        .unwrap();

        let manager = ConfigManager::load_from_directory_with_env(dir.path(), "staging").unwrap();
        assert_eq!(manager.environment(), "staging");
        assert_eq!(manager.config().database.retry_limit, 3);
        assert!(!manager.config().payments.allow_test_purchases);
        // Untouched fields keep their defaults
        assert_eq!(manager.config().database.retry_interval_ms, 5_000);
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("marketplace.toml"),
            "[database]\nmax_connections = 0\n",
        )
        .unwrap();

        let result = ConfigManager::load_from_directory_with_env(dir.path(), "test");
        assert!(matches!(result, Err(ConfigurationError::InvalidValue { .. })));
    }
}
