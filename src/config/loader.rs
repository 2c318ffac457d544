//! Configuration Loader
//!
//! Environment-aware loading: defaults, then `lifecycle.toml`, then
//! `lifecycle.{env}.toml`, then `LIFECYCLE__*` environment variables.

use super::error::ConfigResult;
use super::LifecycleConfig;
use crate::constants;
use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Loaded, validated configuration plus where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: LifecycleConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment.
    /// Useful in tests, which should not modify global environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let config = Self::load_and_merge_config(&config_directory, environment)?;
        config.validate()?;

        info!(
            environment = environment,
            retry_budget_ms = config.retry.max_elapsed_ms,
            poll_interval_ms = config.polling.poll_interval_ms,
            wait_timeout_ms = config.polling.wait_timeout_ms,
            "⚙️ CONFIG: Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration (tests, embedding callers)
    pub fn from_config(config: LifecycleConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
            config_directory: Self::default_config_directory(),
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
    ) -> ConfigResult<LifecycleConfig> {
        let base_file = config_directory.join(format!("{}.toml", constants::CONFIG_FILE_STEM));
        let env_file = config_directory.join(format!(
            "{}.{environment}.toml",
            constants::CONFIG_FILE_STEM
        ));

        debug!(
            base = %base_file.display(),
            overrides = %env_file.display(),
            "Merging configuration layers"
        );

        let merged = Config::builder()
            .add_source(Config::try_from(&LifecycleConfig::default())?)
            .add_source(File::from(base_file).required(false))
            .add_source(File::from(env_file).required(false))
            .add_source(
                Environment::with_prefix(constants::ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(merged.try_deserialize()?)
    }

    /// Detect the configuration environment from environment variables
    pub fn detect_environment() -> String {
        env::var(constants::ENVIRONMENT_VAR)
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| constants::DEFAULT_ENVIRONMENT.to_string())
            .to_lowercase()
    }

    /// `./config` under the current directory
    fn default_config_directory() -> PathBuf {
        env::current_dir()
            .map(|dir| dir.join("config"))
            .unwrap_or_else(|_| PathBuf::from("config"))
    }
}
