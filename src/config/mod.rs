//! # Lifecycle Configuration
//!
//! Explicit, validated settings for the retry executor, the status waiter and
//! the orchestrator. Nothing reads global state at call time: configuration is
//! loaded once and converted into the settings structs each component takes.
//!
//! ## Layering
//!
//! 1. Built-in defaults
//! 2. `lifecycle.toml` in the configuration directory
//! 3. `lifecycle.{environment}.toml`
//! 4. `LIFECYCLE__*` environment variables (`__` separates nested keys)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use provider_lifecycle::config::ConfigManager;
//! use provider_lifecycle::remote::EntityKind;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let policy = manager.config().retry_policy();
//! let timing = manager.config().wait_timing(EntityKind::MigrationTask);
//! # let _ = (policy, timing);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

use crate::constants;
use crate::polling::WaitTiming;
use crate::remote::EntityKind;
use crate::resilience::{BackoffShape, RetryPolicy, StandardErrorClassifier};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    pub retry: RetryConfig,
    pub polling: PollingConfig,
    /// Optional outer deadline for a whole CRUD operation
    pub operation_timeout_ms: Option<u64>,
    /// Per-kind timing overrides keyed by kind name (`migration_task`, `cluster`, ...)
    pub entities: HashMap<String, EntityTimingConfig>,
    pub events: EventsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_elapsed_ms: u64,
    pub backoff: BackoffShape,
    /// Error codes treated as retryable in addition to the built-in families
    pub retryable_codes: Vec<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_elapsed_ms: constants::DEFAULT_RETRY_MAX_ELAPSED_MS,
            backoff: BackoffShape::default(),
            retryable_codes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub poll_interval_ms: u64,
    pub wait_timeout_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: constants::DEFAULT_POLL_INTERVAL_MS,
            wait_timeout_ms: constants::DEFAULT_WAIT_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityTimingConfig {
    pub poll_interval_ms: Option<u64>,
    pub wait_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: constants::DEFAULT_EVENT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: constants::DEFAULT_LOG_LEVEL.to_string(),
            json: false,
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            polling: PollingConfig::default(),
            operation_timeout_ms: None,
            entities: HashMap::new(),
            events: EventsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl LifecycleConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.retry.max_elapsed_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "retry.max_elapsed_ms",
                0,
                "retry budget must be greater than zero",
            ));
        }

        match self.retry.backoff {
            BackoffShape::Fixed { delay } => {
                check_positive("retry.backoff.delay_ms", delay.as_millis() as u64)?;
            }
            BackoffShape::Exponential {
                base,
                multiplier,
                max,
                jitter,
            } => {
                check_positive("retry.backoff.base_delay_ms", base.as_millis() as u64)?;
                if max < base {
                    return Err(ConfigurationError::invalid_value(
                        "retry.backoff.max_delay_ms",
                        max.as_millis(),
                        "max delay must not be below the base delay",
                    ));
                }
                if multiplier.is_nan() || multiplier < 1.0 {
                    return Err(ConfigurationError::invalid_value(
                        "retry.backoff.multiplier",
                        multiplier,
                        "multiplier must be at least 1.0",
                    ));
                }
                if !(0.0..=1.0).contains(&jitter) {
                    return Err(ConfigurationError::invalid_value(
                        "retry.backoff.jitter",
                        jitter,
                        "jitter must be between 0.0 and 1.0",
                    ));
                }
            }
        }

        check_positive("polling.poll_interval_ms", self.polling.poll_interval_ms)?;
        check_positive("polling.wait_timeout_ms", self.polling.wait_timeout_ms)?;

        if let Some(timeout) = self.operation_timeout_ms {
            check_positive("operation_timeout_ms", timeout)?;
        }

        for (name, timing) in &self.entities {
            name.parse::<EntityKind>().map_err(|reason| {
                ConfigurationError::invalid_value(format!("entities.{name}"), name, reason)
            })?;
            if let Some(interval) = timing.poll_interval_ms {
                check_positive(&format!("entities.{name}.poll_interval_ms"), interval)?;
            }
            if let Some(timeout) = timing.wait_timeout_ms {
                check_positive(&format!("entities.{name}.wait_timeout_ms"), timeout)?;
            }
        }

        if self.events.capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "events.capacity",
                0,
                "event channel capacity must be greater than zero",
            ));
        }

        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Arc::new(StandardErrorClassifier::with_retryable_codes(
                self.retry.retryable_codes.iter().cloned(),
            )),
            Duration::from_millis(self.retry.max_elapsed_ms),
            self.retry.backoff,
        )
    }

    /// Poll timing for `kind`, falling back to the global polling section
    pub fn wait_timing(&self, kind: EntityKind) -> WaitTiming {
        let overrides = self.entities.get(kind.as_str());
        let interval = overrides
            .and_then(|o| o.poll_interval_ms)
            .unwrap_or(self.polling.poll_interval_ms);
        let timeout = overrides
            .and_then(|o| o.wait_timeout_ms)
            .unwrap_or(self.polling.wait_timeout_ms);
        WaitTiming::new(Duration::from_millis(interval), Duration::from_millis(timeout))
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }
}

fn check_positive(field: &str, value: u64) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigurationError::invalid_value(
            field,
            value,
            "must be greater than zero",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = LifecycleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.wait_timing(EntityKind::Cluster),
            WaitTiming::new(Duration::from_secs(5), Duration::from_secs(1800))
        );
        assert_eq!(config.operation_timeout(), None);
    }

    #[test]
    fn test_entity_overrides_apply_per_kind() {
        let mut config = LifecycleConfig::default();
        config.entities.insert(
            "migration_task".to_string(),
            EntityTimingConfig {
                poll_interval_ms: Some(250),
                wait_timeout_ms: None,
            },
        );

        let timing = config.wait_timing(EntityKind::MigrationTask);
        assert_eq!(timing.poll_interval, Duration::from_millis(250));
        assert_eq!(timing.timeout, Duration::from_secs(1800));
        assert_eq!(
            config.wait_timing(EntityKind::InstanceGroup).poll_interval,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = LifecycleConfig::default();
        config.polling.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = LifecycleConfig::default();
        config.retry.backoff =
            BackoffShape::exponential(Duration::from_millis(10), 0.5, Duration::from_secs(1));
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("retry.backoff.multiplier"));

        let mut config = LifecycleConfig::default();
        config
            .entities
            .insert("database".to_string(), EntityTimingConfig::default());
        assert!(config.validate().is_err());

        let rejected_backoffs = [
            (BackoffShape::fixed(Duration::ZERO), "retry.backoff.delay_ms"),
            (
                BackoffShape::exponential(Duration::ZERO, 2.0, Duration::from_secs(1)),
                "retry.backoff.base_delay_ms",
            ),
            (
                BackoffShape::exponential(
                    Duration::from_secs(2),
                    2.0,
                    Duration::from_millis(500),
                ),
                "retry.backoff.max_delay_ms",
            ),
        ];
        for (backoff, field) in rejected_backoffs {
            let mut config = LifecycleConfig::default();
            config.retry.backoff = backoff;
            match config.validate().unwrap_err() {
                ConfigurationError::InvalidValue { field: reported, .. } => {
                    assert_eq!(reported, field)
                }
                other => panic!("expected invalid value, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_retry_policy_uses_configured_codes() {
        let mut config = LifecycleConfig::default();
        config.retry.retryable_codes = vec!["OperationConflict".to_string()];
        config.retry.max_elapsed_ms = 1500;

        let policy = config.retry_policy();
        assert_eq!(policy.max_elapsed, Duration::from_millis(1500));
        let error = crate::remote::RemoteError::new("OperationConflict", "busy");
        assert!(policy.classifier.classify(&error).is_retryable());
    }
}
