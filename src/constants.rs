//! # Constants
//!
//! Event names and the built-in defaults used when no configuration overrides them.

/// Lifecycle events published while an operation runs
pub mod events {
    // Step events
    pub const STEP_STARTED: &str = "step.started";
    pub const STEP_SUCCEEDED: &str = "step.succeeded";
    pub const STEP_FAILED: &str = "step.failed";
    pub const STEP_SKIPPED: &str = "step.skipped";

    // Wait and entity events
    pub const WAIT_COMPLETED: &str = "wait.completed";
    pub const ENTITY_DELETED: &str = "entity.deleted";

    pub const ALL: [&str; 6] = [
        STEP_STARTED,
        STEP_SUCCEEDED,
        STEP_FAILED,
        STEP_SKIPPED,
        WAIT_COMPLETED,
        ENTITY_DELETED,
    ];
}

pub const DEFAULT_EVENT_CAPACITY: usize = 1000;

/// Total retry budget for one remote call
pub const DEFAULT_RETRY_MAX_ELAPSED_MS: u64 = 60_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30 * 60 * 1000;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable naming the configuration environment
pub const ENVIRONMENT_VAR: &str = "LIFECYCLE_ENV";
pub const ENV_PREFIX: &str = "LIFECYCLE";
pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const CONFIG_FILE_STEM: &str = "lifecycle";
