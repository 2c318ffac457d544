//! # Structured Logging Module
//!
//! Console logging through `tracing-subscriber`, optionally as JSON, plus a few
//! helpers that give step and error events a consistent shape.

use crate::config::LoggingConfig;
use crate::remote::{EntityId, EntityKind};
use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging. Safe to call more than once; only the first call has effect.
pub fn init_structured_logging(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = || {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
        };

        let console = if config.json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .json()
                .with_filter(filter())
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(true)
                .with_filter(filter())
                .boxed()
        };

        // A global subscriber may already be installed by an embedding host
        if tracing_subscriber::registry().with(console).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            level = %config.level,
            json = config.json,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Log structured data for step operations
pub fn log_step_operation(
    kind: EntityKind,
    entity_id: Option<&EntityId>,
    step_index: usize,
    step_name: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        entity_kind = %kind,
        entity_id = entity_id.map(EntityId::as_str),
        step_index = step_index,
        step_name = %step_name,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🔧 STEP_OPERATION"
    );
}

/// Log an error with its context and source chain
pub fn log_error(component: &str, operation: &str, error: &dyn std::error::Error) {
    let mut chain = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }

    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        causes = ?chain,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}
