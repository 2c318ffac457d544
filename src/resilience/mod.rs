//! # Resilience Module
//!
//! Retry support for calls against the remote control plane.
//!
//! ## Architecture
//!
//! - **Classifier**: decides whether a remote error is transient or permanent
//! - **Backoff**: fixed or capped exponential delays, with optional jitter
//! - **Retry Executor**: deadline-bounded retry loop honoring the classifier
//!
//! ## Usage
//!
//! ```rust,no_run
//! use provider_lifecycle::remote::RemoteError;
//! use provider_lifecycle::resilience::{
//!     BackoffShape, RetryExecutor, RetryPolicy, StandardErrorClassifier,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let executor = RetryExecutor::new(RetryPolicy::new(
//!     Arc::new(StandardErrorClassifier::new()),
//!     Duration::from_secs(30),
//!     BackoffShape::fixed(Duration::from_millis(100)),
//! ));
//!
//! let outcome = executor
//!     .execute("describe", |_attempt| async { Ok::<_, RemoteError>("ok") })
//!     .await?;
//! assert_eq!(outcome.attempts, 1);
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod classifier;
pub mod retry;

pub use backoff::BackoffShape;
pub use classifier::{
    ErrorCategory, ErrorClassification, ErrorClassifier, Retryability, StandardErrorClassifier,
};
pub use retry::{deadline_after, Attempted, RetryExecutor, RetryPolicy};
