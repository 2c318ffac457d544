//! # Bounded Retry Executor
//!
//! Wraps a single remote call in a deadline-bounded retry loop.
//!
//! The executor never deduplicates calls. A failed attempt may still have
//! mutated remote state, so every mutating call must carry an idempotency
//! token that stays the same across attempts; the remote then treats a
//! retried call as a no-op.

use super::backoff::BackoffShape;
use super::classifier::{ErrorClassifier, StandardErrorClassifier};
use crate::error::{LifecycleError, Result};
use crate::remote::RemoteResult;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, warn};

/// Stand-in for "no deadline" when `start + budget` is not representable
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `start + budget`, saturating to a far-future instant on overflow
pub fn deadline_after(start: Instant, budget: Duration) -> Instant {
    start
        .checked_add(budget)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}

/// How a remote call is retried
#[derive(Clone)]
pub struct RetryPolicy {
    pub classifier: Arc<dyn ErrorClassifier>,
    /// Total time budget across all attempts
    pub max_elapsed: Duration,
    pub backoff: BackoffShape,
}

impl RetryPolicy {
    pub fn new(
        classifier: Arc<dyn ErrorClassifier>,
        max_elapsed: Duration,
        backoff: BackoffShape,
    ) -> Self {
        Self {
            classifier,
            max_elapsed,
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            Arc::new(StandardErrorClassifier::new()),
            Duration::from_secs(60),
            BackoffShape::default(),
        )
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("classifier", &self.classifier.classifier_name())
            .field("max_elapsed", &self.max_elapsed)
            .field("backoff", &self.backoff)
            .finish()
    }
}

/// Successful result of a retried call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted<T> {
    pub value: T,
    /// Number of times the call was invoked, including the successful one
    pub attempts: u32,
}

#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `call` until it succeeds, fails permanently, or the policy budget runs out
    pub async fn execute<T, F, Fut>(&self, operation: &str, call: F) -> Result<Attempted<T>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        self.execute_until(operation, None, call).await
    }

    /// Like [`execute`](Self::execute), additionally bounded by a caller deadline.
    ///
    /// `call` receives the 1-based attempt number. Each attempt is itself cut
    /// off at the deadline; the remote operation behind a cut-off attempt is
    /// not cancelled.
    pub async fn execute_until<T, F, Fut>(
        &self,
        operation: &str,
        deadline: Option<Instant>,
        mut call: F,
    ) -> Result<Attempted<T>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        let started = Instant::now();
        let budget_deadline = deadline_after(started, self.policy.max_elapsed);
        let deadline = deadline.map_or(budget_deadline, |d| d.min(budget_deadline));
        let budget = deadline.saturating_duration_since(started);

        let mut attempts = 0;
        let mut last_error = None;

        loop {
            attempts += 1;

            let error = match timeout_at(deadline, call(attempts)).await {
                Ok(Ok(value)) => {
                    if attempts > 1 {
                        debug!(operation, attempts, "Remote call succeeded after retry");
                    }
                    return Ok(Attempted { value, attempts });
                }
                Ok(Err(error)) => error,
                Err(_) => {
                    warn!(operation, attempts, budget_ms = budget.as_millis() as u64, "Remote call attempt cut off at deadline");
                    break;
                }
            };

            let classification = self.policy.classifier.classify(&error);
            if !classification.is_retryable() {
                debug!(
                    operation,
                    attempts,
                    category = %classification.category,
                    error = %error,
                    "Permanent remote error, not retrying"
                );
                return Err(LifecycleError::PermanentRemote {
                    operation: operation.to_string(),
                    attempts,
                    source: error,
                });
            }

            let delay = self
                .policy
                .backoff
                .delay_for_attempt(attempts)
                .max(classification.retry_after.unwrap_or_default());

            if delay >= deadline.saturating_duration_since(Instant::now()) {
                warn!(
                    operation,
                    attempts,
                    category = %classification.category,
                    error = %error,
                    "Retry budget exhausted"
                );
                last_error = Some(error);
                break;
            }

            debug!(
                operation,
                attempts,
                delay_ms = delay.as_millis() as u64,
                category = %classification.category,
                error = %error,
                "Transient remote error, retrying"
            );
            last_error = Some(error);
            sleep(delay).await;
        }

        Err(LifecycleError::RetryTimeout {
            operation: operation.to_string(),
            attempts,
            budget,
            last_error,
        })
    }
}
