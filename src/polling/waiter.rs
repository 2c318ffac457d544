//! # Status Waiter
//!
//! Polls remote status until it reaches a target state, a failure state, or
//! the deadline. Every poll goes through the retry executor so a transient
//! status error does not end the wait, but the retry loop can never outlive
//! the wait deadline.

use super::wait_spec::{PollDisposition, WaitSpec};
use crate::error::{LifecycleError, Result};
use crate::remote::RemoteResult;
use crate::resilience::{deadline_after, RetryExecutor};
use crate::state_machine::EntityState;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Result of a wait that reached a target state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOutcome {
    pub state: EntityState,
    /// Number of status polls issued
    pub polls: u32,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct StatusWaiter {
    executor: RetryExecutor,
}

impl StatusWaiter {
    pub fn new(executor: RetryExecutor) -> Self {
        Self { executor }
    }

    /// Poll `get_status` until `spec` is satisfied
    pub async fn wait_for<F, Fut>(
        &self,
        entity: &str,
        spec: &WaitSpec,
        get_status: F,
    ) -> Result<WaitOutcome>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RemoteResult<Option<EntityState>>>,
    {
        self.wait_for_until(entity, spec, None, get_status).await
    }

    /// Poll `get_status` until `spec` is satisfied or `outer_deadline` passes,
    /// whichever deadline is earlier.
    ///
    /// On timeout the entity is left as the remote has it; nothing is cancelled.
    pub async fn wait_for_until<F, Fut>(
        &self,
        entity: &str,
        spec: &WaitSpec,
        outer_deadline: Option<Instant>,
        mut get_status: F,
    ) -> Result<WaitOutcome>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RemoteResult<Option<EntityState>>>,
    {
        let started = Instant::now();
        let spec_deadline = deadline_after(started, spec.timeout());
        let deadline = outer_deadline.map_or(spec_deadline, |d| d.min(spec_deadline));
        let max_elapsed = self.executor.policy().max_elapsed;

        let mut polls = 0;
        let mut last_state = None;

        let timed_out = |polls: u32, last_state: Option<EntityState>| {
            LifecycleError::WaitTimeout {
                entity: entity.to_string(),
                expected: spec.target().to_vec(),
                last_state,
                polls,
                timeout: deadline.saturating_duration_since(started),
            }
        };

        loop {
            polls += 1;
            let bounded_by_wait = deadline <= deadline_after(Instant::now(), max_elapsed);

            let observed = match self
                .executor
                .execute_until("get_status", Some(deadline), |_| get_status())
                .await
            {
                Ok(attempted) => attempted.value,
                Err(LifecycleError::RetryTimeout { .. }) if bounded_by_wait => {
                    warn!(entity, polls, "Status poll did not complete before wait deadline");
                    return Err(timed_out(polls, last_state));
                }
                Err(error) => return Err(error),
            };

            if observed.is_some() {
                last_state = observed;
            }

            match spec.disposition(observed) {
                PollDisposition::Failed(state) => {
                    warn!(entity, polls, state = %state, "Remote reported failure state");
                    return Err(LifecycleError::WaitFailure {
                        entity: entity.to_string(),
                        state,
                        polls,
                    });
                }
                PollDisposition::Reached(state) => {
                    let elapsed = started.elapsed();
                    info!(
                        entity,
                        polls,
                        state = %state,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Remote reached target state"
                    );
                    return Ok(WaitOutcome {
                        state,
                        polls,
                        elapsed,
                    });
                }
                PollDisposition::Pending => {
                    debug!(
                        entity,
                        polls,
                        observed = observed.map(|s| s.as_str()).unwrap_or("none"),
                        "Remote still pending"
                    );
                }
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(entity, polls, "Wait deadline reached");
                return Err(timed_out(polls, last_state));
            }
            let next_poll = now
                .checked_add(spec.poll_interval())
                .map_or(deadline, |next| next.min(deadline));
            sleep_until(next_poll).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polling::WaitTiming;
    use crate::remote::RemoteError;
    use crate::resilience::{BackoffShape, RetryPolicy, StandardErrorClassifier};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use EntityState::*;

    fn waiter() -> StatusWaiter {
        StatusWaiter::new(RetryExecutor::new(RetryPolicy::new(
            Arc::new(StandardErrorClassifier::new()),
            Duration::from_secs(1),
            BackoffShape::fixed(Duration::from_millis(1)),
        )))
    }

    fn spec(timeout: Duration) -> WaitSpec {
        WaitSpec::new(
            [CheckPassed],
            [CheckFailed],
            WaitTiming::new(Duration::from_millis(5), timeout),
        )
        .unwrap()
    }

    /// Status source that replays a script, repeating the last entry
    fn scripted(
        script: Vec<RemoteResult<Option<EntityState>>>,
    ) -> impl FnMut() -> std::future::Ready<RemoteResult<Option<EntityState>>> {
        let queue = Arc::new(Mutex::new(VecDeque::from(script)));
        move || {
            let mut queue = queue.lock();
            let next = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            std::future::ready(next.unwrap_or(Ok(None)))
        }
    }

    #[tokio::test]
    async fn test_reaches_target_after_pending_polls() {
        let outcome = waiter()
            .wait_for(
                "task",
                &spec(Duration::from_secs(1)),
                scripted(vec![Ok(None), Ok(Some(Checking)), Ok(Some(CheckPassed))]),
            )
            .await
            .unwrap();

        assert_eq!(outcome.state, CheckPassed);
        assert_eq!(outcome.polls, 3);
    }

    #[tokio::test]
    async fn test_failure_state_stops_polling_immediately() {
        let error = waiter()
            .wait_for(
                "task",
                &spec(Duration::from_secs(1)),
                scripted(vec![Ok(Some(Checking)), Ok(Some(CheckFailed)), Ok(Some(CheckPassed))]),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            LifecycleError::WaitFailure { state: CheckFailed, polls: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_transient_status_errors_do_not_end_wait() {
        let outcome = waiter()
            .wait_for(
                "task",
                &spec(Duration::from_secs(1)),
                scripted(vec![
                    Err(RemoteError::internal("blip")),
                    Ok(Some(CheckPassed)),
                ]),
            )
            .await
            .unwrap();

        assert_eq!(outcome.polls, 1);
        assert_eq!(outcome.state, CheckPassed);
    }

    #[tokio::test]
    async fn test_permanent_status_error_propagates() {
        let error = waiter()
            .wait_for(
                "task",
                &spec(Duration::from_secs(1)),
                scripted(vec![Err(RemoteError::invalid_parameter("bad id"))]),
            )
            .await
            .unwrap_err();

        assert!(error.is_permanent_remote());
    }

    #[tokio::test]
    async fn test_pending_forever_times_out() {
        let error = waiter()
            .wait_for(
                "task",
                &spec(Duration::from_millis(40)),
                scripted(vec![Ok(Some(Checking))]),
            )
            .await
            .unwrap_err();

        match error {
            LifecycleError::WaitTimeout {
                last_state, polls, ..
            } => {
                assert_eq!(last_state, Some(Checking));
                assert!(polls > 1);
            }
            other => panic!("Expected WaitTimeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_outer_deadline_clamps_wait() {
        let started = std::time::Instant::now();
        let error = waiter()
            .wait_for_until(
                "task",
                &spec(Duration::from_secs(10)),
                Some(Instant::now() + Duration::from_millis(30)),
                scripted(vec![Ok(None)]),
            )
            .await
            .unwrap_err();

        assert!(error.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_huge_poll_interval_sleeps_only_until_deadline() {
        let started = std::time::Instant::now();
        let spec = spec(Duration::from_millis(30)).with_poll_interval(Duration::MAX);
        let error = waiter()
            .wait_for("task", &spec, scripted(vec![Ok(Some(Checking))]))
            .await
            .unwrap_err();

        assert!(error.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_unbounded_timeout_still_reaches_target() {
        let outcome = waiter()
            .wait_for(
                "task",
                &spec(Duration::MAX),
                scripted(vec![Ok(Some(Checking)), Ok(Some(CheckPassed))]),
            )
            .await
            .unwrap();

        assert_eq!(outcome.state, CheckPassed);
    }
}
