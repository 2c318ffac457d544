use crate::error::{LifecycleError, Result};
use crate::state_machine::states::format_states;
use crate::state_machine::{EntityState, Transition};
use std::time::Duration;

/// Poll interval and deadline for one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTiming {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl WaitTiming {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }
}

impl Default for WaitTiming {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(30 * 60))
    }
}

/// What a single status observation means for a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDisposition {
    /// Neither target nor failure yet (includes "no status yet")
    Pending,
    Reached(EntityState),
    Failed(EntityState),
}

/// Target and failure state sets plus timing for one poll loop.
///
/// Target and failure sets are disjoint; every other observation is pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitSpec {
    target: Vec<EntityState>,
    failure: Vec<EntityState>,
    timing: WaitTiming,
}

impl WaitSpec {
    pub fn new(
        target: impl Into<Vec<EntityState>>,
        failure: impl Into<Vec<EntityState>>,
        timing: WaitTiming,
    ) -> Result<Self> {
        let target = target.into();
        let failure = failure.into();

        if target.is_empty() {
            return Err(LifecycleError::InvalidWaitSpec {
                reason: "target state set is empty".to_string(),
            });
        }

        let overlap: Vec<EntityState> = target
            .iter()
            .filter(|state| failure.contains(state))
            .copied()
            .collect();
        if !overlap.is_empty() {
            return Err(LifecycleError::InvalidWaitSpec {
                reason: format!(
                    "states {} are both target and failure",
                    format_states(&overlap)
                ),
            });
        }

        if timing.poll_interval.is_zero() || timing.timeout.is_zero() {
            return Err(LifecycleError::InvalidWaitSpec {
                reason: "poll interval and timeout must be non-zero".to_string(),
            });
        }

        Ok(Self {
            target,
            failure,
            timing,
        })
    }

    /// Build the wait that confirms a lifecycle transition
    pub fn for_transition(transition: &Transition, timing: WaitTiming) -> Result<Self> {
        Self::new(transition.target, transition.failure, timing)
    }

    pub fn target(&self) -> &[EntityState] {
        &self.target
    }

    pub fn failure(&self) -> &[EntityState] {
        &self.failure
    }

    pub fn poll_interval(&self) -> Duration {
        self.timing.poll_interval
    }

    pub fn timeout(&self) -> Duration {
        self.timing.timeout
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timing.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.timing.poll_interval = poll_interval;
        self
    }

    /// Failure is checked before target so a failure state always ends the wait
    pub fn disposition(&self, observed: Option<EntityState>) -> PollDisposition {
        match observed {
            Some(state) if self.failure.contains(&state) => PollDisposition::Failed(state),
            Some(state) if self.target.contains(&state) => PollDisposition::Reached(state),
            _ => PollDisposition::Pending,
        }
    }

    pub fn is_pending(&self, observed: Option<EntityState>) -> bool {
        self.disposition(observed) == PollDisposition::Pending
    }
}
