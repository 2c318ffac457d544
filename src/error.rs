use crate::config::ConfigurationError;
use crate::remote::{EntityId, EntityKind, RemoteError};
use crate::state_machine::states::{format_observed, format_states};
use crate::state_machine::{EntityState, LifecycleAction};
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the retry executor, waiter, orchestrator and CRUD handlers.
///
/// Only retryable remote errors are absorbed (by the retry executor); every
/// other variant propagates unchanged to the caller.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The remote rejected the call with an error that will never succeed on retry
    #[error("permanent remote error during {operation} after {attempts} attempt(s): {source}")]
    PermanentRemote {
        operation: String,
        attempts: u32,
        #[source]
        source: RemoteError,
    },

    /// Transient errors kept occurring until the retry budget ran out
    #[error(
        "{operation} did not succeed within its retry budget of {budget:?} ({attempts} attempt(s), last error: {})",
        describe_last_error(.last_error)
    )]
    RetryTimeout {
        operation: String,
        attempts: u32,
        budget: Duration,
        #[source]
        last_error: Option<RemoteError>,
    },

    /// Status never reached a target or failure state before the deadline
    #[error(
        "timed out after {timeout:?} waiting for {entity} to reach {} (last observed: {}, {polls} poll(s))",
        format_states(.expected),
        format_observed(.last_state)
    )]
    WaitTimeout {
        entity: String,
        expected: Vec<EntityState>,
        last_state: Option<EntityState>,
        polls: u32,
        timeout: Duration,
    },

    /// The remote reported an explicit failure state
    #[error("{entity} entered failure state {state} after {polls} poll(s)")]
    WaitFailure {
        entity: String,
        state: EntityState,
        polls: u32,
    },

    #[error("{kind} cannot {action} from state {}", format_observed(.from))]
    InvalidTransition {
        kind: EntityKind,
        from: Option<EntityState>,
        action: LifecycleAction,
    },

    #[error("invalid wait spec: {reason}")]
    InvalidWaitSpec { reason: String },

    #[error("step {step} requires an entity id but none has been assigned")]
    MissingEntityId { step: String },

    /// A step of an orchestrated sequence failed; earlier steps remain applied
    #[error("step {index} ({step}) failed: {source}")]
    StepFailed {
        index: usize,
        step: String,
        entity_id: Option<EntityId>,
        #[source]
        source: Box<LifecycleError>,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

fn describe_last_error(error: &Option<RemoteError>) -> String {
    error
        .as_ref()
        .map_or_else(|| "attempt timed out".to_string(), ToString::to_string)
}

impl LifecycleError {
    /// The innermost error, looking through `StepFailed` wrappers
    pub fn root_cause(&self) -> &LifecycleError {
        match self {
            Self::StepFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// The remote error that caused this failure, if any
    pub fn remote_error(&self) -> Option<&RemoteError> {
        match self.root_cause() {
            Self::PermanentRemote { source, .. } => Some(source),
            Self::RetryTimeout { last_error, .. } => last_error.as_ref(),
            _ => None,
        }
    }

    /// Index and name of the failed step when the error came from a step sequence
    pub fn failed_step(&self) -> Option<(usize, &str)> {
        match self {
            Self::StepFailed { index, step, .. } => Some((*index, step.as_str())),
            _ => None,
        }
    }

    /// Entity id known at the time of failure, so partially created entities can be tracked
    pub fn entity_id(&self) -> Option<&EntityId> {
        match self {
            Self::StepFailed { entity_id, .. } => entity_id.as_ref(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::WaitTimeout { .. } | Self::RetryTimeout { .. }
        )
    }

    pub fn is_wait_failure(&self) -> bool {
        matches!(self.root_cause(), Self::WaitFailure { .. })
    }

    pub fn is_permanent_remote(&self) -> bool {
        matches!(self.root_cause(), Self::PermanentRemote { .. })
    }
}

pub type Result<T> = std::result::Result<T, LifecycleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_step_failures() {
        let error = LifecycleError::StepFailed {
            index: 2,
            step: "precheck".to_string(),
            entity_id: Some(EntityId::new("dts-1")),
            source: Box::new(LifecycleError::WaitFailure {
                entity: "migration_task dts-1".to_string(),
                state: EntityState::CheckFailed,
                polls: 3,
            }),
        };

        assert!(error.is_wait_failure());
        assert!(!error.is_timeout());
        assert_eq!(error.failed_step(), Some((2, "precheck")));
        assert_eq!(error.entity_id(), Some(&EntityId::new("dts-1")));
        assert!(error.remote_error().is_none());
    }

    #[test]
    fn test_messages_name_states_and_steps() {
        let error = LifecycleError::WaitTimeout {
            entity: "cluster c-1".to_string(),
            expected: vec![EntityState::Running],
            last_state: Some(EntityState::Creating),
            polls: 4,
            timeout: Duration::from_millis(100),
        };
        let message = error.to_string();
        assert!(message.contains("{running}"));
        assert!(message.contains("last observed: creating"));

        let error = LifecycleError::InvalidTransition {
            kind: EntityKind::MigrationTask,
            from: Some(EntityState::Finished),
            action: LifecycleAction::Start,
        };
        assert_eq!(error.to_string(), "migration_task cannot start from state finished");
    }

    #[test]
    fn test_retry_timeout_exposes_last_remote_error() {
        let error = LifecycleError::RetryTimeout {
            operation: "configure".to_string(),
            attempts: 5,
            budget: Duration::from_secs(1),
            last_error: Some(RemoteError::internal("boom")),
        };
        assert!(error.is_timeout());
        assert_eq!(error.remote_error().map(|e| e.message.as_str()), Some("boom"));
    }
}
