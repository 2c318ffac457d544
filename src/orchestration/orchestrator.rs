//! # Operation Orchestrator
//!
//! Runs an ordered step sequence against one entity. Each remote call goes
//! through the retry executor, each declared wait through the status waiter,
//! and every attempted step is journaled before the next one starts.
//!
//! A failed step aborts the sequence. Earlier steps stay applied remotely;
//! re-running the operation with the same operation id is safe because every
//! mutating call carries a token derived from that id.

use super::entity::{Entity, StepOutcome, StepRecord};
use super::step::Step;
use crate::config::LifecycleConfig;
use crate::constants::events;
use crate::error::{LifecycleError, Result};
use crate::events::EventPublisher;
use crate::logging::{log_error, log_step_operation};
use crate::polling::{StatusWaiter, WaitSpec};
use crate::remote::{
    ActionRequest, CreateRequest, DeleteRequest, EntityId, EntityKind, IdempotencyToken,
    RemoteApi, RemoteResult,
};
use crate::resilience::{deadline_after, RetryExecutor, RetryPolicy};
use crate::state_machine::{definition, EntityState, LifecycleAction, LifecycleDefinition};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Settings for an orchestrator, built once from configuration
#[derive(Debug, Clone, Default)]
pub struct OrchestratorSettings {
    pub retry: RetryPolicy,
    /// Outer deadline for one `run`, clamping every retry and wait inside it
    pub operation_timeout: Option<Duration>,
}

impl OrchestratorSettings {
    pub fn from_config(config: &LifecycleConfig) -> Self {
        Self {
            retry: config.retry_policy(),
            operation_timeout: config.operation_timeout(),
        }
    }
}

/// Counters gathered while a step runs, kept for the journal even on failure
#[derive(Debug, Default)]
struct StepProgress {
    attempts: u32,
    polls: u32,
}

pub struct Orchestrator {
    remote: Arc<dyn RemoteApi>,
    executor: RetryExecutor,
    waiter: StatusWaiter,
    settings: OrchestratorSettings,
    events: EventPublisher,
}

impl Orchestrator {
    pub fn new(
        remote: Arc<dyn RemoteApi>,
        settings: OrchestratorSettings,
        events: EventPublisher,
    ) -> Self {
        let executor = RetryExecutor::new(settings.retry.clone());
        Self {
            remote,
            waiter: StatusWaiter::new(executor.clone()),
            executor,
            settings,
            events,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn events(&self) -> &EventPublisher {
        &self.events
    }

    /// Execute `steps` strictly in order, stopping at the first failure
    pub async fn run(&self, entity: &mut Entity, steps: &[Step]) -> Result<()> {
        self.run_steps(entity, steps, false).await
    }

    /// Re-run an operation, skipping steps the journal already records as succeeded.
    ///
    /// The entity keeps its operation id, so retried steps send the same tokens.
    pub async fn resume(&self, entity: &mut Entity, steps: &[Step]) -> Result<()> {
        self.run_steps(entity, steps, true).await
    }

    /// Current remote state. `Deleted` when the remote no longer knows the
    /// entity, `None` when it has no status yet.
    pub async fn observe(
        &self,
        kind: EntityKind,
        entity_id: &EntityId,
    ) -> Result<Option<EntityState>> {
        let remote = self.remote.as_ref();
        let attempted = self
            .executor
            .execute("get_status", |_| observe_status(remote, kind, entity_id))
            .await?;
        Ok(attempted.value)
    }

    /// Wait until the remote reports a state in `spec`, with no transition check.
    ///
    /// Used before a sequence when the entity may be mid-transition.
    pub async fn await_state(&self, entity: &mut Entity, spec: &WaitSpec) -> Result<EntityState> {
        let Some(entity_id) = entity.id.clone() else {
            return Err(LifecycleError::MissingEntityId {
                step: "await_state".to_string(),
            });
        };
        let deadline = self
            .settings
            .operation_timeout
            .map(|t| deadline_after(Instant::now(), t));
        let remote = self.remote.as_ref();
        let kind = entity.kind;
        let id_ref = &entity_id;

        let outcome = self
            .waiter
            .wait_for_until(&entity.label(), spec, deadline, move || {
                observe_status(remote, kind, id_ref)
            })
            .await?;
        entity.observed = Some(outcome.state);
        Ok(outcome.state)
    }

    async fn run_steps(&self, entity: &mut Entity, steps: &[Step], resuming: bool) -> Result<()> {
        let deadline = self
            .settings
            .operation_timeout
            .map(|t| deadline_after(Instant::now(), t));
        let definition = definition(entity.kind);

        info!(
            entity = %entity.label(),
            operation_id = %entity.operation_id,
            steps = steps.len(),
            resuming,
            "🚀 Running lifecycle operation"
        );

        for (index, step) in steps.iter().enumerate() {
            if resuming && entity.has_succeeded(index, step.name()) {
                self.skip_step(entity, index, step).await;
                continue;
            }

            let token = IdempotencyToken::derive(entity.operation_id, index, step.name());
            let started_at = Utc::now();
            self.publish(
                events::STEP_STARTED,
                entity,
                json!({"index": index, "step": step.name(), "action": step.action()}),
            )
            .await;

            let mut progress = StepProgress::default();
            let result = self
                .execute_step(entity, definition, step, token, deadline, &mut progress)
                .await;

            let record = StepRecord {
                index,
                step: step.name().to_string(),
                action: step.action(),
                outcome: if result.is_ok() {
                    StepOutcome::Succeeded
                } else {
                    StepOutcome::Failed
                },
                attempts: progress.attempts,
                polls: progress.polls,
                observed_state: entity.observed,
                token: step.action().is_mutating().then_some(token),
                error: result.as_ref().err().map(ToString::to_string),
                started_at,
                finished_at: Utc::now(),
            };
            entity.journal.push(record.clone());

            match result {
                Ok(()) => {
                    log_step_operation(
                        entity.kind,
                        entity.id.as_ref(),
                        index,
                        step.name(),
                        "succeeded",
                        entity.observed.map(|s| s.as_str()),
                    );
                    self.publish_record(events::STEP_SUCCEEDED, entity, &record)
                        .await;

                    if entity.is_deleted() && step.action() == LifecycleAction::Delete {
                        self.publish(events::ENTITY_DELETED, entity, json!({"index": index}))
                            .await;
                        entity.id = None;
                    }
                }
                Err(error) => {
                    log_step_operation(
                        entity.kind,
                        entity.id.as_ref(),
                        index,
                        step.name(),
                        "failed",
                        record.error.as_deref(),
                    );
                    log_error("orchestrator", step.name(), &error);
                    self.publish_record(events::STEP_FAILED, entity, &record)
                        .await;

                    return Err(LifecycleError::StepFailed {
                        index,
                        step: step.name().to_string(),
                        entity_id: entity.id.clone(),
                        source: Box::new(error),
                    });
                }
            }
        }

        info!(
            entity = %entity.label(),
            observed = entity.observed.map(|s| s.as_str()).unwrap_or("unknown"),
            "✅ Lifecycle operation complete"
        );
        Ok(())
    }

    async fn execute_step(
        &self,
        entity: &mut Entity,
        definition: &LifecycleDefinition,
        step: &Step,
        token: IdempotencyToken,
        deadline: Option<Instant>,
        progress: &mut StepProgress,
    ) -> Result<()> {
        let action = step.action();

        // A wait-only step whose target is already observed has nothing to do
        if !action.is_mutating() {
            if let (Some(observed), Some(wait)) = (entity.observed, step.wait()) {
                if wait.target().contains(&observed) {
                    debug!(entity = %entity.label(), step = step.name(), "Target already reached");
                    return Ok(());
                }
            }
        }

        definition.check(entity.observed, action)?;

        let entity_id = match (action, entity.id.clone()) {
            (LifecycleAction::Create, _) => {
                let request = CreateRequest {
                    kind: entity.kind,
                    token,
                    spec: step.payload().cloned().unwrap_or(Value::Null),
                };
                let created = self
                    .executor
                    .execute_until(step.name(), deadline, |_| {
                        self.remote.create(request.clone())
                    })
                    .await
                    .inspect_err(|error| progress.attempts = attempts_of(error))?;

                progress.attempts = created.attempts;
                info!(entity_kind = %entity.kind, entity_id = %created.value, "Remote assigned entity id");
                entity.id = Some(created.value.clone());
                created.value
            }
            (_, None) => {
                return Err(LifecycleError::MissingEntityId {
                    step: step.name().to_string(),
                })
            }
            (LifecycleAction::AwaitCompletion, Some(id)) => id,
            (LifecycleAction::Delete, Some(id)) => {
                let request = DeleteRequest {
                    kind: entity.kind,
                    entity_id: id.clone(),
                    token,
                };
                let deleted = self
                    .executor
                    .execute_until(step.name(), deadline, |_| {
                        delete_tolerating_absence(self.remote.as_ref(), request.clone())
                    })
                    .await
                    .inspect_err(|error| progress.attempts = attempts_of(error))?;

                progress.attempts = deleted.attempts;
                if !deleted.value {
                    info!(entity = %entity.label(), "Entity already deleted remotely");
                    entity.observed = Some(EntityState::Deleted);
                    return Ok(());
                }
                id
            }
            (_, Some(id)) => {
                let request = ActionRequest {
                    kind: entity.kind,
                    entity_id: id.clone(),
                    action,
                    token,
                    payload: step.payload().cloned(),
                };
                let invoked = self
                    .executor
                    .execute_until(step.name(), deadline, |_| {
                        self.remote.invoke(request.clone())
                    })
                    .await
                    .inspect_err(|error| progress.attempts = attempts_of(error))?;
                progress.attempts = invoked.attempts;
                id
            }
        };

        if action.is_mutating() {
            // State is unknown until the remote is observed again
            entity.observed = None;
        }

        let Some(wait) = step.wait() else {
            return Ok(());
        };

        let label = entity.label();
        let remote = self.remote.as_ref();
        let kind = entity.kind;
        let id_ref = &entity_id;
        let waited = self
            .waiter
            .wait_for_until(&label, wait, deadline, move || {
                observe_status(remote, kind, id_ref)
            })
            .await;

        match waited {
            Ok(outcome) => {
                progress.polls = outcome.polls;
                entity.observed = Some(outcome.state);
                self.publish(
                    events::WAIT_COMPLETED,
                    entity,
                    json!({
                        "step": step.name(),
                        "state": outcome.state,
                        "phase": outcome.state.phase(),
                        "polls": outcome.polls,
                        "elapsed_ms": outcome.elapsed.as_millis() as u64,
                    }),
                )
                .await;
                Ok(())
            }
            Err(error) => {
                match &error {
                    LifecycleError::WaitFailure { state, polls, .. } => {
                        progress.polls = *polls;
                        entity.observed = Some(*state);
                    }
                    LifecycleError::WaitTimeout { polls, .. } => progress.polls = *polls,
                    _ => {}
                }
                Err(error)
            }
        }
    }

    async fn skip_step(&self, entity: &mut Entity, index: usize, step: &Step) {
        debug!(entity = %entity.label(), index, step = step.name(), "Skipping step that already succeeded");
        let now = Utc::now();
        let record = StepRecord {
            index,
            step: step.name().to_string(),
            action: step.action(),
            outcome: StepOutcome::Skipped,
            attempts: 0,
            polls: 0,
            observed_state: entity.observed,
            token: None,
            error: None,
            started_at: now,
            finished_at: now,
        };
        entity.journal.push(record.clone());
        self.publish_record(events::STEP_SKIPPED, entity, &record)
            .await;
    }

    async fn publish(&self, name: &str, entity: &Entity, context: Value) {
        if let Err(error) = self
            .events
            .publish(name, entity.kind, entity.id.clone(), context)
            .await
        {
            warn!(event = name, error = %error, "Failed to publish lifecycle event");
        }
    }

    async fn publish_record(&self, name: &str, entity: &Entity, record: &StepRecord) {
        if let Err(error) = self
            .events
            .publish_serialized(name, entity.kind, entity.id.clone(), record)
            .await
        {
            warn!(event = name, error = %error, "Failed to publish lifecycle event");
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Status read where a missing entity reads as `Deleted`
pub(crate) async fn observe_status(
    remote: &dyn RemoteApi,
    kind: EntityKind,
    entity_id: &EntityId,
) -> RemoteResult<Option<EntityState>> {
    match remote.get_status(kind, entity_id).await {
        Err(error) if error.is_not_found() => Ok(Some(EntityState::Deleted)),
        other => other,
    }
}

/// Delete where `NotFound` is success; returns whether the remote actually deleted
async fn delete_tolerating_absence(
    remote: &dyn RemoteApi,
    request: DeleteRequest,
) -> RemoteResult<bool> {
    match remote.delete(request).await {
        Ok(()) => Ok(true),
        Err(error) if error.is_not_found() => Ok(false),
        Err(error) => Err(error),
    }
}

fn attempts_of(error: &LifecycleError) -> u32 {
    match error {
        LifecycleError::PermanentRemote { attempts, .. }
        | LifecycleError::RetryTimeout { attempts, .. } => *attempts,
        _ => 0,
    }
}
