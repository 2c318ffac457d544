//! In-memory remote control plane for tests and the simulation binary.
//!
//! Behaves like a well-mannered cloud API: it deduplicates mutating calls by
//! idempotency token, rejects actions that are illegal from the entity's
//! current state, and reports state changes through a per-action status
//! script that is consumed one entry per poll (the last entry sticks).

use crate::remote::{
    ActionRequest, CreateRequest, DeleteRequest, EntityId, EntityKind, IdempotencyToken,
    RemoteApi, RemoteError, RemoteResult,
};
use crate::state_machine::{definition, EntityState, LifecycleAction};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Remote operation a mock call belongs to, for error injection and counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    Create,
    Invoke(LifecycleAction),
    GetStatus,
    Delete,
}

/// One call received by the mock, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub operation: MockOperation,
    pub entity_id: Option<EntityId>,
    pub token: Option<IdempotencyToken>,
    /// False when the call failed or was a duplicate
    pub applied: bool,
}

#[derive(Debug, Clone)]
enum TokenOutcome {
    Created(EntityId),
    Applied,
}

#[derive(Debug)]
struct MockEntity {
    kind: EntityKind,
    /// State the last poll reported
    state: Option<EntityState>,
    /// States still to be reported, one per poll
    script: VecDeque<Option<EntityState>>,
    /// Remove the entity once the script is exhausted
    removing: bool,
}

impl MockEntity {
    /// State the remote is heading to once the script plays out
    fn effective_state(&self) -> Option<EntityState> {
        self.script.back().copied().flatten().or(self.state)
    }
}

#[derive(Debug, Default)]
pub struct MockRemote {
    entities: DashMap<EntityId, MockEntity>,
    tokens: DashMap<IdempotencyToken, TokenOutcome>,
    scripts: DashMap<(EntityKind, LifecycleAction), Vec<Option<EntityState>>>,
    injected: Mutex<HashMap<MockOperation, VecDeque<RemoteError>>>,
    calls: Mutex<Vec<MockCall>>,
    latency: Mutex<Option<Duration>>,
    next_id: AtomicU64,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    /// States reported after `action` is applied to any entity of `kind`
    pub fn script<I>(&self, kind: EntityKind, action: LifecycleAction, states: I)
    where
        I: IntoIterator<Item = EntityState>,
    {
        self.script_with_gaps(kind, action, states.into_iter().map(Some));
    }

    /// Like [`script`](Self::script), where `None` entries report "no status yet"
    pub fn script_with_gaps<I>(&self, kind: EntityKind, action: LifecycleAction, states: I)
    where
        I: IntoIterator<Item = Option<EntityState>>,
    {
        self.scripts.insert((kind, action), states.into_iter().collect());
    }

    /// Fail the next call of `operation` with `error` (queued, first in first out)
    pub fn fail_next(&self, operation: MockOperation, error: RemoteError) {
        self.injected
            .lock()
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Insert an entity that already exists in `state`
    pub fn seed(&self, kind: EntityKind, state: EntityState) -> EntityId {
        let id = self.allocate_id(kind);
        self.entities.insert(
            id.clone(),
            MockEntity {
                kind,
                state: Some(state),
                script: VecDeque::new(),
                removing: false,
            },
        );
        id
    }

    /// Change the reported state of an entity directly, dropping its script
    pub fn force_state(&self, entity_id: &EntityId, state: EntityState) {
        if let Some(mut entity) = self.entities.get_mut(entity_id) {
            entity.state = Some(state);
            entity.script.clear();
        }
    }

    pub fn exists(&self, entity_id: &EntityId) -> bool {
        self.entities.contains_key(entity_id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// State the remote holds for an entity, ignoring unplayed script entries
    pub fn reported_state(&self, entity_id: &EntityId) -> Option<EntityState> {
        self.entities.get(entity_id).and_then(|e| e.state)
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Number of calls received for `operation`, including failed and duplicate ones
    pub fn call_count(&self, operation: MockOperation) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    /// Number of calls for `operation` that changed remote state
    pub fn applied_count(&self, operation: MockOperation) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.operation == operation && call.applied)
            .count()
    }

    pub fn status_polls(&self) -> usize {
        self.call_count(MockOperation::GetStatus)
    }

    /// Mutating operations in arrival order (status polls left out)
    pub fn mutation_log(&self) -> Vec<MockOperation> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.operation != MockOperation::GetStatus)
            .map(|call| call.operation)
            .collect()
    }

    fn allocate_id(&self, kind: EntityKind) -> EntityId {
        let prefix = match kind {
            EntityKind::MigrationTask => "mt",
            EntityKind::Cluster => "cl",
            EntityKind::InstanceGroup => "ig",
        };
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        EntityId::new(format!("{prefix}-{n:04}"))
    }

    fn script_for(&self, kind: EntityKind, action: LifecycleAction) -> VecDeque<Option<EntityState>> {
        if let Some(script) = self.scripts.get(&(kind, action)) {
            return script.iter().copied().collect();
        }
        let target = definition(kind)
            .transition(action)
            .and_then(|t| t.target.first().copied());
        target.map(Some).into_iter().collect()
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn take_injected(&self, operation: MockOperation) -> Option<RemoteError> {
        self.injected
            .lock()
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
    }

    fn record(
        &self,
        operation: MockOperation,
        entity_id: Option<&EntityId>,
        token: Option<IdempotencyToken>,
        applied: bool,
    ) {
        self.calls.lock().push(MockCall {
            operation,
            entity_id: entity_id.cloned(),
            token,
            applied,
        });
    }

    fn not_found(entity_id: &EntityId) -> RemoteError {
        RemoteError::not_found(format!("entity {entity_id} does not exist")).with_http_status(404)
    }
}

#[async_trait]
impl RemoteApi for MockRemote {
    async fn create(&self, request: CreateRequest) -> RemoteResult<EntityId> {
        self.simulate_latency().await;
        let operation = MockOperation::Create;

        if let Some(error) = self.take_injected(operation) {
            self.record(operation, None, Some(request.token), false);
            return Err(error);
        }

        if let Some(outcome) = self.tokens.get(&request.token) {
            if let TokenOutcome::Created(id) = outcome.value() {
                self.record(operation, Some(id), Some(request.token), false);
                return Ok(id.clone());
            }
        }

        let id = self.allocate_id(request.kind);
        self.entities.insert(
            id.clone(),
            MockEntity {
                kind: request.kind,
                state: None,
                script: self.script_for(request.kind, LifecycleAction::Create),
                removing: false,
            },
        );
        self.tokens
            .insert(request.token, TokenOutcome::Created(id.clone()));
        self.record(operation, Some(&id), Some(request.token), true);
        Ok(id)
    }

    async fn invoke(&self, request: ActionRequest) -> RemoteResult<()> {
        self.simulate_latency().await;
        let operation = MockOperation::Invoke(request.action);
        let id = &request.entity_id;

        if let Some(error) = self.take_injected(operation) {
            self.record(operation, Some(id), Some(request.token), false);
            return Err(error);
        }

        if self.tokens.contains_key(&request.token) {
            self.record(operation, Some(id), Some(request.token), false);
            return Ok(());
        }

        let script = self.script_for(request.kind, request.action);
        let Some(mut entity) = self.entities.get_mut(id) else {
            self.record(operation, Some(id), Some(request.token), false);
            return Err(Self::not_found(id));
        };

        if let Some(current) = entity.effective_state() {
            if definition(entity.kind).check(Some(current), request.action).is_err() {
                drop(entity);
                self.record(operation, Some(id), Some(request.token), false);
                return Err(RemoteError::conflict(format!(
                    "cannot {} entity {id} in state {current}",
                    request.action
                ))
                .with_http_status(409));
            }
        }

        entity.script = script;
        drop(entity);

        self.tokens.insert(request.token, TokenOutcome::Applied);
        self.record(operation, Some(id), Some(request.token), true);
        Ok(())
    }

    async fn get_status(
        &self,
        _kind: EntityKind,
        entity_id: &EntityId,
    ) -> RemoteResult<Option<EntityState>> {
        self.simulate_latency().await;
        let operation = MockOperation::GetStatus;

        if let Some(error) = self.take_injected(operation) {
            self.record(operation, Some(entity_id), None, false);
            return Err(error);
        }
        self.record(operation, Some(entity_id), None, false);

        let Some(mut entity) = self.entities.get_mut(entity_id) else {
            return Err(Self::not_found(entity_id));
        };

        if let Some(next) = entity.script.pop_front() {
            entity.state = next;
            return Ok(next);
        }

        if entity.removing {
            drop(entity);
            self.entities.remove(entity_id);
            return Err(Self::not_found(entity_id));
        }

        Ok(entity.state)
    }

    async fn delete(&self, request: DeleteRequest) -> RemoteResult<()> {
        self.simulate_latency().await;
        let operation = MockOperation::Delete;
        let id = &request.entity_id;

        if let Some(error) = self.take_injected(operation) {
            self.record(operation, Some(id), Some(request.token), false);
            return Err(error);
        }

        if self.tokens.contains_key(&request.token) {
            self.record(operation, Some(id), Some(request.token), false);
            return Ok(());
        }

        let Some(mut entity) = self.entities.get_mut(id) else {
            self.record(operation, Some(id), Some(request.token), false);
            return Err(Self::not_found(id));
        };

        let current = entity.effective_state();
        let deletable = current.map_or(true, |state| definition(entity.kind).can_delete_from(state));
        if !deletable {
            drop(entity);
            self.record(operation, Some(id), Some(request.token), false);
            return Err(RemoteError::conflict(format!(
                "entity {id} is still active ({})",
                crate::state_machine::states::format_observed(&current)
            ))
            .with_http_status(409));
        }

        let script = self
            .scripts
            .get(&(entity.kind, LifecycleAction::Delete))
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        entity.script = script;
        entity.removing = true;
        drop(entity);

        self.tokens.insert(request.token, TokenOutcome::Applied);
        self.record(operation, Some(id), Some(request.token), true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_is_deduplicated_by_token() {
        let remote = MockRemote::new();
        let token = IdempotencyToken::random();
        let request = CreateRequest {
            kind: EntityKind::MigrationTask,
            token,
            spec: serde_json::Value::Null,
        };

        let first = remote.create(request.clone()).await.unwrap();
        let second = remote.create(request).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.as_str(), "mt-0001");
        assert_eq!(remote.entity_count(), 1);
        assert_eq!(remote.applied_count(MockOperation::Create), 1);
        assert_eq!(remote.call_count(MockOperation::Create), 2);
    }

    #[tokio::test]
    async fn test_script_plays_out_and_last_state_sticks() {
        let remote = MockRemote::new();
        let id = remote.seed(EntityKind::MigrationTask, EntityState::Ready);
        remote.script_with_gaps(
            EntityKind::MigrationTask,
            LifecycleAction::Precheck,
            [None, Some(EntityState::Checking), Some(EntityState::CheckPassed)],
        );

        remote
            .invoke(ActionRequest {
                kind: EntityKind::MigrationTask,
                entity_id: id.clone(),
                action: LifecycleAction::Precheck,
                token: IdempotencyToken::random(),
                payload: None,
            })
            .await
            .unwrap();

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(
                remote
                    .get_status(EntityKind::MigrationTask, &id)
                    .await
                    .unwrap(),
            );
        }
        assert_eq!(
            seen,
            [
                None,
                Some(EntityState::Checking),
                Some(EntityState::CheckPassed),
                Some(EntityState::CheckPassed)
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_of_active_entity_is_rejected() {
        let remote = MockRemote::new();
        let id = remote.seed(EntityKind::MigrationTask, EntityState::Running);

        let error = remote
            .delete(DeleteRequest {
                kind: EntityKind::MigrationTask,
                entity_id: id.clone(),
                token: IdempotencyToken::random(),
            })
            .await
            .unwrap_err();

        assert_eq!(error.code.as_deref(), Some("ResourceInUse"));
        assert!(remote.exists(&id));
    }

    #[tokio::test]
    async fn test_injected_errors_are_consumed_in_order() {
        let remote = MockRemote::new();
        let id = remote.seed(EntityKind::Cluster, EntityState::Running);
        remote.fail_next(MockOperation::GetStatus, RemoteError::internal("first"));

        assert!(remote.get_status(EntityKind::Cluster, &id).await.is_err());
        assert_eq!(
            remote.get_status(EntityKind::Cluster, &id).await.unwrap(),
            Some(EntityState::Running)
        );
        assert_eq!(remote.status_polls(), 2);
    }
}
