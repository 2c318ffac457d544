//! # Remote API Boundary
//!
//! The interface the orchestrator consumes from a cloud control plane. Real
//! implementations wrap an SDK client; [`crate::test_helpers::MockRemote`] is an
//! in-memory implementation used by tests and the simulation binary.
//!
//! Implementations are shared between concurrently running orchestrations and
//! must therefore be `Send + Sync`. Every mutating request carries an
//! [`IdempotencyToken`]; the remote is expected to treat a repeated token as a
//! no-op returning the original outcome.

pub mod error;
pub mod types;

pub use error::{RemoteError, RemoteResult};
pub use types::{EntityId, EntityKind, IdempotencyToken};

use crate::state_machine::{EntityState, LifecycleAction};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request to create a new remote entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequest {
    pub kind: EntityKind,
    pub token: IdempotencyToken,
    pub spec: Value,
}

/// Request to perform a lifecycle verb (configure, precheck, start, ...) on an entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    pub kind: EntityKind,
    pub entity_id: EntityId,
    pub action: LifecycleAction,
    pub token: IdempotencyToken,
    pub payload: Option<Value>,
}

/// Request to remove an entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub kind: EntityKind,
    pub entity_id: EntityId,
    pub token: IdempotencyToken,
}

/// Per-entity-type operations exposed by the cloud control plane
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Create an entity and return the id the remote assigned to it
    async fn create(&self, request: CreateRequest) -> RemoteResult<EntityId>;

    /// Perform a domain-specific verb on an existing entity
    async fn invoke(&self, request: ActionRequest) -> RemoteResult<()>;

    /// Report the current state; `Ok(None)` means the remote has no status yet
    async fn get_status(&self, kind: EntityKind, entity_id: &EntityId)
        -> RemoteResult<Option<EntityState>>;

    /// Remove an entity; the remote rejects this for entities that are still active
    async fn delete(&self, request: DeleteRequest) -> RemoteResult<()>;
}
