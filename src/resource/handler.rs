//! # CRUD Handler
//!
//! Maps create/read/update/delete onto the fixed step sequences of an entity
//! kind's lifecycle table and hands them to the orchestrator.

use crate::config::LifecycleConfig;
use crate::error::Result;
use crate::orchestration::{Entity, Orchestrator, Step};
use crate::polling::{WaitSpec, WaitTiming};
use crate::remote::{EntityId, EntityKind};
use crate::state_machine::{definition, EntityState, LifecycleAction, LifecycleDefinition};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// CRUD entry points for one entity kind
#[derive(Debug, Clone)]
pub struct ResourceHandler {
    kind: EntityKind,
    orchestrator: Arc<Orchestrator>,
    timing: WaitTiming,
}

impl ResourceHandler {
    pub fn new(kind: EntityKind, orchestrator: Arc<Orchestrator>, timing: WaitTiming) -> Self {
        Self {
            kind,
            orchestrator,
            timing,
        }
    }

    /// Handler whose wait timing comes from the kind's configuration section
    pub fn from_config(
        kind: EntityKind,
        orchestrator: Arc<Orchestrator>,
        config: &LifecycleConfig,
    ) -> Self {
        Self::new(kind, orchestrator, config.wait_timing(kind))
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    fn definition(&self) -> &'static LifecycleDefinition {
        definition(self.kind)
    }

    /// Create the entity and drive it through the create sequence.
    ///
    /// When a later step fails the error still carries the assigned id.
    pub async fn create(&self, config: Value) -> Result<EntityId> {
        let mut entity = Entity::new(self.kind);
        self.apply_create(&mut entity, config).await?;
        entity.id.ok_or_else(|| crate::error::LifecycleError::MissingEntityId {
            step: LifecycleAction::Create.as_str().to_string(),
        })
    }

    /// Create sequence against a caller-owned entity, keeping its journal
    pub async fn apply_create(&self, entity: &mut Entity, config: Value) -> Result<()> {
        let steps = self.with_config(self.definition().create_sequence, &config)?;
        self.orchestrator.run(entity, &steps).await
    }

    /// Current state, or `None` once the entity is gone and local state should be cleared
    pub async fn read(&self, entity_id: &EntityId) -> Result<Option<EntityState>> {
        let observed = self.orchestrator.observe(self.kind, entity_id).await?;
        Ok(match observed {
            Some(EntityState::Deleted) => None,
            Some(state) => Some(state),
            None => Some(self.definition().initial),
        })
    }

    pub async fn update(&self, entity_id: &EntityId, config: Value) -> Result<()> {
        let mut entity = Entity::existing(self.kind, entity_id.clone(), None);
        self.apply_update(&mut entity, config).await
    }

    /// Update sequence, quiescing a running entity first
    pub async fn apply_update(&self, entity: &mut Entity, config: Value) -> Result<()> {
        let definition = self.definition();
        let current = self.settled_state(entity).await?;

        let mut actions = Vec::new();
        if let Some(quiesce) = definition.update_quiesce {
            if definition.needs_quiesce(current) {
                debug!(entity = %entity.label(), state = %current, action = %quiesce, "Quiescing before update");
                actions.push(quiesce);
            }
        }
        actions.extend_from_slice(definition.update_sequence);

        let steps = self.with_config(&actions, &config)?;
        self.orchestrator.run(entity, &steps).await
    }

    pub async fn delete(&self, entity_id: &EntityId) -> Result<()> {
        let mut entity = Entity::existing(self.kind, entity_id.clone(), None);
        self.apply_delete(&mut entity).await
    }

    /// Delete, tearing down first when the remote would reject a blind delete.
    ///
    /// An entity that is already gone counts as deleted.
    pub async fn apply_delete(&self, entity: &mut Entity) -> Result<()> {
        let definition = self.definition();
        let current = self.settled_state(entity).await?;

        if current == EntityState::Deleted {
            info!(entity = %entity.label(), "Entity already deleted");
            entity.id = None;
            return Ok(());
        }

        let mut actions = Vec::new();
        if let Some(teardown) = definition.delete_teardown {
            if !current.is_terminal() && definition.needs_teardown(current) {
                info!(entity = %entity.label(), state = %current, action = %teardown, "Tearing down before delete");
                actions.push(teardown);
            }
        }
        actions.push(LifecycleAction::Delete);

        let steps = Step::sequence(self.kind, &actions, self.timing)?;
        self.orchestrator.run(entity, &steps).await
    }

    /// Observe the entity, waiting out transient states so the next action is legal
    async fn settled_state(&self, entity: &mut Entity) -> Result<EntityState> {
        let Some(entity_id) = entity.id.clone() else {
            return Err(crate::error::LifecycleError::MissingEntityId {
                step: "observe".to_string(),
            });
        };

        let observed = self
            .orchestrator
            .observe(self.kind, &entity_id)
            .await?
            .unwrap_or(self.definition().initial);
        entity.observed = Some(observed);

        if !observed.is_transient() {
            return Ok(observed);
        }

        debug!(entity = %entity.label(), state = %observed, "Waiting for entity to settle");
        let settled = self.definition().settled_states();
        let spec = WaitSpec::new(settled, Vec::<EntityState>::new(), self.timing)?;
        self.orchestrator.await_state(entity, &spec).await
    }

    /// Table steps for `actions`, with `config` attached to the steps that send it
    fn with_config(&self, actions: &[LifecycleAction], config: &Value) -> Result<Vec<Step>> {
        Ok(Step::sequence(self.kind, actions, self.timing)?
            .into_iter()
            .map(|step| match step.action() {
                LifecycleAction::Create | LifecycleAction::Configure | LifecycleAction::Resize => {
                    step.with_payload(config.clone())
                }
                _ => step,
            })
            .collect())
    }
}
