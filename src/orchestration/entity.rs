use crate::remote::{EntityId, EntityKind, IdempotencyToken};
use crate::state_machine::{EntityState, LifecycleAction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded,
    Failed,
    /// Already succeeded in an earlier run of the same operation
    Skipped,
}

/// Diagnostic record of one attempted step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub index: usize,
    pub step: String,
    pub action: LifecycleAction,
    pub outcome: StepOutcome,
    /// Remote call attempts (0 when no call was issued)
    pub attempts: u32,
    pub polls: u32,
    pub observed_state: Option<EntityState>,
    pub token: Option<IdempotencyToken>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Caller-owned local view of one remote entity and the operation running on it.
///
/// State is only ever observed; the orchestrator updates `observed` from what
/// the remote reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub id: Option<EntityId>,
    /// Seed for per-step idempotency tokens
    pub operation_id: Uuid,
    pub observed: Option<EntityState>,
    pub journal: Vec<StepRecord>,
}

impl Entity {
    /// An entity that does not exist remotely yet
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            id: None,
            operation_id: Uuid::new_v4(),
            observed: None,
            journal: Vec::new(),
        }
    }

    /// An entity the remote already knows about
    pub fn existing(kind: EntityKind, id: EntityId, observed: Option<EntityState>) -> Self {
        Self {
            id: Some(id),
            observed,
            ..Self::new(kind)
        }
    }

    pub fn with_operation_id(mut self, operation_id: Uuid) -> Self {
        self.operation_id = operation_id;
        self
    }

    /// Label used in logs and wait errors
    pub fn label(&self) -> String {
        match &self.id {
            Some(id) => format!("{} {id}", self.kind),
            None => format!("{} (unassigned)", self.kind),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.observed == Some(EntityState::Deleted)
    }

    /// Whether the journal holds a success for the step at `index` named `step`
    pub fn has_succeeded(&self, index: usize, step: &str) -> bool {
        self.journal.iter().any(|record| {
            record.index == index && record.step == step && record.outcome == StepOutcome::Succeeded
        })
    }

    pub fn records_with(&self, outcome: StepOutcome) -> impl Iterator<Item = &StepRecord> {
        self.journal.iter().filter(move |r| r.outcome == outcome)
    }

    /// Most recent failed step, the point an operator would resume from
    pub fn last_failure(&self) -> Option<&StepRecord> {
        self.journal
            .iter()
            .rev()
            .find(|r| r.outcome == StepOutcome::Failed)
    }

    pub fn total_polls(&self) -> u32 {
        self.journal.iter().map(|r| r.polls).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: usize, step: &str, outcome: StepOutcome, polls: u32) -> StepRecord {
        StepRecord {
            index,
            step: step.to_string(),
            action: LifecycleAction::Configure,
            outcome,
            attempts: 1,
            polls,
            observed_state: None,
            token: None,
            error: None,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn test_journal_queries() {
        let mut entity = Entity::existing(
            EntityKind::MigrationTask,
            EntityId::new("mt-0001"),
            Some(EntityState::Ready),
        );
        entity.journal.push(record(0, "configure", StepOutcome::Succeeded, 0));
        entity.journal.push(record(1, "precheck", StepOutcome::Failed, 4));

        assert!(entity.has_succeeded(0, "configure"));
        assert!(!entity.has_succeeded(1, "precheck"));
        assert!(!entity.has_succeeded(1, "configure"));
        assert_eq!(entity.last_failure().unwrap().step, "precheck");
        assert_eq!(entity.total_polls(), 4);
        assert_eq!(entity.records_with(StepOutcome::Succeeded).count(), 1);
        assert_eq!(entity.label(), "migration_task mt-0001");
    }

    #[test]
    fn test_journal_serializes_with_wire_names() {
        let mut entity = Entity::new(EntityKind::Cluster);
        let mut succeeded = record(0, "create", StepOutcome::Succeeded, 2);
        succeeded.observed_state = Some(EntityState::CheckPassed);
        entity.journal.push(succeeded);

        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["kind"], "cluster");
        assert_eq!(json["journal"][0]["outcome"], "succeeded");
        assert_eq!(json["journal"][0]["observed_state"], "checkPassed");
    }
}
