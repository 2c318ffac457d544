use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kinds of remote entity the orchestrator knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Data migration task (configure → precheck → start)
    MigrationTask,
    /// Managed cluster
    Cluster,
    /// Autoscaled instance group
    InstanceGroup,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [Self::MigrationTask, Self::Cluster, Self::InstanceGroup];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MigrationTask => "migration_task",
            Self::Cluster => "cluster",
            Self::InstanceGroup => "instance_group",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "migration_task" => Ok(Self::MigrationTask),
            "cluster" => Ok(Self::Cluster),
            "instance_group" => Ok(Self::InstanceGroup),
            _ => Err(format!("Invalid entity kind: {s}")),
        }
    }
}

/// Opaque identifier assigned by the remote system when an entity is created
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Client-supplied token the remote uses to deduplicate retried mutating calls.
///
/// Tokens are derived from the operation id, the step position and the step
/// name, so re-running the same operation produces the same token for the
/// same step while distinct steps never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyToken(Uuid);

impl IdempotencyToken {
    pub fn derive(operation_id: Uuid, step_index: usize, step_name: &str) -> Self {
        let name = format!("{step_index}:{step_name}");
        Self(Uuid::new_v5(&operation_id, name.as_bytes()))
    }

    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for IdempotencyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_derivation_is_stable() {
        let operation = Uuid::new_v4();
        assert_eq!(
            IdempotencyToken::derive(operation, 1, "configure"),
            IdempotencyToken::derive(operation, 1, "configure")
        );
        assert_ne!(
            IdempotencyToken::derive(operation, 1, "configure"),
            IdempotencyToken::derive(operation, 2, "configure")
        );
        assert_ne!(
            IdempotencyToken::derive(operation, 1, "configure"),
            IdempotencyToken::derive(Uuid::new_v4(), 1, "configure")
        );
    }

    #[test]
    fn test_entity_kind_string_conversion() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.to_string().parse::<EntityKind>().unwrap(), kind);
        }
        assert!("bucket".parse::<EntityKind>().is_err());
    }
}
