//! Lifecycle tables for every supported entity kind.
//!
//! Each table is fixed data: adding an entity kind means adding a table here,
//! not writing another polling loop.

use super::actions::LifecycleAction::{self, *};
use super::states::EntityState::{self, *};
use super::transitions::{LifecycleDefinition, Transition};
use crate::remote::EntityKind;

const NONE: &[EntityState] = &[];

static MIGRATION_TASK_TRANSITIONS: [Transition; 9] = [
    Transition {
        action: Create,
        from: NONE,
        pending: NONE,
        target: &[Unconfigured],
        failure: NONE,
    },
    Transition {
        action: Configure,
        from: &[Unconfigured, Ready, CheckPassed, CheckFailed, Stopped],
        pending: NONE,
        target: &[Ready],
        failure: NONE,
    },
    Transition {
        action: Precheck,
        from: &[Ready, CheckPassed, CheckFailed],
        pending: &[Ready, Checking],
        target: &[CheckPassed],
        failure: &[CheckFailed],
    },
    Transition {
        action: Start,
        from: &[CheckPassed],
        pending: &[CheckPassed],
        target: &[Running, Finished],
        failure: &[RunFailed],
    },
    Transition {
        action: AwaitCompletion,
        from: &[Running],
        pending: &[Running],
        target: &[Finished],
        failure: &[RunFailed],
    },
    Transition {
        action: Pause,
        from: &[Running],
        pending: &[Running, Stopping],
        target: &[Stopped],
        failure: &[RunFailed],
    },
    Transition {
        action: Resume,
        from: &[Stopped],
        pending: &[Stopped],
        target: &[Running, Finished],
        failure: &[RunFailed],
    },
    Transition {
        action: Shutdown,
        from: &[CheckFailed, CheckPassed, Running, Stopped, RunFailed],
        pending: &[Stopping],
        target: &[Finished],
        failure: NONE,
    },
    Transition {
        action: Delete,
        from: &[Unconfigured, Ready, Finished, Deleted],
        pending: &[Deleting],
        target: &[Deleted],
        failure: NONE,
    },
];

static CLUSTER_TRANSITIONS: [Transition; 3] = [
    Transition {
        action: Create,
        from: NONE,
        pending: &[Creating],
        target: &[Running],
        failure: &[CreateFailed],
    },
    Transition {
        action: Resize,
        from: &[Running],
        pending: &[Running, Scaling],
        target: &[Running],
        failure: &[Failed],
    },
    Transition {
        action: Delete,
        from: &[Running, CreateFailed, Failed, Deleted],
        pending: &[Deleting],
        target: &[Deleted],
        failure: NONE,
    },
];

static INSTANCE_GROUP_TRANSITIONS: [Transition; 3] = [
    Transition {
        action: Create,
        from: NONE,
        pending: &[Creating],
        target: &[Active],
        failure: &[CreateFailed],
    },
    Transition {
        action: Resize,
        from: &[Active],
        pending: &[Active, Scaling],
        target: &[Active],
        failure: &[Failed],
    },
    Transition {
        action: Delete,
        from: &[Active, CreateFailed, Failed, Deleted],
        pending: &[Deleting],
        target: &[Deleted],
        failure: NONE,
    },
];

pub static MIGRATION_TASK: LifecycleDefinition = LifecycleDefinition {
    kind: EntityKind::MigrationTask,
    initial: Unconfigured,
    transitions: &MIGRATION_TASK_TRANSITIONS,
    create_sequence: &[Create, Configure, Precheck, Start],
    update_sequence: &[Configure, Precheck, Start],
    update_quiesce: Some(Pause),
    delete_teardown: Some(Shutdown),
    deletable: &[Unconfigured, Ready, Finished],
};

pub static CLUSTER: LifecycleDefinition = LifecycleDefinition {
    kind: EntityKind::Cluster,
    initial: Creating,
    transitions: &CLUSTER_TRANSITIONS,
    create_sequence: &[Create],
    update_sequence: &[Resize],
    update_quiesce: None,
    delete_teardown: None,
    deletable: &[Running, CreateFailed, Failed],
};

pub static INSTANCE_GROUP: LifecycleDefinition = LifecycleDefinition {
    kind: EntityKind::InstanceGroup,
    initial: Creating,
    transitions: &INSTANCE_GROUP_TRANSITIONS,
    create_sequence: &[Create],
    update_sequence: &[Resize],
    update_quiesce: None,
    delete_teardown: None,
    deletable: &[Active, CreateFailed, Failed],
};

/// Lifecycle table for an entity kind
pub fn definition(kind: EntityKind) -> &'static LifecycleDefinition {
    match kind {
        EntityKind::MigrationTask => &MIGRATION_TASK,
        EntityKind::Cluster => &CLUSTER,
        EntityKind::InstanceGroup => &INSTANCE_GROUP,
    }
}

/// Actions a kind supports, in table order
pub fn supported_actions(kind: EntityKind) -> Vec<LifecycleAction> {
    definition(kind).transitions.iter().map(|t| t.action).collect()
}
