use super::actions::LifecycleAction;
use super::states::EntityState;
use crate::error::{LifecycleError, Result};
use crate::remote::EntityKind;

/// One row of a lifecycle table: the states an action may be issued from and
/// the states the waiter should expect afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub action: LifecycleAction,
    /// Legal source states. Empty for `Create`, which runs before the entity exists.
    pub from: &'static [EntityState],
    /// Intermediate states the remote passes through
    pub pending: &'static [EntityState],
    pub target: &'static [EntityState],
    pub failure: &'static [EntityState],
}

impl Transition {
    pub fn allows_from(&self, state: EntityState) -> bool {
        self.from.contains(&state)
    }

    /// Whether the action only makes sense before the entity exists
    pub fn is_creation(&self) -> bool {
        self.from.is_empty()
    }
}

/// Static description of how one entity kind moves through its lifecycle
#[derive(Debug)]
pub struct LifecycleDefinition {
    pub kind: EntityKind,
    /// State of a freshly created entity
    pub initial: EntityState,
    pub transitions: &'static [Transition],
    /// Actions a create operation runs, in order
    pub create_sequence: &'static [LifecycleAction],
    /// Actions an update operation runs, in order
    pub update_sequence: &'static [LifecycleAction],
    /// Action that makes a running entity safe to update, applied only from its `from` states
    pub update_quiesce: Option<LifecycleAction>,
    /// Action that brings an active entity to a deletable state
    pub delete_teardown: Option<LifecycleAction>,
    /// States from which the remote accepts a delete
    pub deletable: &'static [EntityState],
}

impl LifecycleDefinition {
    pub fn transition(&self, action: LifecycleAction) -> Option<&'static Transition> {
        self.transitions.iter().find(|t| t.action == action)
    }

    /// Look up the transition for `action` and check that it is legal from `from`.
    ///
    /// `from == None` means the current state is unknown (or the entity does
    /// not exist yet); only creation is then checked, against the entity
    /// already existing.
    pub fn check(
        &self,
        from: Option<EntityState>,
        action: LifecycleAction,
    ) -> Result<&'static Transition> {
        let invalid = || LifecycleError::InvalidTransition {
            kind: self.kind,
            from,
            action,
        };

        let transition = self.transition(action).ok_or_else(invalid)?;
        match from {
            Some(_) if transition.is_creation() => Err(invalid()),
            Some(state) if !transition.allows_from(state) => Err(invalid()),
            _ => Ok(transition),
        }
    }

    pub fn can_delete_from(&self, state: EntityState) -> bool {
        state == EntityState::Deleted || self.deletable.contains(&state)
    }

    /// Whether a delete from `state` must first run the teardown action
    pub fn needs_teardown(&self, state: EntityState) -> bool {
        !self.can_delete_from(state)
            && self
                .delete_teardown
                .and_then(|action| self.transition(action))
                .is_some_and(|t| t.allows_from(state))
    }

    /// Whether an update from `state` must first run the quiesce action
    pub fn needs_quiesce(&self, state: EntityState) -> bool {
        self.update_quiesce
            .and_then(|action| self.transition(action))
            .is_some_and(|t| t.allows_from(state))
    }

    /// Every state mentioned by this kind's table
    pub fn states(&self) -> Vec<EntityState> {
        let mut states: Vec<EntityState> = EntityState::ALL
            .into_iter()
            .filter(|state| {
                *state == self.initial
                    || self.deletable.contains(state)
                    || self.transitions.iter().any(|t| {
                        t.from.contains(state)
                            || t.pending.contains(state)
                            || t.target.contains(state)
                            || t.failure.contains(state)
                    })
            })
            .collect();
        states.sort();
        states
    }

    /// States the remote will not leave on its own
    pub fn settled_states(&self) -> Vec<EntityState> {
        self.states()
            .into_iter()
            .filter(|state| !state.is_transient())
            .collect()
    }
}
