use crate::error::{LifecycleError, Result};
use crate::polling::{WaitSpec, WaitTiming};
use crate::remote::EntityKind;
use crate::state_machine::{definition, LifecycleAction};
use serde_json::Value;

/// One ordered unit of work: a remote call plus an optional wait condition.
///
/// Steps are immutable once built; operations receive them as slices.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    name: String,
    action: LifecycleAction,
    payload: Option<Value>,
    wait: Option<WaitSpec>,
}

impl Step {
    pub fn new(name: impl Into<String>, action: LifecycleAction) -> Self {
        Self {
            name: name.into(),
            action,
            payload: None,
            wait: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_wait(mut self, wait: WaitSpec) -> Self {
        self.wait = Some(wait);
        self
    }

    /// Build the step for `action` from the lifecycle table of `kind`.
    ///
    /// Transitions without intermediate states (other than creation) complete
    /// synchronously on the remote and get no wait.
    pub fn from_table(kind: EntityKind, action: LifecycleAction, timing: WaitTiming) -> Result<Self> {
        let transition =
            definition(kind)
                .transition(action)
                .ok_or(LifecycleError::InvalidTransition {
                    kind,
                    from: None,
                    action,
                })?;

        let step = Self::new(action.as_str(), action);
        if transition.pending.is_empty() && !transition.is_creation() {
            return Ok(step);
        }
        Ok(step.with_wait(WaitSpec::for_transition(transition, timing)?))
    }

    /// Build a whole sequence from the table, in order
    pub fn sequence(
        kind: EntityKind,
        actions: &[LifecycleAction],
        timing: WaitTiming,
    ) -> Result<Vec<Self>> {
        actions
            .iter()
            .map(|action| Self::from_table(kind, *action, timing))
            .collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self) -> LifecycleAction {
        self.action
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn wait(&self) -> Option<&WaitSpec> {
        self.wait.as_ref()
    }
}
