use serde::{Deserialize, Serialize};
use std::fmt;

/// Verbs that move a remote entity between states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    /// Create the entity; the remote assigns its id
    Create,
    /// Push configuration to the entity
    Configure,
    /// Ask the remote to validate the configuration
    Precheck,
    /// Begin running
    Start,
    /// Issue no request, wait for a running entity to reach its end state
    AwaitCompletion,
    /// Suspend a running entity
    Pause,
    /// Continue a paused entity
    Resume,
    /// Force a terminal state so the entity can be deleted
    Shutdown,
    /// Change capacity of a cluster or instance group
    Resize,
    /// Remove the entity
    Delete,
}

impl LifecycleAction {
    pub const ALL: [LifecycleAction; 10] = [
        Self::Create,
        Self::Configure,
        Self::Precheck,
        Self::Start,
        Self::AwaitCompletion,
        Self::Pause,
        Self::Resume,
        Self::Shutdown,
        Self::Resize,
        Self::Delete,
    ];

    /// Get a string representation of the action for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Configure => "configure",
            Self::Precheck => "precheck",
            Self::Start => "start",
            Self::AwaitCompletion => "await_completion",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Shutdown => "shutdown",
            Self::Resize => "resize",
            Self::Delete => "delete",
        }
    }

    /// Whether the action sends a request that changes remote state
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::AwaitCompletion)
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
