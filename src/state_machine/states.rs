use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase a state belongs to. Phases are totally ordered; failure
/// states keep the phase they failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Provision,
    Configure,
    Validate,
    Run,
    Terminate,
}

/// State reported by the remote system for an entity.
///
/// One enum covers every entity kind; each kind's lifecycle table uses the
/// subset that applies to it. Wire names follow the remote's camelCase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityState {
    /// Created but not yet configured
    Unconfigured,
    /// Configured, ready for validation
    Ready,
    /// Remote precheck in progress
    Checking,
    CheckPassed,
    CheckFailed,
    Running,
    /// Pause requested, remote winding down
    Stopping,
    Stopped,
    Finished,
    RunFailed,
    /// Remote provisioning in progress
    Creating,
    CreateFailed,
    /// Capacity change in progress
    Scaling,
    Active,
    Failed,
    /// Remote teardown in progress
    Deleting,
    /// Entity no longer exists remotely
    Deleted,
}

impl EntityState {
    pub const ALL: [EntityState; 17] = [
        Self::Unconfigured,
        Self::Ready,
        Self::Checking,
        Self::CheckPassed,
        Self::CheckFailed,
        Self::Running,
        Self::Stopping,
        Self::Stopped,
        Self::Finished,
        Self::RunFailed,
        Self::Creating,
        Self::CreateFailed,
        Self::Scaling,
        Self::Active,
        Self::Failed,
        Self::Deleting,
        Self::Deleted,
    ];

    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Deleted)
    }

    /// Check if the remote reported an explicit failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::CheckFailed | Self::RunFailed | Self::CreateFailed | Self::Failed
        )
    }

    /// States the remote moves out of on its own, without another request
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Checking | Self::Stopping | Self::Creating | Self::Scaling | Self::Deleting
        )
    }

    pub fn phase(&self) -> Phase {
        match self {
            Self::Creating | Self::CreateFailed => Phase::Provision,
            Self::Unconfigured | Self::Ready => Phase::Configure,
            Self::Checking | Self::CheckPassed | Self::CheckFailed => Phase::Validate,
            Self::Running
            | Self::Stopping
            | Self::Stopped
            | Self::RunFailed
            | Self::Scaling
            | Self::Active
            | Self::Failed => Phase::Run,
            Self::Finished | Self::Deleting | Self::Deleted => Phase::Terminate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Ready => "ready",
            Self::Checking => "checking",
            Self::CheckPassed => "checkPassed",
            Self::CheckFailed => "checkFailed",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Finished => "finished",
            Self::RunFailed => "runFailed",
            Self::Creating => "creating",
            Self::CreateFailed => "createFailed",
            Self::Scaling => "scaling",
            Self::Active => "active",
            Self::Failed => "failed",
            Self::Deleting => "deleting",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| format!("Invalid entity state: {s}"))
    }
}

/// Render a state set as `{a, b}` for messages
pub fn format_states(states: &[EntityState]) -> String {
    let names: Vec<&str> = states.iter().map(EntityState::as_str).collect();
    format!("{{{}}}", names.join(", "))
}

/// Render an optional observation, `none` when nothing was observed
pub fn format_observed(state: &Option<EntityState>) -> String {
    state.map_or_else(|| "none".to_string(), |s| s.to_string())
}
