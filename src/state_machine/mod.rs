// Lifecycle state machine
//
// Table-driven description of the states each remote entity kind reports and
// the actions that move it between them. The orchestrator consults these
// tables to reject illegal calls and to build wait specs; the state itself is
// only ever observed from the remote, never set locally.

pub mod actions;
pub mod definitions;
pub mod states;
pub mod transitions;

pub use actions::LifecycleAction;
pub use definitions::{definition, supported_actions};
pub use states::{EntityState, Phase};
pub use transitions::{LifecycleDefinition, Transition};
