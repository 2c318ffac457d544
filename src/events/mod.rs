pub mod publisher;

// Re-export key types for convenience
pub use crate::constants::events as names;
pub use publisher::{EventPublisher, LifecycleEvent, PublishError};
