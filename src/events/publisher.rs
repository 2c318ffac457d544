use crate::remote::{EntityId, EntityKind};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

/// Broadcast publisher for lifecycle events
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<LifecycleEvent>,
}

/// Event that has been published
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleEvent {
    pub name: String,
    pub entity_kind: EntityKind,
    pub entity_id: Option<EntityId>,
    pub context: Value,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event with the given name and context
    pub async fn publish(
        &self,
        event_name: impl Into<String>,
        entity_kind: EntityKind,
        entity_id: Option<EntityId>,
        context: Value,
    ) -> Result<(), PublishError> {
        let event = LifecycleEvent {
            name: event_name.into(),
            entity_kind,
            entity_id,
            context,
            published_at: chrono::Utc::now(),
        };

        // send() only fails when nobody is subscribed, which is fine
        match self.sender.send(event) {
            Ok(_) => Ok(()),
            Err(broadcast::error::SendError(_)) => Ok(()),
        }
    }

    /// Publish an event whose context is any serializable value
    pub async fn publish_serialized<T: Serialize>(
        &self,
        event_name: impl Into<String>,
        entity_kind: EntityKind,
        entity_id: Option<EntityId>,
        context: &T,
    ) -> Result<(), PublishError> {
        let context = serde_json::to_value(context)?;
        self.publish(event_name, entity_kind, entity_id, context)
            .await
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Error types for event publishing
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_EVENT_CAPACITY)
    }
}
