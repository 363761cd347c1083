use crate::common::{EventEnvelope, EventPublisher};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Keeps every published envelope in memory, in publish order.
#[derive(Debug, Default)]
pub struct InMemoryEventPublisher {
    events: RwLock<Vec<EventEnvelope>>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<EventEnvelope> {
        self.events.read().await.clone()
    }

    pub async fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    /// Envelopes raised for one task, oldest first.
    pub async fn events_for(&self, task_id: &str) -> Vec<EventEnvelope> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.aggregate_id == task_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, envelope: EventEnvelope) -> Result<(), String> {
        self.events.write().await.push(envelope);
        Ok(())
    }
}
