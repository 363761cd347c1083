use crate::common::{EventEnvelope, EventPublisher};
use async_trait::async_trait;

/// Announces lifecycle events on the `medifleet::events` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventPublisher;

#[async_trait]
impl EventPublisher for LogEventPublisher {
    async fn publish(&self, envelope: EventEnvelope) -> Result<(), String> {
        tracing::info!(
            target: "medifleet::events",
            event_type = %envelope.event_type,
            task_id = %envelope.aggregate_id,
            tick = envelope.metadata.tick.unwrap_or_default(),
            "{}",
            envelope.event_data
        );
        Ok(())
    }
}
