use crate::common::{ApplicationError, ApplicationResult, DomainError, DomainEvent, EventEnvelope, EventMetadata, EventPublisher};
use crate::domains::fleet::FleetEvent;
use crate::domains::scheduler::{FleetHandle, TickReport, TickScheduler};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

const EVENT_SOURCE: &str = "medifleet";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub events_published: usize,
    pub publish_failures: usize,
}

/// Drives the scheduler at a fixed rate and forwards its events.
pub struct FleetService {
    scheduler: TickScheduler,
    publisher: Arc<dyn EventPublisher>,
    tick_interval: Duration,
    max_ticks: Option<u64>,
}

impl FleetService {
    pub fn new(scheduler: TickScheduler, publisher: Arc<dyn EventPublisher>, tick_interval: Duration) -> Self {
        Self {
            scheduler,
            publisher,
            tick_interval,
            max_ticks: None,
        }
    }

    pub fn with_max_ticks(mut self, max_ticks: Option<u64>) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    pub fn handle(&self) -> FleetHandle {
        self.scheduler.handle()
    }

    pub fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    /// Runs one tick and publishes what it raised. Publisher failures are
    /// counted and logged, never returned.
    pub async fn step(&mut self, summary: &mut RunSummary) -> TickReport {
        let report = self.scheduler.tick();
        summary.ticks += 1;
        let tick = report.tick;
        for event in self.scheduler.take_events() {
            match self.publish(&event, tick).await {
                Ok(()) => summary.events_published += 1,
                Err(e) => {
                    summary.publish_failures += 1;
                    warn!(event_type = event.event_type(), "Event publish failed: {}", e);
                }
            }
        }
        debug!(
            tick,
            arbitrated = report.arbitrated,
            awards = report.awards.len(),
            moved = report.robots_moved().count(),
            "tick finished"
        );
        report
    }

    async fn publish(&self, event: &FleetEvent, tick: u64) -> ApplicationResult<()> {
        let envelope = EventEnvelope::new(event, "Task", EventMetadata::from_tick(EVENT_SOURCE, tick))
            .map_err(DomainError::from)?;
        self.publisher
            .publish(envelope)
            .await
            .map_err(ApplicationError::EventPublisher)
    }

    /// Ticks until `shutdown` is set, the sender goes away, or the tick limit is hit.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_ms = self.tick_interval.as_millis() as u64, "Fleet service running");

        loop {
            if self.max_ticks.is_some_and(|max| summary.ticks >= max) {
                info!(ticks = summary.ticks, "Tick limit reached");
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    self.step(&mut summary).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown requested");
                        break;
                    }
                }
            }
        }
        summary
    }
}
