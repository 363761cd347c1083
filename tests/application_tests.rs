use async_trait::async_trait;
use medifleet::adapters::outbound::{init_noop_logger, InMemoryEventPublisher};
use medifleet::application::{FleetService, RunSummary};
use medifleet::common::{EventEnvelope, EventPublisher};
use medifleet::domains::scheduler::{TaskSubmission, TickScheduler};
use medifleet::Config;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

struct RejectingPublisher;

#[async_trait]
impl EventPublisher for RejectingPublisher {
    async fn publish(&self, _envelope: EventEnvelope) -> Result<(), String> {
        Err("sink offline".to_string())
    }
}

async fn step_until_completed(service: &mut FleetService, summary: &mut RunSummary) {
    for _ in 0..200 {
        service.step(summary).await;
        if service.scheduler().snapshot().stats.completed_tasks == 1 {
            return;
        }
    }
    panic!("task never completed");
}

fn service(publisher: Arc<dyn EventPublisher>) -> FleetService {
    let scheduler = TickScheduler::from_config(&Config::default(), init_noop_logger()).unwrap();
    FleetService::new(scheduler, publisher, Duration::from_millis(1))
}

#[tokio::test]
async fn test_step_publishes_task_lifecycle() {
    let publisher = Arc::new(InMemoryEventPublisher::new());
    let mut service = service(publisher.clone());
    service
        .handle()
        .submit(TaskSubmission::new("PHA").with_id("delivery-1"))
        .unwrap();

    let mut summary = RunSummary::default();
    step_until_completed(&mut service, &mut summary).await;

    assert!(summary.ticks > 5);
    assert_eq!(summary.publish_failures, 0);
    let types: Vec<String> = publisher
        .events_for("delivery-1")
        .await
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(types, vec!["task.created", "task.assigned", "task.completed"]);
    assert_eq!(summary.events_published, 3);

    let created = &publisher.events_of_type("task.created").await[0];
    assert_eq!(created.aggregate_type, "Task");
    assert_eq!(created.metadata.tick, Some(1));
}

#[tokio::test]
async fn test_publish_failures_do_not_stop_the_fleet() {
    let mut service = service(Arc::new(RejectingPublisher));
    service.handle().submit(TaskSubmission::new("ICU")).unwrap();

    let mut summary = RunSummary::default();
    step_until_completed(&mut service, &mut summary).await;

    assert_eq!(summary.events_published, 0);
    assert_eq!(summary.publish_failures, 3);
}

#[tokio::test]
async fn test_run_stops_at_tick_limit() {
    let publisher = Arc::new(InMemoryEventPublisher::new());
    let mut service = service(publisher).with_max_ticks(Some(5));
    let (_tx, rx) = watch::channel(false);

    let summary = service.run(rx).await;
    assert_eq!(summary.ticks, 5);
    assert_eq!(service.handle().snapshot().unwrap().tick, 5);
}

#[tokio::test]
async fn test_run_stops_on_shutdown_signal() {
    let publisher = Arc::new(InMemoryEventPublisher::new());
    let mut service = service(publisher);
    let (tx, rx) = watch::channel(false);

    let runner = tokio::spawn(async move { service.run(rx).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    tx.send(true).unwrap();
    let summary = runner.await.unwrap();
    assert!(summary.ticks >= 1);
}
