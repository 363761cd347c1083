use anyhow::Context;
use medifleet::adapters::inbound::RandomTaskSource;
use medifleet::adapters::outbound::{
    init_combined_logger, init_tracing_logger, FileEventPublisher, InMemoryEventPublisher, LogEventPublisher,
};
use medifleet::application::FleetService;
use medifleet::common::EventPublisher;
use medifleet::config::EventSink;
use medifleet::domains::scheduler::TickScheduler;
use medifleet::Config;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).context("installing tracing subscriber")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;
    init_tracing(&config.logging.level)?;

    info!("Starting MediFleet");

    let logger = match &config.logging.file {
        Some(path) => {
            let level = config.logging.level.parse().unwrap_or(log::LevelFilter::Info);
            init_combined_logger(path, level)
        }
        None => init_tracing_logger(),
    };

    let publisher: Arc<dyn EventPublisher> = match config.events.sink {
        EventSink::Log => Arc::new(LogEventPublisher),
        EventSink::File => Arc::new(FileEventPublisher::new(config.events.file_path.clone())),
        EventSink::Memory => Arc::new(InMemoryEventPublisher::new()),
    };

    let scheduler = TickScheduler::from_config(&config, logger).context("building the fleet")?;
    info!(
        rows = config.grid.rows,
        cols = config.grid.cols,
        robots = config.robots.len(),
        "Floor plan loaded"
    );

    let mut service = FleetService::new(scheduler, publisher, config.tick_interval())
        .with_max_ticks(config.scheduler.max_ticks);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let demo = config.demo.enabled.then(|| {
        let destinations = config
            .grid
            .waypoints
            .iter()
            .map(|w| w.name.clone())
            .filter(|name| config.grid.home.as_deref().map_or(true, |home| !home.eq_ignore_ascii_case(name)))
            .collect();
        let source = RandomTaskSource::new(
            service.handle(),
            destinations,
            Duration::from_millis(config.demo.interval_ms),
            config.demo.seed,
        );
        tokio::spawn(source.run(shutdown_rx.clone()))
    });

    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = signal_tx.send(true);
        }
    });

    let summary = service.run(shutdown_rx).await;
    let _ = shutdown_tx.send(true);

    if let Some(demo) = demo {
        match demo.await {
            Ok(accepted) => info!(accepted, "Demo source stopped"),
            Err(e) => warn!("Demo source panicked: {}", e),
        }
    }

    if let Ok(snapshot) = service.handle().snapshot() {
        info!(
            ticks = summary.ticks,
            events = summary.events_published,
            publish_failures = summary.publish_failures,
            completed = snapshot.stats.completed_tasks,
            failed = snapshot.stats.failed_tasks,
            "Shutting down MediFleet"
        );
    }
    Ok(())
}
