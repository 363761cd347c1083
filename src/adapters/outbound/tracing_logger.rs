use crate::domains::logger::{DomainLogger, DynLogger};
use std::sync::Arc;

/// Forwards domain log lines to whatever `tracing` subscriber is installed.
struct TracingBridge;

impl DomainLogger for TracingBridge {
    fn info(&self, msg: &str) {
        tracing::info!(target: "medifleet::core", "{}", msg);
    }

    fn warn(&self, msg: &str) {
        tracing::warn!(target: "medifleet::core", "{}", msg);
    }

    fn error(&self, msg: &str) {
        tracing::error!(target: "medifleet::core", "{}", msg);
    }
}

/// Default logger for the binary.
pub fn init_tracing_logger() -> DynLogger {
    Arc::new(TracingBridge)
}
