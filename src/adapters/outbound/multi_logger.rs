use crate::domains::logger::{DomainLogger, DynLogger};
use std::sync::Arc;

/// Fans every line out to a list of loggers, in order.
pub struct MultiLogger {
    sinks: Vec<DynLogger>,
}

impl MultiLogger {
    pub fn new(sinks: Vec<DynLogger>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl DomainLogger for MultiLogger {
    fn info(&self, msg: &str) {
        self.sinks.iter().for_each(|s| s.info(msg));
    }

    fn warn(&self, msg: &str) {
        self.sinks.iter().for_each(|s| s.warn(msg));
    }

    fn error(&self, msg: &str) {
        self.sinks.iter().for_each(|s| s.error(msg));
    }
}

/// Tracing output plus a `fast_log` file when one can be opened.
pub fn init_combined_logger(path: &str, level: log::LevelFilter) -> DynLogger {
    let tracing = super::init_tracing_logger();
    match super::init_file_logger(path, level) {
        Ok(file) => Arc::new(MultiLogger::new(vec![file, tracing])),
        Err(e) => {
            tracing::warn!("File logging disabled: {}", e);
            tracing
        }
    }
}
