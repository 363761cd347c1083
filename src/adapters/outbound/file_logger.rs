use crate::domains::logger::{DynLogger, FileLogger};
use std::sync::Arc;

/// Installs `fast_log` on `path` and returns a logger writing through it.
/// Only one global `log` backend can exist per process.
pub fn init_file_logger(path: &str, level: log::LevelFilter) -> Result<DynLogger, String> {
    FileLogger::init(path, level).map_err(|e| format!("Failed to initialize fast_log: {}", e))?;
    Ok(Arc::new(FileLogger))
}
