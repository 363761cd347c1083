pub mod file_logger;
pub mod file_publisher;
pub mod log_publisher;
pub mod memory_publisher;
pub mod multi_logger;
pub mod noop_logger;
pub mod tracing_logger;

pub use file_logger::*;
pub use file_publisher::*;
pub use log_publisher::*;
pub use memory_publisher::*;
pub use multi_logger::*;
pub use noop_logger::*;
pub use tracing_logger::*;
