pub mod random_task_source;
pub mod task_payload;

pub use random_task_source::*;
pub use task_payload::*;
