pub mod events;
pub mod robot;
pub mod task;
pub mod world;

pub use events::*;
pub use robot::*;
pub use task::*;
pub use world::*;
