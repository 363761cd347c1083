pub mod auction;
pub mod fleet;
pub mod grid;
pub mod logger;
pub mod motion;
pub mod pathfinding;
pub mod scheduler;

pub use auction::*;
pub use fleet::*;
pub use grid::*;
pub use logger::*;
pub use motion::*;
pub use pathfinding::*;
pub use scheduler::*;
