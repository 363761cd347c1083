pub mod cell;
pub mod floor;
pub mod obstacle;

pub use cell::*;
pub use floor::*;
pub use obstacle::*;
