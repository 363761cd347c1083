pub mod inbox;
pub mod snapshot;
pub mod tick;

pub use inbox::*;
pub use snapshot::*;
pub use tick::*;
