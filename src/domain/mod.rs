pub mod context;
pub mod outcome;
pub mod payload;
pub mod schedule;

pub use context::*;
pub use outcome::*;
pub use payload::*;
pub use schedule::*;
