/// Arena config module.
pub mod arena;
/// Movement config module.
pub mod movement;
/// Synchronization config module.
pub mod sync;

mod base;
mod logger;

pub use base::*;
pub use logger::*;
