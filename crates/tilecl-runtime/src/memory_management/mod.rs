mod arena;
mod placed;

pub use arena::*;
pub use placed::*;
