mod flag;
mod hazard;
mod pipe;

pub use flag::*;
pub use hazard::*;
pub use pipe::*;
