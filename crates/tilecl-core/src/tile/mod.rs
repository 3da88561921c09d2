mod base;
mod conv;
mod order;
mod packing;
mod placement;

pub use base::*;
pub use conv::*;
pub use order::*;
pub use packing::*;
pub use placement::*;
