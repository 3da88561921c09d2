#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! # TileCL Core
//!
//! The data model of TileCL: [global tensors](GlobalTensor) over off-chip memory, [tiles](Tile)
//! in the on-chip tiers and the fractal packing that maps a tile's logical coordinates to its
//! buffer.

extern crate alloc;

/// Layouts of global tensors.
pub mod layout;

mod tensor;
mod tile;

pub use tensor::*;
pub use tile::*;
