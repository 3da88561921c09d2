#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! # TileCL Common
//!
//! Building blocks shared by every TileCL crate: the element types a tile can hold, the
//! pad values used for ragged tiles, the tile placements, quantization modes and the
//! hardware constants of the accelerator.

/// Element types and their numeric conversions.
pub mod element;

/// Hardware constants of the accelerator.
pub mod hardware;

/// Pad values for ragged tiles.
pub mod pad;

/// Quantization modes of the fixpipe.
pub mod quant;

/// On-chip tile placements.
pub mod tier;

pub use element::*;
pub use pad::*;
pub use quant::*;
pub use tier::*;
