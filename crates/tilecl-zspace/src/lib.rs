//! # Shape and stride descriptors for TileCL
//!
//! Fixed-rank (5-D) descriptors whose dimensions are each either a compile-time constant
//! or a runtime value, plus the affine indexing helpers shared by global tensors and tiles.

#![no_std]
#![warn(missing_docs)]

/// Indexing utilities.
pub mod indexing;
/// Stride builders.
pub mod striding;

mod dim;
mod shape;

pub use dim::*;
pub use shape::*;
