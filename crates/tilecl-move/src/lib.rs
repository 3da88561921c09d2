#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! # TileCL Move
//!
//! The movement engines of TileCL. Every operation takes the [core](tilecl_runtime::AiCore),
//! a destination and a source, executes immediately and records the hardware instructions
//! the accelerator would issue for it.
//!
//! - [load]: global memory to the staging or vector tier.
//! - [extract]: staging tier to the operand tiers, at an offset.
//! - [mov]: every tier to tier path, including the accumulator write-back.
//! - [store]: staging, vector and accumulator tiers to global memory.
//! - [mmad]: the matrix multiply consuming the operand tiers.

extern crate alloc;

#[macro_use]
extern crate derive_new;

mod burst;
mod compute;
mod engine;
mod extract;
mod fixpipe;
mod load;
mod mov;
mod store;
mod strategy;

pub use compute::*;
pub use extract::*;
pub use fixpipe::*;
pub use load::*;
pub use mov::*;
pub use store::*;
pub use strategy::*;
