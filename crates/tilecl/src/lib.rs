#![cfg_attr(not(feature = "std"), no_std)]

//! # TileCL
//!
//! A tile memory model and the data-movement engines of a matrix-multiply accelerator.
//!
//! Tensors in global memory are described by a [GlobalTensor], tensors in the on-chip tiers
//! by a [Tile] whose placement, packing and valid extent are part of its type. The engines
//! of [movement] stage tensors in, repack them for the cube unit, move them between tiers
//! and store them back, recording on an [AiCore](runtime::AiCore) the instructions the
//! hardware would issue.
//!
//! ```ignore
//! use tilecl::prelude::*;
//!
//! let mut core = AiCore::new();
//! let mut staging = TileMatNz::<f16, 64, 128>::new();
//! core.assign(&mut staging, 0)?;
//! load(&mut core, &staging, &tensor);
//! ```

pub use tilecl_core::*;

pub use tilecl_common as common;
pub use tilecl_move as movement;
pub use tilecl_runtime as runtime;
pub use tilecl_zspace as zspace;

/// Everything a kernel needs.
pub mod prelude {
    pub use tilecl_common::{Element, PadMax, PadMin, PadNull, PadZero, QuantMode, ReluMode, TileType};
    pub use tilecl_core::{
        ConvTile, GlobalTensor, Tile, TileAcc, TileBias, TileDesc, TileLeft, TileMatDn,
        TileMatNd, TileMatNz, TileMatZn, TileRight, TileScaling, TileVec, TileVecDn,
        layout::{Dn, FractalZ, Nc1hwc0, Nd, Nz},
    };
    pub use tilecl_move::{
        AccInit, AtomicMode, CubeUnit, FixpipeParams, FixpipeQuant, ReferenceCube, extract,
        load, load_conv, mmad, mov, mov_with, store, store_acc, store_acc_with, store_with,
    };
    pub use tilecl_runtime::{
        AiCore, kernel_assert,
        config::GlobalConfig,
        sync::{EventId, Flag, Pipe},
    };
    pub use tilecl_zspace::{
        Dyn, DynShape, DynStride, Fixed, Full, Shape, Shape2D, StaticShape2D, StaticStride2D,
        Stride, Stride2D,
    };
}
