mod conv;
mod fractal;
mod nd;
mod pad;

pub use conv::*;

use crate::engine;
use derive_more::Display;
use tilecl_common::{Element, TileType};
use tilecl_core::{GlobalTensor, OrderKind, TileDesc, layout::{GmLayout, LayoutKind}};
use tilecl_runtime::{AiCore, sync::Endpoint};
use tilecl_zspace::{ShapeDescriptor, StrideDescriptor};

/// How a load converts the global layout into the tile layout.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum LoadPath {
    /// Row-major tensor into an unblocked row-major tile.
    #[display("ND -> ND")]
    NdToNd,
    /// Column-major tensor into an unblocked column-major tile.
    #[display("DN -> DN")]
    DnToDn,
    /// Row-major tensor into an NZ tile.
    #[display("ND -> NZ")]
    NdToNz,
    /// Column-major tensor into a ZN tile.
    #[display("DN -> ZN")]
    DnToZn,
    /// NZ tensor into an NZ tile, fractal by fractal.
    #[display("NZ -> NZ")]
    NzToNz,
}

/// The path loading a tensor of layout `layout` into a tile, `None` when the hardware has
/// no such path.
pub const fn load_path(
    layout: LayoutKind,
    tier: TileType,
    block: OrderKind,
    inner: OrderKind,
    fractal: usize,
) -> Option<LoadPath> {
    if !matches!(tier, TileType::Mat | TileType::Vec) {
        return None;
    }

    match (layout, block, inner) {
        (LayoutKind::Nd, OrderKind::RowMajor, OrderKind::NoneBox) => Some(LoadPath::NdToNd),
        (LayoutKind::Dn, OrderKind::ColMajor, OrderKind::NoneBox) => Some(LoadPath::DnToDn),
        (LayoutKind::Nd, OrderKind::ColMajor, OrderKind::RowMajor) if fractal == 512 => {
            Some(LoadPath::NdToNz)
        }
        (LayoutKind::Dn, OrderKind::RowMajor, OrderKind::ColMajor) if fractal == 512 => {
            Some(LoadPath::DnToZn)
        }
        (LayoutKind::Nz, OrderKind::ColMajor, OrderKind::RowMajor) if fractal == 512 => {
            Some(LoadPath::NzToNz)
        }
        _ => None,
    }
}

/// Stage a region of global memory into a staging or vector tile.
///
/// The region is described by the shape and strides of `src`, its logical rows and columns
/// must match the valid extent of `dst` (see [LoadPath] for the accepted layouts). What lies
/// outside the valid extent is filled with the pad value of the tile.
///
/// Unsupported layout pairs fail to compile.
///
/// # Panics
///
/// If the region doesn't match the valid extent of the tile or its strides don't fit the
/// layout.
pub fn load<T, B, Sh, St, L>(core: &mut AiCore, dst: &T, src: &GlobalTensor<T::Elem, B, Sh, St, L>)
where
    T: TileDesc,
    B: AsRef<[T::Elem]>,
    Sh: ShapeDescriptor,
    St: StrideDescriptor,
    L: GmLayout,
{
    let path = const {
        let size = core::mem::size_of::<T::Elem>();
        assert!(
            size == 1 || size == 2 || size == 4 || size == 8,
            "Loaded elements are 1, 2, 4 or 8 bytes wide"
        );
        match load_path(
            L::KIND,
            <T::Placement as tilecl_core::Placement>::TYPE,
            T::BLOCK,
            T::INNER,
            T::FRACTAL,
        ) {
            Some(path) => path,
            None => panic!("No load path between the tensor layout and the tile layout"),
        }
    };

    core.log_movement(&format_args!(
        "load {path} {} {:?} into {dst:?}",
        <T::Elem as Element>::ELEM,
        src.shape()
    ));

    let pipe = engine::route(Endpoint::Tier(dst.tier()), Endpoint::Global);
    engine::write(core, pipe, dst);

    match path {
        LoadPath::NdToNd => nd::load_nd(core, pipe, dst, src),
        LoadPath::DnToDn => nd::load_dn(core, pipe, dst, src),
        LoadPath::NdToNz => fractal::load_nd2nz(core, pipe, dst, src),
        LoadPath::DnToZn => fractal::load_dn2zn(core, pipe, dst, src),
        LoadPath::NzToNz => fractal::load_nz2nz(core, pipe, dst, src),
    }

    pad::fill_pad(core, dst);
}
