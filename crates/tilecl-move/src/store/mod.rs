mod acc;
mod tile;

pub use acc::*;

use crate::engine;
use derive_more::Display;
use tilecl_common::{Element, TileType};
use tilecl_core::{GlobalTensor, OrderKind, Placement, TileDesc, layout::{GmLayout, LayoutKind}};
use tilecl_runtime::{AiCore, kernel_assert, sync::Endpoint};
use tilecl_zspace::{ShapeDescriptor, StrideDescriptor};

/// What a store does with the values already in global memory.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Default)]
pub enum AtomicMode {
    /// Values are overwritten.
    #[default]
    #[display("none")]
    None,
    /// Values are added to the destination.
    #[display("add")]
    Add,
}

/// How a store converts the tile layout into the global layout.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum StorePath {
    /// Unblocked row-major tile into a row-major tensor.
    #[display("ND -> ND")]
    NdToNd,
    /// Unblocked column-major tile into a column-major tensor.
    #[display("DN -> DN")]
    DnToDn,
    /// NZ tile unpacked into a row-major tensor.
    #[display("NZ -> ND")]
    NzToNd,
    /// ZN tile unpacked into a column-major tensor.
    #[display("ZN -> DN")]
    ZnToDn,
    /// NZ tile into an NZ tensor, fractal by fractal.
    #[display("NZ -> NZ")]
    NzToNz,
}

/// The path storing a tile into a tensor of layout `layout`, `None` when the hardware has
/// no such path.
pub const fn store_path(
    tier: TileType,
    block: OrderKind,
    inner: OrderKind,
    fractal: usize,
    layout: LayoutKind,
) -> Option<StorePath> {
    if !matches!(tier, TileType::Mat | TileType::Vec) {
        return None;
    }

    match (block, inner, layout) {
        (OrderKind::RowMajor, OrderKind::NoneBox, LayoutKind::Nd) => Some(StorePath::NdToNd),
        (OrderKind::ColMajor, OrderKind::NoneBox, LayoutKind::Dn) => Some(StorePath::DnToDn),
        (OrderKind::ColMajor, OrderKind::RowMajor, LayoutKind::Nd) if fractal == 512 => {
            Some(StorePath::NzToNd)
        }
        (OrderKind::RowMajor, OrderKind::ColMajor, LayoutKind::Dn) if fractal == 512 => {
            Some(StorePath::ZnToDn)
        }
        (OrderKind::ColMajor, OrderKind::RowMajor, LayoutKind::Nz) if fractal == 512 => {
            Some(StorePath::NzToNz)
        }
        _ => None,
    }
}

/// Write the valid extent of a staging or vector tile into a region of global memory.
///
/// The inverse of [load](crate::load): the region described by `dst` must match the valid
/// extent of `src` (see [StorePath] for the accepted layouts). Unsupported layout pairs fail
/// to compile.
pub fn store<T, B, Sh, St, L>(core: &mut AiCore, dst: &mut GlobalTensor<T::Elem, B, Sh, St, L>, src: &T)
where
    T: TileDesc,
    B: AsRef<[T::Elem]> + AsMut<[T::Elem]>,
    Sh: ShapeDescriptor,
    St: StrideDescriptor,
    L: GmLayout,
{
    store_with(core, dst, src, AtomicMode::None);
}

/// [store] with an atomic mode.
///
/// # Panics
///
/// If the region doesn't match the valid extent of the tile, its strides don't fit the
/// layout, or atomic add isn't supported for the element type.
pub fn store_with<T, B, Sh, St, L>(
    core: &mut AiCore,
    dst: &mut GlobalTensor<T::Elem, B, Sh, St, L>,
    src: &T,
    atomic: AtomicMode,
) where
    T: TileDesc,
    B: AsRef<[T::Elem]> + AsMut<[T::Elem]>,
    Sh: ShapeDescriptor,
    St: StrideDescriptor,
    L: GmLayout,
{
    let path = const {
        match store_path(
            <T::Placement as Placement>::TYPE,
            T::BLOCK,
            T::INNER,
            T::FRACTAL,
            L::KIND,
        ) {
            Some(path) => path,
            None => panic!("No store path between the tile layout and the tensor layout"),
        }
    };
    let elem = <T::Elem as Element>::ELEM;
    let atomic = atomic == AtomicMode::Add;
    kernel_assert!(
        !atomic || elem.supports_atomic_add(),
        "Atomic add isn't supported for {elem}"
    );

    core.log_movement(&format_args!(
        "store {path} atomic={atomic} {src:?} into {elem} {:?}",
        dst.shape()
    ));

    let pipe = engine::route(Endpoint::Global, Endpoint::Tier(src.tier()));
    engine::read(core, pipe, src);

    let writer = tile::TileWriter::new(pipe, atomic);
    match path {
        StorePath::NdToNd => writer.nd(core, dst, src),
        StorePath::DnToDn => writer.dn(core, dst, src),
        StorePath::NzToNd => writer.nz2nd(core, dst, src),
        StorePath::ZnToDn => writer.zn2dn(core, dst, src),
        StorePath::NzToNz => writer.nz2nz(core, dst, src),
    }
}
