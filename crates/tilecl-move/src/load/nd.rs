use crate::{burst::Bursts, engine};
use tilecl_core::{GlobalTensor, TileDesc, layout::GmLayout};
use tilecl_runtime::{AiCore, kernel_assert, sync::Pipe, trace::Instr};
use tilecl_zspace::{ShapeDescriptor, StrideDescriptor, striding::outer_dims_dense};

/// Row-major tensor into an unblocked row-major tile: one burst per row.
pub(super) fn load_nd<T, B, Sh, St, L>(
    core: &mut AiCore,
    pipe: Pipe,
    dst: &T,
    src: &GlobalTensor<T::Elem, B, Sh, St, L>,
) where
    T: TileDesc,
    B: AsRef<[T::Elem]>,
    Sh: ShapeDescriptor,
    St: StrideDescriptor,
    L: GmLayout,
{
    let shape @ [s0, s1, s2, s3, s4] = src.shape();
    let strides @ [_, _, _, g3, g4] = src.strides();
    let (rows, cols) = (dst.valid_rows(), dst.valid_cols());

    kernel_assert!(
        rows == s0 * s1 * s2 * s3 && cols == s4,
        "A {rows} × {cols} ND load needs s0 * s1 * s2 * s3 == rows and s4 == cols, got {shape:?}"
    );
    kernel_assert!(g4 == 1, "ND tensors need a unit innermost stride, got {strides:?}");

    let bulk = g3 == cols
        && T::COLS == cols
        && outer_dims_dense(shape, strides, s3 * g3)
        && !needs_pad::<T>(rows, cols);

    if bulk {
        let bursts = Bursts::single(rows * cols);
        gm_to_tier(core, pipe, dst, src, src.offset(), 0, bursts);
        return;
    }

    let bursts = Bursts::new(s3, cols, g3, T::COLS);
    for (outer, gm_offset) in engine::outer_positions(shape, strides, src.offset()).enumerate() {
        gm_to_tier(core, pipe, dst, src, gm_offset, outer * s3 * T::COLS, bursts);
    }
}

/// Column-major tensor into an unblocked column-major tile: one burst per column.
pub(super) fn load_dn<T, B, Sh, St, L>(
    core: &mut AiCore,
    pipe: Pipe,
    dst: &T,
    src: &GlobalTensor<T::Elem, B, Sh, St, L>,
) where
    T: TileDesc,
    B: AsRef<[T::Elem]>,
    Sh: ShapeDescriptor,
    St: StrideDescriptor,
    L: GmLayout,
{
    let shape @ [s0, s1, s2, s3, s4] = src.shape();
    let strides @ [_, _, _, g3, g4] = src.strides();
    let (rows, cols) = (dst.valid_rows(), dst.valid_cols());

    kernel_assert!(
        rows == s3 && cols == s0 * s1 * s2 * s4,
        "A {rows} × {cols} DN load needs s3 == rows and s0 * s1 * s2 * s4 == cols, got {shape:?}"
    );
    kernel_assert!(g3 == 1, "DN tensors need a unit row stride, got {strides:?}");

    let bulk = g4 == rows
        && T::ROWS == rows
        && outer_dims_dense(shape, strides, s4 * g4)
        && !needs_pad::<T>(rows, cols);

    if bulk {
        let bursts = Bursts::single(rows * cols);
        gm_to_tier(core, pipe, dst, src, src.offset(), 0, bursts);
        return;
    }

    let bursts = Bursts::new(s4, rows, g4, T::ROWS);
    for (outer, gm_offset) in engine::outer_positions(shape, strides, src.offset()).enumerate() {
        gm_to_tier(core, pipe, dst, src, gm_offset, outer * s4 * T::ROWS, bursts);
    }
}

fn needs_pad<T: TileDesc>(rows: usize, cols: usize) -> bool {
    (rows < T::ROWS || cols < T::COLS) && T::PAD.value::<T::Elem>().is_some()
}

/// Issue and execute a strided transfer from global memory into `dst`, cut at the burst
/// limit.
pub(super) fn gm_to_tier<T, B, Sh, St, L>(
    core: &mut AiCore,
    pipe: Pipe,
    dst: &T,
    src: &GlobalTensor<T::Elem, B, Sh, St, L>,
    gm_offset: usize,
    tile_offset: usize,
    bursts: Bursts,
) where
    T: TileDesc,
    B: AsRef<[T::Elem]>,
    Sh: ShapeDescriptor,
    St: StrideDescriptor,
    L: GmLayout,
{
    let size = core::mem::size_of::<T::Elem>();

    for (first, part) in bursts.split() {
        let (len_burst, src_gap, dst_gap) = part.in_bytes(size);
        core.issue(
            pipe,
            Instr::GmToTier {
                tier: dst.tier(),
                n_burst: part.count,
                len_burst,
                src_gap,
                dst_gap,
            },
        );

        part.run(
            dst.elements_mut(core),
            tile_offset + first * part.dst_stride,
            src.data(),
            gm_offset + first * part.src_stride,
            false,
        );
    }
}
