use bytemuck::Pod;
use tilecl_common::hardware::FRACTAL_NZ_ROW;
use tilecl_runtime::{
    AiCore, kernel_assert, kernel_panic,
    memory_management::Placed,
    sync::{AccessKind, Endpoint, Pipe},
};
use tilecl_zspace::RANK;

/// The pipe executing a movement from `src` to `dst`.
///
/// # Panics
///
/// If the hardware has no path between the two endpoints.
pub(crate) fn route(dst: Endpoint, src: Endpoint) -> Pipe {
    match Pipe::route(dst, src) {
        Some(pipe) => pipe,
        None => kernel_panic!("No hardware path from {src} to {dst}"),
    }
}

/// Record that `pipe` reads the whole buffer of `tile`.
pub(crate) fn read<P: Placed>(core: &mut AiCore, pipe: Pipe, tile: &P) {
    let range = core.placement(tile);
    core.access(pipe, AccessKind::Read, tile.tier(), range);
}

/// Record that `pipe` writes the whole buffer of `tile`.
pub(crate) fn write<P: Placed>(core: &mut AiCore, pipe: Pipe, tile: &P) {
    let range = core.placement(tile);
    core.access(pipe, AccessKind::Write, tile.tier(), range);
}

/// Views over the buffers of two tiles, the destination mutable.
///
/// # Panics
///
/// If both tiles share a tier and their buffers overlap.
pub(crate) fn views<'a, D: Pod, S: Pod>(
    core: &'a mut AiCore,
    dst: &impl Placed,
    src: &impl Placed,
) -> (&'a mut [D], &'a [S]) {
    let (dst_range, src_range) = (core.placement(dst), core.placement(src));
    let dst_len = dst_range.size / core::mem::size_of::<D>();
    let src_len = src_range.size / core::mem::size_of::<S>();

    if dst.tier() == src.tier() {
        return core.arena_mut(dst.tier()).view_pair_mut(
            dst_range.offset,
            dst_len,
            src_range.offset,
            src_len,
        );
    }

    let (dst_arena, src_arena) = core.arenas_mut(dst.tier(), src.tier());
    (
        dst_arena.view_mut(dst_range.offset, dst_len),
        src_arena.view(src_range.offset, src_len),
    )
}

/// Global memory position of every outer (i, j, k) index of a tensor, in dense order.
pub(crate) fn outer_positions(
    shape: [usize; RANK],
    strides: [usize; RANK],
    offset: usize,
) -> impl Iterator<Item = usize> {
    let [s0, s1, s2, _, _] = shape;
    let [g0, g1, g2, _, _] = strides;

    (0..s0 * s1 * s2).map(move |outer| {
        let (i, j, k) = (outer / (s1 * s2), (outer / s2) % s1, outer % s2);
        offset + i * g0 + j * g1 + k * g2
    })
}

/// Index in an NZ tensor `[batch, col blocks, row blocks, 16, C0]` of the logical
/// (`row`, `col`). Batches follow each other along the columns.
pub(crate) fn nz_index(shape: [usize; RANK], row: usize, col: usize) -> [usize; RANK] {
    let [_, s1, _, s3, s4] = shape;
    [
        col / (s1 * s4),
        (col / s4) % s1,
        row / s3,
        row % s3,
        col % s4,
    ]
}

/// Check the shape and strides of an NZ tensor holding a `rows × cols` region.
pub(crate) fn check_nz(
    shape: [usize; RANK],
    strides: [usize; RANK],
    rows: usize,
    cols: usize,
    c0: usize,
) {
    let [s0, s1, s2, s3, s4] = shape;
    let [_, _, g2, g3, g4] = strides;

    kernel_assert!(
        s3 == FRACTAL_NZ_ROW && s4 == c0,
        "NZ tensors hold {FRACTAL_NZ_ROW} × {c0} fractals, got {shape:?}"
    );
    kernel_assert!(
        rows == s2 * s3 && cols == s0 * s1 * s4,
        "A {rows} × {cols} NZ region needs s2 * s3 == rows and s0 * s1 * s4 == cols, got {shape:?}"
    );
    kernel_assert!(
        g4 == 1 && g3 == c0 && g2 == FRACTAL_NZ_ROW * c0,
        "The fractals of an NZ tensor must be dense, got strides {strides:?}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outer_positions_follow_the_strides() {
        let positions: alloc::vec::Vec<usize> =
            outer_positions([2, 1, 3, 4, 8], [200, 100, 40, 8, 1], 5).collect();
        assert_eq!(positions, [5, 45, 85, 205, 245, 285]);
    }

    #[test]
    #[should_panic(expected = "No hardware path from gm to gm")]
    fn missing_paths_abort() {
        route(Endpoint::Global, Endpoint::Global);
    }

    #[test]
    fn nz_splits_rows_and_cols_into_blocks() {
        // f16: C0 = 16, two column blocks per batch.
        let shape = [2, 2, 2, 16, 16];
        assert_eq!(nz_index(shape, 17, 3), [0, 0, 1, 1, 3]);
        assert_eq!(nz_index(shape, 0, 20), [0, 1, 0, 0, 4]);
        assert_eq!(nz_index(shape, 0, 33), [1, 0, 0, 0, 1]);
    }
}
