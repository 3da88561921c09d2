use super::nd::gm_to_tier;
use crate::{burst::Bursts, engine::check_nz};
use tilecl_common::hardware::c0_elems;
use tilecl_core::{GlobalTensor, TileDesc, layout::GmLayout};
use tilecl_runtime::{AiCore, kernel_assert, sync::Pipe, trace::Instr};
use tilecl_zspace::{ShapeDescriptor, StrideDescriptor};

/// Row-major matrix into an NZ tile, repacked into fractals on the fly.
pub(super) fn load_nd2nz<T, B, Sh, St, L>(
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
    let shape = src.shape();
    let [_, _, _, g3, g4] = src.strides();
    let (rows, cols) = check_matrix(dst, shape, "ND -> NZ");
    kernel_assert!(g4 == 1, "ND tensors need a unit innermost stride, got {g4}");

    core.issue(
        pipe,
        Instr::Nd2Nz {
            tier: dst.tier(),
            nd_num: 1,
            n_value: rows,
            d_value: cols,
        },
    );

    let base = src.offset();
    let data = src.data();
    let elements = dst.elements_mut(core);
    for row in 0..rows {
        for col in 0..cols {
            elements[T::PACKING.offset(row, col)] = data[base + row * g3 + col];
        }
    }
}

/// Column-major matrix into a ZN tile.
pub(super) fn load_dn2zn<T, B, Sh, St, L>(
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
    let shape = src.shape();
    let [_, _, _, g3, g4] = src.strides();
    let (rows, cols) = check_matrix(dst, shape, "DN -> ZN");
    kernel_assert!(g3 == 1, "DN tensors need a unit row stride, got {g3}");

    core.issue(
        pipe,
        Instr::Dn2Zn {
            tier: dst.tier(),
            dn_num: 1,
            n_value: cols,
            d_value: rows,
        },
    );

    let base = src.offset();
    let data = src.data();
    let elements = dst.elements_mut(core);
    for col in 0..cols {
        for row in 0..rows {
            elements[T::PACKING.offset(row, col)] = data[base + col * g4 + row];
        }
    }
}

/// NZ tensor into an NZ tile: every column block of a batch is one burst of whole
/// fractals.
pub(super) fn load_nz2nz<T, B, Sh, St, L>(
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
    let strides @ [g0, g1, ..] = src.strides();
    let (rows, cols) = (dst.valid_rows(), dst.valid_cols());
    let c0 = c0_elems(core::mem::size_of::<T::Elem>());

    check_nz(shape, strides, rows, cols, c0);

    let bursts = Bursts::new(s1, s2 * s3 * s4, g1, T::ROWS * c0);
    for batch in 0..s0 {
        let gm_offset = src.offset() + batch * g0;
        let tile_offset = batch * s1 * T::ROWS * c0;
        gm_to_tier(core, pipe, dst, src, gm_offset, tile_offset, bursts);
    }
}

fn check_matrix<T: TileDesc>(dst: &T, shape: [usize; 5], path: &str) -> (usize, usize) {
    let [s0, s1, s2, s3, s4] = shape;
    let (rows, cols) = (dst.valid_rows(), dst.valid_cols());

    kernel_assert!(
        s0 == 1 && s1 == 1 && s2 == 1,
        "{path} loads move a single 2-D matrix, got {shape:?}"
    );
    kernel_assert!(
        rows == s3 && cols == s4,
        "A {rows} × {cols} {path} load needs s3 == rows and s4 == cols, got {shape:?}"
    );

    (rows, cols)
}

#[cfg(test)]
mod tests {
    use crate::load::load;
    use alloc::{sync::Arc, vec, vec::Vec};
    use half::f16;
    use pretty_assertions::assert_eq;
    use tilecl_common::TileType;
    use tilecl_core::{GlobalTensor, TileDesc, TileMatNz, layout::Nz};
    use tilecl_runtime::{AiCore, config::GlobalConfig, sync::Pipe, trace::Instr};
    use tilecl_zspace::{DynShape, DynStride};

    #[test_log::test]
    fn nz_fractals_are_copied_as_is() {
        let mut core = AiCore::from_config(Arc::new(GlobalConfig::default()));
        let source: Vec<f16> = (0..32 * 32).map(|i| f16::from_bits(i as u16 * 7 + 1)).collect();
        let gm = GlobalTensor::<f16, _, _, _, Nz>::new(
            source.as_slice(),
            DynShape::new([1, 2, 2, 16, 16]),
            DynStride::new([1024, 512, 256, 16, 1]),
        );
        let mut tile = TileMatNz::<f16, 32, 32>::new();
        core.assign(&mut tile, 0).unwrap();

        load(&mut core, &tile, &gm);

        let bits = |values: &[f16]| values.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(tile.elements(&core)), bits(&source));
        // Column block 1, row block 1, fractal position (3, 5).
        assert_eq!(tile.get(&core, 19, 21), source[512 + 256 + 3 * 16 + 5]);
        assert_eq!(
            core.trace().on_pipe(Pipe::Mte2).cloned().collect::<Vec<_>>(),
            vec![Instr::GmToTier {
                tier: TileType::Mat,
                n_burst: 2,
                len_burst: 1024,
                src_gap: 0,
                dst_gap: 0,
            }]
        );
    }
}
