use crate::{
    engine::{self, check_nz, nz_index},
    fixpipe::{Fixpipe, FixpipeParams},
};
use tilecl_common::{
    Element, cast_quant_mode,
    hardware::{ACC_MAX_COLS, ACC_ND_MAX_ROWS, ACC_NZ_MAX_ROWS, FRACTAL_NZ_ROW, c0_elems},
    scalar_quant_mode,
};
use tilecl_core::{Acc, GlobalTensor, TileDesc, layout::{GmLayout, LayoutKind}};
use tilecl_runtime::{AiCore, kernel_assert, sync::Endpoint};
use tilecl_zspace::{ShapeDescriptor, StrideDescriptor};

/// Write an accumulator tile into global memory with a plain conversion.
///
/// See [store_acc_with] for the accepted layouts.
pub fn store_acc<D, B, Sh, St, L, S>(
    core: &mut AiCore,
    dst: &mut GlobalTensor<D, B, Sh, St, L>,
    src: &S,
) where
    D: Element,
    B: AsRef<[D]> + AsMut<[D]>,
    Sh: ShapeDescriptor,
    St: StrideDescriptor,
    L: GmLayout,
    S: TileDesc<Placement = Acc>,
{
    const {
        assert!(
            cast_quant_mode(<S::Elem as Element>::ELEM, D::ELEM).is_some(),
            "No plain conversion between the accumulator and the output, use store_acc_with"
        );
    }
    store_acc_with(core, dst, src, FixpipeParams::default());
}

/// Write an accumulator tile into global memory through the fixpipe.
///
/// - ND: the valid columns are cut into `ValidCols / s4` matrices of `s3 == ValidRows`
///   rows, matrix `k` starting at `k * stride(2)`.
/// - NZ: `[batch, col blocks, row blocks, 16, C0]` with `C0` the fractal width of the
///   output type.
///
/// Values go through the ReLU, then the quantization of `params`, and are added to the
/// destination for atomic write-backs.
///
/// # Panics
///
/// If a dimension of the destination is zero, its shape doesn't match the valid extent,
/// the conversion isn't supported or atomic add isn't supported for the output type.
pub fn store_acc_with<D, B, Sh, St, L, S>(
    core: &mut AiCore,
    dst: &mut GlobalTensor<D, B, Sh, St, L>,
    src: &S,
    params: FixpipeParams,
) where
    D: Element,
    B: AsRef<[D]> + AsMut<[D]>,
    Sh: ShapeDescriptor,
    St: StrideDescriptor,
    L: GmLayout,
    S: TileDesc<Placement = Acc>,
{
    let nz = const {
        let (src_elem, dst_elem) = (<S::Elem as Element>::ELEM, D::ELEM);
        assert!(
            src_elem.is_accumulator_type(),
            "Accumulators hold i32 or f32"
        );
        assert!(
            cast_quant_mode(src_elem, dst_elem).is_some()
                || scalar_quant_mode(src_elem, dst_elem).is_some(),
            "The accumulator can't be converted into the output type"
        );
        assert!(
            S::COLS >= 1 && S::COLS <= ACC_MAX_COLS,
            "Stored accumulators have 1 to 4095 columns"
        );

        match L::KIND {
            LayoutKind::Nd => {
                assert!(
                    S::ROWS <= ACC_ND_MAX_ROWS,
                    "ND stores of accumulators have at most 8192 rows"
                );
                false
            }
            LayoutKind::Nz => {
                assert!(
                    S::ROWS <= ACC_NZ_MAX_ROWS && S::COLS % FRACTAL_NZ_ROW == 0,
                    "NZ stores of accumulators have at most 65535 rows and whole fractal columns"
                );
                true
            }
            _ => panic!("Accumulators are stored as ND or NZ"),
        }
    };

    let shape = dst.shape();
    kernel_assert!(
        shape.iter().all(|dim| *dim > 0),
        "Every dimension of an accumulator store must be positive, got {shape:?}"
    );

    core.log_movement(&format_args!(
        "store {} quant={:?} relu={} atomic={} {src:?} into {} {shape:?}",
        L::KIND,
        params.quant,
        params.relu,
        params.atomic,
        D::ELEM
    ));

    let pipe = engine::route(Endpoint::Global, Endpoint::Tier(src.tier()));
    let (rows, cols) = (src.valid_rows(), src.valid_cols());
    let fixpipe = Fixpipe::configure::<S::Elem, D>(core, pipe, &params, cols);
    engine::read(core, pipe, src);

    let position = if nz {
        check_nz(shape, dst.strides(), rows, cols, c0_elems(D::ELEM.size()));
        nz_position
    } else {
        check_nd(shape, dst.strides(), rows, cols);
        nd_position
    };

    core.issue(pipe, fixpipe.instr(Endpoint::Global, rows, cols));

    let elements = src.elements(core);
    for row in 0..rows {
        for col in 0..cols {
            let value = fixpipe.convert(elements[S::PACKING.offset(row, col)], col);
            let at = dst.position(position(shape, row, col));
            fixpipe.write(&mut dst.data_mut()[at], value);
        }
    }
}

fn check_nd(shape: [usize; 5], strides: [usize; 5], rows: usize, cols: usize) {
    let [s0, s1, s2, s3, s4] = shape;

    kernel_assert!(
        s0 == 1 && s1 == 1,
        "ND accumulator stores spread matrices over dimension 2 only, got {shape:?}"
    );
    kernel_assert!(
        rows == s3 && cols % s4 == 0,
        "A {rows} × {cols} accumulator needs s3 == rows and a multiple of s4 columns, got {shape:?}"
    );
    kernel_assert!(
        cols / s4 <= s2,
        "{} matrices don't fit in the {s2} of the destination",
        cols / s4
    );
    kernel_assert!(
        strides[4] == 1,
        "ND tensors need a unit innermost stride, got {strides:?}"
    );
}

/// Matrix `col / s4` of the destination holds the column.
fn nd_position(shape: [usize; 5], row: usize, col: usize) -> [usize; 5] {
    let s4 = shape[4];
    [0, 0, col / s4, row, col % s4]
}

fn nz_position(shape: [usize; 5], row: usize, col: usize) -> [usize; 5] {
    nz_index(shape, row, col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixpipe::FixpipeQuant;
    use alloc::{sync::Arc, vec, vec::Vec};
    use half::f16;
    use pretty_assertions::assert_eq;
    use tilecl_common::{TileType, encode_scale};
    use tilecl_core::{
        TileAcc, TileScaling,
        layout::{Nd, Nz},
    };
    use tilecl_runtime::{config::GlobalConfig, sync::Pipe, trace::Instr};
    use tilecl_zspace::{Dyn, DynShape, DynStride, Shape2D, Stride2D};

    fn core() -> AiCore {
        AiCore::from_config(Arc::new(GlobalConfig::default()))
    }

    fn acc<E: Element>(core: &mut AiCore, f: impl Fn(usize, usize) -> E) -> TileAcc<E, 16, 32> {
        let mut tile = TileAcc::<E, 16, 32>::new();
        core.assign(&mut tile, 0).unwrap();
        let values: Vec<E> = (0..16 * 32).map(|i| f(i / 32, i % 32)).collect();
        tile.copy_from_slice(core, &values);
        tile
    }

    #[test]
    fn nd_stores_split_the_columns_into_matrices() {
        let mut core = core();
        let tile = acc(&mut core, |row, col| (row * 100 + col) as f32);

        // Two 16 × 16 matrices with a row pitch of 20, 320 elements apart.
        let mut dst = GlobalTensor::<f32, _, _, _, Nd>::new(
            vec![0.0; 640],
            DynShape::new([1, 1, 2, 16, 16]),
            DynStride::new([640, 640, 320, 20, 1]),
        );
        store_acc(&mut core, &mut dst, &tile);

        assert_eq!(dst.get([0, 0, 0, 3, 5]), 305.0);
        assert_eq!(dst.get([0, 0, 1, 3, 5]), 321.0);
        assert_eq!(dst.data()[16], 0.0);
        assert!(matches!(
            core.trace().on_pipe(Pipe::Fix).next(),
            Some(Instr::Fixpipe { dst: Endpoint::Global, rows: 16, cols: 32, atomic: false, .. })
        ));
    }

    #[test]
    fn nz_stores_follow_the_output_fractals() {
        let mut core = core();
        let tile = acc(&mut core, |row, col| (row * 32 + col) as f32);

        // f16 outputs have 16 wide fractals.
        let mut dst = GlobalTensor::<f16, _, _, _, Nz>::new(
            vec![f16::ZERO; 512],
            DynShape::new([1, 2, 1, 16, 16]),
            DynStride::new([512, 256, 256, 16, 1]),
        );
        store_acc(&mut core, &mut dst, &tile);

        assert_eq!(dst.get([0, 1, 0, 2, 3]), f16::from_f32(83.0));
        assert_eq!(dst.data()[16], f16::from_f32(32.0));
    }

    #[test]
    fn atomic_stores_add_the_result() {
        let mut core = core();
        let tile = acc(&mut core, |row, col| (row + col) as f32);

        let mut dst = GlobalTensor::<f32, _, _, _, Nd>::new(
            vec![10.0; 512],
            Shape2D::<Dyn, Dyn>::new([16, 32]),
            Stride2D::<Dyn, Dyn>::new([32, 1]),
        );
        store_acc_with(&mut core, &mut dst, &tile, FixpipeParams::default().with_atomic());

        let expected: Vec<f32> = (0..512).map(|i| 10.0 + (i / 32 + i % 32) as f32).collect();
        assert_eq!(dst.into_inner(), expected);
    }

    #[test]
    fn vector_quantization_scales_each_column() {
        let mut core = core();
        let tile = acc(&mut core, |_, col| col as i32 * 10);
        let mut scales = TileScaling::<32>::new();
        core.assign(&mut scales, 0).unwrap();
        let entries = core.arena_mut(TileType::Scaling).view_mut::<u64>(0, 32);
        for (col, entry) in entries.iter_mut().enumerate() {
            *entry = encode_scale(if col % 2 == 0 { 0.5 } else { -0.25 });
        }

        let mut dst = GlobalTensor::<i8, _, _, _, Nd>::new(
            vec![0i8; 512],
            Shape2D::<Dyn, Dyn>::new([16, 32]),
            Stride2D::<Dyn, Dyn>::new([32, 1]),
        );
        let params = FixpipeParams::quant(FixpipeQuant::vector(&core, &scales));
        store_acc_with(&mut core, &mut dst, &tile, params);

        assert_eq!(dst.get([0, 0, 0, 7, 4]), 20);
        assert_eq!(dst.get([0, 0, 0, 7, 5]), -12);
        // 310 * -0.25 = -77.5 rounds to -78.
        assert_eq!(dst.get([0, 0, 0, 7, 31]), -78);
    }

    #[test]
    #[should_panic(expected = "must be positive")]
    fn empty_destinations_are_rejected() {
        let mut core = core();
        let tile = acc(&mut core, |_, _| 0.0f32);

        let mut dst = GlobalTensor::<f32, _, _, _, Nd>::new(
            vec![0.0; 512],
            DynShape::new([1, 0, 1, 16, 32]),
            DynStride::new([512, 512, 512, 32, 1]),
        );
        store_acc(&mut core, &mut dst, &tile);
    }
}
