use crate::{
    burst::Bursts,
    engine::{self, check_nz},
};
use tilecl_core::{GlobalTensor, TileDesc, layout::GmLayout};
use tilecl_runtime::{AiCore, kernel_assert, sync::Pipe, trace::Instr};
use tilecl_zspace::{ShapeDescriptor, StrideDescriptor, striding::outer_dims_dense};

/// Issues the bursts of a staging or vector tile store.
#[derive(new)]
pub(super) struct TileWriter {
    pipe: Pipe,
    atomic: bool,
}

impl TileWriter {
    /// Unblocked row-major tile: one burst per row.
    pub fn nd<T, B, Sh, St, L>(
        &self,
        core: &mut AiCore,
        dst: &mut GlobalTensor<T::Elem, B, Sh, St, L>,
        src: &T,
    ) where
        T: TileDesc,
        B: AsRef<[T::Elem]> + AsMut<[T::Elem]>,
        Sh: ShapeDescriptor,
        St: StrideDescriptor,
        L: GmLayout,
    {
        let shape @ [s0, s1, s2, s3, s4] = dst.shape();
        let strides @ [_, _, _, g3, g4] = dst.strides();
        let (rows, cols) = (src.valid_rows(), src.valid_cols());

        kernel_assert!(
            rows == s0 * s1 * s2 * s3 && cols == s4,
            "A {rows} × {cols} ND store needs s0 * s1 * s2 * s3 == rows and s4 == cols, got {shape:?}"
        );
        kernel_assert!(g4 == 1, "ND tensors need a unit innermost stride, got {strides:?}");

        if g3 == cols && T::COLS == cols && outer_dims_dense(shape, strides, s3 * g3) {
            let offset = dst.offset();
            self.tier_to_gm(core, dst, src, offset, 0, Bursts::single(rows * cols));
            return;
        }

        let bursts = Bursts::new(s3, cols, T::COLS, g3);
        for (outer, gm_offset) in engine::outer_positions(shape, strides, dst.offset()).enumerate() {
            self.tier_to_gm(core, dst, src, gm_offset, outer * s3 * T::COLS, bursts);
        }
    }

    /// Unblocked column-major tile: one burst per column.
    pub fn dn<T, B, Sh, St, L>(
        &self,
        core: &mut AiCore,
        dst: &mut GlobalTensor<T::Elem, B, Sh, St, L>,
        src: &T,
    ) where
        T: TileDesc,
        B: AsRef<[T::Elem]> + AsMut<[T::Elem]>,
        Sh: ShapeDescriptor,
        St: StrideDescriptor,
        L: GmLayout,
    {
        let shape @ [s0, s1, s2, s3, s4] = dst.shape();
        let strides @ [_, _, _, g3, g4] = dst.strides();
        let (rows, cols) = (src.valid_rows(), src.valid_cols());

        kernel_assert!(
            rows == s3 && cols == s0 * s1 * s2 * s4,
            "A {rows} × {cols} DN store needs s3 == rows and s0 * s1 * s2 * s4 == cols, got {shape:?}"
        );
        kernel_assert!(g3 == 1, "DN tensors need a unit row stride, got {strides:?}");

        if g4 == rows && T::ROWS == rows && outer_dims_dense(shape, strides, s4 * g4) {
            let offset = dst.offset();
            self.tier_to_gm(core, dst, src, offset, 0, Bursts::single(rows * cols));
            return;
        }

        let bursts = Bursts::new(s4, rows, T::ROWS, g4);
        for (outer, gm_offset) in engine::outer_positions(shape, strides, dst.offset()).enumerate() {
            self.tier_to_gm(core, dst, src, gm_offset, outer * s4 * T::ROWS, bursts);
        }
    }

    /// NZ tile into a row-major matrix: the rows of a column block are adjacent in the
    /// tile, so each column block is one transfer of `C0` wide bursts.
    pub fn nz2nd<T, B, Sh, St, L>(
        &self,
        core: &mut AiCore,
        dst: &mut GlobalTensor<T::Elem, B, Sh, St, L>,
        src: &T,
    ) where
        T: TileDesc,
        B: AsRef<[T::Elem]> + AsMut<[T::Elem]>,
        Sh: ShapeDescriptor,
        St: StrideDescriptor,
        L: GmLayout,
    {
        let [_, _, _, g3, g4] = dst.strides();
        let (rows, cols) = check_matrix(src, dst.shape(), "NZ -> ND");
        kernel_assert!(g4 == 1, "ND tensors need a unit innermost stride, got {g4}");

        let c0 = T::PACKING.inner_cols;
        for block in 0..cols.div_ceil(c0) {
            let len = c0.min(cols - block * c0);
            let bursts = Bursts::new(rows, len, c0, g3);
            let gm_offset = dst.offset() + block * c0;
            self.tier_to_gm(core, dst, src, gm_offset, block * T::ROWS * c0, bursts);
        }
    }

    /// ZN tile into a column-major matrix, one transfer per row block.
    pub fn zn2dn<T, B, Sh, St, L>(
        &self,
        core: &mut AiCore,
        dst: &mut GlobalTensor<T::Elem, B, Sh, St, L>,
        src: &T,
    ) where
        T: TileDesc,
        B: AsRef<[T::Elem]> + AsMut<[T::Elem]>,
        Sh: ShapeDescriptor,
        St: StrideDescriptor,
        L: GmLayout,
    {
        let [_, _, _, g3, g4] = dst.strides();
        let (rows, cols) = check_matrix(src, dst.shape(), "ZN -> DN");
        kernel_assert!(g3 == 1, "DN tensors need a unit row stride, got {g3}");

        let c0 = T::PACKING.inner_rows;
        for block in 0..rows.div_ceil(c0) {
            let len = c0.min(rows - block * c0);
            let bursts = Bursts::new(cols, len, c0, g4);
            let gm_offset = dst.offset() + block * c0;
            self.tier_to_gm(core, dst, src, gm_offset, block * T::COLS * c0, bursts);
        }
    }

    /// NZ tile into an NZ tensor: every column block of a batch is one burst of whole
    /// fractals.
    pub fn nz2nz<T, B, Sh, St, L>(
        &self,
        core: &mut AiCore,
        dst: &mut GlobalTensor<T::Elem, B, Sh, St, L>,
        src: &T,
    ) where
        T: TileDesc,
        B: AsRef<[T::Elem]> + AsMut<[T::Elem]>,
        Sh: ShapeDescriptor,
        St: StrideDescriptor,
        L: GmLayout,
    {
        let shape @ [s0, s1, s2, s3, s4] = dst.shape();
        let strides @ [g0, g1, ..] = dst.strides();
        let c0 = T::PACKING.inner_cols;

        check_nz(shape, strides, src.valid_rows(), src.valid_cols(), c0);

        let bursts = Bursts::new(s1, s2 * s3 * s4, T::ROWS * c0, g1);
        for batch in 0..s0 {
            let gm_offset = dst.offset() + batch * g0;
            self.tier_to_gm(core, dst, src, gm_offset, batch * s1 * T::ROWS * c0, bursts);
        }
    }

    /// Issue and execute a strided transfer from `src` into global memory, cut at the burst
    /// limit.
    fn tier_to_gm<T, B, Sh, St, L>(
        &self,
        core: &mut AiCore,
        dst: &mut GlobalTensor<T::Elem, B, Sh, St, L>,
        src: &T,
        gm_offset: usize,
        tile_offset: usize,
        bursts: Bursts,
    ) where
        T: TileDesc,
        B: AsRef<[T::Elem]> + AsMut<[T::Elem]>,
        Sh: ShapeDescriptor,
        St: StrideDescriptor,
        L: GmLayout,
    {
        let size = core::mem::size_of::<T::Elem>();

        for (first, part) in bursts.split() {
            let (len_burst, src_gap, dst_gap) = part.in_bytes(size);
            core.issue(
                self.pipe,
                Instr::TierToGm {
                    tier: src.tier(),
                    n_burst: part.count,
                    len_burst,
                    src_gap,
                    dst_gap,
                    atomic: self.atomic,
                },
            );

            part.run(
                dst.data_mut(),
                gm_offset + first * part.dst_stride,
                src.elements(core),
                tile_offset + first * part.src_stride,
                self.atomic,
            );
        }
    }
}

fn check_matrix<T: TileDesc>(src: &T, shape: [usize; 5], path: &str) -> (usize, usize) {
    let [s0, s1, s2, s3, s4] = shape;
    let (rows, cols) = (src.valid_rows(), src.valid_cols());

    kernel_assert!(
        s0 == 1 && s1 == 1 && s2 == 1,
        "{path} stores move a single 2-D matrix, got {shape:?}"
    );
    kernel_assert!(
        rows == s3 && cols == s4,
        "A {rows} × {cols} {path} store needs s3 == rows and s4 == cols, got {shape:?}"
    );

    (rows, cols)
}

#[cfg(test)]
mod tests {
    use crate::store::{AtomicMode, store, store_with};
    use alloc::{sync::Arc, vec, vec::Vec};
    use half::f16;
    use pretty_assertions::assert_eq;
    use tilecl_core::{
        GlobalTensor, TileDesc, TileMatNz, TileMatZn, TileVec, TileVecDn,
        layout::{Dn, Nd, Nz},
    };
    use tilecl_runtime::{AiCore, config::GlobalConfig, trace::Instr};
    use tilecl_zspace::{Dyn, DynShape, DynStride, Full, Shape2D, Stride2D};

    fn core() -> AiCore {
        AiCore::from_config(Arc::new(GlobalConfig::default()))
    }

    fn to_gm_bursts(core: &AiCore) -> Vec<(usize, usize, usize, usize)> {
        core.trace()
            .iter()
            .filter_map(|issued| match issued.instr {
                Instr::TierToGm {
                    n_burst,
                    len_burst,
                    src_gap,
                    dst_gap,
                    ..
                } => Some((n_burst, len_burst, src_gap, dst_gap)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn ragged_rows_skip_the_tile_padding() {
        let mut core = core();
        let mut tile = TileVec::<f32, 4, 64, Dyn, Dyn>::with_valid(Dyn(3), Dyn(48));
        core.assign(&mut tile, 0).unwrap();
        let values: Vec<f32> = (0..144).map(|i| i as f32).collect();
        tile.copy_from_slice(&mut core, &values);

        let mut dst = GlobalTensor::<f32, _, _, _, Nd>::new(
            vec![0.0; 3 * 50],
            Shape2D::<Dyn, Dyn>::new([3, 48]),
            Stride2D::<Dyn, Dyn>::new([50, 1]),
        );
        store(&mut core, &mut dst, &tile);

        assert_eq!(dst.get([0, 0, 0, 2, 47]), 143.0);
        assert_eq!(dst.data()[48], 0.0);
        assert_eq!(to_gm_bursts(&core), [(3, 192, 64, 8)]);
    }

    #[test]
    fn dense_column_major_tiles_are_one_burst() {
        let mut core = core();
        let mut tile = TileVecDn::<i32, 8, 4>::new();
        core.assign(&mut tile, 0).unwrap();
        let values: Vec<i32> = (0..32).collect();
        tile.copy_from_slice(&mut core, &values);

        let mut dst = GlobalTensor::<i32, _, _, _, Dn>::new(
            vec![0; 32],
            Shape2D::<Dyn, Dyn>::new([8, 4]),
            Stride2D::<Dyn, Dyn>::new([1, 8]),
        );
        store(&mut core, &mut dst, &tile);

        // Logical (r, c) lands at c * 8 + r.
        assert_eq!(dst.data()[3 * 8 + 5], 5 * 4 + 3);
        assert_eq!(to_gm_bursts(&core), [(1, 128, 0, 0)]);
    }

    #[test]
    fn nz_tiles_unpack_one_column_block_at_a_time() {
        let mut core = core();
        let mut tile = TileMatNz::<f16, 32, 32, Full, Dyn>::with_valid(Full, Dyn(20));
        core.assign(&mut tile, 0).unwrap();
        let values: Vec<f16> = (0..640).map(|i| f16::from_f32(i as f32)).collect();
        tile.copy_from_slice(&mut core, &values);

        let mut dst = GlobalTensor::<f16, _, _, _, Nd>::new(
            vec![f16::ZERO; 32 * 20],
            Shape2D::<Dyn, Dyn>::new([32, 20]),
            Stride2D::<Dyn, Dyn>::new([20, 1]),
        );
        store(&mut core, &mut dst, &tile);

        assert_eq!(dst.into_inner(), values);
        assert_eq!(to_gm_bursts(&core), [(32, 32, 0, 8), (32, 8, 24, 32)]);
    }

    #[test]
    fn zn_tiles_unpack_one_row_block_at_a_time() {
        let mut core = core();
        let mut tile = TileMatZn::<f32, 16, 16>::new();
        core.assign(&mut tile, 0).unwrap();
        let values: Vec<f32> = (0..256).map(|i| i as f32).collect();
        tile.copy_from_slice(&mut core, &values);

        let mut dst = GlobalTensor::<f32, _, _, _, Dn>::new(
            vec![0.0; 256],
            Shape2D::<Dyn, Dyn>::new([16, 16]),
            Stride2D::<Dyn, Dyn>::new([1, 16]),
        );
        store(&mut core, &mut dst, &tile);

        assert_eq!(dst.get([0, 0, 0, 9, 3]), 9.0 * 16.0 + 3.0);
        assert_eq!(to_gm_bursts(&core).len(), 2);
    }

    #[test]
    fn nz_tensors_receive_whole_fractals() {
        let mut core = core();
        let mut tile = TileMatNz::<f16, 32, 32>::new();
        core.assign(&mut tile, 0).unwrap();
        let values: Vec<f16> = (0..1024).map(|i| f16::from_f32(i as f32)).collect();
        tile.copy_from_slice(&mut core, &values);

        let shape = [1, 2, 2, 16, 16];
        let mut dst = GlobalTensor::<f16, _, _, _, Nz>::new(
            vec![f16::ZERO; 1024],
            DynShape::new(shape),
            DynStride::new([1024, 512, 256, 16, 1]),
        );
        store(&mut core, &mut dst, &tile);

        // NZ tensors share the storage order of NZ tiles.
        assert_eq!(dst.data(), tile.elements(&core));
        assert_eq!(to_gm_bursts(&core), [(2, 1024, 0, 0)]);
    }

    #[test]
    fn atomic_stores_add_to_the_destination() {
        let mut core = core();
        let mut tile = TileVec::<f32, 2, 8>::new();
        core.assign(&mut tile, 0).unwrap();
        tile.copy_from_slice(&mut core, &[1.0; 16]);

        let mut dst = GlobalTensor::<f32, _, _, _, Nd>::new(
            vec![2.5; 16],
            Shape2D::<Dyn, Dyn>::new([2, 8]),
            Stride2D::<Dyn, Dyn>::new([8, 1]),
        );
        store_with(&mut core, &mut dst, &tile, AtomicMode::Add);

        assert_eq!(dst.into_inner(), vec![3.5; 16]);
    }

    #[test]
    #[should_panic(expected = "Atomic add isn't supported for u8")]
    fn atomic_stores_check_the_element_type() {
        let mut core = core();
        let mut tile = TileVec::<u8, 1, 32>::new();
        core.assign(&mut tile, 0).unwrap();

        let mut dst = GlobalTensor::<u8, _, _, _, Nd>::new(
            vec![0; 32],
            Shape2D::<Dyn, Dyn>::new([1, 32]),
            Stride2D::<Dyn, Dyn>::new([32, 1]),
        );
        store_with(&mut core, &mut dst, &tile, AtomicMode::Add);
    }
}
