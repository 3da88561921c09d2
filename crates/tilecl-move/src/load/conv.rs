use crate::{burst::Bursts, engine};
use tilecl_common::{Element, TileType};
use tilecl_core::{ConvTile, GlobalTensor, layout::GmLayout};
use tilecl_runtime::{AiCore, kernel_assert, sync::Endpoint, trace::Instr};
use tilecl_zspace::{
    ShapeDescriptor, StrideDescriptor, indexing::num_elems, striding::outer_dims_dense,
};

/// Stage a convolution operand into the staging tier.
///
/// The tensor and the tile share the layout `L`. The region is copied densely, one burst of
/// `C0` elements per row of the innermost plane, or as a single burst when the tensor is
/// already dense.
///
/// # Panics
///
/// If the shape of the tensor differs from the shape of the tile or its innermost stride
/// isn't one.
pub fn load_conv<E, B, Sh, St, L, const BYTES: usize>(
    core: &mut AiCore,
    dst: &ConvTile<E, L, BYTES>,
    src: &GlobalTensor<E, B, Sh, St, L>,
) where
    E: Element,
    B: AsRef<[E]>,
    Sh: ShapeDescriptor,
    St: StrideDescriptor,
    L: GmLayout,
{
    let shape @ [_, _, _, s3, s4] = src.shape();
    let strides @ [_, _, _, g3, g4] = src.strides();

    kernel_assert!(
        shape == dst.shape(),
        "A {} tile of shape {:?} can't hold a region of shape {shape:?}",
        L::KIND,
        dst.shape()
    );
    kernel_assert!(g4 == 1, "C0 must be contiguous, got strides {strides:?}");

    core.log_movement(&format_args!("load {} {} {shape:?} into {dst:?}", L::KIND, E::ELEM));

    let pipe = engine::route(Endpoint::Tier(TileType::Mat), Endpoint::Global);
    engine::write(core, pipe, dst);

    let size = core::mem::size_of::<E>();
    let range = core.placement(dst);
    let issue = |core: &mut AiCore, bursts: Bursts, gm_offset: usize, tile_offset: usize| {
        let (len_burst, src_gap, dst_gap) = bursts.in_bytes(size);
        core.issue(
            pipe,
            Instr::GmToTier {
                tier: TileType::Mat,
                n_burst: bursts.count,
                len_burst,
                src_gap,
                dst_gap,
            },
        );

        let elements = core
            .arena_mut(TileType::Mat)
            .view_mut::<E>(range.offset, num_elems(shape));
        bursts.run(elements, tile_offset, src.data(), gm_offset, false);
    };

    if g3 == s4 && outer_dims_dense(shape, strides, s3 * s4) {
        issue(core, Bursts::single(num_elems(shape)), src.offset(), 0);
        return;
    }

    let [s0, s1, s2, _, _] = shape;
    let mut outer = 0;
    for i in 0..s0 {
        for j in 0..s1 {
            for k in 0..s2 {
                for (first, part) in Bursts::new(s3, s4, g3, s4).split() {
                    let gm_offset = src.position([i, j, k, first, 0]);
                    issue(core, part, gm_offset, (outer * s3 + first) * s4);
                }
                outer += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::{sync::Arc, vec::Vec};
    use half::f16;
    use tilecl_core::layout::Nc1hwc0;
    use tilecl_runtime::config::GlobalConfig;
    use tilecl_zspace::{DynShape, DynStride, striding::row_major_contiguous_strides};

    fn core() -> AiCore {
        AiCore::from_config(Arc::new(GlobalConfig::default()))
    }

    #[test]
    fn dense_feature_maps_move_in_one_burst() {
        let mut core = core();
        let shape = [1, 2, 2, 2, 16];
        let data: Vec<f16> = (0..num_elems(shape)).map(|i| f16::from_f32(i as f32)).collect();
        let src = GlobalTensor::<f16, _, _, _, Nc1hwc0>::new(
            &data[..],
            DynShape::new(shape),
            DynStride::new(row_major_contiguous_strides(shape)),
        );
        let mut tile = ConvTile::<f16, Nc1hwc0, 1024>::new(shape);
        core.assign(&mut tile, 0).unwrap();

        load_conv(&mut core, &tile, &src);

        assert_eq!(tile.elements(&core), &data[..]);
        assert_eq!(core.trace().len(), 1);
    }

    #[test]
    fn padded_rows_move_one_burst_per_c0_row() {
        let mut core = core();
        let shape = [1, 1, 2, 3, 16];
        // Rows of the innermost plane are 24 elements apart in global memory.
        let strides = [96, 96, 72, 24, 1];
        let data: Vec<f16> = (0..144).map(|i| f16::from_f32(i as f32)).collect();
        let src = GlobalTensor::<f16, _, _, _, Nc1hwc0>::new(
            &data[..],
            DynShape::new(shape),
            DynStride::new(strides),
        );
        let mut tile = ConvTile::<f16, Nc1hwc0, 2048>::new(shape);
        core.assign(&mut tile, 0).unwrap();

        load_conv(&mut core, &tile, &src);

        let elements = tile.elements(&core);
        assert_eq!(elements[16], f16::from_f32(24.0));
        assert_eq!(elements[48], f16::from_f32(72.0));
        assert_eq!(core.trace().len(), 2);
        assert!(matches!(
            core.trace().iter().next().map(|issued| &issued.instr),
            Some(Instr::GmToTier { n_burst: 3, len_burst: 32, src_gap: 16, dst_gap: 0, .. })
        ));
    }
}
