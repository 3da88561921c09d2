use crate::{
    engine, extract,
    fixpipe::{Fixpipe, FixpipeParams},
    strategy::{CopyStrategy, select_copy_strategy},
};
use tilecl_common::{
    Elem, Element, FloatKind, TileType, cast_quant_mode,
    hardware::{BIAS_ALIGN_BYTE, FRACTAL_AB_SIZE, SCALING_ALIGN_BYTE, repeat_elems},
};
use tilecl_core::{
    Acc, Bias, Left, Mat, OrderKind, Placement, Right, Scaling, TileDesc, Vector,
};
use tilecl_runtime::{
    AiCore, kernel_assert,
    sync::{Endpoint, Pipe},
    trace::{Instr, VecCopyMode},
};

/// A tier-to-tier path of the hardware, from placement `S` into `Self`.
///
/// Pairs without an implementation have no hardware path and fail to compile.
pub trait MovePath<S: Placement>: Placement {
    /// Execute the movement of `src` into `dst`.
    fn execute<D, T>(core: &mut AiCore, dst: &D, src: &T)
    where
        D: TileDesc<Placement = Self>,
        T: TileDesc<Placement = S>;
}

/// Placements the fixpipe can write on chip.
pub trait FixpipeTarget: Placement {}

impl FixpipeTarget for Mat {}
impl FixpipeTarget for Vector {}

/// Move a tile into another tier.
///
/// Both tiles have the same shape. Staging tiles go to the operand tiers as an extraction
/// at (0, 0), to the bias table with an optional f16 to f32 widening and to the scaling
/// tier. Vector tiles are copied with the strategy of [select_copy_strategy], accumulators
/// are written back with a plain conversion (see [mov_with] for the other options).
pub fn mov<D, S>(core: &mut AiCore, dst: &D, src: &S)
where
    D: TileDesc,
    S: TileDesc,
    D::Placement: MovePath<S::Placement>,
{
    const {
        assert!(
            D::ROWS == S::ROWS && D::COLS == S::COLS,
            "Moved tiles have the same shape"
        );
    }

    core.log_movement(&format_args!("mov {src:?} into {dst:?}"));
    <D::Placement as MovePath<S::Placement>>::execute(core, dst, src);
}

/// Write an accumulator back into a staging or vector tile through the fixpipe.
///
/// The valid extent moved is the smallest of both tiles. Values go through the ReLU, then
/// the quantization of `params`.
///
/// # Panics
///
/// If the conversion isn't supported between the element types, the scales don't cover the
/// columns or an atomic write-back is requested: atomics only target global memory.
pub fn mov_with<D, S>(core: &mut AiCore, dst: &D, src: &S, params: FixpipeParams)
where
    D: TileDesc,
    D::Placement: FixpipeTarget,
    S: TileDesc<Placement = Acc>,
{
    const {
        assert!(
            D::ROWS == S::ROWS && D::COLS == S::COLS,
            "Moved tiles have the same shape"
        );
    }
    kernel_assert!(
        !params.atomic,
        "Atomic write-backs only target global memory"
    );

    core.log_movement(&format_args!(
        "mov quant={:?} relu={} {src:?} into {dst:?}",
        params.quant, params.relu
    ));
    writeback(core, dst, src, &params);
}

impl MovePath<Mat> for Left {
    fn execute<D, T>(core: &mut AiCore, dst: &D, src: &T)
    where
        D: TileDesc<Placement = Self>,
        T: TileDesc<Placement = Mat>,
    {
        extract(core, dst, src, 0, 0);
    }
}

impl MovePath<Mat> for Right {
    fn execute<D, T>(core: &mut AiCore, dst: &D, src: &T)
    where
        D: TileDesc<Placement = Self>,
        T: TileDesc<Placement = Mat>,
    {
        extract(core, dst, src, 0, 0);
    }
}

impl MovePath<Mat> for Bias {
    fn execute<D, T>(core: &mut AiCore, dst: &D, src: &T)
    where
        D: TileDesc<Placement = Self>,
        T: TileDesc<Placement = Mat>,
    {
        const {
            let (src_elem, dst_elem) = (<T::Elem as Element>::ELEM, <D::Elem as Element>::ELEM);
            let widen = src_elem.same_as(&Elem::Float(FloatKind::F16))
                && dst_elem.same_as(&Elem::Float(FloatKind::F32));
            assert!(
                widen || (src_elem.same_as(&dst_elem) && src_elem.is_accumulator_type()),
                "Bias rows are f16 widened to f32, or f32 and i32 kept as is"
            );
            assert!(
                matches!(T::INNER, OrderKind::NoneBox),
                "Bias rows come from an unblocked staging tile"
            );
            assert!(
                (D::COLS * core::mem::size_of::<D::Elem>()) % BIAS_ALIGN_BYTE == 0,
                "Bias rows are 64 byte aligned"
            );
        }

        row_burst(core, dst, src);
    }
}

impl MovePath<Mat> for Scaling {
    fn execute<D, T>(core: &mut AiCore, dst: &D, src: &T)
    where
        D: TileDesc<Placement = Self>,
        T: TileDesc<Placement = Mat>,
    {
        const {
            assert!(
                <T::Elem as Element>::ELEM.same_as(&<u64 as Element>::ELEM),
                "Scales are u64 entries"
            );
            assert!(
                matches!(T::INNER, OrderKind::NoneBox),
                "Scales come from an unblocked staging tile"
            );
            assert!(
                (D::COLS * 8) % SCALING_ALIGN_BYTE == 0,
                "Scale rows are 128 byte aligned"
            );
        }

        row_burst(core, dst, src);
    }
}

/// One burst of the first row of `src` into the single row of `dst`, converting each
/// element.
fn row_burst<D: TileDesc, T: TileDesc>(core: &mut AiCore, dst: &D, src: &T) {
    let (dst_tier, src_tier) = (dst.tier(), src.tier());
    let pipe = engine::route(Endpoint::Tier(dst_tier), Endpoint::Tier(src_tier));
    engine::read(core, pipe, src);
    engine::write(core, pipe, dst);

    let cols = dst.valid_cols().min(src.valid_cols());
    core.issue(
        pipe,
        Instr::TierBurst {
            src: src_tier,
            dst: dst_tier,
            n_burst: 1,
            len_burst: cols * core::mem::size_of::<T::Elem>(),
            src_gap: 0,
            dst_gap: 0,
        },
    );

    if <D::Elem as Element>::ELEM == <T::Elem as Element>::ELEM {
        let bytes = cols * core::mem::size_of::<T::Elem>();
        let (to, from) = engine::views::<u8, u8>(core, dst, src);
        to[..bytes].copy_from_slice(&from[..bytes]);
        return;
    }

    let (to, from) = engine::views::<D::Elem, T::Elem>(core, dst, src);
    for col in 0..cols {
        let value = from[T::PACKING.offset(0, col)].to_f64();
        to[D::PACKING.offset(0, col)] = D::Elem::from_f64(value);
    }
}

impl MovePath<Vector> for Vector {
    fn execute<D, T>(core: &mut AiCore, dst: &D, src: &T)
    where
        D: TileDesc<Placement = Self>,
        T: TileDesc<Placement = Vector>,
    {
        const {
            assert!(
                <D::Elem as Element>::ELEM.same_as(&<T::Elem as Element>::ELEM),
                "Vector copies keep the element type"
            );
            assert!(
                D::BLOCK.same_as(&T::BLOCK),
                "Vector copies keep the tile order"
            );
        }

        let pipe = engine::route(Endpoint::Tier(TileType::Vec), Endpoint::Tier(TileType::Vec));
        engine::read(core, pipe, src);
        engine::write(core, pipe, dst);

        let rows = dst.valid_rows().min(src.valid_rows());
        let cols = dst.valid_cols().min(src.valid_cols());
        // Column-major tiles are copied as their transpose.
        let (lines, len, pitch) = match D::BLOCK {
            OrderKind::ColMajor => (cols, rows, D::ROWS),
            _ => (rows, cols, D::COLS),
        };
        let size = core::mem::size_of::<D::Elem>();
        let strategy = select_copy_strategy(lines, len, pitch, pitch, size);
        log::trace!("Vector copy of {lines} × {len} with {strategy}");

        issue_vec_copies(core, pipe, strategy, lines, len, size);

        let (to, from) = engine::views::<u8, u8>(core, dst, src);
        if len == pitch {
            let bytes = lines * len * size;
            to[..bytes].copy_from_slice(&from[..bytes]);
            return;
        }
        for line in 0..lines {
            let start = line * pitch * size;
            let end = start + len * size;
            to[start..end].copy_from_slice(&from[start..end]);
        }
    }
}

fn issue_vec_copies(
    core: &mut AiCore,
    pipe: Pipe,
    strategy: CopyStrategy,
    lines: usize,
    len: usize,
    size: usize,
) {
    match strategy {
        CopyStrategy::Bulk { repeat } => core.issue(
            pipe,
            Instr::VecCopy {
                mode: VecCopyMode::Norm,
                repeat,
                count: lines * len,
            },
        ),
        CopyStrategy::PerRow { rows, repeat } => {
            for _ in 0..rows {
                core.issue(
                    pipe,
                    Instr::VecCopy {
                        mode: VecCopyMode::Norm,
                        repeat,
                        count: len,
                    },
                );
            }
        }
        CopyStrategy::CountMode { transfers, count } => {
            for _ in 0..transfers {
                core.issue(
                    pipe,
                    Instr::VecCopy {
                        mode: VecCopyMode::Count,
                        repeat: count.div_ceil(repeat_elems(size)),
                        count,
                    },
                );
            }
        }
    }
}

impl MovePath<Acc> for Mat {
    fn execute<D, T>(core: &mut AiCore, dst: &D, src: &T)
    where
        D: TileDesc<Placement = Self>,
        T: TileDesc<Placement = Acc>,
    {
        const {
            assert!(
                cast_quant_mode(<T::Elem as Element>::ELEM, <D::Elem as Element>::ELEM).is_some(),
                "No plain conversion between the accumulator and the destination, use mov_with"
            );
        }
        writeback(core, dst, src, &FixpipeParams::default());
    }
}

impl MovePath<Acc> for Vector {
    fn execute<D, T>(core: &mut AiCore, dst: &D, src: &T)
    where
        D: TileDesc<Placement = Self>,
        T: TileDesc<Placement = Acc>,
    {
        const {
            assert!(
                cast_quant_mode(<T::Elem as Element>::ELEM, <D::Elem as Element>::ELEM).is_some(),
                "No plain conversion between the accumulator and the destination, use mov_with"
            );
        }
        writeback(core, dst, src, &FixpipeParams::default());
    }
}

/// Accumulator into a staging tile (NZ) or a vector tile (unblocked row-major).
fn writeback<D: TileDesc, S: TileDesc>(
    core: &mut AiCore,
    dst: &D,
    src: &S,
    params: &FixpipeParams,
) {
    const {
        assert!(
            <S::Elem as Element>::ELEM.is_accumulator_type(),
            "Accumulators hold i32 or f32"
        );
        match <D::Placement as Placement>::TYPE {
            TileType::Mat => assert!(
                matches!(D::BLOCK, OrderKind::ColMajor)
                    && matches!(D::INNER, OrderKind::RowMajor)
                    && D::FRACTAL == FRACTAL_AB_SIZE
                    && (D::COLS * core::mem::size_of::<D::Elem>()) % 32 == 0,
                "Accumulators are written back into NZ staging tiles"
            ),
            TileType::Vec => assert!(
                matches!(D::BLOCK, OrderKind::RowMajor) && matches!(D::INNER, OrderKind::NoneBox),
                "Accumulators are written back into row-major vector tiles"
            ),
            _ => {}
        }
    }

    let dst_tier = dst.tier();
    let pipe = engine::route(Endpoint::Tier(dst_tier), Endpoint::Tier(TileType::Acc));
    let rows = dst.valid_rows().min(src.valid_rows());
    let cols = dst.valid_cols().min(src.valid_cols());

    let fixpipe = Fixpipe::configure::<S::Elem, D::Elem>(core, pipe, params, cols);
    engine::read(core, pipe, src);
    engine::write(core, pipe, dst);
    core.issue(pipe, fixpipe.instr(Endpoint::Tier(dst_tier), rows, cols));

    let (to, from) = engine::views::<D::Elem, S::Elem>(core, dst, src);
    for row in 0..rows {
        for col in 0..cols {
            let value = fixpipe.convert(from[S::PACKING.offset(row, col)], col);
            fixpipe.write(&mut to[D::PACKING.offset(row, col)], value);
        }
    }
}
