use crate::engine;
use derive_more::Display;
use tilecl_common::{Element, TileType, hardware::FRACTAL_AB_SIZE};
use tilecl_core::{Left, Mat, OrderKind, Packing, Placement, Right, TileDesc};
use tilecl_runtime::{
    AiCore, kernel_assert,
    sync::{Endpoint, Pipe},
    trace::Instr,
};

/// Side of a 32 × 32 square moved by the paired transpose of 1-byte elements.
const B8_SQUARE: usize = 32;

/// Placements an extraction can write: the operand tiers of the cube unit.
pub trait ExtractTarget: Placement {
    /// Inner order the operand tier expects.
    const INNER: OrderKind;
}

impl ExtractTarget for Left {
    const INNER: OrderKind = OrderKind::RowMajor;
}

impl ExtractTarget for Right {
    const INNER: OrderKind = OrderKind::ColMajor;
}

/// Order in which the blocks of a destination are visited, one instruction per line.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Sweep {
    /// One line per block column.
    #[display("column")]
    Column,
    /// One line per block row.
    #[display("row")]
    Row,
}

impl Sweep {
    /// The sweep issuing the fewest instructions over a grid of blocks.
    pub const fn select(block_rows: usize, block_cols: usize) -> Self {
        if block_rows >= block_cols {
            Sweep::Column
        } else {
            Sweep::Row
        }
    }

    /// The lines of a `block_rows × block_cols` grid, as (first block, step, length).
    fn lines(
        self,
        block_rows: usize,
        block_cols: usize,
    ) -> impl Iterator<Item = ((usize, usize), (usize, usize), usize)> {
        let count = match self {
            Sweep::Column => block_cols,
            Sweep::Row => block_rows,
        };

        (0..count).map(move |line| match self {
            Sweep::Column => ((0, line), (1, 0), block_rows),
            Sweep::Row => ((line, 0), (0, 1), block_cols),
        })
    }
}

/// Copy a sub-tile of a staging tile into an operand tile.
///
/// The destination logical (r, c) receives the source logical (r + `index_row`,
/// c + `index_col`). The source is NZ or ZN; when its inner order differs from the one of
/// the operand tier, the fractals are transposed on the way.
///
/// Layouts, element types and tile sizes are checked at compile time.
///
/// # Panics
///
/// If the sub-tile leaves the source or the offsets are misaligned: multiples of the
/// fractal dims without transpose, of 32 (1-byte elements) or 16 with transpose.
pub fn extract<D, S>(core: &mut AiCore, dst: &D, src: &S, index_row: usize, index_col: usize)
where
    D: TileDesc,
    D::Placement: ExtractTarget,
    S: TileDesc<Placement = Mat>,
{
    let transpose = const {
        let elem = <S::Elem as Element>::ELEM;
        assert!(
            elem.same_as(&<D::Elem as Element>::ELEM),
            "Extraction keeps the element type"
        );
        assert!(
            elem.is_operand_type(),
            "Extracted elements are i8, f16, bf16 or f32"
        );
        assert!(
            S::FRACTAL == FRACTAL_AB_SIZE,
            "Extraction reads 512 byte fractals"
        );
        assert!(
            (matches!(S::BLOCK, OrderKind::ColMajor) && matches!(S::INNER, OrderKind::RowMajor))
                || (matches!(S::BLOCK, OrderKind::RowMajor)
                    && matches!(S::INNER, OrderKind::ColMajor)),
            "The source of an extraction is NZ or ZN"
        );
        assert!(
            matches!(D::BLOCK, OrderKind::RowMajor)
                && D::INNER.same_as(&<D::Placement as ExtractTarget>::INNER),
            "Left operands are ZZ and right operands are ZN"
        );
        assert!(
            D::ROWS <= S::ROWS && D::COLS <= S::COLS,
            "The destination of an extraction can't be larger than its source"
        );

        let transpose = !D::INNER.same_as(&S::INNER);
        if transpose {
            let align = transpose_align(elem.size());
            assert!(
                D::ROWS % align == 0 && D::COLS % align == 0,
                "Transposed extractions move whole 16 × 16 (32 × 32 for 1-byte elements) squares"
            );
        }
        transpose
    };

    kernel_assert!(
        index_row + D::ROWS <= S::ROWS && index_col + D::COLS <= S::COLS,
        "A {} × {} extraction at ({index_row}, {index_col}) leaves the {} × {} source",
        D::ROWS,
        D::COLS,
        S::ROWS,
        S::COLS
    );
    let size = core::mem::size_of::<S::Elem>();
    let (align_row, align_col) = if transpose {
        (transpose_align(size), transpose_align(size))
    } else {
        (D::PACKING.inner_rows, D::PACKING.inner_cols)
    };
    kernel_assert!(
        index_row % align_row == 0 && index_col % align_col == 0,
        "Extraction offsets ({index_row}, {index_col}) must be multiples of ({align_row}, {align_col})"
    );

    core.log_movement(&format_args!(
        "extract ({index_row}, {index_col}) transpose={transpose} {src:?} into {dst:?}"
    ));

    let tier = <D::Placement as Placement>::TYPE;
    let pipe = engine::route(Endpoint::Tier(tier), Endpoint::Tier(TileType::Mat));
    engine::read(core, pipe, src);
    engine::write(core, pipe, dst);

    let origin = (index_row, index_col);
    if !transpose {
        extract_fractals::<D, S>(core, pipe, dst, src, origin);
    } else if size == 1 {
        extract_b8_transposed::<D, S>(core, pipe, dst, src, origin);
    } else {
        core.issue(
            pipe,
            Instr::Load3d {
                dst: tier,
                rows: D::ROWS,
                cols: D::COLS,
                index_row,
                index_col,
            },
        );
        let (dst_bytes, src_bytes) = engine::views::<u8, u8>(core, dst, src);
        copy_region::<D, S>(dst_bytes, src_bytes, origin, (0, 0), (D::ROWS, D::COLS));
    }
}

/// Block loads of whole fractals, one per sweep line.
fn extract_fractals<D: TileDesc, S: TileDesc>(
    core: &mut AiCore,
    pipe: Pipe,
    dst: &D,
    src: &S,
    (index_row, index_col): (usize, usize),
) {
    let (dst_packing, src_packing) = (D::PACKING, S::PACKING);
    let (block_rows, block_cols) = (dst_packing.block_rows(), dst_packing.block_cols());
    let first_row = index_row / src_packing.inner_rows;
    let first_col = index_col / src_packing.inner_cols;
    let sweep = Sweep::select(block_rows, block_cols);
    log::trace!("Extracting {block_rows} × {block_cols} fractals with a {sweep} sweep");

    for ((row, col), step, repeat) in sweep.lines(block_rows, block_cols) {
        let src_line = Line::new(&src_packing, (first_row + row, first_col + col), step, repeat);
        let dst_line = Line::new(&dst_packing, (row, col), step, repeat);

        core.issue(
            pipe,
            Instr::Load2d {
                dst: <D::Placement as Placement>::TYPE,
                start_index: src_line.start,
                repeat,
                src_stride: src_line.stride,
                dst_gap: dst_line.stride.saturating_sub(1),
            },
        );

        let (dst_bytes, src_bytes) = engine::views::<u8, u8>(core, dst, src);
        for fractal in 0..repeat {
            let from = (src_line.start + fractal * src_line.stride) * FRACTAL_AB_SIZE;
            let to = (dst_line.start + fractal * dst_line.stride) * FRACTAL_AB_SIZE;
            dst_bytes[to..to + FRACTAL_AB_SIZE]
                .copy_from_slice(&src_bytes[from..from + FRACTAL_AB_SIZE]);
        }
    }
}

/// Paired transposes of 32 × 32 squares of 1-byte elements, one per sweep line.
fn extract_b8_transposed<D: TileDesc, S: TileDesc>(
    core: &mut AiCore,
    pipe: Pipe,
    dst: &D,
    src: &S,
    origin @ (index_row, index_col): (usize, usize),
) {
    let (square_rows, square_cols) = (D::ROWS / B8_SQUARE, D::COLS / B8_SQUARE);
    let src_packing = S::PACKING;
    let dst_packing = D::PACKING;
    let sweep = Sweep::select(square_rows, square_cols);
    let src_block = |row: usize, col: usize| {
        (
            (index_row + row * B8_SQUARE) / src_packing.inner_rows,
            (index_col + col * B8_SQUARE) / src_packing.inner_cols,
        )
    };
    let dst_block = |row: usize, col: usize| {
        (
            row * B8_SQUARE / dst_packing.inner_rows,
            col * B8_SQUARE / dst_packing.inner_cols,
        )
    };

    for ((row, col), (step_row, step_col), repeat) in sweep.lines(square_rows, square_cols) {
        let (next_row, next_col) = (row + step_row, col + step_col);
        let start_index = fractal_index(&src_packing, src_block(row, col));
        let (src_stride, dst_stride) = if repeat > 1 {
            (
                fractal_index(&src_packing, src_block(next_row, next_col)) - start_index,
                fractal_index(&dst_packing, dst_block(next_row, next_col))
                    - fractal_index(&dst_packing, dst_block(row, col)),
            )
        } else {
            (0, 0)
        };

        core.issue(
            pipe,
            Instr::Load2dTranspose {
                dst: <D::Placement as Placement>::TYPE,
                start_index,
                repeat,
                src_stride,
                dst_gap: dst_stride.saturating_sub(2),
            },
        );

        let (dst_bytes, src_bytes) = engine::views::<u8, u8>(core, dst, src);
        for square in 0..repeat {
            let first = (
                (row + square * step_row) * B8_SQUARE,
                (col + square * step_col) * B8_SQUARE,
            );
            copy_region::<D, S>(dst_bytes, src_bytes, origin, first, (B8_SQUARE, B8_SQUARE));
        }
    }
}

/// Copy `extent` destination elements starting at `first`, element by element through
/// both packings.
fn copy_region<D: TileDesc, S: TileDesc>(
    dst: &mut [u8],
    src: &[u8],
    (index_row, index_col): (usize, usize),
    (first_row, first_col): (usize, usize),
    (rows, cols): (usize, usize),
) {
    let size = core::mem::size_of::<D::Elem>();
    for row in first_row..first_row + rows {
        for col in first_col..first_col + cols {
            let to = D::PACKING.offset(row, col) * size;
            let from = S::PACKING.offset(row + index_row, col + index_col) * size;
            dst[to..to + size].copy_from_slice(&src[from..from + size]);
        }
    }
}

/// Alignment of transposed extractions.
const fn transpose_align(elem_size: usize) -> usize {
    if elem_size == 1 { B8_SQUARE } else { 16 }
}

fn fractal_index(packing: &Packing, (block_row, block_col): (usize, usize)) -> usize {
    packing.block_index(block_row, block_col)
}

/// A line of fractals: the index of the first one and the distance between two.
struct Line {
    start: usize,
    stride: usize,
}

impl Line {
    fn new(
        packing: &Packing,
        (row, col): (usize, usize),
        (step_row, step_col): (usize, usize),
        repeat: usize,
    ) -> Self {
        let start = fractal_index(packing, (row, col));
        let stride = if repeat > 1 {
            fractal_index(packing, (row + step_row, col + step_col)) - start
        } else {
            0
        };
        Self { start, stride }
    }
}
