use super::OrderKind;
use tilecl_common::hardware::{C0_SIZE_BYTE, FRACTAL_C_SIZE, FRACTAL_NZ_ROW};

/// Rows and columns of an inner block.
///
/// Accumulator fractals are always 16 × 16. Operand fractals are 16 rows of `C0` elements
/// when their inner order is row-major, `C0` rows of 16 elements when it's column-major.
/// Without inner blocking every element is its own block.
pub const fn inner_dims(inner: OrderKind, fractal: usize, elem_size: usize) -> (usize, usize) {
    if matches!(inner, OrderKind::NoneBox) {
        return (1, 1);
    }
    if fractal == FRACTAL_C_SIZE {
        return (FRACTAL_NZ_ROW, FRACTAL_NZ_ROW);
    }

    let c0 = C0_SIZE_BYTE / elem_size;
    match inner {
        OrderKind::RowMajor => (FRACTAL_NZ_ROW, c0),
        _ => (c0, FRACTAL_NZ_ROW),
    }
}

/// Maps the logical coordinates of a tile to element offsets in its buffer.
///
/// The tile is cut into `inner_rows × inner_cols` blocks. Blocks are stored one after the
/// other in the block order, elements of a block in the inner order:
///
/// ```text
/// block row-major:    (r / ir) * cols * ir + (c / ic) * ir * ic + inner
/// block col-major:    (c / ic) * rows * ic + (r / ir) * ir * ic + inner
/// inner row-major:    (r % ir) * ic + c % ic
/// inner col-major:    (c % ic) * ir + r % ir
/// ```
///
/// An unboxed tile has 1 × 1 blocks, which reduces to `r * cols + c` or `c * rows + r`.
///
/// Vector tiles may end with a partial row of blocks. Those blocks hold only the remaining
/// rows: `ir` is replaced by their height in the column block stride of row-major blocks
/// and in the inner column-major formula, so the packing stays dense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packing {
    /// Rows of the tile.
    pub rows: usize,
    /// Columns of the tile.
    pub cols: usize,
    /// Order of the blocks.
    pub block: OrderKind,
    /// Order of the elements in a block.
    pub inner: OrderKind,
    /// Rows of a block.
    pub inner_rows: usize,
    /// Columns of a block.
    pub inner_cols: usize,
}

impl Packing {
    /// Describe the packing of a tile.
    pub const fn new(
        rows: usize,
        cols: usize,
        block: OrderKind,
        inner: OrderKind,
        fractal: usize,
        elem_size: usize,
    ) -> Self {
        let (inner_rows, inner_cols) = inner_dims(inner, fractal, elem_size);
        Self {
            rows,
            cols,
            block,
            inner,
            inner_rows,
            inner_cols,
        }
    }

    /// Whether the tile is divided into inner blocks.
    pub const fn is_boxed(&self) -> bool {
        !matches!(self.inner, OrderKind::NoneBox)
    }

    /// Elements in a block.
    pub const fn block_elems(&self) -> usize {
        self.inner_rows * self.inner_cols
    }

    /// Number of block rows, the last one possibly partial.
    pub const fn block_rows(&self) -> usize {
        self.rows.div_ceil(self.inner_rows)
    }

    /// Rows of the blocks in block row `block_row`.
    pub const fn block_height(&self, block_row: usize) -> usize {
        let remaining = self.rows - block_row * self.inner_rows;
        if remaining < self.inner_rows {
            remaining
        } else {
            self.inner_rows
        }
    }

    /// Number of block columns.
    pub const fn block_cols(&self) -> usize {
        self.cols / self.inner_cols
    }

    /// Storage index of the block at (`block_row`, `block_col`).
    ///
    /// Scaled by [Packing::block_elems] this is the block start only when every block row is
    /// full, which holds for all but vector tiles.
    pub const fn block_index(&self, block_row: usize, block_col: usize) -> usize {
        match self.block {
            OrderKind::ColMajor => block_col * self.block_rows() + block_row,
            _ => block_row * self.block_cols() + block_col,
        }
    }

    /// Element offset of the logical coordinates (`row`, `col`).
    pub const fn offset(&self, row: usize, col: usize) -> usize {
        let (ir, ic) = (self.inner_rows, self.inner_cols);
        let (block_row, block_col) = (row / ir, col / ic);
        let height = self.block_height(block_row);

        let block = match self.block {
            OrderKind::ColMajor => block_col * self.rows * ic + block_row * ir * ic,
            _ => block_row * self.cols * ir + block_col * height * ic,
        };
        let inner = match self.inner {
            OrderKind::ColMajor => (col % ic) * height + row % ir,
            _ => (row % ir) * ic + col % ic,
        };

        block + inner
    }
}
