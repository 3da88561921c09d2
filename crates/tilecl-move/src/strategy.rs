use derive_more::Display;
use tilecl_common::hardware::{REPEAT_MAX, repeat_elems};

/// How a copy inside the vector tier is issued.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum CopyStrategy {
    /// One copy in repeat mode over the packed region.
    #[display("bulk(repeat={repeat})")]
    Bulk {
        /// Full or partial vectors moved.
        repeat: usize,
    },
    /// One strided copy per row, each made of whole vectors.
    #[display("per-row(rows={rows}, repeat={repeat})")]
    PerRow {
        /// Copies issued.
        rows: usize,
        /// Vectors moved per row.
        repeat: usize,
    },
    /// Copies in element count mode, freeing the copy from the repeat limit.
    #[display("count(transfers={transfers}, count={count})")]
    CountMode {
        /// Copies issued.
        transfers: usize,
        /// Elements moved by each copy.
        count: usize,
    },
}

/// Choose how to copy a `rows × cols` region between two vector tiles.
///
/// Pitches are the row strides of the two tiles in elements. With `W = 256 / elem_size`
/// elements per vector:
///
/// - a packed region (one row, or both pitches equal to `cols`) is one bulk copy of
///   `ceil(rows * cols / W)` repeats, or one count-mode copy past [REPEAT_MAX] repeats;
/// - a region with padded rows is one copy per row when rows are whole vectors and there
///   are at most [REPEAT_MAX] of them, otherwise one count-mode copy per row.
pub fn select_copy_strategy(
    rows: usize,
    cols: usize,
    src_pitch: usize,
    dst_pitch: usize,
    elem_size: usize,
) -> CopyStrategy {
    let width = repeat_elems(elem_size);
    let packed = rows == 1 || (src_pitch == cols && dst_pitch == cols);

    if packed {
        let count = rows * cols;
        let repeat = count.div_ceil(width);
        return if repeat <= REPEAT_MAX {
            CopyStrategy::Bulk { repeat }
        } else {
            CopyStrategy::CountMode {
                transfers: 1,
                count,
            }
        };
    }

    if cols % width == 0 && rows <= REPEAT_MAX {
        CopyStrategy::PerRow {
            rows,
            repeat: cols / width,
        }
    } else {
        CopyStrategy::CountMode {
            transfers: rows,
            count: cols,
        }
    }
}
