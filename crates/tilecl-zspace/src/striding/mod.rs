//! # Stride Layout Builders

use crate::RANK;

/// Construct row-major contiguous strides for a shape.
///
/// The returned strides satisfy:
/// - ``strides[RANK - 1] == 1``
/// - ``for i in 0..RANK - 1 { strides[i] == strides[i + 1] * shape[i + 1] }``
pub fn row_major_contiguous_strides(shape: [usize; RANK]) -> [usize; RANK] {
    let mut strides = [1; RANK];
    for i in (0..RANK - 1).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

/// Strides of a column-major region: the two innermost dimensions are swapped so rows are
/// adjacent in memory, outer dimensions stay contiguous.
pub fn col_major_contiguous_strides(shape: [usize; RANK]) -> [usize; RANK] {
    let [d0, d1, d2, rows, cols] = shape;
    let mut strides = row_major_contiguous_strides([d0, d1, d2, cols, rows]);
    strides.swap(3, 4);
    strides
}

/// Whether the outer dimensions of a region are laid out densely around its two
/// innermost dimensions. Dimensions of extent one never break density.
pub fn outer_dims_dense(shape: [usize; RANK], strides: [usize; RANK], plane: usize) -> bool {
    let mut expected = plane;
    for dim in (0..3).rev() {
        if shape[dim] == 1 {
            continue;
        }
        if strides[dim] != expected {
            return false;
        }
        expected *= shape[dim];
    }
    true
}
