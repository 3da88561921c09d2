//! Indexing Utilities

use crate::RANK;

/// Linear element offset of a 5-D index under the given strides.
pub fn ravel_index(index: [usize; RANK], strides: [usize; RANK]) -> usize {
    index
        .iter()
        .zip(strides.iter())
        .map(|(i, s)| i * s)
        .sum()
}

/// Split a linear position into a 5-D index over `shape`, innermost dimension fastest.
pub fn unravel_index(mut position: usize, shape: [usize; RANK]) -> [usize; RANK] {
    let mut index = [0; RANK];
    for dim in (0..RANK).rev() {
        index[dim] = position % shape[dim];
        position /= shape[dim];
    }
    index
}

/// Number of elements described by a shape.
pub fn num_elems(shape: [usize; RANK]) -> usize {
    shape.iter().product()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ravel_applies_strides() {
        assert_eq!(ravel_index([1, 0, 2, 3, 4], [1000, 500, 100, 10, 1]), 1234);
    }

    #[test]
    fn unravel_is_inverse_of_contiguous_ravel() {
        let shape = [2, 3, 1, 4, 5];
        let strides = crate::striding::row_major_contiguous_strides(shape);

        for position in 0..num_elems(shape) {
            let index = unravel_index(position, shape);
            assert_eq!(ravel_index(index, strides), position);
        }
    }
}
