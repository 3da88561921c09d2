use crate::layout::{GmLayout, LayoutKind, Nd};
use core::marker::PhantomData;
use tilecl_common::Element;
use tilecl_zspace::{
    DynShape, DynStride, RANK, ShapeDescriptor, StrideDescriptor, indexing::ravel_index,
};

/// A typed view over off-chip global memory.
///
/// The tensor owns no memory: `B` is any buffer of elements supplied by the caller, borrowed
/// (`&[E]`, `&mut [E]`) or owned (`Vec<E>`). Mutable access is only needed to store into the
/// tensor. The view starts `offset` elements into the buffer and maps a 5-D index to
/// `offset + Σ idx[i] * stride[i]`.
///
/// No bounds validation happens here; the movement engines check the parts of the shape
/// they rely on and index the buffer with Rust's bounds checks.
#[derive(Debug, Clone)]
pub struct GlobalTensor<E: Element, B, Sh = DynShape, St = DynStride, L: GmLayout = Nd> {
    buffer: B,
    offset: usize,
    shape: Sh,
    stride: St,
    _elem: PhantomData<(E, L)>,
}

impl<E, B, Sh, St, L> GlobalTensor<E, B, Sh, St, L>
where
    E: Element,
    B: AsRef<[E]>,
    Sh: ShapeDescriptor,
    St: StrideDescriptor,
    L: GmLayout,
{
    /// The layout of the tensor.
    pub const LAYOUT: LayoutKind = L::KIND;

    /// View `buffer` from its first element.
    pub fn new(buffer: B, shape: Sh, stride: St) -> Self {
        Self::with_offset(buffer, 0, shape, stride)
    }

    /// View `buffer` starting `offset` elements in.
    pub fn with_offset(buffer: B, offset: usize, shape: Sh, stride: St) -> Self {
        Self {
            buffer,
            offset,
            shape,
            stride,
            _elem: PhantomData,
        }
    }

    /// The extent of dimension `dim`.
    pub fn dim(&self, dim: usize) -> usize {
        self.shape.get(dim)
    }

    /// The stride of dimension `dim`, in elements.
    pub fn stride(&self, dim: usize) -> usize {
        self.stride.get(dim)
    }

    /// Every extent, outermost first.
    pub fn shape(&self) -> [usize; RANK] {
        self.shape.to_array()
    }

    /// Every stride, outermost first.
    pub fn strides(&self) -> [usize; RANK] {
        self.stride.to_array()
    }

    /// Offset of the view in the buffer, in elements.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The whole underlying buffer.
    pub fn data(&self) -> &[E] {
        self.buffer.as_ref()
    }

    /// Position in the buffer of a 5-D index.
    pub fn position(&self, index: [usize; RANK]) -> usize {
        self.offset + ravel_index(index, self.strides())
    }

    /// The element at a 5-D index.
    pub fn get(&self, index: [usize; RANK]) -> E {
        self.data()[self.position(index)]
    }

    /// Give the buffer back.
    pub fn into_inner(self) -> B {
        self.buffer
    }
}

impl<E, B, Sh, St, L> GlobalTensor<E, B, Sh, St, L>
where
    E: Element,
    B: AsRef<[E]> + AsMut<[E]>,
    Sh: ShapeDescriptor,
    St: StrideDescriptor,
    L: GmLayout,
{
    /// The whole underlying buffer, mutably.
    pub fn data_mut(&mut self) -> &mut [E] {
        self.buffer.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Dn;
    use pretty_assertions::assert_eq;
    use alloc::vec::Vec;
    use tilecl_zspace::{Dyn, Fixed, Shape2D, StaticStride2D, Stride2D};

    #[test]
    fn accessors_mix_fixed_and_runtime_values() {
        let data: Vec<f32> = (0..64).map(|i| i as f32).collect();
        let tensor = GlobalTensor::<f32, _, _, _>::with_offset(
            &data[..],
            8,
            Shape2D::<Dyn, Fixed<8>>::new([4]),
            StaticStride2D::<16, 1>::default(),
        );

        assert_eq!(tensor.dim(3), 4);
        assert_eq!(tensor.dim(4), 8);
        assert_eq!(tensor.stride(3), 16);
        assert_eq!(tensor.get([0, 0, 0, 1, 2]), 26.0);
    }

    #[test]
    fn column_major_views_walk_rows_contiguously() {
        let data: Vec<i32> = (0..12).collect();
        let tensor = GlobalTensor::<i32, _, _, _, Dn>::new(
            data,
            Shape2D::<Dyn, Dyn>::new([3, 4]),
            Stride2D::<Fixed<1>, Dyn>::new([3]),
        );

        assert_eq!(tensor.get([0, 0, 0, 2, 1]), 5);
        assert_eq!(
            GlobalTensor::<i32, Vec<i32>, Shape2D<Dyn, Dyn>, Stride2D<Fixed<1>, Dyn>, Dn>::LAYOUT,
            LayoutKind::Dn
        );
    }

    #[test]
    fn stores_go_through_data_mut() {
        let mut tensor = GlobalTensor::<u8, _, _, _>::new(
            [0u8; 4],
            Shape2D::<Fixed<1>, Fixed<4>>::default(),
            StaticStride2D::<4, 1>::default(),
        );
        tensor.data_mut()[2] = 9;

        assert_eq!(tensor.into_inner(), [0, 0, 9, 0]);
    }
}
