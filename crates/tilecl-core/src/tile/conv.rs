use crate::layout::{GmLayout, LayoutKind};
use core::marker::PhantomData;
use tilecl_common::{
    Element, TileType,
    hardware::{BLOCK_BYTE_SIZE, C0_SIZE_BYTE},
};
use tilecl_runtime::{AiCore, PlacementId, kernel_assert, memory_management::Placed};
use tilecl_zspace::{RANK, indexing::num_elems};

/// A convolution operand staged in the staging tier.
///
/// Unlike [Tile](crate::Tile), the shape of a convolution tile is only known at run time: the
/// buffer reserves `BYTES` bytes and holds a dense 5-D region in the layout `L`, `C0` elements
/// innermost. A FRACTAL_Z filter `[C1HW, N / 16, 16, C0]` uses a leading extent of one.
pub struct ConvTile<E: Element, L: GmLayout, const BYTES: usize> {
    id: PlacementId,
    address: Option<usize>,
    shape: [usize; RANK],
    _marker: PhantomData<(E, L)>,
}

impl<E: Element, L: GmLayout, const BYTES: usize> ConvTile<E, L, BYTES> {
    /// Layout of the tile.
    pub const LAYOUT: LayoutKind = L::KIND;

    const CHECK: () = {
        assert!(
            L::KIND.is_conv(),
            "Convolution tiles are NC1HWC0 or FRACTAL_Z"
        );
        assert!(
            BYTES > 0 && BYTES % BLOCK_BYTE_SIZE == 0,
            "The buffer of a convolution tile must be a non-empty multiple of 32 bytes"
        );
    };

    /// Declare a convolution tile holding a region of the given shape.
    ///
    /// # Panics
    ///
    /// If the innermost extent isn't `C0` or the region doesn't fit in `BYTES`.
    pub fn new(shape: [usize; RANK]) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CHECK;
        let size = core::mem::size_of::<E>();

        kernel_assert!(
            shape[RANK - 1] * size == C0_SIZE_BYTE,
            "The innermost extent of a {} tile must be C0 = {}, got {}",
            L::KIND,
            C0_SIZE_BYTE / size,
            shape[RANK - 1]
        );
        kernel_assert!(
            num_elems(shape) * size <= BYTES,
            "A {shape:?} region of {} doesn't fit in {BYTES} bytes",
            E::ELEM
        );

        Self {
            id: PlacementId::new(),
            address: None,
            shape,
            _marker: PhantomData,
        }
    }

    /// Every extent, outermost first.
    pub fn shape(&self) -> [usize; RANK] {
        self.shape
    }

    /// The extent of dimension `dim`.
    pub fn dim(&self, dim: usize) -> usize {
        self.shape[dim]
    }

    /// Elements in the region.
    pub fn num_elems(&self) -> usize {
        num_elems(self.shape)
    }

    /// The region, densely packed.
    pub fn elements<'a>(&self, core: &'a AiCore) -> &'a [E] {
        let range = core.placement(self);
        core.arena(TileType::Mat)
            .view(range.offset, self.num_elems())
    }
}

impl<E: Element, L: GmLayout, const BYTES: usize> core::fmt::Debug for ConvTile<E, L, BYTES> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConvTile")
            .field("id", &self.id)
            .field("layout", &L::KIND)
            .field("elem", &E::ELEM)
            .field("shape", &self.shape)
            .field("address", &self.address)
            .finish()
    }
}

impl<E: Element, L: GmLayout, const BYTES: usize> Placed for ConvTile<E, L, BYTES> {
    fn placement_id(&self) -> PlacementId {
        self.id
    }

    fn tier(&self) -> TileType {
        TileType::Mat
    }

    fn byte_size(&self) -> usize {
        BYTES
    }

    fn address(&self) -> Option<usize> {
        self.address
    }

    fn bind(&mut self, address: usize) {
        self.address = Some(address);
    }
}
