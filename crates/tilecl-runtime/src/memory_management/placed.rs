use crate::id::PlacementId;
use tilecl_common::TileType;

/// Something that occupies a byte range of an on-chip tier once it has been assigned an
/// address.
pub trait Placed {
    /// Identity of the placement, stable for the lifetime of the value.
    fn placement_id(&self) -> PlacementId;

    /// The tier the value lives in.
    fn tier(&self) -> TileType;

    /// Bytes occupied in the tier.
    fn byte_size(&self) -> usize;

    /// The assigned byte address, `None` before assignment.
    fn address(&self) -> Option<usize>;

    /// Record the assigned byte address.
    fn bind(&mut self, address: usize);
}
