use crate::id::PlacementId;
use alloc::{vec, vec::Vec};
use bytemuck::Pod;
use core::fmt::Display;
use hashbrown::HashMap;
use tilecl_common::{TileType, hardware::BLOCK_BYTE_SIZE};

/// A contiguous byte range of a tier.
#[derive(new, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ByteRange {
    /// First byte.
    pub offset: usize,
    /// Number of bytes.
    pub size: usize,
}

impl ByteRange {
    /// One past the last byte.
    pub fn end(&self) -> usize {
        self.offset + self.size
    }

    /// Whether the two ranges share at least one byte.
    pub fn overlaps(&self, other: &ByteRange) -> bool {
        self.size > 0 && other.size > 0 && self.offset < other.end() && other.offset < self.end()
    }
}

impl Display for ByteRange {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.offset, self.end())
    }
}

/// Errors raised when placing a tile in a tier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    /// The address isn't a multiple of the block size.
    #[error("Address {offset:#x} in tier {tier} is not aligned to {alignment} bytes")]
    Misaligned {
        /// The tier.
        tier: TileType,
        /// The requested address.
        offset: usize,
        /// The required alignment.
        alignment: usize,
    },

    /// The placement doesn't fit in the tier.
    #[error("Range {range} doesn't fit in tier {tier} of {capacity} bytes")]
    OutOfBounds {
        /// The tier.
        tier: TileType,
        /// The requested range.
        range: ByteRange,
        /// Capacity of the tier.
        capacity: usize,
    },

    /// The placement overlaps another live placement of the same tier.
    #[error("Range {range} in tier {tier} overlaps placement {other} at {other_range}")]
    Overlap {
        /// The tier.
        tier: TileType,
        /// The requested range.
        range: ByteRange,
        /// The placement already covering part of the range.
        other: PlacementId,
        /// Range of the other placement.
        other_range: ByteRange,
    },
}

/// Occupancy of an arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaUsage {
    /// Number of live placements.
    pub placements: usize,
    /// Bytes covered by live placements, overlapping bytes counted once per placement.
    pub bytes_in_use: usize,
    /// Capacity of the tier.
    pub capacity: usize,
}

impl Display for ArenaUsage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} placements, {} / {} bytes",
            self.placements, self.bytes_in_use, self.capacity
        )
    }
}

/// The fixed-capacity scratch memory of one on-chip tier.
///
/// The storage is allocated once when the core is created. Tiles are placed at byte
/// offsets chosen by the caller: the arena never allocates, it only checks that a
/// placement is aligned and in bounds and, when enabled, that it doesn't overlap another
/// live placement.
pub struct Arena {
    tier: TileType,
    // Backed by u64 words so any element type can be viewed at a block aligned offset.
    words: Vec<u64>,
    capacity: usize,
    placements: HashMap<PlacementId, ByteRange>,
    check_overlap: bool,
}

impl Arena {
    /// Create the arena of a tier.
    pub fn new(tier: TileType, capacity: usize, check_overlap: bool) -> Self {
        let num_words = capacity.div_ceil(core::mem::size_of::<u64>());

        Self {
            tier,
            words: vec![0; num_words],
            capacity,
            placements: HashMap::new(),
            check_overlap,
        }
    }

    /// The tier of the arena.
    pub fn tier(&self) -> TileType {
        self.tier
    }

    /// Capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether overlapping placements are rejected.
    pub fn checks_overlap(&self) -> bool {
        self.check_overlap
    }

    /// The whole tier as bytes.
    pub fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.words)[..self.capacity]
    }

    /// The whole tier as mutable bytes.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        let capacity = self.capacity;
        &mut bytemuck::cast_slice_mut(&mut self.words)[..capacity]
    }

    /// Overwrite every byte of the tier.
    pub fn fill_bytes(&mut self, value: u8) {
        self.bytes_mut().fill(value);
    }

    /// View `len` elements starting at byte `offset`.
    ///
    /// # Panics
    ///
    /// If the range is out of bounds or the offset isn't aligned for `E`.
    pub fn view<E: Pod>(&self, offset: usize, len: usize) -> &[E] {
        let range = self.element_range::<E>(offset, len);
        bytemuck::cast_slice(&self.bytes()[range.offset..range.end()])
    }

    /// Mutable view of `len` elements starting at byte `offset`.
    ///
    /// # Panics
    ///
    /// If the range is out of bounds or the offset isn't aligned for `E`.
    pub fn view_mut<E: Pod>(&mut self, offset: usize, len: usize) -> &mut [E] {
        let range = self.element_range::<E>(offset, len);
        bytemuck::cast_slice_mut(&mut self.bytes_mut()[range.offset..range.end()])
    }

    /// A mutable destination view and a source view of the same tier.
    ///
    /// # Panics
    ///
    /// If the two ranges overlap.
    pub fn view_pair_mut<D: Pod, S: Pod>(
        &mut self,
        dst_offset: usize,
        dst_len: usize,
        src_offset: usize,
        src_len: usize,
    ) -> (&mut [D], &[S]) {
        let dst = self.element_range::<D>(dst_offset, dst_len);
        let src = self.element_range::<S>(src_offset, src_len);
        crate::kernel_assert!(
            !dst.overlaps(&src),
            "Source {src} and destination {dst} overlap in tier {}",
            self.tier
        );

        let bytes = self.bytes_mut();
        if dst.offset < src.offset {
            let (head, tail) = bytes.split_at_mut(src.offset);
            (
                bytemuck::cast_slice_mut(&mut head[dst.offset..dst.end()]),
                bytemuck::cast_slice(&tail[..src.size]),
            )
        } else {
            let (head, tail) = bytes.split_at_mut(dst.offset);
            (
                bytemuck::cast_slice_mut(&mut tail[..dst.size]),
                bytemuck::cast_slice(&head[src.offset..src.end()]),
            )
        }
    }

    /// Record a placement, replacing a previous one with the same id.
    pub fn claim(&mut self, id: PlacementId, range: ByteRange) -> Result<(), ArenaError> {
        if range.offset % BLOCK_BYTE_SIZE != 0 {
            return Err(ArenaError::Misaligned {
                tier: self.tier,
                offset: range.offset,
                alignment: BLOCK_BYTE_SIZE,
            });
        }
        if range.end() > self.capacity {
            return Err(ArenaError::OutOfBounds {
                tier: self.tier,
                range,
                capacity: self.capacity,
            });
        }
        if self.check_overlap {
            let conflict = self
                .placements
                .iter()
                .find(|(other, other_range)| **other != id && other_range.overlaps(&range));

            if let Some((other, other_range)) = conflict {
                return Err(ArenaError::Overlap {
                    tier: self.tier,
                    range,
                    other: *other,
                    other_range: *other_range,
                });
            }
        }

        self.placements.insert(id, range);
        Ok(())
    }

    /// Forget a placement, returning its range.
    pub fn release(&mut self, id: &PlacementId) -> Option<ByteRange> {
        self.placements.remove(id)
    }

    /// Range of a live placement.
    pub fn placement(&self, id: &PlacementId) -> Option<ByteRange> {
        self.placements.get(id).copied()
    }

    /// Occupancy of the arena.
    pub fn usage(&self) -> ArenaUsage {
        ArenaUsage {
            placements: self.placements.len(),
            bytes_in_use: self.placements.values().map(|range| range.size).sum(),
            capacity: self.capacity,
        }
    }

    fn element_range<E: Pod>(&self, offset: usize, len: usize) -> ByteRange {
        let range = ByteRange::new(offset, len * core::mem::size_of::<E>());
        crate::kernel_assert!(
            range.end() <= self.capacity,
            "Access {range} is out of bounds of tier {} ({} bytes)",
            self.tier,
            self.capacity
        );
        crate::kernel_assert!(
            offset % core::mem::align_of::<E>() == 0,
            "Access at {offset:#x} in tier {} is misaligned for its element type",
            self.tier
        );
        range
    }
}

impl Display for Arena {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!(" - Tier {} ({})\n", self.tier, self.usage()))?;
        let mut placements: Vec<_> = self.placements.iter().collect();
        placements.sort_by_key(|(_, range)| range.offset);
        for (id, range) in placements {
            f.write_fmt(format_args!("   - Placement {id} {range}\n"))?;
        }
        Ok(())
    }
}

impl core::fmt::Debug for Arena {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Arena")
            .field("tier", &self.tier)
            .field("capacity", &self.capacity)
            .field("placements", &self.placements)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena(check_overlap: bool) -> Arena {
        Arena::new(TileType::Mat, 1024, check_overlap)
    }

    #[test]
    fn claim_rejects_misaligned_address() {
        let mut arena = arena(true);
        let err = arena.claim(PlacementId::new(), ByteRange::new(16, 64));

        assert!(matches!(err, Err(ArenaError::Misaligned { offset: 16, .. })));
    }

    #[test]
    fn claim_rejects_out_of_bounds() {
        let mut arena = arena(true);
        let err = arena.claim(PlacementId::new(), ByteRange::new(992, 64));

        assert!(matches!(err, Err(ArenaError::OutOfBounds { .. })));
    }

    #[test]
    fn overlap_is_reported_when_checked() {
        let mut arena = arena(true);
        let first = PlacementId::new();
        arena.claim(first, ByteRange::new(0, 256)).unwrap();

        let err = arena.claim(PlacementId::new(), ByteRange::new(128, 256));
        assert!(matches!(err, Err(ArenaError::Overlap { other, .. }) if other == first));

        arena.release(&first);
        assert!(arena.claim(PlacementId::new(), ByteRange::new(128, 256)).is_ok());
    }

    #[test]
    fn overlap_is_allowed_when_unchecked() {
        let mut arena = arena(false);
        arena.claim(PlacementId::new(), ByteRange::new(0, 256)).unwrap();

        assert!(arena.claim(PlacementId::new(), ByteRange::new(0, 256)).is_ok());
        assert_eq!(arena.usage().placements, 2);
    }

    #[test]
    fn reclaiming_moves_the_placement() {
        let mut arena = arena(true);
        let id = PlacementId::new();
        arena.claim(id, ByteRange::new(0, 256)).unwrap();
        arena.claim(id, ByteRange::new(64, 256)).unwrap();

        assert_eq!(arena.placement(&id), Some(ByteRange::new(64, 256)));
    }

    #[test]
    fn typed_views_share_bytes() {
        let mut arena = arena(false);
        arena.view_mut::<u32>(32, 2).copy_from_slice(&[0x0403_0201, 0x0807_0605]);

        assert_eq!(arena.view::<u8>(32, 8), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn pair_views_work_in_both_orders() {
        let mut arena = arena(false);
        arena.view_mut::<u16>(512, 4).copy_from_slice(&[1, 2, 3, 4]);

        let (dst, src) = arena.view_pair_mut::<u16, u16>(0, 4, 512, 4);
        dst.copy_from_slice(src);
        let (dst, src) = arena.view_pair_mut::<u16, u16>(768, 4, 0, 4);
        dst.copy_from_slice(src);

        assert_eq!(arena.view::<u16>(768, 4), &[1, 2, 3, 4]);
    }

    #[test]
    #[should_panic]
    fn out_of_bounds_view_panics() {
        arena(false).view::<f32>(1020, 2);
    }
}
