use crate::{
    config::{GlobalConfig, Logger, movement::MovementLogLevel, sync::SyncLogLevel},
    memory_management::{Arena, ArenaError, ArenaUsage, ByteRange, Placed},
    sync::{AccessKind, EventId, Flag, Hazard, Pipe, SyncError, SyncTracker},
    trace::{InstructionTrace, Instr, Issued},
};
use alloc::{sync::Arc, vec::Vec};
use core::fmt::Display;
use tilecl_common::TileType;

/// An executable model of one accelerator core.
///
/// The core owns the fixed-capacity arenas backing every on-chip tier, the trace of the
/// instructions issued by the movement engines and the tracker of the handshakes between
/// its pipes. Engines execute immediately in program order; the handshakes a real kernel
/// needs are checked, never enforced.
#[derive(Debug)]
pub struct AiCore {
    arenas: Vec<Arena>,
    sync: SyncTracker,
    trace: InstructionTrace,
    logger: Logger,
    config: Arc<GlobalConfig>,
}

/// What a kernel left behind once it finished without synchronization errors.
#[derive(Debug)]
pub struct KernelReport {
    /// Every instruction issued, empty when tracing is disabled.
    pub trace: InstructionTrace,
    /// Occupancy of each tier when the kernel finished.
    pub usage: Vec<(TileType, ArenaUsage)>,
}

impl Default for AiCore {
    fn default() -> Self {
        Self::new()
    }
}

impl AiCore {
    /// Create a core from the global configuration.
    pub fn new() -> Self {
        Self::from_config(GlobalConfig::get())
    }

    /// Create a core from the given configuration.
    pub fn from_config(config: Arc<GlobalConfig>) -> Self {
        let arenas = TileType::ALL
            .iter()
            .map(|tier| {
                Arena::new(
                    *tier,
                    config.arena.capacity(*tier),
                    config.arena.check_overlap,
                )
            })
            .collect();

        Self {
            arenas,
            sync: SyncTracker::default(),
            trace: InstructionTrace::default(),
            logger: Logger::from_config(config.clone()),
            config,
        }
    }

    /// The configuration of the core.
    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// The arena of a tier.
    pub fn arena(&self, tier: TileType) -> &Arena {
        &self.arenas[tier.index()]
    }

    /// The mutable arena of a tier.
    pub fn arena_mut(&mut self, tier: TileType) -> &mut Arena {
        &mut self.arenas[tier.index()]
    }

    /// The arenas of two distinct tiers, the first one mutable.
    ///
    /// # Panics
    ///
    /// If both tiers are the same.
    pub fn arenas_mut(&mut self, dst: TileType, src: TileType) -> (&mut Arena, &Arena) {
        crate::kernel_assert!(dst != src, "Tier {dst} can't be borrowed twice");

        let (dst_index, src_index) = (dst.index(), src.index());
        if dst_index < src_index {
            let (head, tail) = self.arenas.split_at_mut(src_index);
            (&mut head[dst_index], &tail[0])
        } else {
            let (head, tail) = self.arenas.split_at_mut(dst_index);
            (&mut tail[0], &head[src_index])
        }
    }

    /// Bind a tile to the byte `address` of its tier.
    ///
    /// A tile can be assigned again to move it; the previous placement is replaced.
    pub fn assign<P: Placed>(&mut self, tile: &mut P, address: usize) -> Result<(), ArenaError> {
        let tier = tile.tier();
        let range = ByteRange::new(address, tile.byte_size());
        self.arena_mut(tier).claim(tile.placement_id(), range)?;
        tile.bind(address);

        log::debug!("Placement {} bound to {tier}{range}", tile.placement_id());
        Ok(())
    }

    /// Release the placement of a tile, so its bytes can be reused by another tile.
    pub fn release<P: Placed>(&mut self, tile: &P) {
        self.arena_mut(tile.tier()).release(&tile.placement_id());
    }

    /// The bytes a tile covers in its tier.
    ///
    /// # Panics
    ///
    /// If the tile wasn't assigned an address.
    pub fn placement<P: Placed>(&self, tile: &P) -> ByteRange {
        let address = tile.address();
        crate::kernel_assert!(
            address.is_some(),
            "Tile {} in tier {} is used before being assigned an address",
            tile.placement_id(),
            tile.tier()
        );
        ByteRange::new(address.unwrap_or_default(), tile.byte_size())
    }

    /// Record that `pipe` reads or writes `range` of `tier`.
    ///
    /// # Panics
    ///
    /// On a hazard when strict synchronization is enabled.
    pub fn access(&mut self, pipe: Pipe, kind: AccessKind, tier: TileType, range: ByteRange) {
        for hazard in self.sync.access(pipe, kind, tier, range) {
            self.report(&hazard);
        }
    }

    /// Record an instruction issued on `pipe`.
    pub fn issue(&mut self, pipe: Pipe, instr: Instr) {
        let issued = Issued::new(pipe, instr);
        log::trace!("{issued}");

        if let MovementLogLevel::Full = self.logger.log_level_movement() {
            self.logger.log_movement(&issued);
        }
        if self.config.movement.trace {
            self.trace.push(issued);
        }
    }

    /// Log one movement operation.
    pub fn log_movement<S: Display>(&mut self, msg: &S) {
        log::debug!("{msg}");

        if self.logger.log_level_movement() != MovementLogLevel::Disabled {
            self.logger.log_movement(msg);
        }
    }

    /// Set a flag from `src` to `dst`, returning the permit `dst` must wait on.
    pub fn set_flag(&mut self, src: Pipe, dst: Pipe, event: EventId) -> Flag {
        let (flag, reissued) = self.sync.set_flag(src, dst, event);
        self.issue(Pipe::S, Instr::SetFlag { src, dst, event });
        self.log_sync_full(&flag);

        if let Some(hazard) = reissued {
            self.report(&hazard);
        }
        flag
    }

    /// Wait on a flag, ordering the accesses it observed before the later accesses of its
    /// destination pipe.
    pub fn wait_flag(&mut self, flag: Flag) {
        self.issue(
            Pipe::S,
            Instr::WaitFlag {
                src: flag.src(),
                dst: flag.dst(),
                event: flag.event(),
            },
        );
        self.log_sync_full(&flag);
        self.sync.wait_flag(flag);
    }

    /// Issue a pipe barrier.
    pub fn pipe_barrier(&mut self, pipe: Pipe) {
        self.issue(Pipe::S, Instr::Barrier(pipe));
        self.sync.pipe_barrier(pipe);
    }

    /// The instructions issued so far.
    pub fn trace(&self) -> &InstructionTrace {
        &self.trace
    }

    /// Forget the instructions issued so far.
    pub fn clear_trace(&mut self) {
        self.trace.clear();
    }

    /// The hazards found so far.
    pub fn hazards(&self) -> &[Hazard] {
        self.sync.hazards()
    }

    /// End the kernel, reporting hazards and flags that were never awaited.
    pub fn finish(mut self) -> Result<KernelReport, SyncError> {
        let unawaited = self.sync.unawaited();
        if self.logger.log_level_sync() != SyncLogLevel::Disabled {
            for flag in unawaited.iter() {
                self.logger.log_sync(&format_args!("Flag {flag} never awaited"));
            }
        }

        let usage = self
            .arenas
            .iter()
            .map(|arena| (arena.tier(), arena.usage()))
            .collect();
        let trace = core::mem::take(&mut self.trace);
        self.sync.finish()?;

        Ok(KernelReport { trace, usage })
    }

    fn log_sync_full<S: Display>(&mut self, msg: &S) {
        if let SyncLogLevel::Full = self.logger.log_level_sync() {
            self.logger.log_sync(msg);
        }
    }

    fn report(&mut self, hazard: &Hazard) {
        log::warn!("{hazard}");
        if self.logger.log_level_sync() != SyncLogLevel::Disabled {
            self.logger.log_sync(hazard);
        }
        crate::kernel_assert!(
            !self.config.sync.strict,
            "Hazard with strict synchronization: {hazard}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::PlacementId;
    use crate::memory_management::Placed;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct Block {
        id: PlacementId,
        tier: TileType,
        address: Option<usize>,
    }

    impl Block {
        fn new(tier: TileType) -> Self {
            Self {
                id: PlacementId::new(),
                tier,
                address: None,
            }
        }
    }

    impl Placed for Block {
        fn placement_id(&self) -> PlacementId {
            self.id
        }

        fn tier(&self) -> TileType {
            self.tier
        }

        fn byte_size(&self) -> usize {
            512
        }

        fn address(&self) -> Option<usize> {
            self.address
        }

        fn bind(&mut self, address: usize) {
            self.address = Some(address);
        }
    }

    fn core(strict: bool) -> AiCore {
        let mut config = GlobalConfig::default();
        config.arena.check_overlap = true;
        config.sync.strict = strict;
        AiCore::from_config(Arc::new(config))
    }

    #[test_log::test]
    fn assign_binds_the_tile() {
        let mut core = core(false);
        let mut block = Block::new(TileType::Mat);
        core.assign(&mut block, 1024).unwrap();

        assert_eq!(core.placement(&block), ByteRange::new(1024, 512));
        assert_eq!(core.arena(TileType::Mat).usage().placements, 1);

        let mut other = Block::new(TileType::Mat);
        assert!(core.assign(&mut other, 1280).is_err());
        core.release(&block);
        assert!(core.assign(&mut other, 1280).is_ok());
    }

    #[test_log::test]
    #[should_panic]
    fn unassigned_tile_panics() {
        core(false).placement(&Block::new(TileType::Left));
    }

    #[test_log::test]
    fn arenas_mut_splits_both_ways() {
        let mut core = core(false);
        core.arena_mut(TileType::Acc).fill_bytes(7);

        let (dst, src) = core.arenas_mut(TileType::Mat, TileType::Acc);
        dst.bytes_mut()[0] = src.bytes()[0];
        let (dst, src) = core.arenas_mut(TileType::Acc, TileType::Mat);
        assert_eq!(src.bytes()[0], 7);
        assert_eq!(dst.tier(), TileType::Acc);
    }

    #[test_log::test]
    fn finish_reports_missing_waits() {
        let mut core = core(false);
        let _flag = core.set_flag(Pipe::Mte2, Pipe::Mte1, EventId::new(0));

        assert!(matches!(core.finish(), Err(SyncError::UnawaitedFlags { .. })));
    }

    #[test_log::test]
    fn finish_returns_the_trace() {
        let mut core = core(false);
        let flag = core.set_flag(Pipe::Mte2, Pipe::Mte1, EventId::new(0));
        core.wait_flag(flag);
        core.pipe_barrier(Pipe::All);

        let report = core.finish().unwrap();
        assert_eq!(report.trace.len(), 3);
        assert_eq!(report.usage.len(), TileType::COUNT);
    }

    #[test_log::test]
    #[should_panic(expected = "strict synchronization")]
    fn strict_mode_panics_on_hazard() {
        let mut core = core(true);
        let range = ByteRange::new(0, 64);
        core.access(Pipe::Mte2, AccessKind::Write, TileType::Mat, range);
        core.access(Pipe::Mte1, AccessKind::Read, TileType::Mat, range);
    }
}
