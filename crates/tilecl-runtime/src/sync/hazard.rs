use super::{EventId, Flag, Pipe};
use crate::{id::FlagId, memory_management::ByteRange};
use alloc::vec::Vec;
use derive_more::Display;
use hashbrown::HashMap;
use tilecl_common::TileType;

/// Whether an access reads or writes its range.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    /// The range is read.
    #[display("read")]
    Read,
    /// The range is written.
    #[display("write")]
    Write,
}

/// A conflict between pipes that no handshake orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hazard {
    /// Two pipes access overlapping bytes of a tier, at least one of them writing, and the
    /// earlier access was never made visible to the later pipe.
    Unordered {
        /// The tier.
        tier: TileType,
        /// Bytes touched by the earlier access.
        earlier_range: ByteRange,
        /// Pipe of the earlier access.
        earlier_pipe: Pipe,
        /// Kind of the earlier access.
        earlier_kind: AccessKind,
        /// Bytes touched by the later access.
        later_range: ByteRange,
        /// Pipe of the later access.
        later_pipe: Pipe,
        /// Kind of the later access.
        later_kind: AccessKind,
    },
    /// A flag was set again on an event whose previous flag hasn't been awaited.
    FlagReissued {
        /// Pipe setting the flag.
        src: Pipe,
        /// Pipe waiting on the flag.
        dst: Pipe,
        /// The event.
        event: EventId,
    },
}

impl core::fmt::Display for Hazard {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Hazard::Unordered {
                tier,
                earlier_range,
                earlier_pipe,
                earlier_kind,
                later_range,
                later_pipe,
                later_kind,
            } => write!(
                f,
                "{later_pipe} {later_kind} of {tier}{later_range} isn't ordered after \
                 {earlier_pipe} {earlier_kind} of {tier}{earlier_range}"
            ),
            Hazard::FlagReissued { src, dst, event } => {
                write!(f, "Flag {src} -> {dst} ({event}) set again before being awaited")
            }
        }
    }
}

/// A flag that was set and never awaited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnawaitedFlag {
    /// Pipe setting the flag.
    pub src: Pipe,
    /// Pipe that should have waited.
    pub dst: Pipe,
    /// The event.
    pub event: EventId,
}

impl core::fmt::Display for UnawaitedFlag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} -> {} ({})", self.src, self.dst, self.event)
    }
}

/// Synchronization errors reported when a kernel finishes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Accesses of different pipes raced.
    #[error("{} hazard(s) detected between pipes", .hazards.len())]
    Hazards {
        /// Every recorded hazard, in detection order.
        hazards: Vec<Hazard>,
    },
    /// Flags were set without a matching wait.
    #[error("{} flag(s) set and never awaited", .flags.len())]
    UnawaitedFlags {
        /// The flags, ordered by creation.
        flags: Vec<UnawaitedFlag>,
    },
}

#[derive(Debug)]
struct Access {
    seq: u64,
    pipe: Pipe,
    kind: AccessKind,
    tier: TileType,
    range: ByteRange,
    // Pipes that are ordered after this access.
    visible: u8,
}

#[derive(Debug)]
struct PendingFlag {
    src: Pipe,
    dst: Pipe,
    event: EventId,
    observed: Vec<u64>,
}

/// Records the accesses issued by every pipe and the handshakes between them, and finds the
/// accesses that no handshake orders.
///
/// The tracker only observes: it never blocks nor reorders an operation, so a kernel with a
/// missing handshake still runs and produces the values a sequential execution would.
///
/// Every access is checked against the tracked history, which only shrinks when an access
/// becomes visible to every pipe or on a [Pipe::All] barrier. Long kernels without full
/// barriers pay a linear scan per access.
#[derive(Debug, Default)]
pub struct SyncTracker {
    accesses: Vec<Access>,
    next_seq: u64,
    pending: HashMap<FlagId, PendingFlag>,
    hazards: Vec<Hazard>,
}

impl SyncTracker {
    /// Record an access and return the hazards it creates.
    pub fn access(
        &mut self,
        pipe: Pipe,
        kind: AccessKind,
        tier: TileType,
        range: ByteRange,
    ) -> Vec<Hazard> {
        let found: Vec<Hazard> = self
            .accesses
            .iter()
            .filter(|earlier| {
                earlier.tier == tier
                    && earlier.pipe != pipe
                    && (earlier.kind == AccessKind::Write || kind == AccessKind::Write)
                    && earlier.visible & pipe.mask() == 0
                    && earlier.range.overlaps(&range)
            })
            .map(|earlier| Hazard::Unordered {
                tier,
                earlier_range: earlier.range,
                earlier_pipe: earlier.pipe,
                earlier_kind: earlier.kind,
                later_range: range,
                later_pipe: pipe,
                later_kind: kind,
            })
            .collect();

        self.accesses.push(Access {
            seq: self.next_seq,
            pipe,
            kind,
            tier,
            range,
            visible: pipe.mask(),
        });
        self.next_seq += 1;
        self.hazards.extend(found.iter().cloned());

        found
    }

    /// Snapshot the accesses visible to `src` into a new flag.
    pub fn set_flag(&mut self, src: Pipe, dst: Pipe, event: EventId) -> (Flag, Option<Hazard>) {
        let reissued = self
            .pending
            .values()
            .any(|flag| flag.src == src && flag.dst == dst && flag.event == event)
            .then_some(Hazard::FlagReissued { src, dst, event });
        if let Some(hazard) = &reissued {
            self.hazards.push(hazard.clone());
        }

        let observed = self
            .accesses
            .iter()
            .filter(|access| access.visible & src.mask() != 0)
            .map(|access| access.seq)
            .collect();
        let id = FlagId::new();
        self.pending.insert(
            id,
            PendingFlag {
                src,
                dst,
                event,
                observed,
            },
        );

        (
            Flag {
                id,
                src,
                dst,
                event,
            },
            reissued,
        )
    }

    /// Make the accesses observed by the flag visible to its destination pipe.
    pub fn wait_flag(&mut self, flag: Flag) {
        let Some(pending) = self.pending.remove(&flag.id) else {
            return;
        };

        for seq in pending.observed {
            // Accesses are stored by increasing sequence number; barriers may have dropped some.
            if let Ok(index) = self.accesses.binary_search_by_key(&seq, |access| access.seq) {
                self.accesses[index].visible |= pending.dst.mask();
            }
        }

        // Accesses every pipe is ordered after can't conflict anymore.
        self.accesses.retain(|access| access.visible != Pipe::All.mask());
    }

    /// Record a barrier.
    ///
    /// A barrier on [Pipe::All] drains every pipe, so the tracked history is dropped. A barrier
    /// on a single pipe only orders that pipe against itself, which is already the case.
    pub fn pipe_barrier(&mut self, pipe: Pipe) {
        if pipe == Pipe::All {
            self.accesses.clear();
        }
    }

    /// Every hazard found so far.
    pub fn hazards(&self) -> &[Hazard] {
        &self.hazards
    }

    /// Flags set and not awaited yet, ordered by creation.
    pub fn unawaited(&self) -> Vec<UnawaitedFlag> {
        let mut flags: Vec<_> = self.pending.iter().collect();
        flags.sort_by_key(|(id, _)| **id);
        flags
            .into_iter()
            .map(|(_, flag)| UnawaitedFlag {
                src: flag.src,
                dst: flag.dst,
                event: flag.event,
            })
            .collect()
    }

    /// Consume the tracker, failing when hazards were found or flags left pending.
    pub fn finish(self) -> Result<(), SyncError> {
        if !self.hazards.is_empty() {
            return Err(SyncError::Hazards {
                hazards: self.hazards,
            });
        }
        let flags = self.unawaited();
        if !flags.is_empty() {
            return Err(SyncError::UnawaitedFlags { flags });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANGE: ByteRange = ByteRange {
        offset: 0,
        size: 512,
    };

    #[test]
    fn unordered_read_after_write_is_a_hazard() {
        let mut tracker = SyncTracker::default();
        tracker.access(Pipe::Mte2, AccessKind::Write, TileType::Mat, RANGE);
        let found = tracker.access(Pipe::Mte1, AccessKind::Read, TileType::Mat, RANGE);

        assert_eq!(found.len(), 1);
        assert!(matches!(tracker.finish(), Err(SyncError::Hazards { .. })));
    }

    #[test]
    fn handshake_orders_the_pipes() {
        let mut tracker = SyncTracker::default();
        tracker.access(Pipe::Mte2, AccessKind::Write, TileType::Mat, RANGE);
        let (flag, _) = tracker.set_flag(Pipe::Mte2, Pipe::Mte1, EventId::new(0));
        tracker.wait_flag(flag);

        assert!(tracker.access(Pipe::Mte1, AccessKind::Read, TileType::Mat, RANGE).is_empty());
        assert!(tracker.finish().is_ok());
    }

    #[test]
    fn flag_only_covers_earlier_accesses() {
        let mut tracker = SyncTracker::default();
        let (flag, _) = tracker.set_flag(Pipe::Mte2, Pipe::Mte1, EventId::new(0));
        tracker.access(Pipe::Mte2, AccessKind::Write, TileType::Mat, RANGE);
        tracker.wait_flag(flag);

        assert_eq!(tracker.access(Pipe::Mte1, AccessKind::Read, TileType::Mat, RANGE).len(), 1);
    }

    #[test]
    fn visibility_is_transitive() {
        let mut tracker = SyncTracker::default();
        tracker.access(Pipe::Mte2, AccessKind::Write, TileType::Mat, RANGE);
        let (flag, _) = tracker.set_flag(Pipe::Mte2, Pipe::Mte1, EventId::new(0));
        tracker.wait_flag(flag);
        let (flag, _) = tracker.set_flag(Pipe::Mte1, Pipe::M, EventId::new(1));
        tracker.wait_flag(flag);

        assert!(tracker.access(Pipe::M, AccessKind::Write, TileType::Mat, RANGE).is_empty());
    }

    #[test]
    fn reads_never_conflict_and_disjoint_ranges_never_conflict() {
        let mut tracker = SyncTracker::default();
        tracker.access(Pipe::Mte1, AccessKind::Read, TileType::Mat, RANGE);
        assert!(tracker.access(Pipe::Fix, AccessKind::Read, TileType::Mat, RANGE).is_empty());
        assert!(
            tracker
                .access(Pipe::Fix, AccessKind::Write, TileType::Mat, ByteRange::new(512, 64))
                .is_empty()
        );
        assert!(tracker.access(Pipe::Fix, AccessKind::Write, TileType::Vec, RANGE).is_empty());
    }

    #[test]
    fn barrier_drains_everything() {
        let mut tracker = SyncTracker::default();
        tracker.access(Pipe::Mte2, AccessKind::Write, TileType::Mat, RANGE);
        let (flag, _) = tracker.set_flag(Pipe::Mte2, Pipe::Mte1, EventId::new(2));
        tracker.pipe_barrier(Pipe::All);
        tracker.wait_flag(flag);

        assert!(tracker.access(Pipe::V, AccessKind::Read, TileType::Mat, RANGE).is_empty());
    }

    #[test]
    fn accesses_visible_everywhere_are_dropped() {
        let mut tracker = SyncTracker::default();
        tracker.access(Pipe::Mte2, AccessKind::Write, TileType::Mat, RANGE);
        tracker.access(Pipe::Mte1, AccessKind::Read, TileType::Vec, RANGE);

        let chain = Pipe::UNITS.into_iter().filter(|pipe| *pipe != Pipe::Mte2);
        let mut src = Pipe::Mte2;
        for (event, dst) in chain.enumerate() {
            let (flag, _) = tracker.set_flag(src, dst, EventId::new(event as u8));
            tracker.wait_flag(flag);
            src = dst;
        }

        // The Mte1 read is only ordered before the pipes following Mte1 in the chain.
        assert_eq!(tracker.accesses.len(), 1);
        assert_eq!(tracker.accesses[0].pipe, Pipe::Mte1);
        assert!(tracker.access(Pipe::V, AccessKind::Write, TileType::Mat, RANGE).is_empty());
    }

    #[test]
    fn pending_flags_are_reported() {
        let mut tracker = SyncTracker::default();
        let (first, reissued) = tracker.set_flag(Pipe::Mte2, Pipe::Mte1, EventId::new(3));
        assert!(reissued.is_none());
        let (_second, reissued) = tracker.set_flag(Pipe::Mte2, Pipe::Mte1, EventId::new(3));
        assert!(reissued.is_some());
        tracker.wait_flag(first);

        tracker.hazards.clear();
        let err = tracker.finish().unwrap_err();
        assert_eq!(
            err,
            SyncError::UnawaitedFlags {
                flags: alloc::vec![UnawaitedFlag {
                    src: Pipe::Mte2,
                    dst: Pipe::Mte1,
                    event: EventId::new(3),
                }],
            }
        );
    }
}
