use derive_more::Display;
use tilecl_common::{TileType, hardware::EVENT_ID_COUNT};

/// A functional unit of the core, each with its own in-order instruction stream.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pipe {
    /// Scalar unit, issues every other instruction.
    #[display("S")]
    S,
    /// Vector unit.
    #[display("V")]
    V,
    /// Cube (matrix multiply) unit.
    #[display("M")]
    M,
    /// Staging tier to operand tiers.
    #[display("MTE1")]
    Mte1,
    /// Global memory to staging and vector tiers.
    #[display("MTE2")]
    Mte2,
    /// Vector and staging tiers to global memory.
    #[display("MTE3")]
    Mte3,
    /// Accumulator write-back.
    #[display("FIX")]
    Fix,
    /// Every pipe, only meaningful for barriers.
    #[display("ALL")]
    All,
}

impl Pipe {
    /// The pipes that issue instructions.
    pub const UNITS: [Pipe; 7] = [
        Pipe::S,
        Pipe::V,
        Pipe::M,
        Pipe::Mte1,
        Pipe::Mte2,
        Pipe::Mte3,
        Pipe::Fix,
    ];

    /// Bit of the pipe in a visibility mask, every bit for [Pipe::All].
    pub const fn mask(&self) -> u8 {
        match self {
            Pipe::All => 0x7f,
            pipe => 1 << (*pipe as u8),
        }
    }

    /// The pipe executing a movement from `src` to `dst`, `None` when no hardware path exists.
    pub const fn route(dst: Endpoint, src: Endpoint) -> Option<Pipe> {
        match (dst, src) {
            (Endpoint::Tier(TileType::Mat | TileType::Vec), Endpoint::Global) => Some(Pipe::Mte2),
            (
                Endpoint::Tier(
                    TileType::Left | TileType::Right | TileType::Bias | TileType::Scaling,
                ),
                Endpoint::Tier(TileType::Mat),
            ) => Some(Pipe::Mte1),
            (
                Endpoint::Global | Endpoint::Tier(TileType::Mat | TileType::Vec),
                Endpoint::Tier(TileType::Acc),
            ) => Some(Pipe::Fix),
            (Endpoint::Tier(TileType::Vec), Endpoint::Tier(TileType::Vec)) => Some(Pipe::V),
            (Endpoint::Global, Endpoint::Tier(TileType::Mat | TileType::Vec)) => Some(Pipe::Mte3),
            _ => None,
        }
    }
}

/// One end of a movement.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Off-chip global memory.
    #[display("gm")]
    Global,
    /// An on-chip tier.
    #[display("{_0}")]
    Tier(TileType),
}

/// Identifies a handshake between a pair of pipes.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[display("EVENT_ID{_0}")]
pub struct EventId(u8);

impl EventId {
    /// Create an event id.
    ///
    /// # Panics
    ///
    /// If `id` isn't below the number of hardware events.
    pub fn new(id: u8) -> Self {
        crate::kernel_assert!(
            id < EVENT_ID_COUNT,
            "Event id {id} is out of range, the core has {EVENT_ID_COUNT} events"
        );
        Self(id)
    }

    /// The raw id.
    pub fn value(&self) -> u8 {
        self.0
    }
}
