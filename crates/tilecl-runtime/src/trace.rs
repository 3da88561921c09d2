use crate::sync::{Endpoint, EventId, Pipe};
use alloc::vec::Vec;
use derive_more::Display;
use tilecl_common::{QuantMode, ReluMode, TileType};

/// Mode of a vector copy.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VecCopyMode {
    /// Repeat count mode, each repeat moves a full vector.
    #[display("norm")]
    Norm,
    /// Element count mode, the last repeat may be partial.
    #[display("count")]
    Count,
}

/// A hardware instruction issued by an engine.
///
/// Burst lengths, gaps and strides are in bytes unless stated otherwise.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum Instr {
    /// Strided transfer from global memory.
    #[display(
        "copy_gm_to_{tier} n_burst={n_burst} len_burst={len_burst} src_gap={src_gap} dst_gap={dst_gap}"
    )]
    GmToTier {
        /// Destination tier.
        tier: TileType,
        /// Number of bursts.
        n_burst: usize,
        /// Bytes per burst.
        len_burst: usize,
        /// Bytes skipped in global memory between bursts.
        src_gap: usize,
        /// Bytes skipped in the tier between bursts.
        dst_gap: usize,
    },
    /// Transfer from a row-major tensor into a block column-major tile.
    #[display("copy_gm_to_{tier}_nd2nz nd_num={nd_num} n_value={n_value} d_value={d_value}")]
    Nd2Nz {
        /// Destination tier.
        tier: TileType,
        /// Number of matrices moved.
        nd_num: usize,
        /// Rows per matrix.
        n_value: usize,
        /// Columns per matrix.
        d_value: usize,
    },
    /// Transfer from a column-major tensor into a block row-major tile.
    #[display("copy_gm_to_{tier}_dn2zn dn_num={dn_num} n_value={n_value} d_value={d_value}")]
    Dn2Zn {
        /// Destination tier.
        tier: TileType,
        /// Number of matrices moved.
        dn_num: usize,
        /// Columns per matrix.
        n_value: usize,
        /// Rows per matrix.
        d_value: usize,
    },
    /// Block load of whole fractals into an operand tier.
    #[display("load_2d_{dst} start={start_index} repeat={repeat} src_stride={src_stride} dst_gap={dst_gap}")]
    Load2d {
        /// Destination tier.
        dst: TileType,
        /// Index of the first source fractal.
        start_index: usize,
        /// Number of fractals moved.
        repeat: usize,
        /// Fractals between two source fractals.
        src_stride: usize,
        /// Fractals skipped in the destination between two fractals.
        dst_gap: usize,
    },
    /// Paired transposing load of 32 × 32 byte squares, used for 1-byte elements.
    #[display(
        "load_2d_transpose_{dst} start={start_index} repeat={repeat} src_stride={src_stride} dst_gap={dst_gap}"
    )]
    Load2dTranspose {
        /// Destination tier.
        dst: TileType,
        /// Index of the first source fractal.
        start_index: usize,
        /// Number of squares moved.
        repeat: usize,
        /// Fractals between two source squares.
        src_stride: usize,
        /// Fractals skipped in the destination between two squares.
        dst_gap: usize,
    },
    /// Wide transposing load of a whole tile.
    #[display("load_3d_{dst} rows={rows} cols={cols} index_row={index_row} index_col={index_col}")]
    Load3d {
        /// Destination tier.
        dst: TileType,
        /// Rows moved.
        rows: usize,
        /// Columns moved.
        cols: usize,
        /// First source row.
        index_row: usize,
        /// First source column.
        index_col: usize,
    },
    /// Strided transfer between two on-chip tiers.
    #[display("copy_{src}_to_{dst} n_burst={n_burst} len_burst={len_burst} src_gap={src_gap} dst_gap={dst_gap}")]
    TierBurst {
        /// Source tier.
        src: TileType,
        /// Destination tier.
        dst: TileType,
        /// Number of bursts.
        n_burst: usize,
        /// Bytes per burst.
        len_burst: usize,
        /// Bytes skipped in the source between bursts.
        src_gap: usize,
        /// Bytes skipped in the destination between bursts.
        dst_gap: usize,
    },
    /// Vector copy inside the vector tier.
    #[display("vcopy mode={mode} repeat={repeat} count={count}")]
    VecCopy {
        /// Repeat or count mode.
        mode: VecCopyMode,
        /// Repeats issued.
        repeat: usize,
        /// Elements moved.
        count: usize,
    },
    /// Accumulator write-back through the fixpipe.
    #[display("fixpipe_{dst} rows={rows} cols={cols} quant={quant} relu={relu} atomic={atomic}")]
    Fixpipe {
        /// Destination of the write-back.
        dst: Endpoint,
        /// Rows written.
        rows: usize,
        /// Columns written.
        cols: usize,
        /// Conversion applied to the values.
        quant: QuantMode,
        /// Activation applied before the conversion.
        relu: ReluMode,
        /// Whether values are added to the destination.
        atomic: bool,
    },
    /// Strided transfer to global memory.
    #[display(
        "copy_{tier}_to_gm n_burst={n_burst} len_burst={len_burst} src_gap={src_gap} dst_gap={dst_gap} atomic={atomic}"
    )]
    TierToGm {
        /// Source tier.
        tier: TileType,
        /// Number of bursts.
        n_burst: usize,
        /// Bytes per burst.
        len_burst: usize,
        /// Bytes skipped in the tier between bursts.
        src_gap: usize,
        /// Bytes skipped in global memory between bursts.
        dst_gap: usize,
        /// Whether values are added to the destination.
        atomic: bool,
    },
    /// Matrix multiply on the cube unit.
    #[display("mmad m={m} k={k} n={n} init={init}")]
    Mmad {
        /// Rows of the result.
        m: usize,
        /// Reduction size.
        k: usize,
        /// Columns of the result.
        n: usize,
        /// Whether the accumulator is initialized rather than accumulated into.
        init: bool,
    },
    /// Handshake set.
    #[display("set_flag {src} -> {dst} {event}")]
    SetFlag {
        /// Pipe setting the flag.
        src: Pipe,
        /// Pipe waiting on it.
        dst: Pipe,
        /// Event of the flag.
        event: EventId,
    },
    /// Handshake wait.
    #[display("wait_flag {src} -> {dst} {event}")]
    WaitFlag {
        /// Pipe that set the flag.
        src: Pipe,
        /// Pipe waiting on it.
        dst: Pipe,
        /// Event of the flag.
        event: EventId,
    },
    /// Pipe barrier.
    #[display("pipe_barrier {_0}")]
    Barrier(Pipe),
}

/// An instruction with the pipe it was issued on.
#[derive(new, Debug, Display, Clone, PartialEq)]
#[display("[{pipe}] {instr}")]
pub struct Issued {
    /// The issuing pipe.
    pub pipe: Pipe,
    /// The instruction.
    pub instr: Instr,
}

/// The instructions issued by a core, in program order.
#[derive(Debug, Clone, Default)]
pub struct InstructionTrace {
    entries: Vec<Issued>,
}

impl InstructionTrace {
    /// Append an instruction.
    pub fn push(&mut self, issued: Issued) {
        self.entries.push(issued);
    }

    /// Every recorded instruction.
    pub fn iter(&self) -> impl Iterator<Item = &Issued> {
        self.entries.iter()
    }

    /// Instructions issued on `pipe`.
    pub fn on_pipe(&self, pipe: Pipe) -> impl Iterator<Item = &Instr> {
        self.entries
            .iter()
            .filter(move |issued| issued.pipe == pipe)
            .map(|issued| &issued.instr)
    }

    /// Number of recorded instructions matching `predicate`.
    pub fn count<F: Fn(&Instr) -> bool>(&self, predicate: F) -> usize {
        self.entries.iter().filter(|issued| predicate(&issued.instr)).count()
    }

    /// Number of recorded instructions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every recorded instruction.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
