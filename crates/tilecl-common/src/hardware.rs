//! Addressing and alignment rules of the accelerator.
//!
//! Sizes are in bytes unless the name says otherwise.

/// Granularity of every on-chip address and of a data block.
pub const BLOCK_BYTE_SIZE: usize = 32;

/// Rows of an operand fractal, and both dims of an accumulator fractal.
pub const FRACTAL_NZ_ROW: usize = 16;

/// Bytes of the innermost dimension of a fractal (`C0`).
pub const C0_SIZE_BYTE: usize = 32;

/// Size of a left/right operand fractal.
pub const FRACTAL_AB_SIZE: usize = 512;

/// Size of an accumulator fractal.
pub const FRACTAL_C_SIZE: usize = 1024;

/// Element size required by accumulator fractals.
pub const ACC_ELEM_SIZE: usize = 4;

/// Bytes moved by one repeat of a vector instruction.
pub const REPEAT_BYTE: usize = 256;

/// Largest repeat count a vector instruction can encode.
pub const REPEAT_MAX: usize = 255;

/// Largest burst count of a single DMA instruction.
pub const BURST_MAX: usize = 4095;

/// Required byte alignment of a bias row.
pub const BIAS_ALIGN_BYTE: usize = 64;

/// Required byte alignment of a scaling row.
pub const SCALING_ALIGN_BYTE: usize = 128;

/// Column limit of an accumulator write-back.
pub const ACC_MAX_COLS: usize = 4095;

/// Row limit of an accumulator write-back to an ND tensor.
pub const ACC_ND_MAX_ROWS: usize = 8192;

/// Row limit of an accumulator write-back to an NZ tensor.
pub const ACC_NZ_MAX_ROWS: usize = 65535;

/// Number of event ids available per pipe pair.
pub const EVENT_ID_COUNT: u8 = 8;

/// Elements in the innermost fractal dimension for an element of `elem_size` bytes.
pub const fn c0_elems(elem_size: usize) -> usize {
    C0_SIZE_BYTE / elem_size
}

/// Elements moved by one vector repeat.
pub const fn repeat_elems(elem_size: usize) -> usize {
    REPEAT_BYTE / elem_size
}
