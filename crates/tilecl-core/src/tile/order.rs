use derive_more::Display;

/// Enum for the available orders.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderKind {
    /// Row after row.
    #[display("row-major")]
    RowMajor,
    /// Column after column.
    #[display("col-major")]
    ColMajor,
    /// No inner blocking, only valid as an inner order.
    #[display("none")]
    NoneBox,
}

impl OrderKind {
    /// Const equality, usable inside compile-time assertions.
    pub const fn same_as(&self, other: &OrderKind) -> bool {
        *self as u8 == *other as u8
    }
}

/// Order of the blocks of a tile, or of the elements inside a block.
///
/// With 2 × 2 blocks, the block indices are:
///
/// ```text
///   RowMajor     ColMajor
/// ┌───┬───┐    ┌───┬───┐
/// │ 0 │ 1 │    │ 0 │ 2 │
/// ├───┼───┤    ├───┼───┤
/// │ 2 │ 3 │    │ 1 │ 3 │
/// └───┴───┘    └───┴───┘
/// ```
pub trait TilingOrder: Send + Sync + 'static {
    /// Return the trait value as enum.
    const KIND: OrderKind;
}

/// Rows are contiguous.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowMajor;

/// Columns are contiguous.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColMajor;

/// The tile isn't divided into inner blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoneBox;

impl TilingOrder for RowMajor {
    const KIND: OrderKind = OrderKind::RowMajor;
}

impl TilingOrder for ColMajor {
    const KIND: OrderKind = OrderKind::ColMajor;
}

impl TilingOrder for NoneBox {
    const KIND: OrderKind = OrderKind::NoneBox;
}
