use derive_more::Display;

/// The on-chip tier a tile lives in.
///
/// Each tier is a fixed-capacity scratch memory sitting between the off-chip global memory
/// and a compute unit.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum TileType {
    /// Vector work buffer, read and written by the vector unit.
    #[display("vec")]
    Vec,
    /// Staging buffer (L1) between global memory and the operand tiers.
    #[display("mat")]
    Mat,
    /// Left operand buffer (L0A) of the cube unit.
    #[display("left")]
    Left,
    /// Right operand buffer (L0B) of the cube unit.
    #[display("right")]
    Right,
    /// Accumulator buffer (L0C) of the cube unit.
    #[display("acc")]
    Acc,
    /// Bias table of the cube unit.
    #[display("bias")]
    Bias,
    /// Fixpipe buffer holding per-channel quantization scales.
    #[display("scaling")]
    Scaling,
}

impl TileType {
    /// Number of tiers.
    pub const COUNT: usize = 7;

    /// Every tier, ordered by [index](Self::index).
    pub const ALL: [TileType; Self::COUNT] = [
        TileType::Vec,
        TileType::Mat,
        TileType::Left,
        TileType::Right,
        TileType::Acc,
        TileType::Bias,
        TileType::Scaling,
    ];

    /// Dense index of the tier.
    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Whether the tier feeds the cube unit as an operand.
    pub const fn is_operand(&self) -> bool {
        matches!(self, TileType::Left | TileType::Right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_follow_declaration_order() {
        for (i, tier) in TileType::ALL.iter().enumerate() {
            assert_eq!(tier.index(), i);
        }
    }
}
