use tilecl_common::TileType;

/// Type-level tier of a [Tile](crate::Tile).
///
/// Movement operations are implemented per pair of placements, so a movement between tiers
/// without a hardware path doesn't compile.
pub trait Placement: Send + Sync + 'static {
    /// The tier.
    const TYPE: TileType;
}

macro_rules! placement {
    ($name:ident, $ty:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl Placement for $name {
            const TYPE: TileType = $ty;
        }
    };
}

placement!(Mat, TileType::Mat, "Staging tier between global memory and the operand tiers.");
placement!(Left, TileType::Left, "Left operand tier of the cube unit.");
placement!(Right, TileType::Right, "Right operand tier of the cube unit.");
placement!(Acc, TileType::Acc, "Accumulator tier of the cube unit.");
placement!(Bias, TileType::Bias, "Bias table of the cube unit.");
placement!(Scaling, TileType::Scaling, "Per-channel scales of the fixpipe.");
placement!(Vector, TileType::Vec, "Vector work tier.");
