use crate::Element;
use derive_more::Display;

/// The value written in the part of a tile that lies outside its valid extent.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum PadValue {
    /// The pad region is left untouched.
    #[default]
    Null,
    /// The pad region is zeroed.
    Zero,
    /// The pad region holds the smallest value of the type (`-inf` for floats).
    Min,
    /// The pad region holds the largest value of the type (`+inf` for floats).
    Max,
}

impl PadValue {
    /// The pad value for the element type, `None` when nothing has to be written.
    pub fn value<E: Element>(&self) -> Option<E> {
        match self {
            PadValue::Null => None,
            PadValue::Zero => Some(bytemuck::Zeroable::zeroed()),
            PadValue::Min => Some(E::MIN_VALUE),
            PadValue::Max => Some(E::MAX_VALUE),
        }
    }
}

/// Type-level pad policy of a tile.
pub trait PadPolicy: Send + Sync + 'static {
    /// The pad value selected by the policy.
    const VALUE: PadValue;
}

macro_rules! pad_policy {
    ($name:ident, $value:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl PadPolicy for $name {
            const VALUE: PadValue = $value;
        }
    };
}

pad_policy!(PadNull, PadValue::Null, "Leave the pad region untouched.");
pad_policy!(PadZero, PadValue::Zero, "Fill the pad region with zeros.");
pad_policy!(PadMin, PadValue::Min, "Fill the pad region with the type minimum.");
pad_policy!(PadMax, PadValue::Max, "Fill the pad region with the type maximum.");
