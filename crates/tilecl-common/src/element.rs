use bytemuck::Pod;
use core::fmt::{Debug, Display};
use half::{bf16, f16};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[allow(missing_docs)]
pub enum FloatKind {
    F16,
    BF16,
    F32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[allow(missing_docs)]
pub enum IntKind {
    I8,
    I16,
    I32,
    I64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[allow(missing_docs)]
pub enum UIntKind {
    U8,
    U16,
    U32,
    U64,
}

/// The runtime description of an [element](Element) type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[allow(missing_docs)]
pub enum Elem {
    Float(FloatKind),
    Int(IntKind),
    UInt(UIntKind),
}

impl Elem {
    /// Size of the element in bytes.
    pub const fn size(&self) -> usize {
        match self {
            Elem::Float(FloatKind::F16) | Elem::Float(FloatKind::BF16) => 2,
            Elem::Float(FloatKind::F32) => 4,
            Elem::Int(IntKind::I8) | Elem::UInt(UIntKind::U8) => 1,
            Elem::Int(IntKind::I16) | Elem::UInt(UIntKind::U16) => 2,
            Elem::Int(IntKind::I32) | Elem::UInt(UIntKind::U32) => 4,
            Elem::Int(IntKind::I64) | Elem::UInt(UIntKind::U64) => 8,
        }
    }

    /// Whether the element is a floating point type.
    pub const fn is_float(&self) -> bool {
        matches!(self, Elem::Float(_))
    }

    /// Const equality, usable inside compile-time assertions.
    pub const fn same_as(&self, other: &Elem) -> bool {
        match (self, other) {
            (Elem::Float(a), Elem::Float(b)) => *a as u8 == *b as u8,
            (Elem::Int(a), Elem::Int(b)) => *a as u8 == *b as u8,
            (Elem::UInt(a), Elem::UInt(b)) => *a as u8 == *b as u8,
            _ => false,
        }
    }

    /// Element types a compute-operand tile (left or right) may hold.
    pub const fn is_operand_type(&self) -> bool {
        matches!(
            self,
            Elem::Int(IntKind::I8)
                | Elem::Float(FloatKind::F16)
                | Elem::Float(FloatKind::BF16)
                | Elem::Float(FloatKind::F32)
        )
    }

    /// Element types an accumulator tile may hold.
    pub const fn is_accumulator_type(&self) -> bool {
        matches!(self, Elem::Int(IntKind::I32) | Elem::Float(FloatKind::F32))
    }

    /// Element types the atomic-add write-back supports.
    pub const fn supports_atomic_add(&self) -> bool {
        matches!(
            self,
            Elem::Float(FloatKind::F16)
                | Elem::Float(FloatKind::BF16)
                | Elem::Float(FloatKind::F32)
                | Elem::Int(IntKind::I8)
                | Elem::Int(IntKind::I16)
                | Elem::Int(IntKind::I32)
        )
    }
}

impl Display for Elem {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Elem::Float(kind) => match kind {
                FloatKind::F16 => f.write_str("f16"),
                FloatKind::BF16 => f.write_str("bf16"),
                FloatKind::F32 => f.write_str("f32"),
            },
            Elem::Int(kind) => match kind {
                IntKind::I8 => f.write_str("i8"),
                IntKind::I16 => f.write_str("i16"),
                IntKind::I32 => f.write_str("i32"),
                IntKind::I64 => f.write_str("i64"),
            },
            Elem::UInt(kind) => match kind {
                UIntKind::U8 => f.write_str("u8"),
                UIntKind::U16 => f.write_str("u16"),
                UIntKind::U32 => f.write_str("u32"),
                UIntKind::U64 => f.write_str("u64"),
            },
        }
    }
}

/// A scalar type that can live in a tile or a global tensor.
///
/// Elements are plain old data: tiers store them as raw bytes and reinterpret them with
/// [bytemuck]. Numeric conversions go through `f64`, which is exact for every supported
/// type except 64-bit integers beyond 2^53.
pub trait Element: Pod + Default + PartialEq + Debug + Send + Sync + 'static {
    /// Runtime description of the type.
    const ELEM: Elem;
    /// Smallest value of the type, `-inf` for floats.
    const MIN_VALUE: Self;
    /// Largest value of the type, `+inf` for floats.
    const MAX_VALUE: Self;

    /// Widen to `f64`.
    fn to_f64(self) -> f64;

    /// Narrow from `f64`.
    ///
    /// Floats round to nearest even; integers truncate toward zero and saturate.
    fn from_f64(value: f64) -> Self;

    /// The sum used by atomic-add write-backs.
    ///
    /// Integers wrap, half precision types add in `f32` and round back.
    fn accumulate(self, rhs: Self) -> Self;
}

macro_rules! impl_element_int {
    ($ty:ty, $elem:expr) => {
        impl Element for $ty {
            const ELEM: Elem = $elem;
            const MIN_VALUE: Self = <$ty>::MIN;
            const MAX_VALUE: Self = <$ty>::MAX;

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn from_f64(value: f64) -> Self {
                value as $ty
            }

            fn accumulate(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }
        }
    };
}

impl_element_int!(i8, Elem::Int(IntKind::I8));
impl_element_int!(i16, Elem::Int(IntKind::I16));
impl_element_int!(i32, Elem::Int(IntKind::I32));
impl_element_int!(i64, Elem::Int(IntKind::I64));
impl_element_int!(u8, Elem::UInt(UIntKind::U8));
impl_element_int!(u16, Elem::UInt(UIntKind::U16));
impl_element_int!(u32, Elem::UInt(UIntKind::U32));
impl_element_int!(u64, Elem::UInt(UIntKind::U64));

macro_rules! impl_element_half {
    ($ty:ty, $elem:expr) => {
        impl Element for $ty {
            const ELEM: Elem = $elem;
            const MIN_VALUE: Self = <$ty>::NEG_INFINITY;
            const MAX_VALUE: Self = <$ty>::INFINITY;

            fn to_f64(self) -> f64 {
                self.to_f64()
            }

            fn from_f64(value: f64) -> Self {
                <$ty>::from_f64(value)
            }

            fn accumulate(self, rhs: Self) -> Self {
                <$ty>::from_f32(self.to_f32() + rhs.to_f32())
            }
        }
    };
}

impl_element_half!(f16, Elem::Float(FloatKind::F16));
impl_element_half!(bf16, Elem::Float(FloatKind::BF16));

impl Element for f32 {
    const ELEM: Elem = Elem::Float(FloatKind::F32);
    const MIN_VALUE: Self = f32::NEG_INFINITY;
    const MAX_VALUE: Self = f32::INFINITY;

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn accumulate(self, rhs: Self) -> Self {
        self + rhs
    }
}

/// Round half to even then saturate into the integer type `E`.
///
/// Float targets are narrowed with [Element::from_f64].
pub fn round_saturate<E: Element>(value: f64) -> E {
    if E::ELEM.is_float() {
        return E::from_f64(value);
    }

    let rounded = num_traits::Float::round(value);
    // `round` breaks ties away from zero, move the halfway cases back to the even neighbour.
    let rounded = if num_traits::Float::abs(value - num_traits::Float::trunc(value)) == 0.5
        && rounded % 2.0 != 0.0
    {
        rounded - num_traits::Float::signum(value)
    } else {
        rounded
    };

    let min = E::MIN_VALUE.to_f64();
    let max = E::MAX_VALUE.to_f64();
    E::from_f64(rounded.clamp(min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn elem_sizes_match_rust_types() {
        assert_eq!(<f16 as Element>::ELEM.size(), core::mem::size_of::<f16>());
        assert_eq!(<bf16 as Element>::ELEM.size(), core::mem::size_of::<bf16>());
        assert_eq!(<i8 as Element>::ELEM.size(), 1);
        assert_eq!(<u64 as Element>::ELEM.size(), 8);
        assert_eq!(<f32 as Element>::ELEM.size(), 4);
    }

    #[test]
    fn round_saturate_uses_ties_to_even() {
        assert_eq!(round_saturate::<i8>(2.5), 2);
        assert_eq!(round_saturate::<i8>(3.5), 4);
        assert_eq!(round_saturate::<i8>(-2.5), -2);
        assert_eq!(round_saturate::<i8>(-0.4), 0);
        assert_eq!(round_saturate::<i8>(1000.0), 127);
        assert_eq!(round_saturate::<u8>(-3.0), 0);
        assert_eq!(round_saturate::<u8>(300.7), 255);
    }

    #[test]
    fn half_accumulate_rounds_back() {
        let a = f16::from_f32(1.0);
        let b = f16::from_f32(2.5);
        assert_eq!(a.accumulate(b), f16::from_f32(3.5));
        assert_eq!(i8::MAX.accumulate(1), i8::MIN);
    }

    #[test]
    fn operand_allow_list() {
        assert!(<i8 as Element>::ELEM.is_operand_type());
        assert!(<f16 as Element>::ELEM.is_operand_type());
        assert!(!<i32 as Element>::ELEM.is_operand_type());
        assert!(<i32 as Element>::ELEM.is_accumulator_type());
        assert!(!<u8 as Element>::ELEM.supports_atomic_add());
    }
}
