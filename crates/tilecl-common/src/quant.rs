use crate::{Elem, Element, FloatKind, IntKind, UIntKind, round_saturate};
use derive_more::Display;

/// Conversion applied by the fixpipe when accumulator data leaves the cube unit.
///
/// The names follow the hardware mode register: `Q`/`REQ`/`DEQ` modes multiply by a scale
/// first, `V` modes take one scale per output column from the scaling tier.
#[allow(non_camel_case_types, missing_docs)]
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum QuantMode {
    NoQuant,
    F322F16,
    F322BF16,
    QF322B8_PRE,
    QF322F16_PRE,
    QF322BF16_PRE,
    REQ8,
    DEQF16,
    QS322BF16_PRE,
    VQF322B8_PRE,
    VQF322F16_PRE,
    VQF322BF16_PRE,
    VREQ8,
    VDEQF16,
    VQS322BF16_PRE,
}

/// Where the scale of a quantization comes from.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum QuantFamily {
    /// Plain type conversion, no scale.
    Cast,
    /// A single scale for the whole tile.
    Scalar,
    /// One scale per output column.
    Vector,
}

impl QuantMode {
    /// The family of the mode.
    pub const fn family(&self) -> QuantFamily {
        match self {
            QuantMode::NoQuant | QuantMode::F322F16 | QuantMode::F322BF16 => QuantFamily::Cast,
            QuantMode::QF322B8_PRE
            | QuantMode::QF322F16_PRE
            | QuantMode::QF322BF16_PRE
            | QuantMode::REQ8
            | QuantMode::DEQF16
            | QuantMode::QS322BF16_PRE => QuantFamily::Scalar,
            _ => QuantFamily::Vector,
        }
    }

    /// Convert an accumulator value, already widened to `f64`, into the output type.
    ///
    /// The value is multiplied by `scale` (ignored by cast modes). Float outputs round to
    /// nearest even, integer outputs round half to even and saturate.
    pub fn apply<D: Element>(&self, value: f64, scale: f32) -> D {
        match self.family() {
            QuantFamily::Cast => D::from_f64(value),
            QuantFamily::Scalar | QuantFamily::Vector => {
                round_saturate::<D>(value * scale as f64)
            }
        }
    }
}

/// ReLU applied by the fixpipe before quantization.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum ReluMode {
    /// Values pass through.
    #[default]
    NoRelu,
    /// Negative values are clamped to zero.
    NormalRelu,
}

impl ReluMode {
    /// Apply the activation.
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            ReluMode::NoRelu => value,
            ReluMode::NormalRelu => value.max(0.0),
        }
    }
}

const F32: Elem = Elem::Float(FloatKind::F32);
const F16: Elem = Elem::Float(FloatKind::F16);
const BF16: Elem = Elem::Float(FloatKind::BF16);
const I32: Elem = Elem::Int(IntKind::I32);
const I8: Elem = Elem::Int(IntKind::I8);
const U8: Elem = Elem::UInt(UIntKind::U8);

/// Mode of a write-back without scale, `None` when the pair can't be converted.
pub const fn cast_quant_mode(src: Elem, dst: Elem) -> Option<QuantMode> {
    if src.same_as(&dst) && src.is_accumulator_type() {
        return Some(QuantMode::NoQuant);
    }
    if src.same_as(&F32) {
        if dst.same_as(&F16) {
            return Some(QuantMode::F322F16);
        }
        if dst.same_as(&BF16) {
            return Some(QuantMode::F322BF16);
        }
    }
    None
}

/// Mode of a write-back with a single scale, `None` when the pair can't be quantized.
pub const fn scalar_quant_mode(src: Elem, dst: Elem) -> Option<QuantMode> {
    if src.same_as(&F32) {
        if dst.same_as(&I8) || dst.same_as(&U8) {
            return Some(QuantMode::QF322B8_PRE);
        }
        if dst.same_as(&F16) {
            return Some(QuantMode::QF322F16_PRE);
        }
        if dst.same_as(&BF16) {
            return Some(QuantMode::QF322BF16_PRE);
        }
    }
    if src.same_as(&I32) {
        if dst.same_as(&I8) || dst.same_as(&U8) {
            return Some(QuantMode::REQ8);
        }
        if dst.same_as(&F16) {
            return Some(QuantMode::DEQF16);
        }
        if dst.same_as(&BF16) {
            return Some(QuantMode::QS322BF16_PRE);
        }
    }
    None
}

/// Mode of a write-back with per-column scales, `None` when the pair can't be quantized.
pub const fn vector_quant_mode(src: Elem, dst: Elem) -> Option<QuantMode> {
    match scalar_quant_mode(src, dst) {
        Some(QuantMode::QF322B8_PRE) => Some(QuantMode::VQF322B8_PRE),
        Some(QuantMode::QF322F16_PRE) => Some(QuantMode::VQF322F16_PRE),
        Some(QuantMode::QF322BF16_PRE) => Some(QuantMode::VQF322BF16_PRE),
        Some(QuantMode::REQ8) => Some(QuantMode::VREQ8),
        Some(QuantMode::DEQF16) => Some(QuantMode::VDEQF16),
        Some(QuantMode::QS322BF16_PRE) => Some(QuantMode::VQS322BF16_PRE),
        _ => None,
    }
}

/// Mode for the given family, `None` when the pair is unsupported.
pub const fn quant_mode(family: QuantFamily, src: Elem, dst: Elem) -> Option<QuantMode> {
    match family {
        QuantFamily::Cast => cast_quant_mode(src, dst),
        QuantFamily::Scalar => scalar_quant_mode(src, dst),
        QuantFamily::Vector => vector_quant_mode(src, dst),
    }
}

/// Decode the scale stored in a scaling-tier entry: the low 32 bits hold an `f32`.
pub fn decode_scale(entry: u64) -> f32 {
    f32::from_bits(entry as u32)
}

/// Encode a scale into a scaling-tier entry.
pub fn encode_scale(scale: f32) -> u64 {
    scale.to_bits() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use half::f16;

    #[test]
    fn lookup_tables() {
        assert_eq!(cast_quant_mode(F32, F16), Some(QuantMode::F322F16));
        assert_eq!(cast_quant_mode(F32, BF16), Some(QuantMode::F322BF16));
        assert_eq!(cast_quant_mode(F32, F32), Some(QuantMode::NoQuant));
        assert_eq!(cast_quant_mode(I32, I32), Some(QuantMode::NoQuant));
        assert_eq!(cast_quant_mode(I32, F16), None);

        assert_eq!(scalar_quant_mode(F32, U8), Some(QuantMode::QF322B8_PRE));
        assert_eq!(scalar_quant_mode(I32, I8), Some(QuantMode::REQ8));
        assert_eq!(scalar_quant_mode(I32, F16), Some(QuantMode::DEQF16));
        assert_eq!(scalar_quant_mode(I32, BF16), Some(QuantMode::QS322BF16_PRE));
        assert_eq!(scalar_quant_mode(F32, F32), None);

        assert_eq!(vector_quant_mode(I32, U8), Some(QuantMode::VREQ8));
        assert_eq!(vector_quant_mode(F32, BF16), Some(QuantMode::VQF322BF16_PRE));
    }

    #[test]
    fn lookup_is_const() {
        const MODE: Option<QuantMode> = scalar_quant_mode(F32, F16);
        assert_eq!(MODE, Some(QuantMode::QF322F16_PRE));
    }

    #[test]
    fn requantize_saturates() {
        let out: i8 = QuantMode::REQ8.apply(1000.0, 0.5);
        assert_eq!(out, 127);
        let out: i8 = QuantMode::REQ8.apply(-7.0, 0.5);
        assert_eq!(out, -4);
        let out: f16 = QuantMode::DEQF16.apply(3.0, 0.25);
        assert_eq!(out, f16::from_f32(0.75));
        let out: f16 = QuantMode::F322F16.apply(1.5, 100.0);
        assert_eq!(out, f16::from_f32(1.5));
    }

    #[test]
    fn scales_round_trip_through_entries() {
        assert_eq!(decode_scale(encode_scale(0.125)), 0.125);
    }
}
