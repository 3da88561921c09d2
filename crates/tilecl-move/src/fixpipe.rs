use alloc::vec::Vec;
use tilecl_common::{
    Element, QuantFamily, QuantMode, ReluMode, TileType, decode_scale, quant_mode,
};
use tilecl_core::TileScaling;
use tilecl_runtime::{
    AiCore, kernel_assert, kernel_panic,
    memory_management::ByteRange,
    sync::{AccessKind, Endpoint, Pipe},
    trace::Instr,
};

/// Scale applied when accumulator values leave the cube unit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FixpipeQuant {
    /// Plain type conversion.
    #[default]
    Cast,
    /// Every value is multiplied by the same scale.
    Scalar(f32),
    /// Column `c` is multiplied by entry `c` of a scaling tile.
    Vector {
        /// Byte address of the scales in the scaling tier.
        address: usize,
        /// Number of scales.
        len: usize,
    },
}

impl FixpipeQuant {
    /// Per-column scales read from `scales`, which must be assigned.
    pub fn vector<const COLS: usize>(core: &AiCore, scales: &TileScaling<COLS>) -> Self {
        let range = core.placement(scales);
        FixpipeQuant::Vector {
            address: range.offset,
            len: COLS,
        }
    }

    /// The family of the quantization mode used.
    pub fn family(&self) -> QuantFamily {
        match self {
            FixpipeQuant::Cast => QuantFamily::Cast,
            FixpipeQuant::Scalar(_) => QuantFamily::Scalar,
            FixpipeQuant::Vector { .. } => QuantFamily::Vector,
        }
    }
}

/// Options of an accumulator write-back.
#[derive(new, Debug, Clone, Copy, PartialEq, Default)]
pub struct FixpipeParams {
    /// Conversion of the values.
    pub quant: FixpipeQuant,
    /// Activation applied before the conversion.
    pub relu: ReluMode,
    /// Add the values to the destination, only for global memory.
    pub atomic: bool,
}

impl FixpipeParams {
    /// Write-back with the given conversion.
    pub fn quant(quant: FixpipeQuant) -> Self {
        Self {
            quant,
            ..Default::default()
        }
    }

    /// Clamp negative values to zero before the conversion.
    pub fn with_relu(mut self) -> Self {
        self.relu = ReluMode::NormalRelu;
        self
    }

    /// Add the values to the destination.
    pub fn with_atomic(mut self) -> Self {
        self.atomic = true;
        self
    }
}

enum Scales {
    Uniform(f32),
    PerColumn(Vec<f32>),
}

/// A configured fixpipe converting accumulator values of type `S` into `D`.
pub(crate) struct Fixpipe {
    mode: QuantMode,
    relu: ReluMode,
    scales: Scales,
    atomic: bool,
}

impl Fixpipe {
    /// Configure the fixpipe for `cols` output columns, reading the vector scales if any.
    ///
    /// # Panics
    ///
    /// If the conversion isn't supported between the two types, or an atomic write-back
    /// targets a type without atomic add.
    pub fn configure<S: Element, D: Element>(
        core: &mut AiCore,
        pipe: Pipe,
        params: &FixpipeParams,
        cols: usize,
    ) -> Self {
        let family = params.quant.family();
        let Some(mode) = quant_mode(family, S::ELEM, D::ELEM) else {
            kernel_panic!(
                "The fixpipe has no {family} conversion from {} to {}",
                S::ELEM,
                D::ELEM
            )
        };
        kernel_assert!(
            !params.atomic || D::ELEM.supports_atomic_add(),
            "Atomic add isn't supported for {}",
            D::ELEM
        );

        let scales = match params.quant {
            FixpipeQuant::Cast => Scales::Uniform(1.0),
            FixpipeQuant::Scalar(scale) => Scales::Uniform(scale),
            FixpipeQuant::Vector { address, len } => {
                kernel_assert!(len >= cols, "{len} scales can't cover {cols} columns");

                let range = ByteRange::new(address, len * core::mem::size_of::<u64>());
                core.access(pipe, AccessKind::Read, TileType::Scaling, range);
                let entries = core.arena(TileType::Scaling).view::<u64>(address, len);
                Scales::PerColumn(entries.iter().map(|entry| decode_scale(*entry)).collect())
            }
        };

        Self {
            mode,
            relu: params.relu,
            scales,
            atomic: params.atomic,
        }
    }

    /// The instruction writing a `rows × cols` region to `dst`.
    pub fn instr(&self, dst: Endpoint, rows: usize, cols: usize) -> Instr {
        Instr::Fixpipe {
            dst,
            rows,
            cols,
            quant: self.mode,
            relu: self.relu,
            atomic: self.atomic,
        }
    }

    /// Convert the accumulator value of column `col`.
    pub fn convert<S: Element, D: Element>(&self, value: S, col: usize) -> D {
        let value = self.relu.apply(value.to_f64());
        let scale = match &self.scales {
            Scales::Uniform(scale) => *scale,
            Scales::PerColumn(scales) => scales[col],
        };
        self.mode.apply::<D>(value, scale)
    }

    /// Write a converted value, adding it to the destination for atomic write-backs.
    pub fn write<D: Element>(&self, slot: &mut D, value: D) {
        *slot = if self.atomic {
            slot.accumulate(value)
        } else {
            value
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc;
    use half::f16;
    use tilecl_common::encode_scale;
    use tilecl_runtime::config::GlobalConfig;

    fn core() -> AiCore {
        AiCore::from_config(Arc::new(GlobalConfig::default()))
    }

    #[test]
    fn relu_applies_before_the_scale() {
        let mut core = core();
        let params = FixpipeParams::quant(FixpipeQuant::Scalar(-2.0)).with_relu();
        let fixpipe = Fixpipe::configure::<i32, i8>(&mut core, Pipe::Fix, &params, 4);

        assert_eq!(fixpipe.convert::<i32, i8>(-5, 0), 0);
        assert_eq!(fixpipe.convert::<i32, i8>(3, 0), -6);
        assert_eq!(fixpipe.convert::<i32, i8>(100, 0), -128);
    }

    #[test]
    fn vector_scales_come_from_the_scaling_tier() {
        let mut core = core();
        let mut scales = TileScaling::<16>::new();
        core.assign(&mut scales, 128).unwrap();
        let entries = core.arena_mut(TileType::Scaling).view_mut::<u64>(128, 16);
        for (col, entry) in entries.iter_mut().enumerate() {
            *entry = encode_scale(col as f32 * 0.5);
        }

        let params = FixpipeParams::quant(FixpipeQuant::vector(&core, &scales));
        let fixpipe = Fixpipe::configure::<f32, f16>(&mut core, Pipe::Fix, &params, 16);

        assert_eq!(fixpipe.convert::<f32, f16>(3.0, 4), f16::from_f32(6.0));
        assert!(matches!(
            fixpipe.instr(Endpoint::Global, 1, 16),
            Instr::Fixpipe { quant: QuantMode::VQF322F16_PRE, .. }
        ));
    }

    #[test]
    #[should_panic(expected = "no Cast conversion")]
    fn unsupported_conversions_panic() {
        Fixpipe::configure::<i32, f16>(&mut core(), Pipe::Fix, &FixpipeParams::default(), 1);
    }

    #[test]
    fn atomic_writes_accumulate() {
        let mut core = core();
        let params = FixpipeParams::default().with_atomic();
        let fixpipe = Fixpipe::configure::<f32, f32>(&mut core, Pipe::Fix, &params, 1);

        let mut slot = 1.5f32;
        fixpipe.write(&mut slot, 2.0);
        assert_eq!(slot, 3.5);
    }
}
