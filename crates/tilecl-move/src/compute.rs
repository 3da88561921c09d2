use crate::engine;
use alloc::vec;
use tilecl_common::{Elem, Element, FloatKind, IntKind, TileType};
use tilecl_core::{Acc, Left, Right, TileBias, TileDesc};
use tilecl_runtime::{
    AiCore, kernel_assert, memory_management::ByteRange, sync::{AccessKind, Pipe}, trace::Instr,
};

/// How the accumulator starts a matrix multiply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccInit {
    /// From zero.
    #[default]
    Zero,
    /// From its current values.
    Accumulate,
    /// From a bias row broadcast over every row.
    Bias {
        /// Byte address of the row in the bias table.
        address: usize,
        /// Entries in the row.
        len: usize,
    },
}

impl AccInit {
    /// Start from the bias row `bias`, which must be assigned.
    pub fn bias<E: Element, const COLS: usize>(core: &AiCore, bias: &TileBias<E, COLS>) -> Self {
        AccInit::Bias {
            address: core.placement(bias).offset,
            len: COLS,
        }
    }
}

/// The cube unit: consumes an operand pair and produces an accumulator tile.
pub trait CubeUnit {
    /// `acc[m][n] = init + Σ_k left[m][k] * right[k][n]` over the valid extents of the
    /// operands.
    fn mmad<C, A, B>(&self, core: &mut AiCore, acc: &C, left: &A, right: &B, init: AccInit)
    where
        C: TileDesc<Placement = Acc>,
        A: TileDesc<Placement = Left>,
        B: TileDesc<Placement = Right>;
}

/// A cube unit computing the product on the host, in `f64`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceCube;

/// Matrix multiply on the [ReferenceCube].
pub fn mmad<C, A, B>(core: &mut AiCore, acc: &C, left: &A, right: &B, init: AccInit)
where
    C: TileDesc<Placement = Acc>,
    A: TileDesc<Placement = Left>,
    B: TileDesc<Placement = Right>,
{
    ReferenceCube.mmad(core, acc, left, right, init);
}

/// Whether the cube unit multiplies `operand` into `acc`.
pub const fn mmad_supported(operand: Elem, acc: Elem) -> bool {
    match operand {
        Elem::Int(IntKind::I8) => acc.same_as(&Elem::Int(IntKind::I32)),
        Elem::Float(FloatKind::F16 | FloatKind::BF16 | FloatKind::F32) => {
            acc.same_as(&Elem::Float(FloatKind::F32))
        }
        _ => false,
    }
}

impl CubeUnit for ReferenceCube {
    fn mmad<C, A, B>(&self, core: &mut AiCore, acc: &C, left: &A, right: &B, init: AccInit)
    where
        C: TileDesc<Placement = Acc>,
        A: TileDesc<Placement = Left>,
        B: TileDesc<Placement = Right>,
    {
        const {
            let operand = <A::Elem as Element>::ELEM;
            assert!(
                operand.same_as(&<B::Elem as Element>::ELEM),
                "Both operands have the same element type"
            );
            assert!(
                mmad_supported(operand, <C::Elem as Element>::ELEM),
                "The cube unit multiplies i8 into i32, and f16, bf16 or f32 into f32"
            );
            assert!(
                A::ROWS <= C::ROWS && B::COLS <= C::COLS,
                "The accumulator can't hold the product"
            );
        }

        let (m, k, n) = (left.valid_rows(), left.valid_cols(), right.valid_cols());
        kernel_assert!(
            right.valid_rows() == k,
            "A {m} × {k} left operand can't multiply a {} × {n} right operand",
            right.valid_rows()
        );

        core.log_movement(&format_args!("mmad {m} × {k} × {n} init={init:?}"));

        let pipe = Pipe::M;
        engine::read(core, pipe, left);
        engine::read(core, pipe, right);
        if init == AccInit::Accumulate {
            engine::read(core, pipe, acc);
        }
        let bias = match init {
            AccInit::Bias { address, len } => {
                kernel_assert!(len >= n, "A bias row of {len} can't cover {n} columns");
                let size = core::mem::size_of::<C::Elem>();
                let range = ByteRange::new(address, len * size);
                core.access(pipe, AccessKind::Read, TileType::Bias, range);
                Some(core.arena(TileType::Bias).view::<C::Elem>(address, len).to_vec())
            }
            _ => None,
        };
        engine::write(core, pipe, acc);
        core.issue(
            pipe,
            Instr::Mmad {
                m,
                k,
                n,
                init: init != AccInit::Accumulate,
            },
        );

        let (lhs, rhs, current) = (left.elements(core), right.elements(core), acc.elements(core));
        let mut sums = vec![0.0; m * n];
        for row in 0..m {
            for col in 0..n {
                let start = match (&bias, init) {
                    (Some(bias), _) => bias[col].to_f64(),
                    (None, AccInit::Accumulate) => current[C::PACKING.offset(row, col)].to_f64(),
                    _ => 0.0,
                };
                sums[row * n + col] = (0..k).fold(start, |sum, i| {
                    sum + lhs[A::PACKING.offset(row, i)].to_f64()
                        * rhs[B::PACKING.offset(i, col)].to_f64()
                });
            }
        }

        let out = acc.elements_mut(core);
        for row in 0..m {
            for col in 0..n {
                out[C::PACKING.offset(row, col)] = C::Elem::from_f64(sums[row * n + col]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::{sync::Arc, vec::Vec};
    use half::f16;
    use pretty_assertions::assert_eq;
    use tilecl_core::{TileAcc, TileLeft, TileRight};
    use tilecl_runtime::config::GlobalConfig;

    fn core() -> AiCore {
        AiCore::from_config(Arc::new(GlobalConfig::default()))
    }

    #[test]
    fn products_match_the_definition() {
        let mut core = core();
        let mut left = TileLeft::<f16, 16, 32>::new();
        let mut right = TileRight::<f16, 32, 16>::new();
        let mut acc = TileAcc::<f32, 16, 16>::new();
        core.assign(&mut left, 0).unwrap();
        core.assign(&mut right, 0).unwrap();
        core.assign(&mut acc, 0).unwrap();

        let a: Vec<f32> = (0..512).map(|i| (i % 7) as f32 - 3.0).collect();
        let b: Vec<f32> = (0..512).map(|i| (i % 5) as f32 * 0.5).collect();
        left.copy_from_slice(&mut core, &a.iter().map(|v| f16::from_f32(*v)).collect::<Vec<_>>());
        right.copy_from_slice(&mut core, &b.iter().map(|v| f16::from_f32(*v)).collect::<Vec<_>>());

        mmad(&mut core, &acc, &left, &right, AccInit::Zero);

        let expected: Vec<f32> = (0..256)
            .map(|i| (0..32).map(|k| a[(i / 16) * 32 + k] * b[k * 16 + i % 16]).sum())
            .collect();
        assert_eq!(acc.to_vec(&core), expected);
        assert_eq!(
            core.trace().on_pipe(Pipe::M).collect::<Vec<_>>(),
            [&Instr::Mmad { m: 16, k: 32, n: 16, init: true }]
        );
    }

    #[test]
    fn integer_products_accumulate() {
        let mut core = core();
        let mut left = TileLeft::<i8, 16, 32>::new();
        let mut right = TileRight::<i8, 32, 16>::new();
        let mut acc = TileAcc::<i32, 16, 16>::new();
        core.assign(&mut left, 0).unwrap();
        core.assign(&mut right, 0).unwrap();
        core.assign(&mut acc, 0).unwrap();
        left.copy_from_slice(&mut core, &[-2; 512]);
        right.copy_from_slice(&mut core, &[3; 512]);
        acc.copy_from_slice(&mut core, &[100; 256]);

        mmad(&mut core, &acc, &left, &right, AccInit::Accumulate);

        assert_eq!(acc.to_vec(&core), [100 - 6 * 32; 256]);
    }

    #[test]
    fn bias_rows_seed_every_row() {
        let mut core = core();
        let mut left = TileLeft::<f32, 16, 8>::new();
        let mut right = TileRight::<f32, 8, 16>::new();
        let mut acc = TileAcc::<f32, 16, 16>::new();
        let mut bias = TileBias::<f32, 16>::new();
        core.assign(&mut left, 0).unwrap();
        core.assign(&mut right, 0).unwrap();
        core.assign(&mut acc, 0).unwrap();
        core.assign(&mut bias, 0).unwrap();
        left.copy_from_slice(&mut core, &[1.0; 128]);
        right.copy_from_slice(&mut core, &[0.5; 128]);
        let row: Vec<f32> = (0..16).map(|col| col as f32).collect();
        bias.copy_from_slice(&mut core, &row);

        let init = AccInit::bias(&core, &bias);
        mmad(&mut core, &acc, &left, &right, init);

        assert_eq!(acc.get(&core, 9, 5), 4.0 + 5.0);
    }

    #[test]
    #[should_panic(expected = "can't multiply")]
    fn reduction_sizes_must_agree() {
        use tilecl_zspace::{Dyn, Full};

        let mut core = core();
        let mut left = TileLeft::<f32, 16, 16, Full, Dyn>::with_valid(Full, Dyn(8));
        let mut right = TileRight::<f32, 16, 16>::new();
        let mut acc = TileAcc::<f32, 16, 16>::new();
        core.assign(&mut left, 0).unwrap();
        core.assign(&mut right, 0).unwrap();
        core.assign(&mut acc, 0).unwrap();

        mmad(&mut core, &acc, &left, &right, AccInit::Zero);
    }
}
