use half::f16;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tilecl::prelude::*;

fn core() -> AiCore {
    AiCore::from_config(Arc::new(GlobalConfig::default()))
}

fn lhs(row: usize, col: usize) -> f32 {
    ((row * 7 + col * 3) % 11) as f32 - 5.0
}

fn rhs(row: usize, col: usize) -> f32 {
    ((row * 5 + col) % 9) as f32 * 0.25 - 1.0
}

/// A 64 × 128 left matrix and a 32 × 64 right matrix, the second one multiplied as its
/// transpose.
fn operands() -> (Vec<f16>, Vec<f16>) {
    let a = (0..64 * 128).map(|i| f16::from_f32(lhs(i / 128, i % 128))).collect();
    let b = (0..32 * 64).map(|i| f16::from_f32(rhs(i / 64, i % 64))).collect();
    (a, b)
}

fn reference() -> Vec<f32> {
    (0..32 * 32)
        .map(|i| {
            let (m, n) = (i / 32, i % 32);
            (0..64).map(|k| lhs(16 + m, 32 + k) * rhs(n, k)).sum()
        })
        .collect()
}

fn handshake(core: &mut AiCore, src: Pipe, dst: Pipe, event: u8) {
    let flag = core.set_flag(src, dst, EventId::new(event));
    core.wait_flag(flag);
}

#[test_log::test]
fn staged_matmul_matches_the_reference() {
    let mut core = core();
    let (a, b) = operands();

    let gm_a = GlobalTensor::<f16, _, _, _, Nd>::new(
        a.as_slice(),
        StaticShape2D::<64, 128>::new([]),
        StaticStride2D::<128, 1>::new([]),
    );
    // The 32 × 64 right matrix read as its 64 × 32 transpose.
    let gm_b = GlobalTensor::<f16, _, _, _, Dn>::new(
        b.as_slice(),
        StaticShape2D::<64, 32>::new([]),
        StaticStride2D::<1, 64>::new([]),
    );

    let mut staged_a = TileMatNz::<f16, 64, 128>::new();
    let mut staged_b = TileMatZn::<f16, 64, 32>::new();
    let mut left = TileLeft::<f16, 32, 64>::new();
    let mut right = TileRight::<f16, 64, 32>::new();
    let mut acc = TileAcc::<f32, 32, 32>::new();
    core.assign(&mut staged_a, 0).unwrap();
    core.assign(&mut staged_b, 64 * 128 * 2).unwrap();
    core.assign(&mut left, 0).unwrap();
    core.assign(&mut right, 0).unwrap();
    core.assign(&mut acc, 0).unwrap();

    load(&mut core, &staged_a, &gm_a);
    load(&mut core, &staged_b, &gm_b);
    handshake(&mut core, Pipe::Mte2, Pipe::Mte1, 0);

    extract(&mut core, &left, &staged_a, 16, 32);
    extract(&mut core, &right, &staged_b, 0, 0);
    handshake(&mut core, Pipe::Mte1, Pipe::M, 0);

    mmad(&mut core, &acc, &left, &right, AccInit::Zero);
    handshake(&mut core, Pipe::M, Pipe::Fix, 0);

    let mut gm_c = GlobalTensor::<f32, _, _, _, Nd>::new(
        vec![0.0f32; 32 * 32],
        StaticShape2D::<32, 32>::new([]),
        StaticStride2D::<32, 1>::new([]),
    );
    store_acc(&mut core, &mut gm_c, &acc);

    assert_eq!(gm_c.into_inner(), reference());

    let report = core.finish().unwrap();
    let mmads: Vec<_> = report.trace.on_pipe(Pipe::M).collect();
    assert_eq!(mmads.len(), 1);
}

#[test_log::test]
fn missing_handshakes_are_reported_when_the_kernel_finishes() {
    let mut core = core();
    let (a, _) = operands();

    let gm_a = GlobalTensor::<f16, _, _, _, Nd>::new(
        a.as_slice(),
        StaticShape2D::<64, 128>::new([]),
        StaticStride2D::<128, 1>::new([]),
    );
    let mut staged = TileMatNz::<f16, 64, 128>::new();
    let mut left = TileLeft::<f16, 32, 64>::new();
    core.assign(&mut staged, 0).unwrap();
    core.assign(&mut left, 0).unwrap();

    load(&mut core, &staged, &gm_a);
    extract(&mut core, &left, &staged, 0, 0);

    // Values are still produced in program order.
    assert_eq!(left.get(&core, 3, 5), f16::from_f32(lhs(3, 5)));
    assert_eq!(core.hazards().len(), 1);

    match core.finish() {
        Err(tilecl::runtime::sync::SyncError::Hazards { hazards }) => {
            assert!(matches!(
                hazards[0],
                tilecl::runtime::sync::Hazard::Unordered {
                    tier: TileType::Mat,
                    earlier_pipe: Pipe::Mte2,
                    later_pipe: Pipe::Mte1,
                    ..
                }
            ));
        }
        other => panic!("Expected a hazard, got {other:?}"),
    }
}

#[test_log::test]
fn flags_must_be_awaited() {
    let mut core = core();
    let _flag = core.set_flag(Pipe::Mte2, Pipe::Mte1, EventId::new(2));

    match core.finish() {
        Err(tilecl::runtime::sync::SyncError::UnawaitedFlags { flags }) => {
            assert_eq!(flags.len(), 1);
            assert_eq!(flags[0].event, EventId::new(2));
        }
        other => panic!("Expected an unawaited flag, got {other:?}"),
    }
}

#[test_log::test]
fn atomic_stores_accumulate_partial_products() {
    let mut core = core();
    let mut left = TileLeft::<f32, 16, 8>::new();
    let mut right = TileRight::<f32, 8, 16>::new();
    let mut acc = TileAcc::<f32, 16, 16>::new();
    core.assign(&mut left, 0).unwrap();
    core.assign(&mut right, 0).unwrap();
    core.assign(&mut acc, 0).unwrap();
    left.copy_from_slice(&mut core, &[2.0; 128]);
    right.copy_from_slice(&mut core, &[0.5; 128]);

    mmad(&mut core, &acc, &left, &right, AccInit::Zero);
    handshake(&mut core, Pipe::M, Pipe::Fix, 1);

    let mut dst = GlobalTensor::<f32, _, _, _, Nd>::new(
        vec![1.5f32; 256],
        StaticShape2D::<16, 16>::new([]),
        StaticStride2D::<16, 1>::new([]),
    );
    store_acc_with(&mut core, &mut dst, &acc, FixpipeParams::default().with_atomic());

    assert_eq!(dst.into_inner(), vec![1.5 + 8.0; 256]);
    core.finish().unwrap();
}
