use half::f16;
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::sync::Arc;
use tilecl::prelude::*;
use tilecl::runtime::memory_management::ArenaError;

fn with_env<R>(key: &str, value: &str, f: impl FnOnce() -> R) -> R {
    // SAFETY: every test touching the environment is serial.
    unsafe { std::env::set_var(key, value) };
    let result = f();
    unsafe { std::env::remove_var(key) };
    result
}

#[test_log::test]
#[serial]
fn environment_overrides_the_file() {
    let config = GlobalConfig::from_toml("[sync]\nstrict = false\n").unwrap();
    let config = with_env("TILECL_STRICT_SYNC", "1", || config.override_from_env());
    assert!(config.sync.strict);

    let config = with_env("TILECL_TRACE", "false", || config.override_from_env());
    assert!(!config.movement.trace);
}

#[test_log::test]
#[serial]
fn disabled_traces_stay_empty() {
    let mut config = GlobalConfig::default();
    config.movement.trace = false;
    let mut core = AiCore::from_config(Arc::new(config));

    let _ = core.set_flag(Pipe::Mte2, Pipe::Mte1, EventId::new(0));

    assert_eq!(core.trace().len(), 0);
}

#[test_log::test]
#[serial]
#[should_panic(expected = "strict synchronization")]
fn strict_mode_panics_on_the_first_hazard() {
    let config = with_env("TILECL_STRICT_SYNC", "true", || {
        GlobalConfig::default().override_from_env()
    });
    let mut core = AiCore::from_config(Arc::new(config));

    let source = vec![1.0f32; 16 * 16];
    let gm = GlobalTensor::<f32, _, _, _, Nd>::new(
        source.as_slice(),
        StaticShape2D::<16, 16>::new([]),
        StaticStride2D::<16, 1>::new([]),
    );
    let mut staged = TileMatNz::<f32, 16, 16>::new();
    let mut left = TileLeft::<f32, 16, 16>::new();
    core.assign(&mut staged, 0).unwrap();
    core.assign(&mut left, 0).unwrap();

    load(&mut core, &staged, &gm);
    extract(&mut core, &left, &staged, 0, 0);
}

#[test_log::test]
#[serial]
fn small_tiers_reject_large_tiles() {
    let config = GlobalConfig::from_toml("[arena]\nleft = 4096\ncheck_overlap = true\n").unwrap();
    let mut core = AiCore::from_config(Arc::new(config));

    let mut left = TileLeft::<f16, 64, 64>::new();
    assert!(matches!(
        core.assign(&mut left, 0),
        Err(ArenaError::OutOfBounds { capacity: 4096, .. })
    ));

    let mut first = TileLeft::<f16, 32, 32>::new();
    let mut second = TileLeft::<f16, 32, 32>::new();
    core.assign(&mut first, 0).unwrap();
    assert!(matches!(
        core.assign(&mut second, 1024),
        Err(ArenaError::Overlap { .. })
    ));
    core.release(&first);
    core.assign(&mut second, 1024).unwrap();
}

#[test_log::test]
#[serial]
fn the_global_configuration_is_set_once() {
    let mut config = GlobalConfig::default();
    config.arena.bias = 2048;
    GlobalConfig::set(config);

    let core = AiCore::new();
    assert_eq!(core.arena(TileType::Bias).capacity(), 2048);
    assert!(std::panic::catch_unwind(|| GlobalConfig::set(GlobalConfig::default())).is_err());
}
