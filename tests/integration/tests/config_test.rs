//! Configuration loading tests
//!
//! Environment overrides mutate process state, so these run serially. They
//! start from defaults rather than `Config::load()` so the host's own config
//! file plays no part.

use anyhow::Result;
use flipbook::player::PlaybackMode;
use flipbook::{BufferMeasure, Config, RenderStrategy};
use serial_test::serial;

#[test]
#[serial]
fn test_env_overrides_defaults() -> Result<()> {
    std::env::set_var("FLIPBOOK_RENDER_WIDTH", "320");
    std::env::set_var("FLIPBOOK_POLL_INTERVAL_MS", "150");
    let mut config = Config::default();
    let applied = config.apply_env_overrides();
    std::env::remove_var("FLIPBOOK_RENDER_WIDTH");
    std::env::remove_var("FLIPBOOK_POLL_INTERVAL_MS");

    applied?;
    config.validate()?;
    assert_eq!(config.render.width, 320);
    assert_eq!(config.render.height, 360);
    assert_eq!(config.buffering.poll_interval_ms, 150);
    Ok(())
}

#[test]
#[serial]
fn test_invalid_env_override_rejected() {
    std::env::set_var("FLIPBOOK_FALLBACK_FPS", "fast");
    let result = Config::default().apply_env_overrides();
    std::env::remove_var("FLIPBOOK_FALLBACK_FPS");

    assert!(result.is_err());
}

#[test]
fn test_config_file_sections() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[render]
width = 800
height = 450
strategy = "refresh-driven"

[buffering]
measure = "contiguous-from-start"
ready_threshold = 95

[extract]
target_fps = 12.0
loop_playback = true

[general]
mode = "extract"
"#,
    )?;

    let config = Config::load_from_file(&path)?;
    config.validate()?;

    assert_eq!((config.render.width, config.render.height), (800, 450));
    assert_eq!(config.render.strategy, RenderStrategy::RefreshDriven);
    assert_eq!(config.buffering.measure, BufferMeasure::ContiguousFromStart);
    assert_eq!(config.buffering.ready_threshold, 95);
    assert_eq!(config.extract.target_fps, Some(12.0));
    assert!(config.extract.loop_playback);
    assert_eq!(config.general.mode, PlaybackMode::Extract);
    assert_eq!(config.buffering.poll_interval_ms, 300);
    Ok(())
}
