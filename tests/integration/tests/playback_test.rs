//! End-to-end live playback scenarios
//!
//! These tests drive the controller the way an embedding page would:
//! initialize, let the source buffer and play, then pause, hide or reload.

use anyhow::Result;
use flipbook::overlay::{TEXT_BUFFERED, TEXT_MANUAL_START};
use flipbook::player::{PlaybackState, PlayerEvent, StartOutcome};
use flipbook::{Config, FrameRect, MediaElement, RenderStrategy, SyntheticConfig, SyntheticVideo};
use flipbook_integration_tests::{settle, widescreen, TestRig};
use std::time::Duration;

fn manual_start() -> Config {
    let mut config = Config::default();
    config.general.auto_play = false;
    config
}

#[tokio::test(start_paused = true)]
async fn test_fully_buffered_dismisses_overlay_on_first_poll() -> Result<()> {
    let mut rig = TestRig::new(widescreen(), manual_start())?;

    assert_eq!(rig.controller.initialize().await?, StartOutcome::Deferred);
    assert!(rig.controller.overlay().is_visible());

    // First poll lands at 300ms
    settle(Duration::from_millis(350)).await;

    assert!(!rig.controller.overlay().is_visible());
    assert_eq!(rig.count_events(&PlayerEvent::OverlayDismissed), 1);
    assert!(rig.events().contains(&PlayerEvent::BufferingProgress { percent: 100 }));
    assert!(rig.texts().iter().any(|t| t == "Loaded — ready to play"));
    assert!(rig.texts().iter().any(|t| t == TEXT_BUFFERED));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_progress_climbs_while_downloading() -> Result<()> {
    let mut rig = TestRig::new(SyntheticConfig { buffer_rate: 0.5, ..widescreen() }, manual_start())?;
    rig.controller.initialize().await?;

    settle(Duration::from_secs(2)).await;
    let midway = rig.controller.status().buffered_percent;
    assert!(midway > 0 && midway < 98, "midway reading {}", midway);
    assert!(rig.controller.overlay().is_visible());

    settle(Duration::from_secs(3)).await;
    assert_eq!(rig.controller.status().buffered_percent, 100);
    assert!(!rig.controller.overlay().is_visible());

    let percents: Vec<u8> = rig
        .events()
        .iter()
        .filter_map(|e| match e {
            PlayerEvent::BufferingProgress { percent } => Some(*percent),
            _ => None,
        })
        .collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_rejected_play_stays_stopped() -> Result<()> {
    let mut rig = TestRig::new(SyntheticConfig { reject_play: true, ..widescreen() }, Config::default())?;

    let outcome = rig.controller.initialize().await?;

    assert_eq!(outcome, StartOutcome::Rejected);
    assert!(!rig.controller.is_playing());
    assert_eq!(rig.controller.state(), PlaybackState::Idle);
    assert!(rig.controller.render_loop().active().is_none());
    assert_eq!(rig.status.lock().text(), TEXT_MANUAL_START);

    settle(Duration::from_millis(500)).await;
    assert_eq!(rig.surface.lock().draw_count(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_live_frames_are_letterboxed() -> Result<()> {
    let mut rig = TestRig::new(widescreen(), Config::default())?;

    assert_eq!(rig.controller.initialize().await?, StartOutcome::Started);
    settle(Duration::from_millis(1000)).await;

    let surface = rig.surface.lock();
    assert!(surface.draw_count() >= 9);
    // 32x18 into 64x64
    assert_eq!(surface.last_rect(), Some(FrameRect { width: 64, height: 36, x_offset: 0, y_offset: 14 }));
    assert_eq!(surface.pixel(0, 0), Some([0, 0, 0, 255]));

    let shown = SyntheticVideo::decode_frame_index(surface.pixel(0, 14).unwrap_or_default());
    assert!((8..=10).contains(&shown), "showing frame {}", shown);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_refresh_driven_without_frame_callback() -> Result<()> {
    let source = SyntheticConfig { frame_callback: false, ..widescreen() };
    let mut rig = TestRig::new(source, Config::default())?;

    rig.controller.initialize().await?;
    settle(Duration::from_millis(500)).await;

    // 60 Hz refresh, faster than the 10 fps source
    let handle = rig.controller.render_loop().active().cloned().unwrap();
    assert!(handle.frames_drawn() >= 25, "drew {}", handle.frames_drawn());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_forced_frame_driven_falls_back_to_refresh() -> Result<()> {
    let mut config = Config::default();
    config.render.strategy = RenderStrategy::FrameDriven;
    let mut rig = TestRig::new(SyntheticConfig { frame_callback: false, ..widescreen() }, config)?;

    rig.controller.initialize().await?;
    settle(Duration::from_millis(200)).await;

    assert!(rig.surface.lock().draw_count() > 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_pause_failure_still_flips_flag() -> Result<()> {
    let mut rig = TestRig::new(SyntheticConfig { fail_pause: true, ..widescreen() }, Config::default())?;
    rig.controller.initialize().await?;
    settle(Duration::from_millis(300)).await;

    rig.controller.pause();

    assert!(!rig.controller.is_playing());
    assert!(rig.controller.render_loop().active().is_none());
    let drawn = rig.surface.lock().draw_count();
    settle(Duration::from_millis(500)).await;
    assert_eq!(rig.surface.lock().draw_count(), drawn);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_hidden_page_pauses_and_manual_start_resumes() -> Result<()> {
    let mut rig = TestRig::new(widescreen(), Config::default())?;
    rig.controller.initialize().await?;
    settle(Duration::from_millis(300)).await;

    rig.controller.on_visibility_change(true);
    assert!(!rig.controller.is_playing());
    assert!(rig.video.lock().is_paused());

    rig.controller.on_visibility_change(false);
    assert!(!rig.controller.is_playing());

    assert_eq!(rig.controller.start().await?, StartOutcome::Started);
    assert!(rig.controller.is_playing());
    assert!(!rig.video.lock().is_paused());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_reload_starts_over() -> Result<()> {
    let mut rig = TestRig::new(widescreen(), Config::default())?;
    rig.controller.initialize().await?;
    settle(Duration::from_millis(800)).await;
    let first_loop = rig.controller.render_loop().active().cloned().unwrap();

    assert_eq!(rig.controller.reload().await?, StartOutcome::Started);

    assert!(!first_loop.is_running());
    let second_loop = rig.controller.render_loop().active().cloned().unwrap();
    assert_ne!(first_loop.id(), second_loop.id());
    assert!(rig.controller.status().position < 0.5);
    assert_eq!(rig.count_events(&PlayerEvent::Reloaded), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_polling() -> Result<()> {
    let mut rig = TestRig::new(SyntheticConfig { buffer_rate: 0.5, ..widescreen() }, manual_start())?;
    rig.controller.initialize().await?;
    settle(Duration::from_millis(700)).await;

    rig.controller.shutdown();
    let polls = rig.events().len();
    settle(Duration::from_secs(2)).await;

    assert!(!rig.controller.is_polling());
    assert_eq!(rig.events().len(), polls);
    Ok(())
}
