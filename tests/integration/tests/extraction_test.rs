//! End-to-end extract mode scenarios

use anyhow::Result;
use flipbook::player::{PlaybackMode, PlaybackState, PlayerEvent, StartOutcome};
use flipbook::{Config, SyntheticConfig, SyntheticVideo};
use flipbook_integration_tests::{settle, widescreen, TestRig, CANVAS};
use std::time::Duration;

fn extract_at(fps: f64) -> Config {
    let mut config = Config::default();
    config.general.mode = PlaybackMode::Extract;
    config.extract.target_fps = Some(fps);
    config
}

#[tokio::test(start_paused = true)]
async fn test_two_seconds_at_ten_fps() -> Result<()> {
    let mut rig = TestRig::new(widescreen(), extract_at(10.0))?;

    let outcome = rig.controller.initialize().await?;

    assert_eq!(outcome, StartOutcome::Extracted { frames: 20 });
    let sequence = rig.controller.extracted().cloned().unwrap();
    assert_eq!(sequence.len(), 20);
    for (i, frame) in sequence.iter().enumerate() {
        assert_eq!(frame.index, i);
        assert!((frame.media_time - i as f64 / 10.0).abs() < 1e-12);
        assert!((sequence.frame_time(i) - frame.media_time).abs() < 1e-12);
    }

    let seeks = rig.video.lock().seeks().to_vec();
    assert_eq!(seeks.len(), 20);
    assert!(seeks.iter().enumerate().all(|(i, t)| (t - i as f64 / 10.0).abs() < 1e-12));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_written_frames_match_seek_times() -> Result<()> {
    let mut rig = TestRig::new(widescreen(), extract_at(10.0))?;
    rig.controller.initialize().await?;
    let sequence = rig.controller.extracted().cloned().unwrap();

    let manifest_path = sequence.write_to_dir(rig.path())?;

    let manifest: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(manifest_path)?)?;
    assert_eq!(manifest["frame_count"], 20);
    assert_eq!(manifest["frames_per_second"], 10.0);
    assert_eq!(manifest["frames"][13]["file"], "frame_00013.png");

    // Captures cover the whole canvas; the top-left pixel carries the frame index
    let still = image::open(rig.path().join("frame_00013.png"))?.to_rgba8();
    assert_eq!(still.dimensions(), CANVAS);
    assert_eq!(SyntheticVideo::decode_frame_index(still.get_pixel(0, 0).0), 13);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_progress_reported_per_frame() -> Result<()> {
    let mut rig = TestRig::new(SyntheticConfig { duration: 1.0, ..widescreen() }, extract_at(4.0))?;
    rig.controller.initialize().await?;

    let completed: Vec<usize> = rig
        .events()
        .iter()
        .filter_map(|e| match e {
            PlayerEvent::ExtractionProgress { completed, total: 4 } => Some(*completed),
            _ => None,
        })
        .collect();
    assert_eq!(completed, vec![1, 2, 3, 4]);

    let texts = rig.texts();
    for i in 1..=4 {
        let expected = format!("Extracting frames… {}/4", i);
        assert!(texts.contains(&expected), "missing {:?}", expected);
    }
    assert_eq!(rig.count_events(&PlayerEvent::ExtractionComplete { frames: 4 }), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cached_playback_runs_at_sequence_rate() -> Result<()> {
    let mut rig = TestRig::new(widescreen(), extract_at(10.0))?;
    rig.controller.initialize().await?;
    let after_extraction = rig.surface.lock().draw_count();
    assert_eq!(after_extraction, 20);

    // Ticks at 0, 100, ..., 500ms
    settle(Duration::from_millis(550)).await;
    assert_eq!(rig.surface.lock().draw_count() - after_extraction, 6);

    rig.controller.pause();
    settle(Duration::from_secs(1)).await;
    assert_eq!(rig.surface.lock().draw_count() - after_extraction, 6);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_restart_reuses_extracted_frames() -> Result<()> {
    let mut config = extract_at(10.0);
    config.extract.loop_playback = true;
    let mut rig = TestRig::new(SyntheticConfig { duration: 0.5, ..widescreen() }, config)?;
    rig.controller.initialize().await?;
    rig.controller.pause();

    let outcome = rig.controller.start().await?;

    assert_eq!(outcome, StartOutcome::Extracted { frames: 5 });
    assert_eq!(rig.video.lock().seeks().len(), 5);
    assert_eq!(rig.count_events(&PlayerEvent::ExtractionComplete { frames: 5 }), 1);
    assert!(rig.controller.render_loop().is_running());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_start_after_cached_stills_run_out() -> Result<()> {
    let mut rig = TestRig::new(SyntheticConfig { duration: 0.5, ..widescreen() }, extract_at(10.0))?;
    rig.controller.initialize().await?;

    settle(Duration::from_secs(1)).await;
    assert_eq!(rig.controller.state(), PlaybackState::Ended);
    assert!(!rig.controller.is_playing());
    let drawn = rig.surface.lock().draw_count();

    assert_eq!(rig.controller.start().await?, StartOutcome::Extracted { frames: 5 });
    assert_eq!(rig.controller.state(), PlaybackState::Playing);
    settle(Duration::from_millis(450)).await;

    assert_eq!(rig.surface.lock().draw_count() - drawn, 5);
    assert_eq!(rig.video.lock().seeks().len(), 5);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_source_rate_used_without_target() -> Result<()> {
    let mut config = Config::default();
    config.general.mode = PlaybackMode::Extract;
    let mut rig = TestRig::new(SyntheticConfig { duration: 0.5, ..widescreen() }, config)?;

    assert_eq!(rig.controller.initialize().await?, StartOutcome::Extracted { frames: 5 });
    Ok(())
}
