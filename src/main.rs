use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use flipbook::media::SyntheticVideo;
use flipbook::player::{PlaybackController, PlaybackMode, PlayerEvent, PlayerEventHandler};
use flipbook::renderer::{PixelSurface, RenderStrategy};
use flipbook::utils::Config;
use flipbook::{OverlayRecorder, SyntheticConfig};
use log::{error, info, warn};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// flipbook - play a video source onto a pixel canvas
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Playback mode
    #[arg(short, long, value_enum)]
    mode: Option<PlaybackMode>,

    /// Render tick source for live mode
    #[arg(long, value_enum)]
    strategy: Option<RenderStrategy>,

    /// Canvas width
    #[arg(long)]
    width: Option<u32>,

    /// Canvas height
    #[arg(long)]
    height: Option<u32>,

    /// Source video width
    #[arg(long, default_value = "1280")]
    source_width: u32,

    /// Source video height
    #[arg(long, default_value = "720")]
    source_height: u32,

    /// Source frame rate
    #[arg(long, default_value = "30")]
    fps: f64,

    /// Source duration in seconds
    #[arg(long, default_value = "4")]
    duration: f64,

    /// Media seconds downloaded per second; instant when omitted
    #[arg(long, value_name = "RATE")]
    buffer_rate: Option<f64>,

    /// Delay before the source reports metadata, in milliseconds
    #[arg(long, default_value = "0")]
    metadata_delay_ms: u64,

    /// Make the source refuse to play, like a blocked autoplay
    #[arg(long)]
    reject_play: bool,

    /// Capture rate for extract mode
    #[arg(long, value_name = "FPS")]
    extract_fps: Option<f64>,

    /// How long to play before pausing, in seconds
    #[arg(long, default_value = "3")]
    run_secs: u64,

    /// Directory for the final canvas and any extracted frames
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Wait for a manual start instead of autoplaying
    #[arg(long)]
    no_autoplay: bool,

    /// Configuration file to use instead of the user config
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.general.mode = mode;
        }
        if let Some(strategy) = self.strategy {
            config.render.strategy = strategy;
        }
        if let Some(width) = self.width {
            config.render.width = width;
        }
        if let Some(height) = self.height {
            config.render.height = height;
        }
        if self.extract_fps.is_some() {
            config.extract.target_fps = self.extract_fps;
        }
        if self.no_autoplay {
            config.general.auto_play = false;
        }
    }

    fn source(&self) -> Result<SyntheticConfig> {
        let source = SyntheticConfig {
            width: self.source_width,
            height: self.source_height,
            fps: self.fps,
            duration: self.duration,
            metadata_delay: Duration::from_millis(self.metadata_delay_ms),
            buffer_rate: self.buffer_rate.unwrap_or(f64::INFINITY),
            reject_play: self.reject_play,
            ..Default::default()
        };
        source.validate().context("Invalid source settings")?;
        Ok(source)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load()?,
    };
    args.apply(&mut config);
    config.validate()?;
    let source = args.source()?;

    // Initialize logging
    let log_level = if args.debug { "debug" } else { config.general.log_level.as_str() };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    info!("Starting flipbook v{}", env!("CARGO_PKG_VERSION"));

    let (video, _clock) = SyntheticVideo::launch(source);
    let surface = Arc::new(Mutex::new(PixelSurface::new(config.render.width, config.render.height)));
    let status = Arc::new(Mutex::new(OverlayRecorder::new()));

    let mut controller = PlaybackController::new(video, surface.clone(), status, config);
    controller.add_event_handler(Box::new(LoggingEventHandler));

    let mut outcome = controller.initialize().await?;
    if !outcome.is_playing() {
        info!("Not playing after initialization ({:?}), starting manually", outcome);
        outcome = controller.start().await?;
    }
    if !outcome.is_playing() {
        warn!("Playback did not start: {:?}", outcome);
    }

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(args.run_secs)) => {}
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    info!("{}", controller.status());
    controller.pause();

    if let Some(dir) = &args.output {
        std::fs::create_dir_all(dir).with_context(|| format!("Creating {}", dir.display()))?;

        if let Some(sequence) = controller.extracted() {
            sequence.write_to_dir(&dir.join("frames"))?;
        }

        let canvas = dir.join("canvas.png");
        surface.lock().save_png(&canvas)?;
        std::fs::write(dir.join("status.json"), serde_json::to_string_pretty(&controller.status())?)?;
        info!("Saved canvas to {}", canvas.display());
    }

    controller.shutdown();
    Ok(())
}

/// Event handler that logs events
struct LoggingEventHandler;

impl PlayerEventHandler for LoggingEventHandler {
    fn handle_event(&mut self, event: &PlayerEvent) {
        match event {
            PlayerEvent::BufferingProgress { percent } => {
                // Polled every few hundred milliseconds
                log::debug!("Buffering: {}%", percent);
            }
            PlayerEvent::ExtractionProgress { completed, total } => {
                log::debug!("Extracted {}/{}", completed, total);
            }
            PlayerEvent::PlaybackRejected { reason } => error!("Playback rejected: {}", reason),
            PlayerEvent::ExtractionComplete { frames } => info!("Extraction complete: {} frames", frames),
            other => info!("{:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_settings_validated() {
        let args = Args::parse_from(["flipbook", "--fps", "24", "--source-width", "320", "--source-height", "240"]);
        let source = args.source().unwrap();
        assert_eq!((source.width, source.height, source.fps), (320, 240, 24.0));

        assert!(Args::parse_from(["flipbook", "--fps", "0"]).source().is_err());
        assert!(Args::parse_from(["flipbook", "--duration=-1"]).source().is_err());
        assert!(Args::parse_from(["flipbook", "--source-width", "40000", "--source-height", "40000"])
            .source()
            .is_err());
    }
}
