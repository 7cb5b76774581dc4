//! Playback controller implementation for flipbook
//!
//! [`PlaybackController`] is the glue between the environment objects and
//! the playback core. It owns the "is playing" flag, the surface's render
//! loop, the buffering poller and the overlay.

use super::events::{EventDispatcher, PlayerEventHandler};
use super::state::PlayerStatus;
use super::{PlaybackMode, PlaybackState, PlayerEvent, StartOutcome};
use crate::buffering::{
    poll_once, status_text, BufferProgressEstimator, BufferingState, ProgressPoller, ProgressUpdate,
};
use crate::extract::{CachedPlayback, ExtractedFrameSequence, ExtractionProgress, FrameExtractor};
use crate::media::{wait_for_metadata, MediaEvent, SharedMedia};
use crate::overlay::{Overlay, SharedStatus, TEXT_BUFFERED, TEXT_MANUAL_START, TEXT_PREPARING};
use crate::renderer::{FrameRenderLoop, SharedSurface};
use crate::utils::config::Config;
use crate::utils::error::Result;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Main playback controller
pub struct PlaybackController {
    media: SharedMedia,
    overlay: Overlay,
    render_loop: FrameRenderLoop,
    estimator: Arc<Mutex<BufferProgressEstimator>>,
    poller: Option<ProgressPoller>,
    ready_watcher: Option<JoinHandle<()>>,
    config: Config,
    state: PlaybackState,
    playing: bool,
    extracted: Option<Arc<ExtractedFrameSequence>>,
    events: EventDispatcher,
}

impl PlaybackController {
    pub fn new(media: SharedMedia, surface: SharedSurface, status: SharedStatus, config: Config) -> Self {
        let render_loop = FrameRenderLoop::new(surface, config.render.refresh_interval());
        let estimator = BufferProgressEstimator::from_config(&config.buffering);

        Self {
            media,
            overlay: Overlay::new(status),
            render_loop,
            estimator: Arc::new(Mutex::new(estimator)),
            poller: None,
            ready_watcher: None,
            config,
            state: PlaybackState::Idle,
            playing: false,
            extracted: None,
            events: EventDispatcher::new(),
        }
    }

    pub fn add_event_handler(&mut self, handler: Box<dyn PlayerEventHandler>) {
        self.events.add_handler(handler);
    }

    /// Prepare the surface and overlay, start tracking buffering, and try
    /// to autoplay.
    ///
    /// Must be called within a tokio runtime. Returns `Deferred` when
    /// autoplay is disabled.
    pub async fn initialize(&mut self) -> Result<StartOutcome> {
        info!("Initializing playback ({:?} mode)", self.config.general.mode);

        {
            let mut surface = self.render_loop.surface().lock();
            let bounds = surface.bounds();
            surface.fill_rect(bounds, self.config.render.background)?;
        }

        self.overlay.show();
        self.overlay.set_progress(0);
        self.overlay.set_text(&status_text(BufferingState::default()));

        self.start_poller();
        self.start_ready_watcher();

        if !self.config.general.auto_play {
            self.overlay.set_text(TEXT_MANUAL_START);
            return Ok(StartOutcome::Deferred);
        }

        self.start().await
    }

    /// Start playback.
    ///
    /// Waits for metadata first when the source has none. A rejected
    /// `play()` is not an error: the controller stays idle, shows the
    /// manual start prompt and returns `Rejected`.
    pub async fn start(&mut self) -> Result<StartOutcome> {
        if self.playing {
            if self.is_advancing() {
                debug!("Start requested while already playing");
                return Ok(match (self.config.general.mode, &self.extracted) {
                    (PlaybackMode::Extract, Some(sequence)) => StartOutcome::Extracted { frames: sequence.len() },
                    _ => StartOutcome::Started,
                });
            }
            debug!("Previous playback has finished, starting again");
            self.render_loop.cancel();
            self.playing = false;
        }

        if !self.media.lock().has_metadata() {
            self.state = PlaybackState::Preparing;
            self.overlay.set_text(TEXT_PREPARING);
            if let Err(e) = self.media.lock().load() {
                debug!("Ignoring load failure: {}", e);
            }
            wait_for_metadata(&self.media).await?;
            debug!("Metadata ready");
        }

        match self.config.general.mode {
            PlaybackMode::Live => Ok(self.start_live()),
            PlaybackMode::Extract => self.start_extracted().await,
        }
    }

    fn start_live(&mut self) -> StartOutcome {
        if let Some(update) = poll_once(&self.media, &self.estimator, &self.overlay) {
            dispatch_progress(&self.events, update);
        }

        let played = self.media.lock().play();
        if let Err(e) = played {
            warn!("Playback rejected: {}", e);
            self.state = PlaybackState::Idle;
            self.overlay.set_text(TEXT_MANUAL_START);
            self.events.dispatch(PlayerEvent::PlaybackRejected { reason: e.to_string() });
            return StartOutcome::Rejected;
        }

        self.render_loop.start(self.media.clone(), self.config.render.strategy);
        self.playing = true;
        self.state = PlaybackState::Playing;
        self.events.dispatch(PlayerEvent::PlaybackStarted);
        StartOutcome::Started
    }

    async fn start_extracted(&mut self) -> Result<StartOutcome> {
        let sequence = match self.extracted.clone() {
            Some(sequence) => sequence,
            None => {
                let sequence = Arc::new(self.extract().await?);
                self.extracted = Some(sequence.clone());
                sequence
            }
        };

        if self.overlay.hide() {
            self.events.dispatch(PlayerEvent::OverlayDismissed);
        }

        CachedPlayback::new(sequence.clone())
            .looping(self.config.extract.loop_playback)
            .start(&mut self.render_loop);
        self.playing = true;
        self.state = PlaybackState::Playing;
        self.events.dispatch(PlayerEvent::PlaybackStarted);

        Ok(StartOutcome::Extracted { frames: sequence.len() })
    }

    /// Run an extraction. Buffering updates are suspended meanwhile so the
    /// overlay only shows extraction progress.
    async fn extract(&mut self) -> Result<ExtractedFrameSequence> {
        self.render_loop.cancel();
        self.state = PlaybackState::Extracting;

        let resume_background = self.poller.is_some();
        self.stop_background();
        self.overlay.show();
        self.overlay.set_progress(0);

        let events = self.events.clone();
        let mut extractor = FrameExtractor::new(self.config.extract.fallback_fps).with_progress_callback(
            Box::new(move |progress: ExtractionProgress| {
                events.dispatch(PlayerEvent::ExtractionProgress {
                    completed: progress.completed,
                    total: progress.total,
                });
            }),
        );

        let surface = self.render_loop.surface().clone();
        let target_fps = self.config.extract.target_fps;
        let result = match self.config.extract.timeout_secs {
            Some(secs) => {
                extractor
                    .extract_with_timeout(&self.media, &surface, &self.overlay, target_fps, Duration::from_secs(secs))
                    .await
            }
            None => extractor.extract(&self.media, &surface, &self.overlay, target_fps).await,
        };

        if resume_background {
            self.start_poller();
            self.start_ready_watcher();
        }

        match result {
            Ok(sequence) => {
                self.events.dispatch(PlayerEvent::ExtractionComplete { frames: sequence.len() });
                Ok(sequence)
            }
            Err(e) => {
                warn!("Extraction failed: {}", e);
                self.state = PlaybackState::Idle;
                self.overlay.set_text(TEXT_MANUAL_START);
                Err(e)
            }
        }
    }

    /// Stop playback. The flag flips even if the source fails to pause.
    pub fn pause(&mut self) {
        self.playing = false;
        self.state = PlaybackState::Paused;

        if let Err(e) = self.media.lock().pause() {
            warn!("Ignoring pause failure: {}", e);
        }
        self.render_loop.cancel();
        self.events.dispatch(PlayerEvent::PlaybackPaused);
    }

    /// Load the source again from scratch and re-run initialization
    pub async fn reload(&mut self) -> Result<StartOutcome> {
        info!("Reloading");
        self.pause();
        self.stop_background();

        if let Err(e) = self.media.lock().load() {
            warn!("Ignoring load failure on reload: {}", e);
        }
        self.estimator.lock().reset();
        self.extracted = None;
        self.state = PlaybackState::Idle;
        self.events.dispatch(PlayerEvent::Reloaded);

        self.initialize().await
    }

    /// Pause when the embedding view is hidden. Becoming visible again does
    /// not resume.
    pub fn on_visibility_change(&mut self, hidden: bool) {
        if hidden {
            debug!("View hidden, pausing");
            self.pause();
        }
    }

    /// Flip overlay visibility; returns the new state
    pub fn toggle_overlay(&mut self) -> bool {
        self.overlay.toggle()
    }

    /// Stop the poller, the readiness watcher and any render loop
    pub fn shutdown(&mut self) {
        info!("Shutting down playback");
        self.stop_background();
        self.render_loop.cancel();
        self.playing = false;
    }

    /// Playing and still advancing: false once the source has ended or
    /// non-looping cached playback has run out
    pub fn is_playing(&self) -> bool {
        self.playing && self.is_advancing()
    }

    pub fn state(&self) -> PlaybackState {
        if self.state == PlaybackState::Playing && !self.is_advancing() {
            PlaybackState::Ended
        } else {
            self.state
        }
    }

    fn is_advancing(&self) -> bool {
        let source_running = match self.config.general.mode {
            PlaybackMode::Live => !self.media.lock().is_paused(),
            PlaybackMode::Extract => true,
        };
        source_running && self.render_loop.is_running()
    }

    pub fn mode(&self) -> PlaybackMode {
        self.config.general.mode
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn render_loop(&self) -> &FrameRenderLoop {
        &self.render_loop
    }

    /// The extracted sequence, once extract mode has run
    pub fn extracted(&self) -> Option<&Arc<ExtractedFrameSequence>> {
        self.extracted.as_ref()
    }

    /// Whether the buffering poller is running
    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(|p| !p.is_finished())
    }

    pub fn status(&self) -> PlayerStatus {
        let (position, duration) = {
            let media = self.media.lock();
            (media.current_time(), media.duration())
        };

        PlayerStatus {
            state: self.state(),
            mode: self.config.general.mode,
            playing: self.is_playing(),
            buffered_percent: self.estimator.lock().last_known(),
            overlay_visible: self.overlay.is_visible(),
            position,
            duration,
            frames_drawn: self.render_loop.latest().map_or(0, |h| h.frames_drawn()),
            frames_extracted: self.extracted.as_ref().map(|s| s.len()),
        }
    }

    fn start_poller(&mut self) {
        let events = self.events.clone();
        self.poller = Some(ProgressPoller::spawn(
            self.media.clone(),
            self.estimator.clone(),
            self.overlay.clone(),
            self.config.buffering.poll_interval(),
            Some(Box::new(move |update: ProgressUpdate| dispatch_progress(&events, update))),
        ));
    }

    /// Show the "buffered" text whenever the source reports it can play
    fn start_ready_watcher(&mut self) {
        if let Some(watcher) = self.ready_watcher.take() {
            watcher.abort();
        }

        let mut events = self.media.lock().subscribe();
        let overlay = self.overlay.clone();

        self.ready_watcher = Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(MediaEvent::CanPlay) => overlay.set_text(TEXT_BUFFERED),
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }

    fn stop_background(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop();
        }
        if let Some(watcher) = self.ready_watcher.take() {
            watcher.abort();
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.stop_background();
    }
}

fn dispatch_progress(events: &EventDispatcher, update: ProgressUpdate) {
    events.dispatch(PlayerEvent::BufferingProgress { percent: update.state.percent });
    if update.dismissed_overlay {
        events.dispatch(PlayerEvent::OverlayDismissed);
    }
}
