//! Frame render loop
//!
//! Draws the source's most recent frame into the surface once per tick.
//! Ticks come either from the source's decoded-frame notifications or from
//! a display-refresh interval. Every tick checks the loop state under the
//! same lock `cancel` takes, so once `cancel` returns no draw is in flight
//! and none will start.

use super::{fit, RenderStrategy, SharedSurface};
use crate::media::{MediaEvent, SharedMedia};
use crate::utils::error::Result;
use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

/// Lifecycle of a single render loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    /// Terminal
    Cancelled,
}

struct LoopShared {
    state: Mutex<LoopState>,
    wake: Notify,
    frames_drawn: AtomicU64,
    ticks_skipped: AtomicU64,
}

/// Cancellation token and statistics for one render loop
#[derive(Clone)]
pub struct LoopHandle {
    id: u64,
    shared: Arc<LoopShared>,
}

impl LoopHandle {
    fn new(id: u64) -> Self {
        Self {
            id,
            shared: Arc::new(LoopShared {
                state: Mutex::new(LoopState::Idle),
                wake: Notify::new(),
                frames_drawn: AtomicU64::new(0),
                ticks_skipped: AtomicU64::new(0),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> LoopState {
        *self.shared.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == LoopState::Running
    }

    fn mark_running(&self) {
        let mut state = self.shared.state.lock();
        if *state == LoopState::Idle {
            *state = LoopState::Running;
        }
    }

    /// Stop the loop. Blocks while a draw is in progress; afterwards no
    /// further draws happen.
    pub fn cancel(&self) {
        let mut state = self.shared.state.lock();
        if *state != LoopState::Cancelled {
            debug!("Cancelling render loop #{}", self.id);
            *state = LoopState::Cancelled;
        }
        drop(state);
        self.shared.wake.notify_one();
    }

    /// Frames drawn so far
    pub fn frames_drawn(&self) -> u64 {
        self.shared.frames_drawn.load(Ordering::Relaxed)
    }

    /// Ticks that produced no draw (no frame yet, or a failed draw)
    pub fn ticks_skipped(&self) -> u64 {
        self.shared.ticks_skipped.load(Ordering::Relaxed)
    }

    /// Resolves once the loop is no longer running
    pub async fn cancelled(&self) {
        loop {
            let notified = self.shared.wake.notified();
            if !self.is_running() {
                return;
            }
            notified.await;
        }
    }

    /// Run `draw` while holding the state lock, only if still running.
    ///
    /// Returns false when the loop has been cancelled. `draw` reports
    /// whether anything was drawn.
    pub(crate) fn draw_if_running<F>(&self, draw: F) -> bool
    where
        F: FnOnce() -> Result<bool>,
    {
        let state = self.shared.state.lock();
        if *state != LoopState::Running {
            return false;
        }

        match draw() {
            Ok(true) => {
                self.shared.frames_drawn.fetch_add(1, Ordering::Relaxed);
            }
            Ok(false) => {
                self.shared.ticks_skipped.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                warn!("Render loop #{} draw failed: {}", self.id, e);
                self.shared.ticks_skipped.fetch_add(1, Ordering::Relaxed);
            }
        }
        true
    }
}

impl fmt::Debug for LoopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("frames_drawn", &self.frames_drawn())
            .finish()
    }
}

/// Where render ticks come from
enum Ticks {
    Frames(broadcast::Receiver<MediaEvent>),
    Refresh(Interval),
}

impl Ticks {
    /// Wait for the next tick; false once the source is gone
    async fn next(&mut self) -> bool {
        match self {
            Ticks::Frames(events) => loop {
                match events.recv().await {
                    Ok(MediaEvent::FramePresented { .. }) => return true,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        trace!("Frame ticks lagged by {}", skipped);
                        return true;
                    }
                    Err(RecvError::Closed) => return false,
                }
            },
            Ticks::Refresh(interval) => {
                interval.tick().await;
                true
            }
        }
    }
}

/// Owner of the render loop for one surface.
///
/// Holds at most one live loop: starting another cancels the previous
/// one first.
pub struct FrameRenderLoop {
    surface: SharedSurface,
    refresh_interval: Duration,
    active: Option<LoopHandle>,
    task: Option<JoinHandle<()>>,
    next_id: u64,
}

impl FrameRenderLoop {
    pub fn new(surface: SharedSurface, refresh_interval: Duration) -> Self {
        Self {
            surface,
            refresh_interval,
            active: None,
            task: None,
            next_id: 0,
        }
    }

    pub fn surface(&self) -> &SharedSurface {
        &self.surface
    }

    /// The live loop, if any
    pub fn active(&self) -> Option<&LoopHandle> {
        self.active.as_ref().filter(|h| h.is_running())
    }

    pub fn is_running(&self) -> bool {
        self.active().is_some()
    }

    /// The most recently started loop, even once cancelled or finished
    pub fn latest(&self) -> Option<&LoopHandle> {
        self.active.as_ref()
    }

    /// Start drawing `media` into the surface. Must be called within a
    /// tokio runtime.
    pub fn start(&mut self, media: SharedMedia, strategy: RenderStrategy) -> LoopHandle {
        let (strategy, ticks) = {
            let source = media.lock();
            let strategy = strategy.resolve(source.supports_frame_callback());
            let ticks = match strategy {
                RenderStrategy::FrameDriven => Ticks::Frames(source.subscribe()),
                _ => {
                    let mut interval = tokio::time::interval(self.refresh_interval);
                    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    Ticks::Refresh(interval)
                }
            };
            (strategy, ticks)
        };

        let surface = self.surface.clone();
        let handle = self.launch(move |handle| run_live(handle, media, surface, ticks));
        info!("Render loop #{} started ({:?})", handle.id(), strategy);
        handle
    }

    /// Cancel any live loop and spawn `body` as the new one
    pub fn launch<F, Fut>(&mut self, body: F) -> LoopHandle
    where
        F: FnOnce(LoopHandle) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        self.next_id += 1;
        let handle = LoopHandle::new(self.next_id);
        handle.mark_running();

        self.task = Some(tokio::spawn(body(handle.clone())));
        self.active = Some(handle.clone());
        handle
    }

    /// Cancel the live loop, if any
    pub fn cancel(&mut self) {
        if let Some(handle) = &self.active {
            handle.cancel();
        }
        // The task notices the cancellation at its next wake-up
        self.task = None;
    }
}

impl Drop for FrameRenderLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_live(handle: LoopHandle, media: SharedMedia, surface: SharedSurface, mut ticks: Ticks) {
    loop {
        tokio::select! {
            biased;
            _ = handle.cancelled() => break,
            more = ticks.next() => {
                if !more {
                    debug!("Render loop #{}: media events closed", handle.id());
                    break;
                }
            }
        }

        if !handle.draw_if_running(|| draw_current_frame(&media, &surface)) {
            break;
        }
    }

    debug!(
        "Render loop #{} exited after {} frames",
        handle.id(),
        handle.frames_drawn()
    );
}

/// Draw the source's current frame contain-fitted into the surface.
///
/// Returns false when the source has no frame to show yet.
pub fn draw_current_frame(media: &SharedMedia, surface: &SharedSurface) -> Result<bool> {
    let (frame, size) = {
        let media = media.lock();
        (media.current_frame(), media.video_size())
    };
    let Some(frame) = frame else {
        return Ok(false);
    };

    let mut surface = surface.lock();
    let rect = fit(size.0, size.1, surface.width(), surface.height());
    surface.draw_frame(&frame, rect)?;
    Ok(true)
}
