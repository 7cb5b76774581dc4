//! Player event delivery

use super::PlayerEvent;
use log::trace;
use parking_lot::Mutex;
use std::sync::Arc;

/// Player event handler trait
pub trait PlayerEventHandler: Send {
    /// Handle player event
    fn handle_event(&mut self, event: &PlayerEvent);
}

impl<F> PlayerEventHandler for F
where
    F: FnMut(&PlayerEvent) + Send,
{
    fn handle_event(&mut self, event: &PlayerEvent) {
        self(event)
    }
}

/// Fans events out to every registered handler.
///
/// Clones share the handler list, so background tasks can dispatch
/// through their own copy. Handlers must not dispatch from inside
/// `handle_event`.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    handlers: Arc<Mutex<Vec<Box<dyn PlayerEventHandler>>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_handler(&self, handler: Box<dyn PlayerEventHandler>) {
        self.handlers.lock().push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.lock().len()
    }

    pub fn dispatch(&self, event: PlayerEvent) {
        trace!("Player event: {:?}", event);
        for handler in self.handlers.lock().iter_mut() {
            handler.handle_event(&event);
        }
    }
}
