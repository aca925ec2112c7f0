//! Per-container publish/subscribe channels
//!
//! Delivery is synchronous: `emit` runs every subscriber on the caller's
//! task, in subscription order, before returning.

use std::fmt;
use std::sync::{Arc, Mutex};

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A list of subscribers for one event type
pub struct Signal<T: ?Sized> {
    handlers: Arc<Mutex<Vec<Handler<T>>>>,
}

impl<T: ?Sized> Signal<T> {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn connect(&self, handler: impl Fn(&T) + Send + Sync + 'static) {
        self.lock().push(Arc::new(handler));
    }

    /// Call every subscriber; a signal without subscribers does nothing
    pub fn emit(&self, value: &T) {
        // Snapshot the list so a handler may connect without deadlocking
        let handlers: Vec<Handler<T>> = self.lock().clone();
        for handler in handlers {
            handler(value);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Handler<T>>> {
        self.handlers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: ?Sized> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Clones share the same subscriber list
impl<T: ?Sized> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            handlers: Arc::clone(&self.handlers),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Why the whole container list must be reloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshReason {
    Destroyed(String),
    Cloned { from: String, to: String },
}

/// The two channels every container owns
#[derive(Debug, Clone, Default)]
pub struct Signals {
    /// Fired with the container name after a single-row change
    pub updated: Signal<str>,
    /// Fired when the set of containers changed
    pub refresh: Signal<RefreshReason>,
}
