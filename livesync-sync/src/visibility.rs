//! Host visibility signal.
//!
//! The host (window, app lifecycle, terminal focus, ...) reports whether it
//! is currently visible. Every listener receives each transition as its own
//! message, so a hidden-visible-hidden burst is never collapsed into its
//! final state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::debug;

/// Receiving end of a visibility subscription. Yields the new state on
/// every transition.
pub type Transitions = mpsc::UnboundedReceiver<bool>;

#[derive(Debug)]
struct VisibilityState {
    visible: bool,
    listeners: Vec<mpsc::UnboundedSender<bool>>,
}

/// Shared, cloneable visibility flag with change notification.
#[derive(Debug, Clone)]
pub struct VisibilitySignal {
    state: Arc<Mutex<VisibilityState>>,
}

impl VisibilitySignal {
    /// Creates a signal with the given initial state.
    pub fn new(visible: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(VisibilityState {
                visible,
                listeners: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VisibilityState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the host is currently visible.
    pub fn is_visible(&self) -> bool {
        self.lock().visible
    }

    /// Reports the host's visibility. Returns `true` if the state changed.
    pub fn set_visible(&self, visible: bool) -> bool {
        let mut state = self.lock();
        if state.visible == visible {
            return false;
        }
        state.visible = visible;
        state.listeners.retain(|tx| tx.send(visible).is_ok());
        debug!(visible, listeners = state.listeners.len(), "Host visibility changed");
        true
    }

    /// Returns a receiver for transitions after this call.
    pub fn subscribe(&self) -> Transitions {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().listeners.push(tx);
        rx
    }

    /// Number of live listeners.
    pub fn listener_count(&self) -> usize {
        let mut state = self.lock();
        state.listeners.retain(|tx| !tx.is_closed());
        state.listeners.len()
    }
}

impl Default for VisibilitySignal {
    fn default() -> Self {
        Self::new(true)
    }
}
