//! Release handles for installed subscriptions.
//!
//! Every operation that installs a timer, listener or channel hands back a
//! `Disposer`. Owners keep at most one live disposer per logical
//! subscription and dispose the old one before installing a replacement.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Runs a release action exactly once, on `dispose()` or on drop.
pub struct Disposer {
    label: &'static str,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Disposer {
    /// Wraps a release action.
    pub fn new(label: &'static str, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            label,
            release: Some(Box::new(release)),
        }
    }

    /// A disposer with nothing to release.
    pub fn noop(label: &'static str) -> Self {
        Self {
            label,
            release: None,
        }
    }

    /// Runs the release action. Later calls do nothing.
    pub fn dispose(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    /// Whether the release action has already run (or never existed).
    pub fn is_disposed(&self) -> bool {
        self.release.is_none()
    }

    /// Label given at construction, for logs.
    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl Drop for Disposer {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("label", &self.label)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Open/closed flag shared between a background task and its disposer.
///
/// The task runs each callback through [`LiveGate::run`], which holds the
/// gate for the duration of the call. [`LiveGate::close`] takes the same
/// lock, so once it returns no callback is running and none will start.
/// A callback must not close its own gate.
#[derive(Debug, Clone)]
pub(crate) struct LiveGate {
    open: Arc<Mutex<bool>>,
}

impl LiveGate {
    pub(crate) fn new() -> Self {
        Self {
            open: Arc::new(Mutex::new(true)),
        }
    }

    /// Runs `f` if the gate is still open.
    pub(crate) fn run<T>(&self, f: impl FnOnce() -> T) -> Option<T> {
        let open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        if *open { Some(f()) } else { None }
    }

    /// Closes the gate, waiting for a callback already in progress.
    pub(crate) fn close(&self) {
        *self.open.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting() -> (Disposer, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let disposer = Disposer::new("test", move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (disposer, count)
    }

    #[test]
    fn dispose_runs_once() {
        let (mut d, count) = counting();
        d.dispose();
        d.dispose();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(d.is_disposed());
    }

    #[test]
    fn drop_disposes() {
        let (d, count) = counting();
        drop(d);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_after_dispose_does_not_rerun() {
        let (mut d, count) = counting();
        d.dispose();
        drop(d);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn noop_is_already_disposed() {
        let mut d = Disposer::noop("empty");
        assert!(d.is_disposed());
        d.dispose();
        assert_eq!(d.label(), "empty");
    }

    #[test]
    fn closed_gate_skips_callbacks() {
        let gate = LiveGate::new();
        assert_eq!(gate.run(|| 1), Some(1));
        gate.clone().close();
        assert_eq!(gate.run(|| 2), None);
    }

    #[test]
    fn close_waits_for_running_callback() {
        let gate = LiveGate::new();
        let finished = Arc::new(AtomicUsize::new(0));
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();

        let worker = {
            let gate = gate.clone();
            let finished = Arc::clone(&finished);
            std::thread::spawn(move || {
                gate.run(|| {
                    entered_tx.send(()).unwrap();
                    std::thread::sleep(std::time::Duration::from_millis(50));
                    finished.fetch_add(1, Ordering::SeqCst);
                });
            })
        };

        entered_rx.recv().unwrap();
        gate.close();
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        worker.join().unwrap();
    }
}
