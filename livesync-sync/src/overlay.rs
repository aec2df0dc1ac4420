//! Optimistic overlay store.
//!
//! Holds pending local mutations and projects them onto authoritative
//! snapshots. Projection replays updates strictly in insertion order, so the
//! displayed collection does not depend on when timers fire or when network
//! responses arrive.
//!
//! Each pending update expires after a TTL (5 s by default). Expiry runs as a
//! background tokio task holding only a weak reference to the store; removing
//! an update early cancels its expiry.

use crate::config::OverlayConfig;
use chrono::Utc;
use livesync_types::{PendingUpdate, Record, UpdateId, UpdateKind};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

/// Replays `updates`, in order, over a copy of `snapshot`.
///
/// - `Create` appends the payload unless a record with the same id exists.
/// - `Update` shallow-merges the payload into every record with its id.
/// - `Delete` removes every record with its id.
///
/// Later updates win over earlier ones for the same id because each is
/// applied to the accumulated result.
pub fn apply_updates<R: Record>(snapshot: &[R], updates: &[PendingUpdate<R>]) -> Vec<R> {
    let mut result = snapshot.to_vec();

    for update in updates {
        let target = update.record_id();
        match update.kind() {
            UpdateKind::Create => {
                if !result.iter().any(|item| item.id() == target) {
                    result.push(update.payload().clone());
                }
            }
            UpdateKind::Update => {
                for item in result.iter_mut().filter(|item| item.id() == target) {
                    item.merge_patch(update.payload());
                }
            }
            UpdateKind::Delete => {
                result.retain(|item| item.id() != target);
            }
        }
    }

    result
}

struct OverlayState<R> {
    /// Oldest first.
    pending: Vec<PendingUpdate<R>>,
    expiries: HashMap<UpdateId, AbortHandle>,
    next_seq: u64,
}

impl<R> OverlayState<R> {
    fn remove_update(&mut self, update_id: &UpdateId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|u| u.id() != update_id);
        self.pending.len() != before
    }
}

fn lock<R>(state: &Mutex<OverlayState<R>>) -> MutexGuard<'_, OverlayState<R>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The set of pending optimistic updates for one collection.
pub struct OverlayStore<R> {
    state: Arc<Mutex<OverlayState<R>>>,
    ttl: Duration,
}

impl<R: Record + Send + 'static> OverlayStore<R> {
    /// Creates a store with the default 5 s TTL.
    pub fn new() -> Self {
        Self::with_config(&OverlayConfig::default())
    }

    /// Creates a store from configuration.
    pub fn with_config(config: &OverlayConfig) -> Self {
        Self::with_ttl(config.ttl())
    }

    /// Creates a store with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(OverlayState {
                pending: Vec::new(),
                expiries: HashMap::new(),
                next_seq: 0,
            })),
            ttl,
        }
    }

    /// Records a local mutation and schedules its expiry.
    ///
    /// Returns the id of the new update so the caller can remove it once the
    /// server has absorbed the change.
    pub fn add(&self, kind: UpdateKind, record: R) -> UpdateId {
        let mut state = lock(&self.state);
        let seq = state.next_seq;
        state.next_seq += 1;

        let update = PendingUpdate::new(kind, record, Utc::now(), seq);
        let update_id = update.id().clone();
        debug!(update_id = %update_id, record_id = %update.record_id(), %kind, "Recorded optimistic update");
        state.pending.push(update);

        if let Some(expiry) = self.schedule_expiry(update_id.clone()) {
            state.expiries.insert(update_id.clone(), expiry);
        }
        update_id
    }

    /// Removes a pending update. Returns `false` if it was not present.
    pub fn remove(&self, update_id: &UpdateId) -> bool {
        let mut state = lock(&self.state);
        if let Some(expiry) = state.expiries.remove(update_id) {
            expiry.abort();
        }
        let removed = state.remove_update(update_id);
        if removed {
            debug!(update_id = %update_id, "Removed optimistic update");
        }
        removed
    }

    /// Projects the pending updates onto an authoritative snapshot.
    ///
    /// Has no side effects; calling it repeatedly with the same inputs gives
    /// the same result.
    pub fn project(&self, snapshot: &[R]) -> Vec<R> {
        let state = lock(&self.state);
        apply_updates(snapshot, &state.pending)
    }

    /// A copy of the pending updates, oldest first.
    pub fn pending(&self) -> Vec<PendingUpdate<R>> {
        lock(&self.state).pending.clone()
    }

    /// Whether an update is still pending.
    pub fn contains(&self, update_id: &UpdateId) -> bool {
        lock(&self.state).pending.iter().any(|u| u.id() == update_id)
    }

    /// Number of pending updates.
    pub fn len(&self) -> usize {
        lock(&self.state).pending.len()
    }

    /// Whether no updates are pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn schedule_expiry(&self, update_id: UpdateId) -> Option<AbortHandle> {
        let Ok(runtime) = Handle::try_current() else {
            warn!(update_id = %update_id, "No tokio runtime, optimistic update will not auto-expire");
            return None;
        };

        let state: Weak<Mutex<OverlayState<R>>> = Arc::downgrade(&self.state);
        let deadline = Instant::now() + self.ttl;
        let task = runtime.spawn(async move {
            sleep_until(deadline).await;
            let Some(state) = state.upgrade() else {
                return;
            };
            let mut state = lock(&state);
            state.expiries.remove(&update_id);
            if state.remove_update(&update_id) {
                debug!(update_id = %update_id, "Optimistic update expired");
            }
        });
        Some(task.abort_handle())
    }
}

impl<R: Record + Send + 'static> Default for OverlayStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Drop for OverlayStore<R> {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        for (_, expiry) in state.expiries.drain() {
            expiry.abort();
        }
    }
}

impl<R> std::fmt::Debug for OverlayStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayStore")
            .field("pending", &lock(&self.state).pending.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}
