//! Simulated display cycle for livesync.
//!
//! Wires the three sync components the way a UI layer would: an in-memory
//! "server" table stands in for the authoritative source, the scheduler's
//! refresh copies it into the local snapshot, push notifications from the
//! in-memory transport patch the snapshot, and the overlay projects pending
//! local edits on top before each render.

pub mod delta;

use livesync_sync::{
    ChangeKind, InMemoryTransport, LiveSyncConfig, OverlayStore, PushTransport, RealtimeBridge,
    RealtimeOptions, SharedTransport, SyncOptions, SyncResult, SyncScheduler, VisibilitySignal,
    change_handler, refresh_fn,
};
use std::path::Path;
use livesync_types::{JsonRecord, Record, RecordId, UpdateId, UpdateKind};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::info;

type Table = Arc<Mutex<Vec<JsonRecord>>>;

fn lock(table: &Mutex<Vec<JsonRecord>>) -> MutexGuard<'_, Vec<JsonRecord>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Parses a JSON array of rows. Every row must be an object with an `id`.
pub fn parse_rows(json: &str) -> SyncResult<Vec<JsonRecord>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let mut rows = Vec::with_capacity(values.len());
    for value in values {
        rows.push(JsonRecord::from_value(value)?);
    }
    Ok(rows)
}

/// Reads seed rows from a JSON file.
pub fn load_rows(path: impl AsRef<Path>) -> SyncResult<Vec<JsonRecord>> {
    parse_rows(&std::fs::read_to_string(path)?)
}

/// One running display cycle.
pub struct DemoApp {
    topic: String,
    server: Table,
    snapshot: Table,
    overlay: OverlayStore<JsonRecord>,
    transport: Arc<InMemoryTransport>,
    visibility: VisibilitySignal,
    scheduler: SyncScheduler,
    bridge: RealtimeBridge,
    refreshes: Arc<AtomicUsize>,
}

impl DemoApp {
    /// Starts the cycle with `seed` as both server contents and initial snapshot.
    pub fn start(config: &LiveSyncConfig, seed: Vec<JsonRecord>) -> SyncResult<Self> {
        config.validate()?;

        let server: Table = Arc::new(Mutex::new(seed.clone()));
        let snapshot: Table = Arc::new(Mutex::new(seed));
        let refreshes = Arc::new(AtomicUsize::new(0));
        let transport = Arc::new(InMemoryTransport::new());
        let visibility = VisibilitySignal::new(true);

        let refresh = refresh_fn({
            let server = Arc::clone(&server);
            let snapshot = Arc::clone(&snapshot);
            let refreshes = Arc::clone(&refreshes);
            move || {
                let server = Arc::clone(&server);
                let snapshot = Arc::clone(&snapshot);
                let refreshes = Arc::clone(&refreshes);
                async move {
                    let rows = lock(&server).clone();
                    let count = rows.len();
                    *lock(&snapshot) = rows;
                    let n = refreshes.fetch_add(1, Ordering::SeqCst) + 1;
                    info!(refresh = n, rows = count, "Snapshot refreshed");
                    anyhow::Ok(())
                }
            }
        });

        let mut scheduler = SyncScheduler::new(visibility.clone());
        scheduler.configure(SyncOptions::from_config(refresh, &config.scheduler))?;

        let apply = {
            let snapshot = Arc::clone(&snapshot);
            change_handler(move |event| delta::apply_change(&mut lock(&snapshot), &event))
        };
        let shared = SharedTransport::available(transport.clone() as Arc<dyn PushTransport>);
        let mut bridge = RealtimeBridge::new(shared);
        bridge.configure(
            RealtimeOptions::new(config.realtime.topic.clone())
                .with_enabled(config.realtime.enabled)
                .on_insert(Arc::clone(&apply))
                .on_update(Arc::clone(&apply))
                .on_delete(apply),
        )?;

        info!(topic = %config.realtime.topic, "Display cycle started");
        Ok(Self {
            topic: config.realtime.topic.clone(),
            server,
            snapshot,
            overlay: OverlayStore::with_config(&config.overlay),
            transport,
            visibility,
            scheduler,
            bridge,
            refreshes,
        })
    }

    /// Inserts or replaces a row on the server and pushes the change.
    pub fn server_upsert(&self, record: JsonRecord) -> usize {
        let id = record.id();
        let kind = {
            let mut server = lock(&self.server);
            match server.iter_mut().find(|r| r.id() == id) {
                Some(existing) => {
                    *existing = record.clone();
                    ChangeKind::Update
                }
                None => {
                    server.push(record.clone());
                    ChangeKind::Insert
                }
            }
        };
        self.transport
            .publish(&self.topic, kind, json!({ "new": record.into_value() }))
    }

    /// Deletes a row on the server and pushes the change.
    pub fn server_delete(&self, id: &RecordId) -> usize {
        lock(&self.server).retain(|r| r.id() != *id);
        self.transport.publish(
            &self.topic,
            ChangeKind::Delete,
            json!({ "old": { "id": id.to_json() } }),
        )
    }

    /// Changes a row on the server without notifying anyone.
    ///
    /// Only a refresh makes such a change visible.
    pub fn server_upsert_silently(&self, record: JsonRecord) {
        let id = record.id();
        let mut server = lock(&self.server);
        match server.iter_mut().find(|r| r.id() == id) {
            Some(existing) => *existing = record,
            None => server.push(record),
        }
    }

    /// Records an optimistic local edit.
    pub fn local_change(&self, kind: UpdateKind, record: JsonRecord) -> UpdateId {
        self.overlay.add(kind, record)
    }

    /// Drops an optimistic edit once the server has absorbed it.
    pub fn confirm(&self, update_id: &UpdateId) -> bool {
        self.overlay.remove(update_id)
    }

    /// What the user sees: pending edits projected onto the snapshot.
    pub fn view(&self) -> Vec<JsonRecord> {
        let snapshot = lock(&self.snapshot).clone();
        self.overlay.project(&snapshot)
    }

    /// The last authoritative snapshot, without pending edits.
    pub fn snapshot(&self) -> Vec<JsonRecord> {
        lock(&self.snapshot).clone()
    }

    /// Number of optimistic edits still pending.
    pub fn pending_count(&self) -> usize {
        self.overlay.len()
    }

    /// Reports host visibility.
    pub fn set_visible(&self, visible: bool) -> bool {
        self.visibility.set_visible(visible)
    }

    /// Number of completed refreshes.
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Whether the realtime channel is live.
    pub fn is_subscribed(&self) -> bool {
        self.bridge.is_subscribed()
    }

    /// Releases timers, listeners and channels.
    pub fn shutdown(&mut self) {
        self.scheduler.disable();
        self.bridge.disable();
        info!("Display cycle stopped");
    }
}
