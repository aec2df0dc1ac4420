//! Client-side sync and reconciliation engine for livesync.
//!
//! Keeps a locally displayed collection consistent with an authoritative
//! remote source while showing not-yet-confirmed local mutations.
//!
//! # Components
//!
//! - **Overlay** ([`OverlayStore`]): pending optimistic updates and the pure
//!   projection of those updates onto an authoritative snapshot
//! - **Scheduler** ([`SyncScheduler`]): periodic and visibility-driven
//!   refresh triggers
//! - **Realtime** ([`RealtimeBridge`]): topic subscription on a push
//!   transport, forwarding insert/update/delete notifications
//!
//! The components do not know about each other. The calling layer wires them
//! into one display cycle: refresh and push callbacks update its snapshot,
//! and before rendering it asks the overlay to project pending updates.
//!
//! # Lifecycle
//!
//! Every installed timer, listener or channel is owned through a
//! [`Disposer`]. Reconfiguring a component releases the previous one before
//! installing the next; dropping the component releases everything.
//!
//! # Example
//!
//! ```
//! use livesync_sync::OverlayStore;
//! use livesync_types::{JsonRecord, UpdateKind};
//!
//! let overlay: OverlayStore<JsonRecord> = OverlayStore::new();
//! let snapshot = vec![JsonRecord::with_id(1).set("name", "orig")];
//!
//! overlay.add(UpdateKind::Update, JsonRecord::with_id(1).set("name", "edited"));
//! let view = overlay.project(&snapshot);
//! assert_eq!(view[0].get("name"), Some(&serde_json::json!("edited")));
//! ```

pub mod config;
pub mod dispose;
mod error;
pub mod overlay;
pub mod realtime;
pub mod scheduler;
pub mod transport;
pub mod visibility;

pub use config::{
    DEFAULT_SYNC_INTERVAL_MS, DEFAULT_UPDATE_TTL_MS, LiveSyncConfig, OverlayConfig,
    RealtimeConfig, SchedulerConfig,
};
pub use dispose::Disposer;
pub use error::{SyncError, SyncResult};
pub use overlay::{OverlayStore, apply_updates};
pub use realtime::{ChangeHandler, RealtimeBridge, RealtimeOptions, change_handler};
pub use scheduler::{RefreshFn, RefreshFuture, SyncOptions, SyncScheduler, Trigger, refresh_fn};
pub use transport::memory::InMemoryTransport;
pub use transport::{
    ChangeEvent, ChangeKind, ChannelHandle, ChannelSpec, EventSink, PushTransport,
    SharedTransport,
};
pub use visibility::{Transitions, VisibilitySignal};
