//! Push transport abstraction.
//!
//! The realtime bridge only needs a subscribable event source keyed by topic
//! that emits insert/update/delete notifications. Concrete transports
//! (websocket channels, database change feeds, ...) implement
//! `PushTransport`; `SharedTransport` is the process-wide, lazily created
//! handle to one of them, which may be unavailable.

use crate::error::SyncResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tokio::sync::mpsc;

/// Kind of change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    /// All kinds, in subscription order.
    pub const ALL: [ChangeKind; 3] = [ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete];
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => f.write_str("INSERT"),
            Self::Update => f.write_str("UPDATE"),
            Self::Delete => f.write_str("DELETE"),
        }
    }
}

/// One change notification as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Topic the change belongs to.
    pub topic: String,
    /// What happened.
    pub kind: ChangeKind,
    /// Transport-defined description of the changed record.
    pub record_delta: serde_json::Value,
}

/// What to subscribe to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    /// Channel name, one per topic and subscriber.
    pub channel: String,
    pub topic: String,
    pub kind: ChangeKind,
}

/// Where a transport delivers notifications for a subscription.
pub type EventSink = mpsc::UnboundedSender<ChangeEvent>;

/// Transport-issued handle for a live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelHandle(u64);

impl ChannelHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

/// An external push channel.
pub trait PushTransport: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Starts delivering `spec.kind` notifications for `spec.topic` to `sink`.
    fn subscribe(&self, spec: &ChannelSpec, sink: EventSink) -> SyncResult<ChannelHandle>;

    /// Stops a subscription. Unknown handles are ignored.
    fn unsubscribe(&self, handle: ChannelHandle);
}

type TransportInit = dyn Fn() -> Option<Arc<dyn PushTransport>> + Send + Sync;

/// Process-wide handle to the push transport.
///
/// The transport is created on first use; `None` from the initializer marks
/// it unavailable for the lifetime of the handle.
#[derive(Clone)]
pub struct SharedTransport {
    cell: Arc<OnceLock<Option<Arc<dyn PushTransport>>>>,
    init: Arc<TransportInit>,
}

impl SharedTransport {
    /// Creates the transport lazily with `init`.
    pub fn lazy<F>(init: F) -> Self
    where
        F: Fn() -> Option<Arc<dyn PushTransport>> + Send + Sync + 'static,
    {
        Self {
            cell: Arc::new(OnceLock::new()),
            init: Arc::new(init),
        }
    }

    /// Wraps an already-created transport.
    pub fn available(transport: Arc<dyn PushTransport>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(Some(transport));
        Self {
            cell: Arc::new(cell),
            init: Arc::new(|| None),
        }
    }

    /// A handle whose transport never exists (offline mode).
    pub fn unavailable() -> Self {
        Self::lazy(|| None)
    }

    /// Returns the transport, creating it on first call.
    pub fn get(&self) -> Option<Arc<dyn PushTransport>> {
        self.cell.get_or_init(|| (self.init)()).clone()
    }

    /// Whether a transport exists.
    pub fn is_available(&self) -> bool {
        self.get().is_some()
    }
}

impl fmt::Debug for SharedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.cell.get() {
            None => "uninitialized",
            Some(None) => "unavailable",
            Some(Some(_)) => "available",
        };
        f.debug_struct("SharedTransport").field("state", &state).finish()
    }
}

/// An in-process transport, used in tests and the demo.
pub mod memory {
    use super::*;
    use crate::error::SyncError;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use tracing::debug;

    struct Registration {
        spec: ChannelSpec,
        sink: EventSink,
    }

    /// Delivers published changes to subscribers of the matching topic and kind.
    #[derive(Default)]
    pub struct InMemoryTransport {
        next_handle: AtomicU64,
        channels: Mutex<HashMap<ChannelHandle, Registration>>,
        fail_subscribe: AtomicBool,
    }

    impl InMemoryTransport {
        /// Creates an empty transport.
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes subsequent `subscribe` calls fail (or succeed again).
        pub fn set_fail_subscribe(&self, fail: bool) {
            self.fail_subscribe.store(fail, Ordering::SeqCst);
        }

        /// Publishes a change. Returns how many subscribers received it.
        pub fn publish(&self, topic: &str, kind: ChangeKind, record_delta: serde_json::Value) -> usize {
            let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
            let mut delivered = 0;
            for registration in channels.values() {
                if registration.spec.topic != topic || registration.spec.kind != kind {
                    continue;
                }
                let event = ChangeEvent {
                    topic: topic.to_string(),
                    kind,
                    record_delta: record_delta.clone(),
                };
                if registration.sink.send(event).is_ok() {
                    delivered += 1;
                }
            }
            debug!(topic, %kind, delivered, "Published change");
            delivered
        }

        /// Number of live subscriptions.
        pub fn active_channels(&self) -> usize {
            self.channels.lock().unwrap_or_else(|e| e.into_inner()).len()
        }

        /// Number of live subscriptions for `topic`.
        pub fn channels_for(&self, topic: &str) -> usize {
            self.channels
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .values()
                .filter(|r| r.spec.topic == topic)
                .count()
        }
    }

    impl PushTransport for InMemoryTransport {
        fn name(&self) -> &str {
            "in-memory"
        }

        fn subscribe(&self, spec: &ChannelSpec, sink: EventSink) -> SyncResult<ChannelHandle> {
            if self.fail_subscribe.load(Ordering::SeqCst) {
                return Err(SyncError::SubscriptionRejected {
                    topic: spec.topic.clone(),
                    reason: "subscriptions disabled".into(),
                });
            }
            if sink.is_closed() {
                return Err(SyncError::Transport(format!(
                    "event sink for channel {} is closed",
                    spec.channel
                )));
            }
            let handle = ChannelHandle::new(self.next_handle.fetch_add(1, Ordering::SeqCst));
            self.channels
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(
                    handle,
                    Registration {
                        spec: spec.clone(),
                        sink,
                    },
                );
            Ok(handle)
        }

        fn unsubscribe(&self, handle: ChannelHandle) {
            self.channels
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&handle);
        }
    }
}
