//! Realtime bridge.
//!
//! Subscribes to insert/update/delete notifications for one topic and
//! forwards each, unmodified, to the matching handler. The channel is
//! released before any replacement is opened, so a notification is never
//! delivered twice by overlapping subscriptions.
//!
//! Once `disable` returns, no handler is running and none will run again.
//! Handlers must not disable their own bridge.
//!
//! A missing transport is a valid offline mode: the bridge logs a warning
//! and stays unsubscribed. Subscription failures are returned to the caller
//! and not retried.

use crate::dispose::{Disposer, LiveGate};
use crate::error::{SyncError, SyncResult};
use crate::transport::{ChangeEvent, ChangeKind, ChannelHandle, ChannelSpec, PushTransport, SharedTransport};
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Callback receiving one change notification.
pub type ChangeHandler = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

/// Wraps a closure as a `ChangeHandler`.
pub fn change_handler<F>(f: F) -> ChangeHandler
where
    F: Fn(ChangeEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Options for one realtime subscription.
#[derive(Clone)]
pub struct RealtimeOptions {
    pub topic: String,
    pub enabled: bool,
    pub on_insert: Option<ChangeHandler>,
    pub on_update: Option<ChangeHandler>,
    pub on_delete: Option<ChangeHandler>,
}

impl RealtimeOptions {
    /// Enabled options for `topic` with no handlers.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            enabled: true,
            on_insert: None,
            on_update: None,
            on_delete: None,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn on_insert(mut self, handler: ChangeHandler) -> Self {
        self.on_insert = Some(handler);
        self
    }

    pub fn on_update(mut self, handler: ChangeHandler) -> Self {
        self.on_update = Some(handler);
        self
    }

    pub fn on_delete(mut self, handler: ChangeHandler) -> Self {
        self.on_delete = Some(handler);
        self
    }

    /// Name of the transport channel for this topic.
    pub fn channel_name(&self) -> String {
        format!("realtime-{}", self.topic)
    }

    fn same_as(&self, other: &Self) -> bool {
        fn same(a: &Option<ChangeHandler>, b: &Option<ChangeHandler>) -> bool {
            match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                _ => false,
            }
        }
        self.topic == other.topic
            && self.enabled == other.enabled
            && same(&self.on_insert, &other.on_insert)
            && same(&self.on_update, &other.on_update)
            && same(&self.on_delete, &other.on_delete)
    }
}

impl fmt::Debug for RealtimeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeOptions")
            .field("topic", &self.topic)
            .field("enabled", &self.enabled)
            .field("on_insert", &self.on_insert.is_some())
            .field("on_update", &self.on_update.is_some())
            .field("on_delete", &self.on_delete.is_some())
            .finish()
    }
}

struct Handlers {
    on_insert: Option<ChangeHandler>,
    on_update: Option<ChangeHandler>,
    on_delete: Option<ChangeHandler>,
}

impl Handlers {
    fn for_kind(&self, kind: ChangeKind) -> Option<&ChangeHandler> {
        match kind {
            ChangeKind::Insert => self.on_insert.as_ref(),
            ChangeKind::Update => self.on_update.as_ref(),
            ChangeKind::Delete => self.on_delete.as_ref(),
        }
    }
}

/// Owns at most one live channel subscription.
pub struct RealtimeBridge {
    transport: SharedTransport,
    options: Option<RealtimeOptions>,
    channel: Option<Disposer>,
}

impl RealtimeBridge {
    /// Creates an unsubscribed bridge over the shared transport.
    pub fn new(transport: SharedTransport) -> Self {
        Self {
            transport,
            options: None,
            channel: None,
        }
    }

    /// Applies new options, replacing any live subscription.
    ///
    /// Returns an error only if the transport rejects the subscription; in
    /// that case nothing stays subscribed and calling again with the same
    /// options retries.
    pub fn configure(&mut self, options: RealtimeOptions) -> SyncResult<()> {
        if let Some(current) = &self.options {
            if current.same_as(&options) {
                debug!(topic = %options.topic, "Realtime options unchanged");
                return Ok(());
            }
        }

        self.teardown();
        self.options = None;

        if options.enabled {
            match self.transport.get() {
                Some(transport) => {
                    self.channel = Some(open_channel(transport, &options)?);
                }
                None => {
                    warn!(topic = %options.topic, "Push transport not available, skipping realtime subscription");
                }
            }
        }
        self.options = Some(options);
        Ok(())
    }

    /// Releases the subscription. Safe to call with nothing subscribed.
    pub fn disable(&mut self) {
        self.teardown();
        if let Some(options) = &mut self.options {
            options.enabled = false;
        }
    }

    /// Whether a channel is currently subscribed.
    pub fn is_subscribed(&self) -> bool {
        self.channel.is_some()
    }

    /// The options last applied successfully.
    pub fn options(&self) -> Option<&RealtimeOptions> {
        self.options.as_ref()
    }

    fn teardown(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.dispose();
        }
    }
}

impl Drop for RealtimeBridge {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for RealtimeBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeBridge")
            .field("transport", &self.transport)
            .field("options", &self.options)
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

fn open_channel(transport: Arc<dyn PushTransport>, options: &RealtimeOptions) -> SyncResult<Disposer> {
    let runtime = Handle::try_current().map_err(|_| SyncError::NoRuntime)?;
    let channel = options.channel_name();
    let (sink, mut events) = mpsc::unbounded_channel();

    let mut handles: Vec<ChannelHandle> = Vec::with_capacity(ChangeKind::ALL.len());
    for kind in ChangeKind::ALL {
        let spec = ChannelSpec {
            channel: channel.clone(),
            topic: options.topic.clone(),
            kind,
        };
        match transport.subscribe(&spec, sink.clone()) {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                for handle in handles {
                    transport.unsubscribe(handle);
                }
                warn!(%channel, %kind, "Realtime subscription failed: {e}");
                return Err(e);
            }
        }
    }
    drop(sink);

    let handlers = Handlers {
        on_insert: options.on_insert.clone(),
        on_update: options.on_update.clone(),
        on_delete: options.on_delete.clone(),
    };
    let gate = LiveGate::new();
    let forwarder = runtime.spawn({
        let gate = gate.clone();
        async move {
            while let Some(event) = events.recv().await {
                let delivered = gate.run(|| match handlers.for_kind(event.kind) {
                    Some(handler) => handler(event),
                    None => debug!(kind = %event.kind, "No handler, change dropped"),
                });
                if delivered.is_none() {
                    break;
                }
            }
        }
    });

    info!(%channel, transport = transport.name(), "Realtime channel subscribed");
    Ok(Disposer::new("realtime channel", move || {
        gate.close();
        for handle in handles {
            transport.unsubscribe(handle);
        }
        forwarder.abort();
        debug!(%channel, "Realtime channel released");
    }))
}
