//! Refresh scheduler.
//!
//! Installs two independent triggers that call the caller's refresh
//! function: a recurring timer and a hidden-to-visible listener. Both are
//! installed together and released together through one `Disposer`.
//!
//! Refresh calls are detached tasks. The scheduler never awaits them, never
//! serializes overlapping calls and never retries a failed one; failures are
//! logged and dropped. Once `disable` returns no new refresh is started,
//! though calls already started run to completion.

use crate::config::{DEFAULT_SYNC_INTERVAL_MS, SchedulerConfig};
use crate::dispose::{Disposer, LiveGate};
use crate::error::{SyncError, SyncResult};
use crate::visibility::{Transitions, VisibilitySignal};
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

/// Future returned by a refresh call.
pub type RefreshFuture = BoxFuture<'static, anyhow::Result<()>>;

/// The caller's refresh function.
pub type RefreshFn = Arc<dyn Fn() -> RefreshFuture + Send + Sync>;

/// Wraps an async closure as a `RefreshFn`.
pub fn refresh_fn<F, Fut>(f: F) -> RefreshFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// What caused a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The recurring timer fired.
    Periodic,
    /// The host became visible.
    Visibility,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Periodic => f.write_str("periodic"),
            Self::Visibility => f.write_str("visibility"),
        }
    }
}

/// Options for one sync subscription.
#[derive(Clone)]
pub struct SyncOptions {
    pub refresh: RefreshFn,
    /// Refresh period (ms). Zero or negative selects 30 minutes.
    pub interval_ms: i64,
    pub enabled: bool,
}

impl SyncOptions {
    /// Enabled options with the default period.
    pub fn new(refresh: RefreshFn) -> Self {
        Self {
            refresh,
            interval_ms: DEFAULT_SYNC_INTERVAL_MS as i64,
            enabled: true,
        }
    }

    /// Options taken from configuration.
    pub fn from_config(refresh: RefreshFn, config: &SchedulerConfig) -> Self {
        Self {
            refresh,
            interval_ms: config.interval_ms,
            enabled: config.enabled,
        }
    }

    pub fn with_interval_ms(mut self, interval_ms: i64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// The effective refresh period.
    pub fn period(&self) -> Duration {
        match u64::try_from(self.interval_ms) {
            Ok(ms) if ms > 0 => Duration::from_millis(ms),
            _ => Duration::from_millis(DEFAULT_SYNC_INTERVAL_MS),
        }
    }

    fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.refresh, &other.refresh)
            && self.interval_ms == other.interval_ms
            && self.enabled == other.enabled
    }
}

impl fmt::Debug for SyncOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOptions")
            .field("interval_ms", &self.interval_ms)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// Owns the periodic timer and visibility listener of one subscription.
pub struct SyncScheduler {
    visibility: VisibilitySignal,
    options: Option<SyncOptions>,
    triggers: Option<Disposer>,
}

impl SyncScheduler {
    /// Creates an idle scheduler listening to `visibility`.
    pub fn new(visibility: VisibilitySignal) -> Self {
        Self {
            visibility,
            options: None,
            triggers: None,
        }
    }

    /// Applies new options.
    ///
    /// Any installed triggers are released before new ones are installed,
    /// so there is never more than one live timer. Options identical to the
    /// current ones (same refresh function, period and flag) leave the
    /// installed triggers running.
    pub fn configure(&mut self, options: SyncOptions) -> SyncResult<()> {
        if let Some(current) = &self.options {
            if current.same_as(&options) && self.triggers.is_some() == options.enabled {
                debug!("Sync options unchanged");
                return Ok(());
            }
        }

        self.teardown();
        if options.enabled {
            self.triggers = Some(self.install(&options)?);
        } else {
            debug!("Sync scheduler disabled, no triggers installed");
        }
        self.options = Some(options);
        Ok(())
    }

    /// Releases both triggers. Safe to call with nothing installed.
    pub fn disable(&mut self) {
        self.teardown();
        if let Some(options) = &mut self.options {
            options.enabled = false;
        }
    }

    /// Whether triggers are currently installed.
    pub fn is_active(&self) -> bool {
        self.triggers.is_some()
    }

    /// The options last applied.
    pub fn options(&self) -> Option<&SyncOptions> {
        self.options.as_ref()
    }

    /// The visibility signal the scheduler listens to.
    pub fn visibility(&self) -> &VisibilitySignal {
        &self.visibility
    }

    fn teardown(&mut self) {
        if let Some(mut triggers) = self.triggers.take() {
            triggers.dispose();
        }
    }

    fn install(&self, options: &SyncOptions) -> SyncResult<Disposer> {
        let runtime = Handle::try_current().map_err(|_| SyncError::NoRuntime)?;
        let gate = LiveGate::new();
        let period = options.period();

        let timer = runtime.spawn(run_periodic(
            options.refresh.clone(),
            Instant::now() + period,
            period,
            gate.clone(),
        ));
        let listener = runtime.spawn(run_visibility_listener(
            options.refresh.clone(),
            self.visibility.subscribe(),
            gate.clone(),
        ));

        info!(period_ms = period.as_millis() as u64, "Sync triggers installed");
        Ok(Disposer::new("sync triggers", move || {
            gate.close();
            timer.abort();
            listener.abort();
            debug!("Sync triggers released");
        }))
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for SyncScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncScheduler")
            .field("options", &self.options)
            .field("active", &self.is_active())
            .finish()
    }
}

async fn run_periodic(refresh: RefreshFn, start: Instant, period: Duration, gate: LiveGate) {
    let mut ticker = interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if gate.run(|| dispatch(&refresh, Trigger::Periodic)).is_none() {
            break;
        }
    }
}

async fn run_visibility_listener(
    refresh: RefreshFn,
    mut transitions: Transitions,
    gate: LiveGate,
) {
    while let Some(visible) = transitions.recv().await {
        let dispatched = gate.run(|| {
            if visible {
                dispatch(&refresh, Trigger::Visibility);
            }
        });
        if dispatched.is_none() {
            break;
        }
    }
}

/// Starts a refresh as a detached task. A failure is logged, not retried.
fn dispatch(refresh: &RefreshFn, trigger: Trigger) {
    debug!(%trigger, "Refresh triggered");
    let call = refresh();
    tokio::spawn(async move {
        if let Err(e) = call.await {
            warn!(%trigger, "Refresh failed: {e:#}");
        }
    });
}
