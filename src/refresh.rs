//! Debounced widget refresh.
//!
//! Every state change asks for a refresh, and setters tend to arrive in
//! bursts (url, then title, then description). The scheduler publishes the
//! fresh state right away but calls the widget's refresh entry point at most
//! once per burst: only after the requests have gone quiet, and only once the
//! widget's own minimum spacing between refreshes has passed.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, trace, warn};

use crate::host::{GlobalSlot, Page};
use crate::models::PluginInfo;
use crate::state::{SharedStore, StateStore, lock};

/// Period of the readiness check while a refresh is pending.
pub const DEFAULT_TICK_MS: u64 = 100;

/// Quiet time required after the last request.
pub const DEFAULT_QUIET_MS: u64 = 100;

/// The widget ignores refreshes closer together than this.
pub const DEFAULT_MIN_SPACING_MS: u64 = 500;

/// Timing parameters for the refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTiming {
    pub tick: Duration,
    pub quiet: Duration,
    pub min_spacing: Duration,
}

impl Default for RefreshTiming {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(DEFAULT_TICK_MS),
            quiet: Duration::from_millis(DEFAULT_QUIET_MS),
            min_spacing: Duration::from_millis(DEFAULT_MIN_SPACING_MS),
        }
    }
}

/// Bookkeeping for the current refresh cycle. Only the latest request counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshRequest {
    pub pending: bool,
    pub last_request_at: Option<Instant>,
}

/// Write the store's config, share config and plugin info to the page.
pub fn publish_globals(page: &dyn Page, store: &StateStore, plugin_info: &PluginInfo) {
    let mut info = plugin_info.clone();
    info.plugin_mode = store.plugin_mode();

    page.set_global(GlobalSlot::Config, store.config().to_value());
    page.set_global(GlobalSlot::Share, store.share().to_value());
    page.set_global(GlobalSlot::PluginInfo, info.to_value());
}

/// Coalesces refresh requests into single widget refresh calls.
pub struct RefreshScheduler {
    page: Arc<dyn Page>,
    store: SharedStore,
    plugin_info: PluginInfo,
    timing: RefreshTiming,
    request: Arc<Mutex<RefreshRequest>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshScheduler {
    pub fn new(
        page: Arc<dyn Page>,
        store: SharedStore,
        plugin_info: PluginInfo,
        timing: RefreshTiming,
    ) -> Self {
        Self {
            page,
            store,
            plugin_info,
            timing,
            request: Arc::new(Mutex::new(RefreshRequest::default())),
            task: Mutex::new(None),
        }
    }

    /// Request a widget refresh.
    ///
    /// Always records the request time and publishes the current state to
    /// the page. Starts a refresh cycle only when the widget can refresh and
    /// no cycle is pending; otherwise the request just extends the quiet
    /// window of the pending cycle, or is dropped if the widget isn't ready.
    pub fn queue_refresh(&self) {
        let mut request = lock(&self.request);
        request.last_request_at = Some(Instant::now());

        publish_globals(self.page.as_ref(), &lock(&self.store), &self.plugin_info);

        if request.pending {
            trace!("refresh already pending");
            return;
        }
        if !self.page.widget().is_some_and(|widget| widget.can_refresh()) {
            trace!("widget refresh unavailable, skipping");
            return;
        }
        let Ok(runtime) = Handle::try_current() else {
            warn!("no async runtime available, dropping refresh request");
            return;
        };

        request.pending = true;
        drop(request);

        debug!("starting refresh cycle");
        let cycle = run_cycle(
            Arc::clone(&self.page),
            Arc::clone(&self.store),
            Arc::clone(&self.request),
            self.timing,
        );
        *lock(&self.task) = Some(runtime.spawn(cycle));
    }

    /// Snapshot of the current request bookkeeping.
    pub fn request(&self) -> RefreshRequest {
        *lock(&self.request)
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.request).pending
    }

    pub fn timing(&self) -> RefreshTiming {
        self.timing
    }

    /// Cancel any pending cycle and forget the last request.
    pub fn reset(&self) {
        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
        *lock(&self.request) = RefreshRequest::default();
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
    }
}

/// Tick until the burst has settled and the widget accepts a refresh, then
/// refresh it once with the share url and title as they are at that moment.
async fn run_cycle(
    page: Arc<dyn Page>,
    store: SharedStore,
    request: Arc<Mutex<RefreshRequest>>,
    timing: RefreshTiming,
) {
    let mut ticker = interval_at(Instant::now() + timing.tick, timing.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let now = Instant::now();

        let Some(widget) = page.widget() else {
            continue;
        };
        let spaced = widget
            .last_refresh_at()
            .is_none_or(|at| now.saturating_duration_since(at) >= timing.min_spacing);

        {
            let mut request = lock(&request);
            let quiet = request
                .last_request_at
                .is_none_or(|at| now.saturating_duration_since(at) >= timing.quiet);
            if !(quiet && spaced) {
                trace!(quiet, spaced, "refresh not due yet");
                continue;
            }
            request.pending = false;
        }

        let share = lock(&store).share();
        debug!(url = ?share.url(), title = ?share.title(), "refreshing widget");
        widget.refresh(share.url(), share.title());
        return;
    }
}
