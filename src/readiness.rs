//! One-time "widget loaded" signal.
//!
//! The first call to [`ReadinessGate::loaded`] either resolves at once (the
//! widget is already on the page) or starts polling for it. Every caller gets
//! a clone of the same shared future, so code that asks before and after the
//! widget appears observes the same handle. There is no timeout: if the
//! widget never loads, the future never resolves.

use futures::FutureExt;
use futures::future::{self, BoxFuture, Shared};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::host::{Page, Widget};
use crate::state::lock;

/// Default period between presence checks.
pub const DEFAULT_LOAD_POLL_MS: u64 = 200;

/// Future resolving to the loaded widget.
pub type WidgetFuture = Shared<BoxFuture<'static, Arc<dyn Widget>>>;

/// Cached readiness signal.
#[derive(Default)]
pub struct LoadState {
    pub resolved: Arc<AtomicBool>,
    pub cached: Option<WidgetFuture>,
    poll: Option<JoinHandle<()>>,
}

/// Hands out the shared "widget loaded" future.
pub struct ReadinessGate {
    page: Arc<dyn Page>,
    poll_interval: Duration,
    state: Mutex<LoadState>,
}

impl ReadinessGate {
    pub fn new(page: Arc<dyn Page>, poll_interval: Duration) -> Self {
        Self {
            page,
            poll_interval,
            state: Mutex::new(LoadState::default()),
        }
    }

    /// Future that resolves once the widget is on the page.
    pub fn loaded(&self) -> WidgetFuture {
        let mut state = lock(&self.state);
        if let Some(ref cached) = state.cached {
            return cached.clone();
        }

        let signal = match self.page.widget() {
            Some(widget) => {
                state.resolved.store(true, Ordering::SeqCst);
                future::ready(widget).boxed().shared()
            }
            None => match Handle::try_current() {
                Ok(runtime) => {
                    let (tx, rx) = oneshot::channel();
                    state.poll = Some(runtime.spawn(poll_for_widget(
                        Arc::clone(&self.page),
                        self.poll_interval,
                        Arc::clone(&state.resolved),
                        tx,
                    )));
                    rx.then(|received| async move {
                        match received {
                            Ok(widget) => widget,
                            Err(_) => future::pending().await,
                        }
                    })
                    .boxed()
                    .shared()
                }
                // No runtime to own the poll; poll from whoever awaits instead.
                Err(_) => lazy_poll(
                    Arc::clone(&self.page),
                    self.poll_interval,
                    Arc::clone(&state.resolved),
                )
                .boxed()
                .shared(),
            },
        };

        state.cached = Some(signal.clone());
        signal
    }

    /// Whether the widget has been seen.
    pub fn is_resolved(&self) -> bool {
        lock(&self.state).resolved.load(Ordering::SeqCst)
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Forget the cached future and stop polling.
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        if let Some(poll) = state.poll.take() {
            poll.abort();
        }
        *state = LoadState::default();
    }
}

impl Drop for ReadinessGate {
    fn drop(&mut self) {
        if let Some(poll) = lock(&self.state).poll.take() {
            poll.abort();
        }
    }
}

async fn poll_for_widget(
    page: Arc<dyn Page>,
    period: Duration,
    resolved: Arc<AtomicBool>,
    tx: oneshot::Sender<Arc<dyn Widget>>,
) {
    let widget = lazy_poll(page, period, resolved).await;
    // every receiver may be gone already; nothing to report then
    let _ = tx.send(widget);
}

async fn lazy_poll(
    page: Arc<dyn Page>,
    period: Duration,
    resolved: Arc<AtomicBool>,
) -> Arc<dyn Widget> {
    debug!(?period, "waiting for widget to load");
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately and the page was just checked
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if let Some(widget) = page.widget() {
            info!("widget loaded");
            resolved.store(true, Ordering::SeqCst);
            return widget;
        }
    }
}
