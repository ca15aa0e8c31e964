//! The bridge context object.
//!
//! [`BridgeBuilder`] collects options and initial state before the widget is
//! involved; [`BridgeBuilder::build`] reconciles with the page and returns a
//! [`ShareBridge`] that owns the store, the refresh scheduler and the
//! readiness gate. Every mutation on the bridge queues a refresh.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::bootstrap::{self, BootstrapReport};
use crate::config::BridgeOptions;
use crate::host::{Page, ScriptPlacement};
use crate::models::{GeneralConfig, PluginMode, ProfileId, ShareConfig};
use crate::readiness::{ReadinessGate, WidgetFuture};
use crate::refresh::{RefreshRequest, RefreshScheduler, RefreshTiming};
use crate::script::{self, Environment};
use crate::state::{SharedStore, StateStore, lock};

/// Configures a bridge before it starts.
pub struct BridgeBuilder {
    page: Arc<dyn Page>,
    options: BridgeOptions,
    store: StateStore,
}

impl BridgeBuilder {
    pub fn new(page: Arc<dyn Page>) -> Self {
        Self {
            page,
            options: BridgeOptions::default(),
            store: StateStore::new(),
        }
    }

    /// Replace the options and apply their initial profile id and configs.
    pub fn options(mut self, options: BridgeOptions) -> Self {
        if !options.config.is_empty() {
            self.store
                .set_general_config(&Value::Object(options.config.clone()));
        }
        if !options.share.is_empty() {
            self.store
                .set_share_config(&Value::Object(options.share.clone()));
        }
        if let Some(ref id) = options.profile_id {
            self.store.set_profile_id(id.clone());
        }
        self.options = options;
        self
    }

    pub fn profile_id(mut self, id: ProfileId) -> Self {
        self.options.profile_id = Some(id.clone());
        self.store.set_profile_id(id);
        self
    }

    pub fn config(mut self, input: &Value) -> Self {
        self.store.set_general_config(input);
        self
    }

    pub fn share(mut self, input: &Value) -> Self {
        self.store.set_share_config(input);
        self
    }

    pub fn share_url(mut self, url: impl Into<String>) -> Self {
        self.store.set_share_field("url", url.into());
        self
    }

    pub fn share_title(mut self, title: impl Into<String>) -> Self {
        self.store.set_share_field("title", title.into());
        self
    }

    pub fn share_description(mut self, description: impl Into<String>) -> Self {
        self.store.set_share_field("description", description.into());
        self
    }

    pub fn share_media(mut self, media: impl Into<String>) -> Self {
        self.store.set_share_field("media", media.into());
        self
    }

    pub fn twitter_via(mut self, handle: &Value) -> Self {
        self.store.twitter_via(handle);
        self
    }

    pub fn url_shortening(mut self, shortener: &str, social_service: &str) -> Self {
        self.store.url_shortening(shortener, social_service);
        self
    }

    /// Leave script injection to [`ShareBridge::add`].
    pub fn disable_auto_add(mut self) -> Self {
        self.options.auto_add = false;
        self
    }

    pub fn enable_auto_add(mut self) -> Self {
        self.options.auto_add = true;
        self
    }

    pub fn script_in_head(mut self) -> Self {
        self.options.script_placement = ScriptPlacement::Head;
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.options.environment = environment;
        self
    }

    pub fn refresh_timing(mut self, timing: RefreshTiming) -> Self {
        self.options.refresh_timing = timing;
        self
    }

    pub fn load_poll_interval(mut self, interval: Duration) -> Self {
        self.options.load_poll_interval = interval;
        self
    }

    /// Script address for the current environment, without the profile.
    pub fn base_url(&self) -> String {
        self.options.environment.base_url()
    }

    /// Reconcile with the page and start the bridge.
    pub fn build(self) -> ShareBridge {
        let BridgeBuilder {
            page,
            options,
            mut store,
        } = self;

        let report = bootstrap::reconcile(&mut store, page.as_ref(), &options.bootstrap_settings());
        let store = store.into_shared();
        let scheduler = RefreshScheduler::new(
            Arc::clone(&page),
            Arc::clone(&store),
            options.plugin_info(),
            options.refresh_timing,
        );
        let gate = ReadinessGate::new(Arc::clone(&page), options.load_poll_interval);

        ShareBridge {
            page,
            store,
            options,
            scheduler,
            gate,
            report,
        }
    }
}

/// A running bridge between the host application and the share widget.
pub struct ShareBridge {
    page: Arc<dyn Page>,
    store: SharedStore,
    options: BridgeOptions,
    scheduler: RefreshScheduler,
    gate: ReadinessGate,
    report: BootstrapReport,
}

impl ShareBridge {
    pub fn builder(page: Arc<dyn Page>) -> BridgeBuilder {
        BridgeBuilder::new(page)
    }

    /// Replace the general config and queue a refresh.
    pub fn set_general_config(&self, input: &Value) -> GeneralConfig {
        let config = lock(&self.store).set_general_config(input);
        self.scheduler.queue_refresh();
        config
    }

    /// Replace the share config and queue a refresh.
    pub fn set_share_config(&self, input: &Value) -> ShareConfig {
        let share = lock(&self.store).set_share_config(input);
        self.scheduler.queue_refresh();
        share
    }

    pub fn general_config(&self) -> GeneralConfig {
        lock(&self.store).config()
    }

    pub fn share_config(&self) -> ShareConfig {
        lock(&self.store).share()
    }

    pub fn set_share_url(&self, url: impl Into<String>) {
        self.set_share_field("url", url.into());
    }

    pub fn set_share_title(&self, title: impl Into<String>) {
        self.set_share_field("title", title.into());
    }

    pub fn set_share_description(&self, description: impl Into<String>) {
        self.set_share_field("description", description.into());
    }

    pub fn set_share_media(&self, media: impl Into<String>) {
        self.set_share_field("media", media.into());
    }

    pub fn share_url(&self) -> Option<String> {
        self.share_config().url().map(str::to_string)
    }

    pub fn share_title(&self) -> Option<String> {
        self.share_config().title().map(str::to_string)
    }

    pub fn share_description(&self) -> Option<String> {
        self.share_config().description().map(str::to_string)
    }

    pub fn share_media(&self) -> Option<String> {
        self.share_config().media().map(str::to_string)
    }

    /// Set (`"handle"`) or clear (`false`) the Twitter via handle.
    pub fn twitter_via(&self, handle: &Value) {
        lock(&self.store).twitter_via(handle);
        self.scheduler.queue_refresh();
    }

    pub fn url_shortening(&self, shortener: &str, social_service: &str) {
        lock(&self.store).url_shortening(shortener, social_service);
        self.scheduler.queue_refresh();
    }

    pub fn profile_id(&self) -> Option<ProfileId> {
        lock(&self.store).profile_id()
    }

    pub fn plugin_mode(&self) -> PluginMode {
        lock(&self.store).plugin_mode()
    }

    /// Inject the widget script now. Returns the address when a tag was added.
    pub fn add(&self) -> Option<String> {
        let profile_id = self.profile_id();
        script::inject(
            self.page.as_ref(),
            &self.options.environment.base_url(),
            profile_id.as_ref(),
            self.options.script_placement,
        )
    }

    /// Ask the widget to re-render with the current state.
    pub fn layers_refresh(&self) {
        self.scheduler.queue_refresh();
    }

    /// Route change notification from the host application.
    pub fn location_changed(&self, next: &str, current: &str) {
        if next == current {
            debug!(%next, "location unchanged, not refreshing");
            return;
        }
        debug!(%current, %next, "location changed");
        self.scheduler.queue_refresh();
    }

    /// Future resolving once the widget has loaded.
    pub fn loaded(&self) -> WidgetFuture {
        self.gate.loaded()
    }

    pub fn is_loaded(&self) -> bool {
        self.gate.is_resolved()
    }

    /// Whether a refresh cycle is waiting to fire.
    pub fn refresh_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    pub fn refresh_request(&self) -> RefreshRequest {
        self.scheduler.request()
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    pub fn bootstrap_report(&self) -> &BootstrapReport {
        &self.report
    }

    /// Cancel the pending refresh and forget the readiness signal.
    pub fn reset(&self) {
        self.scheduler.reset();
        self.gate.reset();
    }

    fn set_share_field(&self, key: &str, value: String) {
        lock(&self.store).set_share_field(key, value);
        self.scheduler.queue_refresh();
    }
}
