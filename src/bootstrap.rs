//! Startup reconciliation between locally built state and page globals.
//!
//! A page may define `addthis_config` / `addthis_share` in its markup before
//! the bridge starts, and the widget itself may already have loaded. Local
//! state wins whenever it has any content; an empty local blob adopts the
//! page's value instead.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::host::{GlobalSlot, Page, ScriptPlacement};
use crate::models::{DYNAMIC_SHARE_KEYS, PluginInfo};
use crate::refresh::publish_globals;
use crate::script;
use crate::state::StateStore;

/// Settings the reconciler needs from the bridge options.
#[derive(Debug, Clone)]
pub struct BootstrapSettings {
    pub auto_add: bool,
    pub base_url: String,
    pub placement: ScriptPlacement,
    pub plugin_info: PluginInfo,
}

/// What bootstrap did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    pub adopted_config: bool,
    pub adopted_share: bool,
    /// Share keys dropped because the widget had already filled them in.
    pub stripped_share_keys: Vec<String>,
    /// Address of the injected script, if one was added.
    pub injected_script: Option<String>,
}

/// Reconcile `store` with the page, publish the result and inject the script.
pub fn reconcile(
    store: &mut StateStore,
    page: &dyn Page,
    settings: &BootstrapSettings,
) -> BootstrapReport {
    let mut report = BootstrapReport::default();

    if store.config().is_empty() {
        if let Some(external) = non_empty_object(page.global(GlobalSlot::Config)) {
            info!(keys = external.len(), "adopting page general config");
            store.adopt_general_config(external);
            report.adopted_config = true;
        }
    }

    if store.share().is_empty() {
        if let Some(mut external) = non_empty_object(page.global(GlobalSlot::Share)) {
            // a widget that loaded first fills these in from the document
            if page.widget().is_some() {
                for key in DYNAMIC_SHARE_KEYS {
                    if external.remove(key).is_some() {
                        report.stripped_share_keys.push(key.to_string());
                    }
                }
            }
            info!(
                keys = external.len(),
                stripped = ?report.stripped_share_keys,
                "adopting page share config"
            );
            store.adopt_share_config(external);
            report.adopted_share = true;
        }
    }

    publish_globals(page, store, &settings.plugin_info);

    if settings.auto_add {
        report.injected_script = script::inject(
            page,
            &settings.base_url,
            store.profile_id().as_ref(),
            settings.placement,
        );
    } else {
        debug!("auto-add disabled, leaving script injection to the host");
    }

    report
}

fn non_empty_object(value: Option<Value>) -> Option<Map<String, Value>> {
    match value {
        Some(Value::Object(map)) if !map.is_empty() => Some(map),
        _ => None,
    }
}
