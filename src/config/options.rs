//! Runtime options for a bridge instance.

use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::bootstrap::BootstrapSettings;
use crate::host::ScriptPlacement;
use crate::models::{PluginInfo, ProfileId};
use crate::readiness::DEFAULT_LOAD_POLL_MS;
use crate::refresh::RefreshTiming;
use crate::script::Environment;

/// Default CMS name reported in the plugin info.
pub const DEFAULT_CMS_NAME: &str = "Rust";

/// Everything a bridge needs to know before it starts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeOptions {
    pub environment: Environment,
    /// Inject the widget script during bootstrap.
    pub auto_add: bool,
    pub script_placement: ScriptPlacement,
    pub profile_id: Option<ProfileId>,
    #[serde(serialize_with = "serialize_millis")]
    pub load_poll_interval: Duration,
    #[serde(skip)]
    pub refresh_timing: RefreshTiming,
    pub cms_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cms_version: Option<String>,
    /// General config applied before bootstrap.
    pub config: Map<String, Value>,
    /// Share config applied before bootstrap.
    pub share: Map<String, Value>,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            auto_add: true,
            script_placement: ScriptPlacement::default(),
            profile_id: None,
            load_poll_interval: Duration::from_millis(DEFAULT_LOAD_POLL_MS),
            refresh_timing: RefreshTiming::default(),
            cms_name: DEFAULT_CMS_NAME.to_string(),
            cms_version: None,
            config: Map::new(),
            share: Map::new(),
        }
    }
}

impl BridgeOptions {
    pub fn plugin_info(&self) -> PluginInfo {
        PluginInfo::new(self.cms_name.clone(), self.cms_version.clone())
    }

    pub fn bootstrap_settings(&self) -> BootstrapSettings {
        BootstrapSettings {
            auto_add: self.auto_add,
            base_url: self.environment.base_url(),
            placement: self.script_placement,
            plugin_info: self.plugin_info(),
        }
    }
}

fn serialize_millis<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}
