//! Data models shared between the bridge and the widget.
//!
//! This module defines the core data structures:
//! - `GeneralConfig` - the widget's general configuration (`addthis_config`)
//! - `ShareConfig` - what gets shared (`addthis_share`)
//! - `ProfileId` - the account/site identifier (`pubid`)
//! - `PluginMode` - whether server-side profile settings apply
//! - `PluginInfo` - the integration record published for usage diagnostics

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Reserved general config key holding the profile identifier.
pub const PUBID_KEY: &str = "pubid";

/// Reserved general config key that switches the widget to local-only settings.
pub const IGNORE_SERVER_CONFIG_KEY: &str = "ignore_server_config";

/// Share config keys the widget fills in on its own when it loads first.
pub const DYNAMIC_SHARE_KEYS: [&str; 4] = ["url", "title", "description", "media"];

/// Loose truthiness as the widget evaluates it.
///
/// `null`, `false`, `0`, and the empty string are falsy. Everything else,
/// including empty arrays and objects, is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Site profile identifier. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    /// Create a profile id, rejecting the empty string.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.is_empty() { None } else { Some(Self(id)) }
    }

    /// Extract a profile id from a `pubid` value.
    ///
    /// Truthy strings and numbers are accepted; numbers keep their JSON text.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !is_truthy(value) {
            return None;
        }
        match value {
            Value::String(s) => Self::new(s.clone()),
            Value::Number(n) => Self::new(n.to_string()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether the widget honours the server-side settings for the profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginMode {
    /// `ignore_server_config` is set; only local settings apply.
    Local,
    /// Server-side profile settings apply (the widget calls this "AddThis").
    #[default]
    #[serde(rename = "AddThis")]
    Remote,
}

impl PluginMode {
    /// Derive the mode from a general config's `ignore_server_config` flag.
    pub fn from_config(config: &Map<String, Value>) -> Self {
        match config.get(IGNORE_SERVER_CONFIG_KEY) {
            Some(flag) if is_truthy(flag) => PluginMode::Local,
            _ => PluginMode::Remote,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PluginMode::Local => "Local",
            PluginMode::Remote => "AddThis",
        }
    }
}

impl fmt::Display for PluginMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// General widget configuration.
///
/// Opaque to the bridge apart from `pubid` and `ignore_server_config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneralConfig(Map<String, Value>);

impl GeneralConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The `pubid` entry, if it is a string.
    pub fn pubid(&self) -> Option<&str> {
        self.0.get(PUBID_KEY).and_then(Value::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub(crate) fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for GeneralConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Share configuration: the url, title and extras the widget shares.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareConfig(Map<String, Value>);

impl ShareConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up a nested value by path, e.g. `["passthrough", "twitter", "via"]`.
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.0.get(*first)?, |value, key| value.get(key))
    }

    pub fn url(&self) -> Option<&str> {
        self.string_field("url")
    }

    pub fn title(&self) -> Option<&str> {
        self.string_field("title")
    }

    pub fn description(&self) -> Option<&str> {
        self.string_field("description")
    }

    pub fn media(&self) -> Option<&str> {
        self.string_field("media")
    }

    fn string_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub(crate) fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for ShareConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Integration record published to the page for the widget's usage stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub info_status: String,
    /// Host framework name
    pub cms_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cms_version: Option<String>,
    pub plugin_name: String,
    pub plugin_version: String,
    pub plugin_mode: PluginMode,
}

impl PluginInfo {
    /// Record for this crate, running inside the named host framework.
    pub fn new(cms_name: impl Into<String>, cms_version: Option<String>) -> Self {
        Self {
            info_status: "enabled".to_string(),
            cms_name: cms_name.into(),
            cms_version,
            plugin_name: env!("CARGO_PKG_NAME").to_string(),
            plugin_version: env!("CARGO_PKG_VERSION").to_string(),
            plugin_mode: PluginMode::default(),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Default for PluginInfo {
    fn default() -> Self {
        Self::new("Rust", None)
    }
}
