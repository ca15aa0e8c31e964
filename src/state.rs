//! Merge and set logic for the bridge's configuration state.
//!
//! The store owns the general config, the share config and the profile id.
//! Setters take borrowed input and copy it in; getters hand out owned
//! snapshots, so no caller ever holds a reference into the store.

use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::models::{GeneralConfig, PUBID_KEY, PluginMode, ProfileId, ShareConfig};

const TWITTER_VIA_PATH: [&str; 3] = ["passthrough", "twitter", "via"];

/// Store shared between the bridge, the scheduler and its timer task.
pub type SharedStore = Arc<Mutex<StateStore>>;

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Configuration state published to the widget.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateStore {
    config: GeneralConfig,
    share: ShareConfig,
    profile_id: Option<ProfileId>,
    plugin_mode: PluginMode,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    /// Snapshot of the general config.
    pub fn config(&self) -> GeneralConfig {
        self.config.clone()
    }

    /// Snapshot of the share config.
    pub fn share(&self) -> ShareConfig {
        self.share.clone()
    }

    pub fn profile_id(&self) -> Option<ProfileId> {
        self.profile_id.clone()
    }

    pub fn plugin_mode(&self) -> PluginMode {
        self.plugin_mode
    }

    /// Replace the general config.
    ///
    /// Non-object input leaves the store untouched. A truthy `pubid` in the
    /// input becomes the profile id for good; afterwards the profile id (if
    /// any) is always written back into the stored `pubid`.
    pub fn set_general_config(&mut self, input: &Value) -> GeneralConfig {
        let Some(map) = input.as_object() else {
            debug!("ignoring non-object general config");
            return self.config();
        };

        if let Some(id) = map.get(PUBID_KEY).and_then(ProfileId::from_value) {
            self.profile_id = Some(id);
        }
        self.plugin_mode = PluginMode::from_config(map);
        self.config = GeneralConfig::from(map.clone());
        self.mirror_profile_id();

        self.config()
    }

    /// Replace the share config. Non-object input is ignored.
    pub fn set_share_config(&mut self, input: &Value) -> ShareConfig {
        match input.as_object() {
            Some(map) => self.share = ShareConfig::from(map.clone()),
            None => debug!("ignoring non-object share config"),
        }
        self.share()
    }

    /// Set the profile id directly and mirror it into the general config.
    pub fn set_profile_id(&mut self, id: ProfileId) {
        self.profile_id = Some(id);
        self.mirror_profile_id();
    }

    /// Write a top-level share field such as `url` or `title`.
    pub fn set_share_field(&mut self, key: &str, value: impl Into<Value>) {
        self.share.as_map_mut().insert(key.to_string(), value.into());
    }

    /// Set or clear the Twitter "via" handle.
    ///
    /// A non-empty string sets `passthrough.twitter.via`, creating the
    /// intermediate objects as needed. `false` removes the handle when the
    /// full path exists. Any other input is ignored.
    pub fn twitter_via(&mut self, handle: &Value) {
        match handle {
            Value::String(s) if !s.is_empty() => {
                let twitter = child_object(self.share.as_map_mut(), TWITTER_VIA_PATH[0])
                    .and_then(|passthrough| child_object(passthrough, TWITTER_VIA_PATH[1]));
                if let Some(twitter) = twitter {
                    twitter.insert(TWITTER_VIA_PATH[2].to_string(), handle.clone());
                }
            }
            Value::Bool(false) => {
                let twitter = self
                    .share
                    .as_map_mut()
                    .get_mut(TWITTER_VIA_PATH[0])
                    .and_then(|p| p.get_mut(TWITTER_VIA_PATH[1]))
                    .and_then(Value::as_object_mut);
                if let Some(twitter) = twitter {
                    twitter.remove(TWITTER_VIA_PATH[2]);
                }
            }
            _ => debug!(?handle, "ignoring twitter via handle"),
        }
    }

    /// Shorten urls shared to `social_service` with `shortener`.
    pub fn url_shortening(&mut self, shortener: &str, social_service: &str) {
        let share = self.share.as_map_mut();

        let shorten = child_object(share, "url_transforms")
            .and_then(|transforms| child_object(transforms, "shorten"));
        if let Some(shorten) = shorten {
            shorten.insert(
                social_service.to_string(),
                Value::String(shortener.to_string()),
            );
        }

        if let Some(shorteners) = child_object(share, "shorteners") {
            shorteners.insert(shortener.to_string(), Value::Object(Map::new()));
        }
    }

    /// Take over a general config found on the page at startup.
    pub(crate) fn adopt_general_config(&mut self, map: Map<String, Value>) {
        if let Some(id) = map.get(PUBID_KEY).and_then(ProfileId::from_value) {
            self.profile_id = Some(id);
        }
        self.plugin_mode = PluginMode::from_config(&map);
        self.config = GeneralConfig::from(map);
    }

    /// Take over a share config found on the page at startup.
    pub(crate) fn adopt_share_config(&mut self, map: Map<String, Value>) {
        self.share = ShareConfig::from(map);
    }

    fn mirror_profile_id(&mut self) {
        if let Some(ref id) = self.profile_id {
            self.config
                .as_map_mut()
                .insert(PUBID_KEY.to_string(), Value::String(id.to_string()));
        }
    }
}

/// Get `map[key]` as an object, first replacing it with `{}` when absent or
/// not an object.
fn child_object<'a>(map: &'a mut Map<String, Value>, key: &str) -> Option<&'a mut Map<String, Value>> {
    if !matches!(map.get(key), Some(Value::Object(_))) {
        map.insert(key.to_string(), Value::Object(Map::new()));
    }
    map.get_mut(key).and_then(Value::as_object_mut)
}
