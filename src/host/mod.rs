//! Boundary with the embedding page and the external share widget.
//!
//! The bridge never touches a real document directly. It talks to:
//! - [`Page`] - the page globals, the widget handle and script tags
//! - [`Widget`] - the loaded widget's refresh API and its own clock
//!
//! [`memory`] holds in-memory implementations for tests and simulation.

pub mod memory;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;

/// Well-known global variables the widget reads its settings from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalSlot {
    /// `addthis_config`
    Config,
    /// `addthis_share`
    Share,
    /// `addthis_plugin_info`
    PluginInfo,
}

impl GlobalSlot {
    pub const ALL: [GlobalSlot; 3] = [GlobalSlot::Config, GlobalSlot::Share, GlobalSlot::PluginInfo];

    /// Name of the global variable on the page.
    pub fn global_name(&self) -> &'static str {
        match self {
            GlobalSlot::Config => "addthis_config",
            GlobalSlot::Share => "addthis_share",
            GlobalSlot::PluginInfo => "addthis_plugin_info",
        }
    }
}

impl fmt::Display for GlobalSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.global_name())
    }
}

/// Where an injected script tag is appended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptPlacement {
    Head,
    #[default]
    Body,
}

impl ScriptPlacement {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "head" => Some(ScriptPlacement::Head),
            "body" | "footer" => Some(ScriptPlacement::Body),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptPlacement::Head => "head",
            ScriptPlacement::Body => "body",
        }
    }
}

impl fmt::Display for ScriptPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The embedding page.
///
/// Implementations must be cheap to call; the scheduler and the readiness
/// poll query them on every tick.
pub trait Page: Send + Sync {
    /// The widget's global handle, once its script has run.
    fn widget(&self) -> Option<Arc<dyn Widget>>;

    /// Read a global slot. `None` when the global is undefined.
    fn global(&self, slot: GlobalSlot) -> Option<Value>;

    /// Overwrite a global slot.
    fn set_global(&self, slot: GlobalSlot, value: Value);

    /// Whether any script tag's `src` contains `src_fragment`.
    fn has_script(&self, src_fragment: &str) -> bool;

    /// Append a script tag with the given `src`.
    fn append_script(&self, src: &str, placement: ScriptPlacement);
}

/// The loaded share widget.
pub trait Widget: Send + Sync {
    /// Whether the widget's refresh entry point exists yet.
    ///
    /// It only appears after the widget has bootstrapped its floating tools.
    fn can_refresh(&self) -> bool;

    /// When the widget last refreshed, by its own bookkeeping.
    ///
    /// The widget ignores refreshes closer together than its minimum spacing,
    /// so the scheduler waits this out. `None` means it never refreshed.
    fn last_refresh_at(&self) -> Option<Instant>;

    /// Re-render the widget's tools for the given share url and title.
    fn refresh(&self, url: Option<&str>, title: Option<&str>);
}
