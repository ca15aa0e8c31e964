//! Widget script address and injection.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::host::{Page, ScriptPlacement};
use crate::models::ProfileId;

/// Production script address.
pub const DEFAULT_SCRIPT_URL: &str = "https://s7.addthis.com/js/300/addthis_widget.js";

/// Fixture address used when running under unit tests.
pub const UNITTEST_SCRIPT_URL: &str = "addthis_widget.js";

/// Substring identifying the widget script among the page's script tags.
pub const SCRIPT_MARKER: &str = "addthis_widget.js";

/// Where the widget script is served from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    /// Internal environments, reachable only inside the vendor's network.
    Dev,
    Test,
    Local,
    /// Relative fixture address for unit tests.
    Unittest,
}

impl Environment {
    /// Parse an environment name. Unknown names mean production.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dev" => Environment::Dev,
            "test" => Environment::Test,
            "local" => Environment::Local,
            "unittest" => Environment::Unittest,
            _ => Environment::Production,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Dev => "dev",
            Environment::Test => "test",
            Environment::Local => "local",
            Environment::Unittest => "unittest",
        }
    }

    /// Script address without the profile fragment.
    pub fn base_url(&self) -> String {
        match self {
            Environment::Production => DEFAULT_SCRIPT_URL.to_string(),
            Environment::Dev | Environment::Test | Environment::Local => {
                format!("http://cache-{}.addthis.com/js/300/addthis_widget.js", self.as_str())
            }
            Environment::Unittest => UNITTEST_SCRIPT_URL.to_string(),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Full script address: the base url plus `#pubid=<id>` when a profile is set.
pub fn script_url(base_url: &str, profile_id: Option<&ProfileId>) -> String {
    match profile_id {
        Some(id) => format!("{base_url}#pubid={id}"),
        None => base_url.to_string(),
    }
}

/// Append the widget script unless one is already on the page.
///
/// Returns the injected address, or `None` when a matching tag existed.
pub fn inject(
    page: &dyn Page,
    base_url: &str,
    profile_id: Option<&ProfileId>,
    placement: ScriptPlacement,
) -> Option<String> {
    if page.has_script(SCRIPT_MARKER) {
        debug!("widget script already on page, skipping injection");
        return None;
    }

    let src = script_url(base_url, profile_id);
    page.append_script(&src, placement);
    info!(%src, %placement, "injected widget script");
    Some(src)
}
