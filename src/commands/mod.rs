//! Command implementations for the sharebridge CLI.
//!
//! - `script_url` - resolve the widget script address
//! - `config_show` / `config_init` / `config_path` - options file handling
//! - `simulate` - replay bridge operations against an in-memory page

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::bootstrap::BootstrapReport;
use crate::config::{
    BridgeFileConfig, DEFAULT_CMS_NAME, OptionOverrides, ResolvedOptions, default_config_path,
    resolve_options,
};
use crate::host::memory::{MemoryPage, MemoryWidget, ScriptTag};
use crate::host::{GlobalSlot, ScriptPlacement};
use crate::models::{PluginMode, ProfileId};
use crate::readiness::DEFAULT_LOAD_POLL_MS;
use crate::script::{self, Environment};
use crate::{BridgeBuilder, Error, Result, ShareBridge};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait CommandResult {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
}

/// Parse an environment name given on the command line.
///
/// Unlike [`Environment::parse`], unknown names are rejected.
pub fn parse_environment(name: &str) -> Result<Environment> {
    match name.to_lowercase().as_str() {
        "production" | "dev" | "test" | "local" | "unittest" => Ok(Environment::parse(name)),
        _ => Err(Error::InvalidInput(format!(
            "Unknown environment '{}'. Expected one of: production, dev, test, local, unittest",
            name
        ))),
    }
}

fn parse_profile_id(id: &str) -> Result<ProfileId> {
    ProfileId::new(id).ok_or_else(|| Error::InvalidInput("Profile id must not be empty".to_string()))
}

fn overrides(environment: Option<&str>, profile_id: Option<&str>) -> Result<OptionOverrides> {
    let mut overrides = OptionOverrides::new();
    if let Some(name) = environment {
        overrides = overrides.with_environment(parse_environment(name)?);
    }
    if let Some(id) = profile_id {
        overrides = overrides.with_profile_id(parse_profile_id(id)?);
    }
    Ok(overrides)
}

fn resolve_config_path(config_path: Option<&Path>) -> Result<PathBuf> {
    config_path
        .map(Path::to_path_buf)
        .or_else(default_config_path)
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

// === script-url ===

#[derive(Serialize)]
pub struct ScriptUrlResult {
    pub environment: Environment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<ProfileId>,
    pub script_url: String,
}

impl CommandResult for ScriptUrlResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        self.script_url.clone()
    }
}

/// Resolve the script address from options, env and flags.
pub fn script_url(
    config_path: Option<&Path>,
    environment: Option<&str>,
    profile_id: Option<&str>,
) -> Result<ScriptUrlResult> {
    let resolved = resolve_options(config_path, &overrides(environment, profile_id)?)?;
    let profile_id = resolved.profile_id.as_ref().map(|r| r.value.clone());
    let script_url = script::script_url(&resolved.script_base_url(), profile_id.as_ref());

    Ok(ScriptUrlResult {
        environment: resolved.environment.value,
        profile_id,
        script_url,
    })
}

// === config ===

#[derive(Serialize)]
pub struct ConfigShowResult {
    pub path: Option<PathBuf>,
    pub exists: bool,
    pub options: ResolvedOptions,
    pub script_url: String,
}

impl CommandResult for ConfigShowResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let o = &self.options;
        let mut lines = Vec::new();
        match self.path {
            Some(ref path) if self.exists => lines.push(format!("File: {}", path.display())),
            Some(ref path) => lines.push(format!("File: {} (not found)", path.display())),
            None => lines.push("File: (none)".to_string()),
        }
        lines.push(format!(
            "  environment:           {} ({})",
            o.environment.value, o.environment.source
        ));
        match o.profile_id {
            Some(ref id) => lines.push(format!(
                "  profile-id:            {} ({})",
                id.value, id.source
            )),
            None => lines.push("  profile-id:            (not set)".to_string()),
        }
        lines.push(format!(
            "  auto-add:              {} ({})",
            o.auto_add.value, o.auto_add.source
        ));
        lines.push(format!(
            "  script-placement:      {} ({})",
            o.script_placement.value, o.script_placement.source
        ));
        lines.push(format!(
            "  load-poll-interval-ms: {} ({})",
            o.load_poll_interval_ms.value, o.load_poll_interval_ms.source
        ));
        lines.push(format!(
            "  cms-name:              {} ({})",
            o.cms_name.value, o.cms_name.source
        ));
        if let Some(ref version) = o.cms_version {
            lines.push(format!(
                "  cms-version:           {} ({})",
                version.value, version.source
            ));
        }
        lines.push(format!("Script: {}", self.script_url));
        lines.join("\n")
    }
}

/// Show resolved options with their sources.
pub fn config_show(
    config_path: Option<&Path>,
    environment: Option<&str>,
    profile_id: Option<&str>,
) -> Result<ConfigShowResult> {
    let resolved = resolve_options(config_path, &overrides(environment, profile_id)?)?;
    let profile_id = resolved.profile_id.as_ref().map(|r| r.value.clone());
    let script_url = script::script_url(&resolved.script_base_url(), profile_id.as_ref());
    let path = resolved.config_path.clone();

    Ok(ConfigShowResult {
        exists: path.as_deref().is_some_and(Path::exists),
        path,
        options: resolved,
        script_url,
    })
}

#[derive(Serialize)]
pub struct ConfigInitResult {
    pub path: PathBuf,
    pub overwritten: bool,
}

impl CommandResult for ConfigInitResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.overwritten {
            format!("Overwrote {}", self.path.display())
        } else {
            format!("Created {}", self.path.display())
        }
    }
}

/// Write an options file holding the defaults.
pub fn config_init(config_path: Option<&Path>, force: bool) -> Result<ConfigInitResult> {
    let path = resolve_config_path(config_path)?;
    let exists = path.exists();
    if exists && !force {
        return Err(Error::InvalidInput(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    let defaults = BridgeFileConfig {
        environment: Some(Environment::Production),
        auto_add: Some(true),
        script_placement: Some(ScriptPlacement::Body),
        load_poll_interval_ms: Some(DEFAULT_LOAD_POLL_MS),
        cms_name: Some(DEFAULT_CMS_NAME.to_string()),
        ..Default::default()
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, defaults.to_kdl().to_string())?;
    info!(path = %path.display(), "wrote options file");

    Ok(ConfigInitResult {
        path,
        overwritten: exists,
    })
}

#[derive(Serialize)]
pub struct ConfigPathResult {
    pub path: PathBuf,
    pub exists: bool,
}

impl CommandResult for ConfigPathResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        self.path.display().to_string()
    }
}

pub fn config_path(config_path: Option<&Path>) -> Result<ConfigPathResult> {
    let path = resolve_config_path(config_path)?;
    Ok(ConfigPathResult {
        exists: path.exists(),
        path,
    })
}

// === simulate ===

/// Initial page contents for a simulation.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageFixture {
    #[serde(default)]
    pub addthis_config: Option<Value>,
    #[serde(default)]
    pub addthis_share: Option<Value>,
    /// `src` of script tags already on the page.
    #[serde(default)]
    pub scripts: Vec<String>,
    /// Widget already loaded before bootstrap.
    #[serde(default)]
    pub widget: Option<WidgetFixture>,
}

#[derive(Debug, Deserialize)]
pub struct WidgetFixture {
    #[serde(default = "default_true")]
    pub can_refresh: bool,
    /// The widget refreshed itself this long before the simulation started.
    #[serde(default)]
    pub last_refresh_ago_ms: Option<u64>,
}

fn default_true() -> bool {
    true
}

/// One bridge operation in a simulation script.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Config { value: Value },
    Share { value: Value },
    ShareUrl { value: String },
    ShareTitle { value: String },
    ShareDescription { value: String },
    ShareMedia { value: String },
    TwitterVia { value: Value },
    UrlShortening { shortener: String, service: String },
    /// The widget script finishes loading.
    LoadWidget {
        #[serde(default = "default_true")]
        can_refresh: bool,
    },
    /// The widget's refresh API becomes available.
    EnableRefresh,
    LocationChange { next: String, current: String },
    Refresh,
    Add,
    Reset,
    Wait { ms: u64 },
}

/// Parameters of a simulation run.
#[derive(Debug, Default)]
pub struct SimulateArgs {
    pub page: PathBuf,
    pub ops: Option<PathBuf>,
    pub settle_ms: u64,
    pub environment: Option<String>,
    pub profile_id: Option<String>,
    pub no_auto_add: bool,
}

#[derive(Debug, Serialize)]
pub struct SimulatedRefresh {
    pub at_ms: u64,
    pub url: Option<String>,
    pub title: Option<String>,
}

#[derive(Serialize)]
pub struct SimulateResult {
    pub bootstrap: BootstrapReport,
    pub profile_id: Option<ProfileId>,
    pub plugin_mode: PluginMode,
    pub widget_loaded: bool,
    pub globals: Map<String, Value>,
    pub scripts: Vec<ScriptTag>,
    pub refresh_calls: Vec<SimulatedRefresh>,
    pub elapsed_ms: u64,
}

impl CommandResult for SimulateResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!(
            "Profile: {}  Mode: {}  Widget loaded: {}",
            self.profile_id
                .as_ref()
                .map_or("(none)".to_string(), ProfileId::to_string),
            self.plugin_mode,
            if self.widget_loaded { "yes" } else { "no" }
        ));
        if self.bootstrap.adopted_config {
            lines.push("Adopted page config".to_string());
        }
        if self.bootstrap.adopted_share {
            lines.push("Adopted page share config".to_string());
        }
        if !self.bootstrap.stripped_share_keys.is_empty() {
            lines.push(format!(
                "Stripped share keys: {}",
                self.bootstrap.stripped_share_keys.join(", ")
            ));
        }

        lines.push(format!("Scripts ({}):", self.scripts.len()));
        for tag in &self.scripts {
            lines.push(format!("  [{}] {}", tag.placement, tag.src));
        }

        lines.push(format!("Refresh calls ({}):", self.refresh_calls.len()));
        for call in &self.refresh_calls {
            lines.push(format!(
                "  +{}ms url={} title={}",
                call.at_ms,
                call.url.as_deref().unwrap_or("-"),
                call.title.as_deref().unwrap_or("-")
            ));
        }

        for (name, value) in &self.globals {
            lines.push(format!("{} = {}", name, value));
        }
        lines.join("\n")
    }
}

/// Bootstrap a bridge on the fixture page, apply `ops` and let it settle.
///
/// Runs on a paused tokio clock, so waits cost no wall time.
pub fn simulate(config_path: Option<&Path>, args: &SimulateArgs) -> Result<SimulateResult> {
    let fixture: PageFixture = serde_json::from_str(&std::fs::read_to_string(&args.page)?)?;
    let ops: Vec<Op> = match args.ops {
        Some(ref path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => Vec::new(),
    };

    let mut overrides = overrides(args.environment.as_deref(), args.profile_id.as_deref())?;
    if args.no_auto_add {
        overrides = overrides.with_auto_add(false);
    }
    let options = resolve_options(config_path, &overrides)?.into_options();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()?;

    runtime.block_on(async {
        let start = Instant::now();
        let page = Arc::new(fixture_page(&fixture, start));

        let bridge = BridgeBuilder::new(page.clone()).options(options).build();
        let loaded = bridge.loaded();
        tokio::spawn(async move {
            loaded.await;
        });

        for op in ops {
            apply(&bridge, &page, op).await;
        }
        tokio::time::sleep(Duration::from_millis(args.settle_ms)).await;

        let refresh_calls = page
            .memory_widget()
            .map(|widget| widget.calls())
            .unwrap_or_default()
            .into_iter()
            .map(|call| SimulatedRefresh {
                at_ms: call.at.duration_since(start).as_millis() as u64,
                url: call.url,
                title: call.title,
            })
            .collect();

        Ok(SimulateResult {
            bootstrap: bridge.bootstrap_report().clone(),
            profile_id: bridge.profile_id(),
            plugin_mode: bridge.plugin_mode(),
            widget_loaded: bridge.is_loaded(),
            globals: page.globals(),
            scripts: page.scripts(),
            refresh_calls,
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    })
}

fn fixture_page(fixture: &PageFixture, start: Instant) -> MemoryPage {
    let mut page = MemoryPage::new();
    if let Some(ref config) = fixture.addthis_config {
        page = page.with_global(GlobalSlot::Config, config.clone());
    }
    if let Some(ref share) = fixture.addthis_share {
        page = page.with_global(GlobalSlot::Share, share.clone());
    }
    for src in &fixture.scripts {
        page = page.with_script(src.clone(), ScriptPlacement::Body);
    }
    if let Some(ref widget) = fixture.widget {
        let memory = MemoryWidget::new();
        memory.set_can_refresh(widget.can_refresh);
        if let Some(ago) = widget.last_refresh_ago_ms {
            let at = start.checked_sub(Duration::from_millis(ago)).unwrap_or(start);
            memory.set_last_refresh_at(Some(at));
        }
        page.install_widget(Arc::new(memory));
    }
    page
}

async fn apply(bridge: &ShareBridge, page: &MemoryPage, op: Op) {
    debug!(?op, "applying operation");
    match op {
        Op::Config { value } => {
            bridge.set_general_config(&value);
        }
        Op::Share { value } => {
            bridge.set_share_config(&value);
        }
        Op::ShareUrl { value } => bridge.set_share_url(value),
        Op::ShareTitle { value } => bridge.set_share_title(value),
        Op::ShareDescription { value } => bridge.set_share_description(value),
        Op::ShareMedia { value } => bridge.set_share_media(value),
        Op::TwitterVia { value } => bridge.twitter_via(&value),
        Op::UrlShortening { shortener, service } => bridge.url_shortening(&shortener, &service),
        Op::LoadWidget { can_refresh } => {
            let widget = MemoryWidget::new();
            widget.set_can_refresh(can_refresh);
            page.install_widget(Arc::new(widget));
        }
        Op::EnableRefresh => {
            if let Some(widget) = page.memory_widget() {
                widget.set_can_refresh(true);
            }
        }
        Op::LocationChange { next, current } => bridge.location_changed(&next, &current),
        Op::Refresh => bridge.layers_refresh(),
        Op::Add => {
            bridge.add();
        }
        Op::Reset => bridge.reset(),
        Op::Wait { ms } => tokio::time::sleep(Duration::from_millis(ms)).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, value: Value) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, value.to_string()).unwrap();
        path
    }

    fn args(page: PathBuf, ops: Option<PathBuf>) -> SimulateArgs {
        SimulateArgs {
            page,
            ops,
            settle_ms: 2000,
            environment: Some("unittest".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_environment_rejects_unknown() {
        assert_eq!(parse_environment("Dev").unwrap(), Environment::Dev);
        assert!(matches!(
            parse_environment("staging"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_ops_deserialize() {
        let ops: Vec<Op> = serde_json::from_value(json!([
            {"op": "share_url", "value": "https://a.example"},
            {"op": "url_shortening", "shortener": "bitly", "service": "twitter"},
            {"op": "load_widget"},
            {"op": "wait", "ms": 250}
        ]))
        .unwrap();

        assert_eq!(
            ops,
            vec![
                Op::ShareUrl {
                    value: "https://a.example".to_string()
                },
                Op::UrlShortening {
                    shortener: "bitly".to_string(),
                    service: "twitter".to_string()
                },
                Op::LoadWidget { can_refresh: true },
                Op::Wait { ms: 250 },
            ]
        );
    }

    #[test]
    fn test_script_url_with_overrides() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("config.kdl");

        let result = script_url(Some(&config), Some("unittest"), Some("abc123")).unwrap();
        assert_eq!(result.script_url, "addthis_widget.js#pubid=abc123");
        assert_eq!(result.to_human(), "addthis_widget.js#pubid=abc123");
    }

    #[test]
    fn test_config_init_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.kdl");

        let created = config_init(Some(&path), false).unwrap();
        assert!(!created.overwritten);
        assert!(config_init(Some(&path), false).is_err());
        assert!(config_init(Some(&path), true).unwrap().overwritten);

        let loaded = BridgeFileConfig::load(&path).unwrap();
        assert_eq!(loaded.environment, Some(Environment::Production));
        assert_eq!(loaded.auto_add, Some(true));
    }

    #[test]
    fn test_simulate_burst_refreshes_once() {
        let dir = TempDir::new().unwrap();
        let page = write(&dir, "page.json", json!({"widget": {}}));
        let ops = write(
            &dir,
            "ops.json",
            json!([
                {"op": "share_url", "value": "https://a.example"},
                {"op": "share_title", "value": "A"},
                {"op": "wait", "ms": 20},
                {"op": "share_title", "value": "B"}
            ]),
        );
        let config = dir.path().join("config.kdl");

        let result = simulate(Some(&config), &args(page, Some(ops))).unwrap();

        assert_eq!(result.refresh_calls.len(), 1);
        assert_eq!(result.refresh_calls[0].url.as_deref(), Some("https://a.example"));
        assert_eq!(result.refresh_calls[0].title.as_deref(), Some("B"));
        assert!(result.refresh_calls[0].at_ms >= 120);
        assert!(result.widget_loaded);
        assert_eq!(result.scripts[0].src, "addthis_widget.js");
    }

    #[test]
    fn test_simulate_strips_dynamic_keys_when_widget_present() {
        let dir = TempDir::new().unwrap();
        let page = write(
            &dir,
            "page.json",
            json!({
                "addthis_share": {"url": "https://page.example", "title": "Page", "email_template": "t"},
                "widget": {"can_refresh": false}
            }),
        );
        let config = dir.path().join("config.kdl");

        let result = simulate(Some(&config), &args(page, None)).unwrap();

        assert_eq!(result.bootstrap.stripped_share_keys, vec!["url", "title"]);
        assert_eq!(result.globals["addthis_share"], json!({"email_template": "t"}));
        assert!(result.refresh_calls.is_empty());
    }

    #[test]
    fn test_simulate_rejects_unknown_op() {
        let dir = TempDir::new().unwrap();
        let page = write(&dir, "page.json", json!({}));
        let ops = write(&dir, "ops.json", json!([{"op": "explode"}]));
        let config = dir.path().join("config.kdl");

        let err = simulate(Some(&config), &args(page, Some(ops))).err().unwrap();
        assert!(matches!(err, Error::Json(_)));
    }
}
