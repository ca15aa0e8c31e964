//! Precedence resolution for bridge options.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Environment variables (`SHAREBRIDGE_ENVIRONMENT`, `SHAREBRIDGE_PROFILE_ID`)
//! 3. `config.kdl`
//! 4. Built-in defaults

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::options::{BridgeOptions, DEFAULT_CMS_NAME};
use super::schema::BridgeFileConfig;
use crate::Result;
use crate::host::ScriptPlacement;
use crate::models::ProfileId;
use crate::readiness::DEFAULT_LOAD_POLL_MS;
use crate::script::Environment;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SHAREBRIDGE_CONFIG";

/// Environment variable overriding the script environment.
pub const ENVIRONMENT_ENV: &str = "SHAREBRIDGE_ENVIRONMENT";

/// Environment variable overriding the profile id.
pub const PROFILE_ID_ENV: &str = "SHAREBRIDGE_PROFILE_ID";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from CLI flag
    CliFlag,
    /// Value from environment variable
    EnvVar(String),
    /// Value from the config file at this path
    File(String),
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::File(path) => write!(f, "file:{}", path),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// CLI overrides for option resolution.
#[derive(Debug, Clone, Default)]
pub struct OptionOverrides {
    pub environment: Option<Environment>,
    pub profile_id: Option<ProfileId>,
    pub auto_add: Option<bool>,
    pub script_placement: Option<ScriptPlacement>,
}

impl OptionOverrides {
    /// Create empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn with_profile_id(mut self, profile_id: ProfileId) -> Self {
        self.profile_id = Some(profile_id);
        self
    }

    pub fn with_auto_add(mut self, auto_add: bool) -> Self {
        self.auto_add = Some(auto_add);
        self
    }

    pub fn with_script_placement(mut self, placement: ScriptPlacement) -> Self {
        self.script_placement = Some(placement);
        self
    }
}

/// Fully resolved options with source tracking.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedOptions {
    pub environment: Resolved<Environment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<Resolved<ProfileId>>,
    pub auto_add: Resolved<bool>,
    pub script_placement: Resolved<ScriptPlacement>,
    pub load_poll_interval_ms: Resolved<u64>,
    pub cms_name: Resolved<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cms_version: Option<Resolved<String>>,
    /// The file the file-level values were read from.
    pub config_path: Option<PathBuf>,
    #[serde(skip)]
    file: BridgeFileConfig,
}

impl ResolvedOptions {
    /// Script address for the resolved environment.
    pub fn script_base_url(&self) -> String {
        self.environment.value.base_url()
    }

    /// Collapse into the options a bridge is built from.
    pub fn into_options(self) -> BridgeOptions {
        BridgeOptions {
            environment: self.environment.value,
            auto_add: self.auto_add.value,
            script_placement: self.script_placement.value,
            profile_id: self.profile_id.map(|r| r.value),
            load_poll_interval: Duration::from_millis(self.load_poll_interval_ms.value),
            cms_name: self.cms_name.value,
            cms_version: self.cms_version.map(|r| r.value),
            config: self.file.config.unwrap_or_default(),
            share: self.file.share.unwrap_or_default(),
            ..Default::default()
        }
    }
}

/// Default location of `config.kdl`: `<config dir>/sharebridge/config.kdl`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sharebridge").join("config.kdl"))
}

/// Load the config file and resolve options against the process environment.
///
/// `path` wins over the default location. A missing file resolves to defaults.
pub fn resolve_options(path: Option<&Path>, overrides: &OptionOverrides) -> Result<ResolvedOptions> {
    let path = path.map(Path::to_path_buf).or_else(default_config_path);
    let file = match path {
        Some(ref path) => BridgeFileConfig::load(path)?,
        None => BridgeFileConfig::default(),
    };
    Ok(resolve_options_with_env(file, path, overrides, |name| {
        std::env::var(name).ok()
    }))
}

/// Resolve options from an already loaded file and an environment lookup.
pub fn resolve_options_with_env(
    file: BridgeFileConfig,
    path: Option<PathBuf>,
    overrides: &OptionOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedOptions {
    let file_source = ValueSource::File(
        path.as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "config.kdl".to_string()),
    );
    let env_value = |name: &str| env(name).filter(|v| !v.is_empty());

    let environment = if let Some(environment) = overrides.environment {
        Resolved::new(environment, ValueSource::CliFlag)
    } else if let Some(value) = env_value(ENVIRONMENT_ENV) {
        Resolved::new(
            Environment::parse(&value),
            ValueSource::EnvVar(ENVIRONMENT_ENV.to_string()),
        )
    } else if let Some(environment) = file.environment {
        Resolved::new(environment, file_source.clone())
    } else {
        Resolved::new(Environment::default(), ValueSource::Default)
    };

    let profile_id = if let Some(ref id) = overrides.profile_id {
        Some(Resolved::new(id.clone(), ValueSource::CliFlag))
    } else if let Some(id) = env_value(PROFILE_ID_ENV).and_then(ProfileId::new) {
        Some(Resolved::new(
            id,
            ValueSource::EnvVar(PROFILE_ID_ENV.to_string()),
        ))
    } else {
        file.profile_id
            .clone()
            .and_then(ProfileId::new)
            .map(|id| Resolved::new(id, file_source.clone()))
    };
    // else: no profile id

    let auto_add = pick(overrides.auto_add, file.auto_add, true, &file_source);
    let script_placement = pick(
        overrides.script_placement,
        file.script_placement,
        ScriptPlacement::default(),
        &file_source,
    );
    let load_poll_interval_ms = pick(
        None,
        file.load_poll_interval_ms,
        DEFAULT_LOAD_POLL_MS,
        &file_source,
    );
    let cms_name = pick(
        None,
        file.cms_name.clone(),
        DEFAULT_CMS_NAME.to_string(),
        &file_source,
    );
    let cms_version = file
        .cms_version
        .clone()
        .map(|v| Resolved::new(v, file_source.clone()));

    ResolvedOptions {
        environment,
        profile_id,
        auto_add,
        script_placement,
        load_poll_interval_ms,
        cms_name,
        cms_version,
        config_path: path,
        file,
    }
}

/// CLI flag, then file, then default.
fn pick<T>(cli: Option<T>, file: Option<T>, default: T, file_source: &ValueSource) -> Resolved<T> {
    if let Some(value) = cli {
        Resolved::new(value, ValueSource::CliFlag)
    } else if let Some(value) = file {
        Resolved::new(value, file_source.clone())
    } else {
        Resolved::new(default, ValueSource::Default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn file_config() -> BridgeFileConfig {
        BridgeFileConfig {
            environment: Some(Environment::Dev),
            profile_id: Some("ra-file".to_string()),
            auto_add: Some(false),
            load_poll_interval_ms: Some(50),
            share: json!({"url": "https://file.example"}).as_object().cloned(),
            ..Default::default()
        }
    }

    #[test]
    fn test_value_source_display() {
        assert_eq!(ValueSource::CliFlag.to_string(), "cli");
        assert_eq!(
            ValueSource::EnvVar(PROFILE_ID_ENV.to_string()).to_string(),
            "env:SHAREBRIDGE_PROFILE_ID"
        );
        assert_eq!(
            ValueSource::File("/tmp/config.kdl".to_string()).to_string(),
            "file:/tmp/config.kdl"
        );
        assert_eq!(ValueSource::Default.to_string(), "default");
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let resolved =
            resolve_options_with_env(BridgeFileConfig::default(), None, &OptionOverrides::new(), no_env);

        assert_eq!(resolved.environment.value, Environment::Production);
        assert_eq!(resolved.environment.source, ValueSource::Default);
        assert!(resolved.profile_id.is_none());
        assert!(resolved.auto_add.value);
        assert_eq!(resolved.load_poll_interval_ms.value, 200);
        assert_eq!(resolved.cms_name.value, "Rust");
    }

    #[test]
    fn test_file_values_override_defaults() {
        let path = PathBuf::from("/etc/sharebridge/config.kdl");
        let resolved = resolve_options_with_env(
            file_config(),
            Some(path),
            &OptionOverrides::new(),
            no_env,
        );

        assert_eq!(resolved.environment.value, Environment::Dev);
        assert_eq!(
            resolved.environment.source,
            ValueSource::File("/etc/sharebridge/config.kdl".to_string())
        );
        assert_eq!(resolved.profile_id.as_ref().unwrap().value.as_str(), "ra-file");
        assert!(!resolved.auto_add.value);

        let options = resolved.into_options();
        assert_eq!(options.load_poll_interval, Duration::from_millis(50));
        assert_eq!(options.share["url"], "https://file.example");
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = [
            (ENVIRONMENT_ENV, "unittest"),
            (PROFILE_ID_ENV, "ra-env"),
        ]
        .into_iter()
        .collect();

        let resolved = resolve_options_with_env(file_config(), None, &OptionOverrides::new(), |name| {
            env.get(name).map(|v| v.to_string())
        });

        assert_eq!(resolved.environment.value, Environment::Unittest);
        assert_eq!(
            resolved.environment.source,
            ValueSource::EnvVar(ENVIRONMENT_ENV.to_string())
        );
        assert_eq!(resolved.profile_id.unwrap().value.as_str(), "ra-env");
    }

    #[test]
    fn test_empty_env_is_ignored() {
        let resolved = resolve_options_with_env(file_config(), None, &OptionOverrides::new(), |_| {
            Some(String::new())
        });
        assert_eq!(resolved.environment.value, Environment::Dev);
        assert_eq!(resolved.profile_id.unwrap().value.as_str(), "ra-file");
    }

    #[test]
    fn test_cli_overrides_everything() {
        let overrides = OptionOverrides::new()
            .with_environment(Environment::Test)
            .with_profile_id(ProfileId::new("ra-cli").unwrap())
            .with_auto_add(true)
            .with_script_placement(ScriptPlacement::Head);

        let resolved = resolve_options_with_env(file_config(), None, &overrides, |_| {
            Some("local".to_string())
        });

        assert_eq!(resolved.environment.value, Environment::Test);
        assert_eq!(resolved.environment.source, ValueSource::CliFlag);
        assert_eq!(resolved.profile_id.as_ref().unwrap().source, ValueSource::CliFlag);
        assert!(resolved.auto_add.value);
        assert_eq!(resolved.script_placement.value, ScriptPlacement::Head);
        assert_eq!(
            resolved.script_base_url(),
            "http://cache-test.addthis.com/js/300/addthis_widget.js"
        );
    }

    #[test]
    fn test_resolve_options_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.kdl");
        std::fs::write(&path, "environment \"unittest\"\nprofile-id \"ra-disk\"\n").unwrap();

        let resolved = resolve_options(Some(&path), &OptionOverrides::new()).unwrap();
        assert_eq!(resolved.config_path.as_deref(), Some(path.as_path()));
        assert_eq!(resolved.script_base_url(), "addthis_widget.js");
    }
}
