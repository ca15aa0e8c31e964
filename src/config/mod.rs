//! Bridge configuration.
//!
//! Options come from `config.kdl`, located at `~/.config/sharebridge/config.kdl`
//! unless `--config` or `SHAREBRIDGE_CONFIG` names another file.
//!
//! Contains:
//! - `environment` - which script host to load the widget from
//! - `auto-add` - whether bootstrap injects the script tag
//! - `script-placement` - "body" or "head"
//! - `profile-id` - site profile
//! - `load-poll-interval-ms` - readiness poll period
//! - `cms-name` / `cms-version` - reported in the plugin info
//! - `config { }` / `share { }` - initial widget configs
//!
//! ## Precedence
//!
//! CLI flag > env var > config file > defaults
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod options;
pub mod resolver;
pub mod schema;

pub use options::{BridgeOptions, DEFAULT_CMS_NAME};
pub use resolver::{
    CONFIG_ENV, ENVIRONMENT_ENV, OptionOverrides, PROFILE_ID_ENV, Resolved, ResolvedOptions,
    ValueSource, default_config_path, resolve_options, resolve_options_with_env,
};
pub use schema::BridgeFileConfig;
