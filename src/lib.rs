//! Sharebridge - keeps an embedded share widget in sync with its host.
//!
//! The host application owns two configuration blobs (general and share
//! config) and a profile identifier. This crate merges updates into them,
//! publishes them to the widget's global slots, and coalesces bursts of
//! changes into a single widget refresh call.
//!
//! The page and the widget are reached through the [`host::Page`] and
//! [`host::Widget`] traits; [`host::memory`] provides in-memory versions.

pub mod bootstrap;
pub mod bridge;
pub mod cli;
pub mod commands;
pub mod config;
pub mod host;
pub mod models;
pub mod readiness;
pub mod refresh;
pub mod script;
pub mod state;

pub use bridge::{BridgeBuilder, ShareBridge};

/// Library-level error type.
///
/// Only configuration loading and the CLI produce these. The bridge itself
/// degrades to no-ops instead of failing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for sharebridge operations.
pub type Result<T> = std::result::Result<T, Error>;
