//! Common test utilities for sharebridge integration tests.
//!
//! Provides `TestEnv` for isolated test environments that never read the
//! user's `~/.config/sharebridge/config.kdl`.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
pub use tempfile::TempDir;

/// A test environment with an isolated options file and fixture directory.
///
/// The `sb()` method returns a `Command` that points `SHAREBRIDGE_CONFIG` at
/// the temp directory and clears the other override variables, making tests
/// parallel-safe.
pub struct TestEnv {
    pub dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the sharebridge binary with an isolated config.
    pub fn sb(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_sharebridge"));
        cmd.current_dir(self.dir.path());
        cmd.env("SHAREBRIDGE_CONFIG", self.config_path());
        cmd.env_remove("SHAREBRIDGE_ENVIRONMENT");
        cmd.env_remove("SHAREBRIDGE_PROFILE_ID");
        cmd.env_remove("SHAREBRIDGE_LOG");
        cmd
    }

    /// Path of the options file (not created until written).
    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.kdl")
    }

    pub fn write_config(&self, kdl: &str) {
        std::fs::write(self.config_path(), kdl).unwrap();
    }

    /// Write a JSON fixture and return its path.
    pub fn write_json(&self, name: &str, value: &serde_json::Value) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, value.to_string()).unwrap();
        path
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a command's stdout as JSON.
pub fn parse_json(stdout: &[u8]) -> serde_json::Value {
    serde_json::from_slice(stdout).unwrap()
}
