//! KDL schema for the bridge options file.
//!
//! This module provides:
//! - `BridgeFileConfig`, the all-optional contents of `config.kdl`
//! - Conversion to and from KDL documents
//! - Conversion of nested KDL blocks to JSON objects for the widget configs
//! - Validation and merging

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::path::Path;

use crate::host::ScriptPlacement;
use crate::script::Environment;
use crate::{Error, Result};

/// Options as written in `config.kdl`.
///
/// # KDL Schema
///
/// ```kdl
/// environment "production"   // production | dev | test | local | unittest
/// auto-add #true
/// script-placement "body"    // body | head
/// profile-id "ra-123"
/// load-poll-interval-ms 200
/// cms-name "Rust"
/// cms-version "1.85"
/// config {
///     ignore_server_config #true
/// }
/// share {
///     url "https://example.com"
///     title "Example"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeFileConfig {
    pub environment: Option<Environment>,
    pub auto_add: Option<bool>,
    pub script_placement: Option<ScriptPlacement>,
    pub profile_id: Option<String>,
    pub load_poll_interval_ms: Option<u64>,
    pub cms_name: Option<String>,
    pub cms_version: Option<String>,
    /// Initial general config
    pub config: Option<Map<String, Value>>,
    /// Initial share config
    pub share: Option<Map<String, Value>>,
}

impl BridgeFileConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(ref id) = self.profile_id {
            if id.is_empty() {
                return Err("profile-id must not be empty".to_string());
            }
        }
        if self.load_poll_interval_ms == Some(0) {
            return Err("load-poll-interval-ms must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Read a config file. A missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)?;
        let doc: KdlDocument = content
            .parse()
            .map_err(|e| Error::Config(format!("Failed to parse KDL in {}: {}", path.display(), e)))?;

        let config = Self::from_kdl(&doc);
        config
            .validate()
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Parse config from a KDL document. Unknown nodes are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(s) = doc.get("environment").and_then(get_string_arg) {
            config.environment = Some(Environment::parse(&s));
        }

        if let Some(node) = doc.get("auto-add") {
            config.auto_add = get_bool_arg(node);
        }

        if let Some(s) = doc.get("script-placement").and_then(get_string_arg) {
            config.script_placement = ScriptPlacement::parse(&s);
        }

        if let Some(node) = doc.get("profile-id") {
            config.profile_id = get_string_arg(node);
        }

        if let Some(node) = doc.get("load-poll-interval-ms") {
            if let Some(i) = node.entries().first().and_then(|e| e.value().as_integer()) {
                config.load_poll_interval_ms = u64::try_from(i).ok();
            }
        }

        if let Some(node) = doc.get("cms-name") {
            config.cms_name = get_string_arg(node);
        }

        if let Some(node) = doc.get("cms-version") {
            config.cms_version = get_string_arg(node);
        }

        if let Some(children) = doc.get("config").and_then(KdlNode::children) {
            config.config = Some(kdl_to_object(children));
        }

        if let Some(children) = doc.get("share").and_then(KdlNode::children) {
            config.share = Some(kdl_to_object(children));
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(env) = self.environment {
            push_string(&mut doc, "environment", env.as_str());
        }

        if let Some(auto_add) = self.auto_add {
            let mut node = KdlNode::new("auto-add");
            node.push(KdlEntry::new(KdlValue::Bool(auto_add)));
            doc.nodes_mut().push(node);
        }

        if let Some(placement) = self.script_placement {
            push_string(&mut doc, "script-placement", placement.as_str());
        }

        if let Some(ref id) = self.profile_id {
            push_string(&mut doc, "profile-id", id);
        }

        if let Some(ms) = self.load_poll_interval_ms {
            let mut node = KdlNode::new("load-poll-interval-ms");
            node.push(KdlEntry::new(KdlValue::Integer(ms as i128)));
            doc.nodes_mut().push(node);
        }

        if let Some(ref name) = self.cms_name {
            push_string(&mut doc, "cms-name", name);
        }

        if let Some(ref version) = self.cms_version {
            push_string(&mut doc, "cms-version", version);
        }

        if let Some(ref config) = self.config {
            doc.nodes_mut().push(object_to_kdl("config", config));
        }

        if let Some(ref share) = self.share {
            doc.nodes_mut().push(object_to_kdl("share", share));
        }

        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    /// The `config` and `share` blocks are replaced wholesale, never merged.
    pub fn merge(&mut self, other: &BridgeFileConfig) {
        if other.environment.is_some() {
            self.environment = other.environment;
        }
        if other.auto_add.is_some() {
            self.auto_add = other.auto_add;
        }
        if other.script_placement.is_some() {
            self.script_placement = other.script_placement;
        }
        if other.profile_id.is_some() {
            self.profile_id = other.profile_id.clone();
        }
        if other.load_poll_interval_ms.is_some() {
            self.load_poll_interval_ms = other.load_poll_interval_ms;
        }
        if other.cms_name.is_some() {
            self.cms_name = other.cms_name.clone();
        }
        if other.cms_version.is_some() {
            self.cms_version = other.cms_version.clone();
        }
        if other.config.is_some() {
            self.config = other.config.clone();
        }
        if other.share.is_some() {
            self.share = other.share.clone();
        }
    }
}

/// Get a string argument from a node's first entry.
fn get_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

/// Get a boolean argument from a node's first entry.
fn get_bool_arg(node: &KdlNode) -> Option<bool> {
    node.entries().first().and_then(|e| e.value().as_bool())
}

fn push_string(doc: &mut KdlDocument, name: &str, value: &str) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(KdlValue::String(value.to_string())));
    doc.nodes_mut().push(node);
}

/// Convert a KDL block to a JSON object.
///
/// A node with children becomes a nested object, a node with one argument a
/// scalar, a node with several arguments an array, and a bare node `null`.
pub fn kdl_to_object(doc: &KdlDocument) -> Map<String, Value> {
    doc.nodes()
        .iter()
        .map(|node| (node.name().value().to_string(), kdl_node_to_value(node)))
        .collect()
}

fn kdl_node_to_value(node: &KdlNode) -> Value {
    if let Some(children) = node.children() {
        return Value::Object(kdl_to_object(children));
    }
    let mut values: Vec<Value> = node
        .entries()
        .iter()
        .filter(|e| e.name().is_none())
        .map(|e| kdl_value_to_json(e.value()))
        .collect();
    match values.len() {
        0 => Value::Null,
        1 => values.remove(0),
        _ => Value::Array(values),
    }
}

fn kdl_value_to_json(value: &KdlValue) -> Value {
    match value {
        KdlValue::String(s) => Value::String(s.clone()),
        KdlValue::Integer(i) => match i64::try_from(*i) {
            Ok(i) => Value::Number(i.into()),
            Err(_) => Value::String(i.to_string()),
        },
        KdlValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        KdlValue::Bool(b) => Value::Bool(*b),
        KdlValue::Null => Value::Null,
    }
}

/// Convert a JSON object to a KDL node named `name` with one child per key.
pub fn object_to_kdl(name: &str, object: &Map<String, Value>) -> KdlNode {
    let mut node = KdlNode::new(name);
    let mut children = KdlDocument::new();
    for (key, value) in object {
        children.nodes_mut().push(value_to_kdl_node(key, value));
    }
    node.set_children(children);
    node
}

fn value_to_kdl_node(name: &str, value: &Value) -> KdlNode {
    match value {
        Value::Object(object) => object_to_kdl(name, object),
        Value::Array(items) => {
            let mut node = KdlNode::new(name);
            for item in items {
                node.push(KdlEntry::new(json_to_kdl_value(item)));
            }
            node
        }
        scalar => {
            let mut node = KdlNode::new(name);
            node.push(KdlEntry::new(json_to_kdl_value(scalar)));
            node
        }
    }
}

fn json_to_kdl_value(value: &Value) -> KdlValue {
    match value {
        Value::Null => KdlValue::Null,
        Value::Bool(b) => KdlValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => KdlValue::Integer(i as i128),
            None => KdlValue::Float(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => KdlValue::String(s.clone()),
        // nested structures inside arrays have no KDL argument form
        other => KdlValue::String(other.to_string()),
    }
}
