use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Target workflow and payload template for one event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
  /// Orchestrator workflow (DAG) to trigger.
  #[serde(rename = "dag_id")]
  pub workflow_id: String,

  /// Conf template. String leaves of the form `"{{ field }}"` are replaced
  /// with the event's `field` value at trigger time.
  #[serde(default, skip_serializing_if = "Map::is_empty")]
  pub conf: Map<String, Value>,
}

/// Whitelist of event types, keyed by the event's `type` field.
///
/// Loaded once at startup and never mutated afterwards, so it can be shared
/// across concurrent triggers behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingTable {
  entries: HashMap<String, MappingEntry>,
}

impl MappingTable {
  pub fn new(entries: HashMap<String, MappingEntry>) -> Self {
    Self { entries }
  }

  /// Load a mapping file.
  ///
  /// `.yaml` and `.yml` files are parsed as YAML, everything else as JSON.
  /// An empty (or whitespace-only) file yields an empty table.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    if content.trim().is_empty() {
      return Ok(Self::default());
    }

    let is_yaml = matches!(
      path.extension().and_then(|e| e.to_str()),
      Some("yaml" | "yml")
    );

    if is_yaml {
      // A YAML document consisting only of `~` or `null` is an empty table
      let table: Option<Self> =
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
          path: path.to_path_buf(),
          source,
        })?;
      Ok(table.unwrap_or_default())
    } else {
      serde_json::from_str(&content).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
      })
    }
  }

  pub fn get(&self, event_type: &str) -> Option<&MappingEntry> {
    self.entries.get(event_type)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Iterate over the whitelisted event types.
  pub fn event_types(&self) -> impl Iterator<Item = &str> {
    self.entries.keys().map(String::as_str)
  }
}
