use chrono::{DateTime, Utc};
use dagrelay_config::Event;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A failed trigger, persisted for replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterEntry {
  /// When the failure was recorded.
  pub timestamp: DateTime<Utc>,
  /// The event exactly as received.
  #[serde(default)]
  pub event: Event,
  /// Target workflow, absent when the event type was not mapped.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub workflow_id: Option<String>,
  /// Run identifier, absent when the failure happened before derivation.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub run_id: Option<String>,
  /// Latest error message for this event.
  #[serde(default)]
  pub error: String,
  /// Correlation id of the trigger call that failed.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub correlation_id: Option<String>,
  /// Resolved conf that was (or would have been) sent.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub conf: Option<Map<String, Value>>,
  /// Fields written by other tools, kept as-is on rewrite.
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl DeadLetterEntry {
  pub fn new(
    event: Event,
    workflow_id: Option<String>,
    run_id: Option<String>,
    error: impl Into<String>,
  ) -> Self {
    Self {
      timestamp: Utc::now(),
      event,
      workflow_id,
      run_id,
      error: error.into(),
      correlation_id: None,
      conf: None,
      extra: Map::new(),
    }
  }

  pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
    self.correlation_id = Some(correlation_id.into());
    self
  }

  pub fn with_conf(mut self, conf: Map<String, Value>) -> Self {
    self.conf = Some(conf);
    self
  }
}

/// One line of the store.
///
/// Lines that do not parse as an entry are kept verbatim so a replay pass
/// never drops data it does not understand.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredLine {
  Entry(DeadLetterEntry),
  Malformed(String),
}

impl StoredLine {
  /// Parse a single non-empty line.
  pub fn parse(line: &str) -> Self {
    match serde_json::from_str::<DeadLetterEntry>(line) {
      Ok(entry) => Self::Entry(entry),
      Err(_) => Self::Malformed(line.to_string()),
    }
  }

  /// Render as a single line without the trailing newline.
  pub fn render(&self) -> Result<String, serde_json::Error> {
    match self {
      Self::Entry(entry) => serde_json::to_string(entry),
      Self::Malformed(raw) => Ok(raw.clone()),
    }
  }
}
