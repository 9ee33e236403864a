use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Field carrying the event discriminator used for mapping lookup.
pub const EVENT_TYPE_FIELD: &str = "type";

/// An event emitted by the metadata platform.
///
/// Events are opaque JSON objects. The only field the engine interprets is
/// `type`, which selects the [`MappingEntry`](crate::MappingEntry). Events
/// are immutable once received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(Map<String, Value>);

impl Event {
  pub fn new(fields: Map<String, Value>) -> Self {
    Self(fields)
  }

  /// The `type` discriminator, if present and a string.
  pub fn event_type(&self) -> Option<&str> {
    self.0.get(EVENT_TYPE_FIELD).and_then(Value::as_str)
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }

  pub fn fields(&self) -> &Map<String, Value> {
    &self.0
  }

  pub fn to_value(&self) -> Value {
    Value::Object(self.0.clone())
  }
}

impl From<Map<String, Value>> for Event {
  fn from(fields: Map<String, Value>) -> Self {
    Self(fields)
  }
}

impl TryFrom<Value> for Event {
  type Error = ConfigError;

  fn try_from(value: Value) -> Result<Self, Self::Error> {
    match value {
      Value::Object(fields) => Ok(Self(fields)),
      _ => Err(ConfigError::EventNotObject),
    }
  }
}
