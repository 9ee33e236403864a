//! Conf template resolution.
//!
//! A template is an arbitrary JSON structure. String leaves that look like
//! `"{{ key }}"` are placeholders and get replaced by the event's `key` field:
//!
//! ```json
//! { "dataset": "{{ urn }}", "tags": ["{{ tag }}", "static"] }
//! ```
//!
//! resolved against `{"type": "x", "urn": "urn:li:dataset:1"}` yields
//!
//! ```json
//! { "dataset": "urn:li:dataset:1", "tags": [null, "static"] }
//! ```
//!
//! Resolution is best-effort: unknown keys resolve to `null`, never an error.
//! Substitution keeps the event value's JSON type.

use dagrelay_config::Event;
use serde_json::{Map, Value};

/// Return the event key named by a placeholder string, if it is one.
///
/// A placeholder starts with `{{` and ends with `}}`. The key is what remains
/// after stripping braces and spaces from both ends, so `"{{bar}}"` and
/// `"{{ bar }}"` both name `bar`. Strings that only embed a placeholder
/// (`"x-{{bar}}"`) are not placeholders.
pub fn placeholder_key(value: &str) -> Option<&str> {
  if value.starts_with("{{") && value.ends_with("}}") {
    Some(value.trim_matches(|c| c == '{' || c == '}' || c == ' '))
  } else {
    None
  }
}

/// Resolve a whole conf template against an event.
///
/// The template is borrowed and left untouched; it is shared by every
/// trigger of the same event type.
pub fn resolve_conf(template: &Map<String, Value>, event: &Event) -> Map<String, Value> {
  template
    .iter()
    .map(|(k, v)| (k.clone(), resolve_value(v, event)))
    .collect()
}

/// Resolve a single template value, recursing through objects and arrays.
pub fn resolve_value(value: &Value, event: &Event) -> Value {
  match value {
    Value::String(s) => match placeholder_key(s) {
      Some(key) => event.get(key).cloned().unwrap_or(Value::Null),
      None => value.clone(),
    },
    Value::Object(map) => Value::Object(resolve_conf(map, event)),
    Value::Array(items) => Value::Array(items.iter().map(|v| resolve_value(v, event)).collect()),
    _ => value.clone(),
  }
}
