//! Canonical JSON text used as run identifier input.
//!
//! The layout matches a sorted-key, ASCII-only rendering with `", "` and
//! `": "` separators:
//!
//! ```text
//! {"a": [1, 2], "b": "café"}
//! ```
//!
//! Identifiers derived from this text stay stable across key insertion order
//! and match those issued by earlier deployments of the bridge, so
//! orchestrator-side deduplication keeps recognising replays.

use std::fmt::Write;

use serde_json::Value;

/// Render a value as canonical JSON text.
pub fn canonical_json(value: &Value) -> String {
  let mut out = String::new();
  write_value(&mut out, value);
  out
}

fn write_value(out: &mut String, value: &Value) {
  match value {
    Value::Null => out.push_str("null"),
    Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
    Value::Number(n) => match n.as_f64() {
      Some(f) if n.is_f64() => write_float(out, f),
      _ => {
        let _ = write!(out, "{}", n);
      }
    },
    Value::String(s) => write_string(out, s),
    Value::Array(items) => {
      out.push('[');
      for (i, item) in items.iter().enumerate() {
        if i > 0 {
          out.push_str(", ");
        }
        write_value(out, item);
      }
      out.push(']');
    }
    Value::Object(map) => {
      let mut keys: Vec<&String> = map.keys().collect();
      keys.sort();

      out.push('{');
      for (i, key) in keys.into_iter().enumerate() {
        if i > 0 {
          out.push_str(", ");
        }
        write_string(out, key);
        out.push_str(": ");
        write_value(out, &map[key]);
      }
      out.push('}');
    }
  }
}

/// Shortest round-trip digits, laid out as fixed notation while the decimal
/// exponent is in `-4..16` and as `d.ddde+XX` outside it.
fn write_float(out: &mut String, f: f64) {
  let sci = format!("{:e}", f.abs());
  let Some((mantissa, exponent)) = sci.split_once('e') else {
    out.push_str(&sci);
    return;
  };
  let Ok(exponent) = exponent.parse::<i32>() else {
    out.push_str(&sci);
    return;
  };
  let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
  // position of the decimal point relative to the first digit
  let point = exponent + 1;

  if f.is_sign_negative() {
    out.push('-');
  }

  if point <= -4 || point > 16 {
    out.push_str(&digits[..1]);
    if digits.len() > 1 {
      out.push('.');
      out.push_str(&digits[1..]);
    }
    let sign = if exponent < 0 { '-' } else { '+' };
    let _ = write!(out, "e{}{:02}", sign, exponent.abs());
  } else if point <= 0 {
    out.push_str("0.");
    out.push_str(&"0".repeat(point.unsigned_abs() as usize));
    out.push_str(&digits);
  } else {
    let point = point as usize;
    if point >= digits.len() {
      out.push_str(&digits);
      out.push_str(&"0".repeat(point - digits.len()));
      out.push_str(".0");
    } else {
      out.push_str(&digits[..point]);
      out.push('.');
      out.push_str(&digits[point..]);
    }
  }
}

fn write_string(out: &mut String, s: &str) {
  out.push('"');
  for c in s.chars() {
    match c {
      '"' => out.push_str("\\\""),
      '\\' => out.push_str("\\\\"),
      '\n' => out.push_str("\\n"),
      '\r' => out.push_str("\\r"),
      '\t' => out.push_str("\\t"),
      '\u{08}' => out.push_str("\\b"),
      '\u{0c}' => out.push_str("\\f"),
      c if !(' '..='~').contains(&c) => {
        let mut units = [0u16; 2];
        for unit in c.encode_utf16(&mut units).iter() {
          let _ = write!(out, "\\u{:04x}", unit);
        }
      }
      c => out.push(c),
    }
  }
  out.push('"');
}
