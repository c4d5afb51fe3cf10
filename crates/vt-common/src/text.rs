//! Text normalization for names coming out of spreadsheets.

use crate::value::Value;

/// Replace non-breaking spaces, collapse whitespace runs, trim.
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a text cell. Empty results and non-text missing values are `Null`;
/// numbers are rendered as text so they can serve as lookup keys.
pub fn normalize_value(value: &Value) -> Value {
    match value.as_text() {
        Some(text) => {
            let norm = normalize_text(&text);
            if norm.is_empty() {
                Value::Null
            } else {
                Value::Text(norm)
            }
        }
        None => Value::Null,
    }
}

/// Trim surrounding whitespace of a text cell; blank text becomes `Null`.
/// Non-text cells are returned unchanged.
pub fn trim_value(value: &Value) -> Value {
    match value {
        Value::Text(s) => {
            let t = s.trim();
            if t.is_empty() {
                Value::Null
            } else {
                Value::Text(t.to_string())
            }
        }
        other => other.clone(),
    }
}
