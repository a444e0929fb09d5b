//! Schema normalization of recovered model output
//!
//! Models return the requested fields in whatever shape they like: a string
//! where a list was asked for, an object wrapping the text under some key, a
//! list of objects instead of a list of strings. Each loosely shaped field is
//! classified into a [`FieldShape`] and coerced by a small named function;
//! the record builders in [`records`] apply these per field with that field's
//! subkey list and default.

mod records;

pub use records::{normalize_analysis, normalize_daily_summary, normalize_report};

use serde_json::{Map, Value};

/// Maximum number of key themes kept on a daily summary
pub const MAX_KEY_THEMES: usize = 5;

/// Observed shape of one field of a recovered value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldShape<'a> {
    /// Absent or `null`
    Missing,
    Text(&'a str),
    Object(&'a Map<String, Value>),
    List(&'a [Value]),
    /// Number or boolean
    Scalar(&'a Value),
}

impl<'a> FieldShape<'a> {
    pub fn of(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => FieldShape::Missing,
            Some(Value::String(s)) => FieldShape::Text(s),
            Some(Value::Object(map)) => FieldShape::Object(map),
            Some(Value::Array(items)) => FieldShape::List(items),
            Some(other) => FieldShape::Scalar(other),
        }
    }
}

/// Whether a value counts as "present" when choosing among alternatives.
///
/// Empty strings, empty collections, `false`, zero and `null` do not.
pub fn is_meaningful(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Render any value as text: strings verbatim, scalars via display, lists
/// as `; `-joined items, objects as compact JSON, `null` as empty.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(stringify)
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(_) => value.to_string(),
    }
}

/// First meaningful value among `keys` of `map`, stringified
pub fn pick_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| is_meaningful(value))
        .map(stringify)
}

/// Coerce a field expected to hold text.
///
/// Objects yield the first meaningful entry among `subkeys`, else their
/// compact JSON. Returns `None` for missing or blank values.
pub fn coerce_text(value: Option<&Value>, subkeys: &[&str]) -> Option<String> {
    let text = match FieldShape::of(value) {
        FieldShape::Missing => return None,
        FieldShape::Text(s) => s.to_string(),
        FieldShape::Object(map) => {
            pick_text(map, subkeys).unwrap_or_else(|| Value::Object(map.clone()).to_string())
        }
        FieldShape::List(items) => stringify(&Value::Array(items.to_vec())),
        FieldShape::Scalar(v) => stringify(v),
    };

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// [`coerce_text`] with a fallback
pub fn text_or(value: Option<&Value>, subkeys: &[&str], default: &str) -> String {
    coerce_text(value, subkeys).unwrap_or_else(|| default.to_string())
}

/// Coerce one element of a list of strings
pub fn coerce_list_item(item: &Value, subkeys: &[&str]) -> Option<String> {
    coerce_text(Some(item), subkeys)
}

/// Coerce a field expected to hold a list of strings.
///
/// A bare string or object becomes a one-element list; blank elements are
/// dropped; a missing field is an empty list.
pub fn coerce_text_list(value: Option<&Value>, subkeys: &[&str]) -> Vec<String> {
    match FieldShape::of(value) {
        FieldShape::Missing => Vec::new(),
        FieldShape::List(items) => items
            .iter()
            .filter_map(|item| coerce_list_item(item, subkeys))
            .collect(),
        FieldShape::Text(_) | FieldShape::Object(_) | FieldShape::Scalar(_) => {
            value.and_then(|v| coerce_list_item(v, subkeys)).into_iter().collect()
        }
    }
}

/// Elements of a field expected to hold a list of structured entries.
///
/// A single object or bare string is treated as a one-element list.
pub fn coerce_entries(value: Option<&Value>) -> Vec<&Value> {
    match FieldShape::of(value) {
        FieldShape::Missing => Vec::new(),
        FieldShape::List(items) => items.iter().filter(|item| !item.is_null()).collect(),
        FieldShape::Text(_) | FieldShape::Object(_) | FieldShape::Scalar(_) => {
            value.into_iter().collect()
        }
    }
}
