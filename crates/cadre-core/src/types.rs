//! Core types for Cadre
//!
//! - Timestamps
//! - Metadata maps (task arguments, goal context)
//! - Typed lookups into metadata with defaults

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Timestamp type alias
pub type Timestamp = DateTime<Utc>;

/// Create a timestamp for the current moment
pub fn now() -> Timestamp {
    Utc::now()
}

/// Keyword arguments forwarded to workers and job actions, and the shape of
/// the context a caller passes along with a goal.
pub type Metadata = Map<String, Value>;

/// Typed accessors over a [`Metadata`] map.
///
/// Missing keys and values of the wrong JSON type both fall back to the
/// supplied default, matching how playbooks read loosely shaped context.
/// Flags are the exception: a present key is read by its truthiness, so
/// `0`, `""` and `null` switch a step off and `"yes"` switches it on.
pub trait ContextExt {
    /// Raw value, cloned, or `default`
    fn value_or(&self, key: &str, default: Value) -> Value;

    /// String value or `default`
    fn str_or(&self, key: &str, default: &str) -> String;

    /// Truthiness of the value, or `default` when the key is absent
    fn flag(&self, key: &str, default: bool) -> bool;

    /// Array value, empty when absent
    fn list(&self, key: &str) -> Vec<Value>;

    /// Nested object, empty when absent
    fn object(&self, key: &str) -> Metadata;

    /// True when the key holds something other than null, false, 0, "", []
    /// or {}
    fn is_set(&self, key: &str) -> bool;
}

impl ContextExt for Metadata {
    fn value_or(&self, key: &str, default: Value) -> Value {
        self.get(key).cloned().unwrap_or(default)
    }

    fn str_or(&self, key: &str, default: &str) -> String {
        self.get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        if self.contains_key(key) {
            self.is_set(key)
        } else {
            default
        }
    }

    fn list(&self, key: &str) -> Vec<Value> {
        self.get(key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    fn object(&self, key: &str) -> Metadata {
        self.get(key)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    fn is_set(&self, key: &str) -> bool {
        match self.get(key) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(o)) => !o.is_empty(),
            Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            Some(Value::Bool(true)) => true,
        }
    }
}

/// Build a [`Metadata`] map from a `json!` object literal.
///
/// Non-object values produce an empty map.
pub fn metadata(value: Value) -> Metadata {
    match value {
        Value::Object(map) => map,
        _ => Metadata::new(),
    }
}
