//! Ordered row model for the transformation pipeline.
//!
//! A [`Row`] is an ordered sequence of `(column-name, value)` pairs and is
//! the sole data interchange type of the engine: ingestion produces rows,
//! every step consumes and produces rows, and output serializes rows back
//! to JSON objects.
//!
//! Values are a tagged union ([`Value`]); steps branch on the tag and
//! reject non-applicable variants instead of coercing.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value as Json;

// =============================================================================
// Value
// =============================================================================

/// Runtime value carried by a row column.
///
/// String is the default representation for DSL-produced scalars; the
/// JSON-aware steps produce the opaque [`Value::JsonObject`] and
/// [`Value::JsonArray`] handles.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Opaque handle to a JSON object produced by a JSON-aware step.
    JsonObject(serde_json::Map<String, Json>),
    /// Opaque handle to a JSON array produced by a JSON-aware step.
    JsonArray(Vec<Json>),
}

impl Value {
    /// Tag name used in type-mismatch diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::JsonObject(_) => "json-object",
            Value::JsonArray(_) => "json-array",
        }
    }

    /// True for `Null` and for strings that trim to nothing.
    pub fn is_null_or_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric view used by quantize and the expression engine.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Convert a `serde_json` value into a row value, preserving runtime
    /// types. Nested containers become opaque handles, not expanded rows.
    pub fn from_json(json: Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::JsonArray(items),
            Json::Object(map) => Value::JsonObject(map),
        }
    }

    /// Convert back to a `serde_json` value for output.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(n) => Json::from(*n),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Bytes(b) => Json::Array(b.iter().map(|v| Json::from(*v)).collect()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => {
                let mut obj = serde_json::Map::new();
                for (k, v) in map {
                    obj.insert(k.clone(), v.to_json());
                }
                Json::Object(obj)
            }
            Value::JsonObject(map) => Json::Object(map.clone()),
            Value::JsonArray(items) => Json::Array(items.clone()),
        }
    }
}

/// Stringification used by string-oriented steps (merge, case ops,
/// masking). Scalars render bare; containers render as JSON text.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(s) => f.write_str(s),
            Value::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            other => f.write_str(&other.to_json().to_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

// =============================================================================
// Row
// =============================================================================

/// Ordered record of columns flowing through the pipeline.
///
/// Column names are case-sensitive. Duplicate names are permitted;
/// by-name operations resolve to the *first* match. Positional indexes
/// are authoritative and out-of-range access panics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Create a row with a single starting column.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            columns: vec![(name.into(), value.into())],
        }
    }

    /// Create an empty row.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append a column, builder style. Always appends, even when the name
    /// already exists.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add(name, value);
        self
    }

    /// Append a column in place. Always appends.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.columns.push((name.into(), value.into()));
    }

    /// Index of the first column with the given name.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(n, _)| n == name)
    }

    /// Value of the first column with the given name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.find(name).map(|pos| &self.columns[pos].1)
    }

    /// Value at a position. Panics when out of range.
    pub fn value(&self, pos: usize) -> &Value {
        &self.columns[pos].1
    }

    /// Name at a position. Panics when out of range.
    pub fn name(&self, pos: usize) -> &str {
        &self.columns[pos].0
    }

    /// Replace the value at a position, keeping name, count and order.
    pub fn set_value(&mut self, pos: usize, value: Value) {
        self.columns[pos].1 = value;
    }

    /// Rename the column at a position in place.
    pub fn rename(&mut self, pos: usize, name: impl Into<String>) {
        self.columns[pos].0 = name.into();
    }

    /// Remove the column at a position, shrinking the row.
    pub fn remove(&mut self, pos: usize) -> (String, Value) {
        self.columns.remove(pos)
    }

    /// Exchange the values at two positions; names stay put.
    pub fn swap_values(&mut self, a: usize, b: usize) {
        if a != b {
            let va = self.columns[a].1.clone();
            let vb = std::mem::replace(&mut self.columns[b].1, va);
            self.columns[a].1 = vb;
        }
    }

    /// Replace the first column with this name, or append a new one.
    pub fn set_or_add(&mut self, name: &str, value: Value) {
        match self.find(name) {
            Some(pos) => self.set_value(pos, value),
            None => self.add(name, value),
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in order.
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Serialize to a JSON object, preserving column order. Duplicate
    /// names collapse to the last occurrence, as JSON objects require.
    pub fn to_json(&self) -> Json {
        let mut obj = serde_json::Map::new();
        for (name, value) in &self.columns {
            obj.insert(name.clone(), value.to_json());
        }
        Json::Object(obj)
    }

    /// Build a row from a JSON object, preserving key order.
    pub fn from_json_object(obj: serde_json::Map<String, Json>) -> Row {
        let mut row = Row::empty();
        for (name, value) in obj {
            row.add(name, Value::from_json(value));
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_appends_in_order() {
        let row = Row::new("a", 1i64).with("b", "two").with("a", 3i64);
        assert_eq!(row.names(), vec!["a", "b", "a"]);
        assert_eq!(row.len(), 3);
    }

    #[test]
    fn test_find_first_match() {
        let row = Row::new("a", 1i64).with("b", 2i64).with("a", 3i64);
        assert_eq!(row.find("a"), Some(0));
        assert_eq!(row.find("missing"), None);
        assert_eq!(row.get("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_set_value_keeps_shape() {
        let mut row = Row::new("a", 1i64).with("b", 2i64);
        row.set_value(1, Value::String("x".into()));
        assert_eq!(row.len(), 2);
        assert_eq!(row.names(), vec!["a", "b"]);
        assert_eq!(row.value(1), &Value::String("x".into()));
    }

    #[test]
    fn test_remove_shrinks() {
        let mut row = Row::new("a", 1i64).with("b", 2i64);
        let (name, value) = row.remove(0);
        assert_eq!(name, "a");
        assert_eq!(value, Value::Int(1));
        assert_eq!(row.names(), vec!["b"]);
    }

    #[test]
    fn test_swap_values_twice_is_identity() {
        let mut row = Row::new("a", 1i64).with("b", "s");
        row.swap_values(0, 1);
        assert_eq!(row.get("a"), Some(&Value::String("s".into())));
        assert_eq!(row.get("b"), Some(&Value::Int(1)));
        row.swap_values(0, 1);
        assert_eq!(row.get("a"), Some(&Value::Int(1)));
        assert_eq!(row.get("b"), Some(&Value::String("s".into())));
    }

    #[test]
    fn test_set_or_add() {
        let mut row = Row::new("a", 1i64);
        row.set_or_add("a", Value::Int(2));
        assert_eq!(row.len(), 1);
        row.set_or_add("b", Value::Int(3));
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::String("hi".into()).to_string(), "hi");
    }

    #[test]
    fn test_json_round_trip_preserves_types() {
        let json = serde_json::json!({"id": 1, "rate": 0.5, "ok": true, "name": "n"});
        let row = match json {
            Json::Object(obj) => Row::from_json_object(obj),
            _ => unreachable!(),
        };
        assert_eq!(row.get("id"), Some(&Value::Int(1)));
        assert_eq!(row.get("rate"), Some(&Value::Float(0.5)));
        assert_eq!(row.get("ok"), Some(&Value::Bool(true)));
        assert_eq!(
            row.to_json(),
            serde_json::json!({"id": 1, "rate": 0.5, "ok": true, "name": "n"})
        );
    }

    #[test]
    fn test_nested_json_stays_opaque() {
        let json = serde_json::json!({"body": {"a": 1}, "tags": [1, 2]});
        let row = match json {
            Json::Object(obj) => Row::from_json_object(obj),
            _ => unreachable!(),
        };
        assert!(matches!(row.get("body"), Some(Value::JsonObject(_))));
        assert!(matches!(row.get("tags"), Some(Value::JsonArray(_))));
    }
}
