use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::errors::CoreError;

/// A dynamically-typed field value
///
/// Instance fields are defined by metadata rather than Rust structs, so every
/// value read from a payload or a document lands in this union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, FieldValue>> {
        match self {
            FieldValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Integer view: integers, integral floats and numeric strings
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            FieldValue::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            FieldValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Equality where `Int(5)` and `Float(5.0)` compare equal
    pub fn loose_eq(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Int(_) | FieldValue::Float(_), FieldValue::Int(_) | FieldValue::Float(_)) => {
                self.as_f64() == other.as_f64()
            }
            (FieldValue::List(a), FieldValue::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            _ => self == other,
        }
    }

    /// Ordering between comparable values; `None` across incompatible types
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::String(a), FieldValue::String(b)) => Some(a.cmp(b)),
            (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
            (FieldValue::Int(a), FieldValue::Int(b)) => Some(a.cmp(b)),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }

    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::String(_) => "string",
            FieldValue::List(_) => "list",
            FieldValue::Map(_) => "map",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Int(i),
                None => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => FieldValue::String(s),
            serde_json::Value::Array(items) => {
                FieldValue::List(items.into_iter().map(FieldValue::from).collect())
            }
            serde_json::Value::Object(map) => FieldValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, FieldValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(items: Vec<T>) -> Self {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// Open-ended mapping of field name to value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapStr(BTreeMap<String, FieldValue>);

impl MapStr {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Decode a JSON document; anything but an object is rejected
    pub fn from_json(value: serde_json::Value) -> Result<Self, CoreError> {
        match FieldValue::from(value) {
            FieldValue::Map(map) => Ok(Self(map)),
            other => Err(CoreError::MalformedFilter {
                reason: format!("expected an object, got {}", other.type_name()),
            }),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Builder-style `set`
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_str)
    }

    /// Read `key` as an integer, accepting numeric strings
    pub fn int64(&self, key: &str) -> Result<i64, CoreError> {
        let value = self.get(key).ok_or_else(|| CoreError::ValidationFailed {
            reason: format!("missing field '{}'", key),
        })?;
        value.as_i64().ok_or_else(|| CoreError::ValidationFailed {
            reason: format!("field '{}' is not an integer: {}", key, value),
        })
    }

    /// Overlay `other` onto `self`, replacing existing keys
    pub fn merge(&mut self, other: &MapStr) {
        for (k, v) in other.iter() {
            self.0.insert(k.clone(), v.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn into_inner(self) -> BTreeMap<String, FieldValue> {
        self.0
    }
}

impl From<BTreeMap<String, FieldValue>> for MapStr {
    fn from(map: BTreeMap<String, FieldValue>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, FieldValue)> for MapStr {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for MapStr {
    type Item = (String, FieldValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
