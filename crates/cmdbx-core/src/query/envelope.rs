use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::model::MapStr;

/// Caller query payload
///
/// `condition` holds raw predicates in the mapping wire form; the other
/// fields are paging directives the core forwards to storage unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryEnvelope {
    #[serde(default, alias = "Condition")]
    pub condition: Option<MapStr>,

    /// Comma-separated projection, empty for all fields
    #[serde(default)]
    pub fields: String,

    #[serde(default)]
    pub start: u64,

    /// Zero means unlimited
    #[serde(default)]
    pub limit: u64,

    /// Comma-separated sort keys; a leading `-` sorts descending
    #[serde(default)]
    pub sort: String,
}

impl QueryEnvelope {
    /// Decode from a structured payload; `null` is the empty envelope
    ///
    /// # Errors
    ///
    /// `MalformedFilter` if the payload is not an object or a member has the
    /// wrong type.
    pub fn decode(raw: &serde_json::Value) -> Result<Self, CoreError> {
        match raw {
            serde_json::Value::Null => Ok(Self::default()),
            serde_json::Value::Object(_) => {
                serde_json::from_value(raw.clone()).map_err(|e| CoreError::MalformedFilter {
                    reason: format!("cannot decode query envelope: {}", e),
                })
            }
            other => Err(CoreError::MalformedFilter {
                reason: format!("query payload must be an object, got {}", json_type(other)),
            }),
        }
    }

    pub fn page(&self) -> Page {
        Page {
            start: self.start,
            limit: (self.limit > 0).then_some(self.limit),
            sort: split_list(&self.sort)
                .into_iter()
                .map(|key| SortKey::parse(&key))
                .collect(),
            fields: split_list(&self.fields),
        }
    }
}

/// Parse raw request bytes into a payload for `translate`
///
/// # Errors
///
/// `MalformedFilter` if the bytes are not a JSON document.
pub fn parse_payload(bytes: &[u8]) -> Result<serde_json::Value, CoreError> {
    serde_json::from_slice(bytes).map_err(|e| CoreError::MalformedFilter {
        reason: format!("payload is not valid JSON: {}", e),
    })
}

fn json_type(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// One sort directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    fn parse(raw: &str) -> Self {
        match raw.strip_prefix('-') {
            Some(field) => Self {
                field: field.to_string(),
                descending: true,
            },
            None => Self {
                field: raw.trim_start_matches('+').to_string(),
                descending: false,
            },
        }
    }
}

/// Paging directives for one `find`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub start: u64,
    pub limit: Option<u64>,
    pub sort: Vec<SortKey>,
    /// Projection; empty means every field
    pub fields: Vec<String>,
}

impl Page {
    pub fn unbounded() -> Self {
        Self::default()
    }
}
