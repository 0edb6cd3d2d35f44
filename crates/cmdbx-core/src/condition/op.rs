use serde::Serialize;

use crate::errors::CoreError;

/// Comparison operator of a single predicate
///
/// Only equality carries precise cross-layer semantics; any other
/// `$`-prefixed operator is preserved as `Other` and handed through to the
/// storage engine untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
    Other(String),
}

impl CompareOp {
    /// Operator key in the mapping wire form
    pub fn as_str(&self) -> &str {
        match self {
            CompareOp::Eq => "$eq",
            CompareOp::Ne => "$ne",
            CompareOp::Lt => "$lt",
            CompareOp::Lte => "$lte",
            CompareOp::Gt => "$gt",
            CompareOp::Gte => "$gte",
            CompareOp::In => "$in",
            CompareOp::NotIn => "$nin",
            CompareOp::Other(name) => name,
        }
    }

    /// Decode an operator key
    ///
    /// # Errors
    ///
    /// `MalformedFilter` when the key is not `$`-prefixed or is a bare `$`.
    pub fn parse(key: &str) -> Result<Self, CoreError> {
        let op = match key {
            "$eq" => CompareOp::Eq,
            "$ne" => CompareOp::Ne,
            "$lt" => CompareOp::Lt,
            "$lte" => CompareOp::Lte,
            "$gt" => CompareOp::Gt,
            "$gte" => CompareOp::Gte,
            "$in" => CompareOp::In,
            "$nin" => CompareOp::NotIn,
            other if other.len() > 1 && other.starts_with('$') => {
                CompareOp::Other(other.to_string())
            }
            other => {
                return Err(CoreError::MalformedFilter {
                    reason: format!("'{}' is not an operator", other),
                })
            }
        };
        Ok(op)
    }

    /// Operators whose value must be a list
    pub fn takes_list(&self) -> bool {
        matches!(self, CompareOp::In | CompareOp::NotIn)
    }
}

impl Serialize for CompareOp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
