//! Mapping wire form of a condition
//!
//! ```text
//! { "ip": "10.0.0.1",                       equality
//!   "cpu": { "$gte": 2, "$lte": 8 },        explicit operators
//!   "$and": [ { "cpu": { "$ne": 4 } } ] }   further conjuncts
//! ```

use std::collections::BTreeMap;

use super::{CompareOp, Condition, Predicate, AND_KEY};
use crate::errors::CoreError;
use crate::model::{FieldValue, MapStr};

impl Condition {
    /// Build a condition from a raw predicate mapping
    ///
    /// # Errors
    ///
    /// `MalformedFilter` if the mapping does not have the expected shape.
    pub fn from_mapping(mapping: &MapStr) -> Result<Self, CoreError> {
        let mut cond = Condition::new();
        cond.parse(mapping)?;
        Ok(cond)
    }

    /// Merge a raw predicate mapping into this condition
    ///
    /// The merge is all-or-nothing: on error the condition is unchanged.
    ///
    /// # Errors
    ///
    /// `MalformedFilter` for a nested object that is not an operator object,
    /// an empty operator object, a non-list `$in`/`$nin`/`$and`, or any other
    /// top-level `$` key.
    pub fn parse(&mut self, mapping: &MapStr) -> Result<(), CoreError> {
        let mut parsed = Vec::new();
        decode_into(mapping.iter(), &mut parsed)?;
        for p in parsed {
            self.push(p);
        }
        Ok(())
    }

    /// Serialise into the mapping wire form
    pub fn to_mapping(&self) -> MapStr {
        let mut grouped: BTreeMap<&str, Vec<&Predicate>> = BTreeMap::new();
        for p in self.predicates() {
            grouped.entry(p.field.as_str()).or_default().push(p);
        }

        let mut out = MapStr::new();
        let mut overflow = Vec::new();
        for (field, preds) in grouped {
            if let [only] = preds.as_slice() {
                if only.is_eq() && only.value.as_map().is_none() {
                    out.set(field, only.value.clone());
                    continue;
                }
            }

            let mut ops: BTreeMap<String, FieldValue> = BTreeMap::new();
            for p in preds {
                let key = p.op.as_str().to_string();
                if ops.contains_key(&key) {
                    overflow.push(single(field, &key, &p.value));
                } else {
                    ops.insert(key, p.value.clone());
                }
            }
            out.set(field, FieldValue::Map(ops));
        }

        if !overflow.is_empty() {
            out.set(AND_KEY, FieldValue::List(overflow));
        }
        out
    }
}

fn single(field: &str, op: &str, value: &FieldValue) -> FieldValue {
    let mut inner = BTreeMap::new();
    inner.insert(op.to_string(), value.clone());
    let mut outer = BTreeMap::new();
    outer.insert(field.to_string(), FieldValue::Map(inner));
    FieldValue::Map(outer)
}

fn malformed(reason: String) -> CoreError {
    CoreError::MalformedFilter { reason }
}

fn decode_into<'a, I>(entries: I, out: &mut Vec<Predicate>) -> Result<(), CoreError>
where
    I: Iterator<Item = (&'a String, &'a FieldValue)>,
{
    for (key, value) in entries {
        if key == AND_KEY {
            let items = value
                .as_list()
                .ok_or_else(|| malformed(format!("'{}' must be a list", AND_KEY)))?;
            for item in items {
                let nested = item
                    .as_map()
                    .ok_or_else(|| malformed(format!("'{}' items must be objects", AND_KEY)))?;
                decode_into(nested.iter(), out)?;
            }
            continue;
        }
        if key.is_empty() {
            return Err(malformed("empty field name".to_string()));
        }
        if key.starts_with('$') {
            return Err(malformed(format!("unsupported top-level operator '{}'", key)));
        }

        match value {
            FieldValue::Map(ops) => decode_operators(key, ops, out)?,
            scalar => out.push(Predicate::new(key.as_str(), CompareOp::Eq, scalar.clone())),
        }
    }
    Ok(())
}

fn decode_operators(
    field: &str,
    ops: &BTreeMap<String, FieldValue>,
    out: &mut Vec<Predicate>,
) -> Result<(), CoreError> {
    if ops.is_empty() {
        return Err(malformed(format!("empty operator object for '{}'", field)));
    }
    if let Some(bad) = ops.keys().find(|k| !k.starts_with('$')) {
        return Err(malformed(format!(
            "unknown nested structure under '{}' (key '{}')",
            field, bad
        )));
    }
    for (op_key, value) in ops {
        let op = CompareOp::parse(op_key)?;
        if op.takes_list() && value.as_list().is_none() {
            return Err(malformed(format!(
                "'{}' on '{}' needs a list, got {}",
                op,
                field,
                value.type_name()
            )));
        }
        out.push(Predicate::new(field, op, value.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mapping(v: serde_json::Value) -> MapStr {
        MapStr::from_json(v).unwrap()
    }

    #[test]
    fn test_scalar_is_equality() {
        let cond = Condition::from_mapping(&mapping(json!({"ip": "10.0.0.1"}))).unwrap();
        assert_eq!(cond.predicates()[0].op, CompareOp::Eq);
        assert_eq!(cond.to_mapping(), mapping(json!({"ip": "10.0.0.1"})));
    }

    #[test]
    fn test_operator_object() {
        let cond =
            Condition::from_mapping(&mapping(json!({"cpu": {"$gte": 2, "$lt": 8}}))).unwrap();
        assert_eq!(cond.len(), 2);
        assert_eq!(
            cond.to_mapping(),
            mapping(json!({"cpu": {"$gte": 2, "$lt": 8}}))
        );
    }

    #[test]
    fn test_duplicate_operator_goes_to_and() {
        let mut cond = Condition::new();
        cond.field("tag").ne("a").field("tag").ne("b");
        let m = cond.to_mapping();
        assert_eq!(
            m,
            mapping(json!({"tag": {"$ne": "a"}, "$and": [{"tag": {"$ne": "b"}}]}))
        );
        let back = Condition::from_mapping(&m).unwrap();
        assert!(back.same_predicates(&cond));
    }

    #[test]
    fn test_eq_with_map_value_is_wrapped() {
        let mut cond = Condition::new();
        cond.field("labels").eq(FieldValue::Map(
            [("env".to_string(), FieldValue::from("prod"))].into(),
        ));
        let m = cond.to_mapping();
        assert_eq!(m, mapping(json!({"labels": {"$eq": {"env": "prod"}}})));
        assert!(Condition::from_mapping(&m).unwrap().same_predicates(&cond));
    }

    #[test]
    fn test_unknown_operator_is_opaque() {
        let m = mapping(json!({"name": {"$regex": "^web"}}));
        let cond = Condition::from_mapping(&m).unwrap();
        assert_eq!(
            cond.predicates()[0].op,
            CompareOp::Other("$regex".to_string())
        );
        assert_eq!(cond.to_mapping(), m);
    }

    #[test]
    fn test_nested_structure_rejected() {
        let err = Condition::from_mapping(&mapping(json!({"a": {"b": 1}}))).unwrap_err();
        assert!(matches!(err, CoreError::MalformedFilter { .. }));
    }

    #[test]
    fn test_in_requires_list() {
        assert!(Condition::from_mapping(&mapping(json!({"a": {"$in": 1}}))).is_err());
        assert!(Condition::from_mapping(&mapping(json!({"a": {"$in": [1, 2]}}))).is_ok());
    }

    #[test]
    fn test_bad_and_rejected() {
        assert!(Condition::from_mapping(&mapping(json!({"$and": {"a": 1}}))).is_err());
        assert!(Condition::from_mapping(&mapping(json!({"$and": [1]}))).is_err());
        assert!(Condition::from_mapping(&mapping(json!({"$or": []}))).is_err());
    }

    #[test]
    fn test_parse_is_atomic() {
        let mut cond = Condition::new();
        cond.field("owner_id").eq("acme");
        let bad = mapping(json!({"a": 1, "b": {}}));
        assert!(cond.parse(&bad).is_err());
        assert_eq!(cond.len(), 1);
    }

    #[test]
    fn test_parse_merges_without_overwrite() {
        let mut cond = Condition::new();
        cond.field("cpu").gte(2);
        cond.parse(&mapping(json!({"cpu": {"$lte": 8}}))).unwrap();
        assert_eq!(cond.predicates_for("cpu").count(), 2);
    }
}
