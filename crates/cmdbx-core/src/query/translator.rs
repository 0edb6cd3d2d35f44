use super::{Page, QueryEnvelope};
use crate::condition::Condition;
use crate::errors::CoreError;
use crate::model::{FieldValue, INST_ID_FIELD, OBJ_ID_FIELD, OWNER_ID_FIELD};

/// Context-derived scope of a request
///
/// `tenant` always comes from the authenticated caller; `obj_id` and
/// `inst_id` come from path parameters when the route carries them.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub tenant: &'a str,
    pub obj_id: Option<&'a str>,
    pub inst_id: Option<i64>,
}

impl<'a> Scope<'a> {
    pub fn new(tenant: &'a str) -> Self {
        Self {
            tenant,
            obj_id: None,
            inst_id: None,
        }
    }

    pub fn with_obj_id(mut self, obj_id: &'a str) -> Self {
        self.obj_id = Some(obj_id);
        self
    }

    pub fn with_inst_id(mut self, inst_id: i64) -> Self {
        self.inst_id = Some(inst_id);
        self
    }

    /// Reserved fields and their context values, tenant first
    fn reserved(&self) -> Vec<(&'static str, FieldValue)> {
        let mut fields = vec![(OWNER_ID_FIELD, FieldValue::from(self.tenant))];
        if let Some(obj_id) = self.obj_id {
            fields.push((OBJ_ID_FIELD, FieldValue::from(obj_id)));
        }
        if let Some(inst_id) = self.inst_id {
            fields.push((INST_ID_FIELD, FieldValue::Int(inst_id)));
        }
        fields
    }
}

/// Output of the translator: scoped predicates plus paging
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedQuery {
    pub condition: Condition,
    pub page: Page,
}

/// Scoping predicates alone, for operations without a caller filter
///
/// # Errors
///
/// `EmptyTenant` if the scope has no tenant.
pub fn scope_condition(scope: &Scope<'_>) -> Result<Condition, CoreError> {
    if scope.tenant.trim().is_empty() {
        return Err(CoreError::EmptyTenant);
    }
    let mut cond = Condition::new();
    for (field, value) in scope.reserved() {
        cond.field(field).eq(value);
    }
    Ok(cond)
}

/// Decode `raw` and merge its condition under the scoping predicates
///
/// The scoping predicates come first and cannot be displaced. A caller
/// predicate on a reserved field is dropped when it is an equality on the
/// context value and rejected otherwise. Without a path type, any caller
/// predicate on `obj_id` is rejected.
///
/// # Errors
///
/// - `EmptyTenant` if the scope has no tenant
/// - `MalformedFilter` if the envelope or its condition cannot be decoded
/// - `ReservedFieldOverride` if the caller targets a reserved field with a
///   different value or operator
pub fn translate(raw: &serde_json::Value, scope: &Scope<'_>) -> Result<TranslatedQuery, CoreError> {
    let mut cond = scope_condition(scope)?;
    let envelope = QueryEnvelope::decode(raw)?;

    let mut caller = match &envelope.condition {
        Some(mapping) => Condition::from_mapping(mapping)?,
        None => Condition::new(),
    };

    for (field, context_value) in scope.reserved() {
        for p in caller.take_field(field) {
            if p.is_eq() && p.value.loose_eq(&context_value) {
                continue;
            }
            return Err(CoreError::ReservedFieldOverride {
                field: field.to_string(),
                expected: context_value.to_string(),
                supplied: format!("{} {}", p.op, p.value),
            });
        }
    }

    // without a path type the type is chosen per definition, never by the caller
    if scope.obj_id.is_none() {
        if let Some(p) = caller.predicates_for(OBJ_ID_FIELD).next() {
            return Err(CoreError::ReservedFieldOverride {
                field: OBJ_ID_FIELD.to_string(),
                expected: "each resolved definition".to_string(),
                supplied: format!("{} {}", p.op, p.value),
            });
        }
    }

    cond.extend(caller);
    tracing::debug!(
        tenant = scope.tenant,
        predicates = cond.len(),
        "translated query condition"
    );

    Ok(TranslatedQuery {
        condition: cond,
        page: envelope.page(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::CompareOp;
    use serde_json::json;

    #[test]
    fn test_scope_seeds_condition() {
        let scope = Scope::new("acme").with_obj_id("host").with_inst_id(5);
        let q = translate(&json!({}), &scope).unwrap();
        let fields: Vec<_> = q
            .condition
            .predicates()
            .iter()
            .map(|p| p.field.as_str())
            .collect();
        assert_eq!(fields, vec!["owner_id", "obj_id", "inst_id"]);
        assert_eq!(q.condition.eq_value("inst_id"), Some(&FieldValue::Int(5)));
    }

    #[test]
    fn test_caller_condition_is_appended() {
        let scope = Scope::new("acme").with_obj_id("host");
        let q = translate(
            &json!({"condition": {"ip": "10.0.0.1", "cpu": {"$gt": 2}}, "limit": 10}),
            &scope,
        )
        .unwrap();
        assert_eq!(q.condition.len(), 4);
        assert_eq!(q.page.limit, Some(10));
        assert!(q
            .condition
            .predicates_for("cpu")
            .any(|p| p.op == CompareOp::Gt));
    }

    #[test]
    fn test_tenant_override_rejected() {
        let scope = Scope::new("acme").with_obj_id("host");
        let err = translate(&json!({"condition": {"owner_id": "globex"}}), &scope).unwrap_err();
        assert!(matches!(
            err,
            CoreError::ReservedFieldOverride { ref field, .. } if field == "owner_id"
        ));
    }

    #[test]
    fn test_tenant_widening_operator_rejected() {
        let scope = Scope::new("acme");
        let raw = json!({"condition": {"owner_id": {"$in": ["acme", "globex"]}}});
        assert!(translate(&raw, &scope).is_err());
    }

    #[test]
    fn test_redundant_scope_predicate_dropped() {
        let scope = Scope::new("acme").with_obj_id("host");
        let q = translate(
            &json!({"condition": {"owner_id": "acme", "obj_id": "host"}}),
            &scope,
        )
        .unwrap();
        assert_eq!(q.condition.predicates_for("owner_id").count(), 1);
        assert_eq!(q.condition.predicates_for("obj_id").count(), 1);
    }

    #[test]
    fn test_inst_id_path_value_must_match() {
        let scope = Scope::new("acme").with_inst_id(5);
        assert!(translate(&json!({"condition": {"inst_id": 5}}), &scope).is_ok());
        assert!(translate(&json!({"condition": {"inst_id": 6}}), &scope).is_err());
    }

    #[test]
    fn test_obj_id_reserved_without_path_scope() {
        let scope = Scope::new("acme");
        let err = translate(&json!({"condition": {"obj_id": "set"}}), &scope).unwrap_err();
        assert!(matches!(
            err,
            CoreError::ReservedFieldOverride { ref field, .. } if field == "obj_id"
        ));
    }

    #[test]
    fn test_empty_tenant_rejected() {
        assert!(matches!(
            translate(&json!({}), &Scope::new("  ")),
            Err(CoreError::EmptyTenant)
        ));
    }

    #[test]
    fn test_malformed_payload_rejected() {
        let scope = Scope::new("acme");
        assert!(matches!(
            translate(&json!("garbage"), &scope),
            Err(CoreError::MalformedFilter { .. })
        ));
        assert!(matches!(
            translate(&json!({"condition": {"a": {"b": 1}}}), &scope),
            Err(CoreError::MalformedFilter { .. })
        ));
    }
}
