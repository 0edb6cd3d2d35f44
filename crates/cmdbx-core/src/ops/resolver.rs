use cmdbx_core_types::RequestContext;

use super::DefinitionCatalog;
use crate::condition::Condition;
use crate::errors::{CoreError, ExError, ExErrorKind, Result};
use crate::model::{FieldValue, ObjectDefinition, OBJ_ID_FIELD, OWNER_ID_FIELD};

/// Definition-level filter: exact type and/or other attributes
#[derive(Debug, Clone, Default)]
pub struct DefinitionFilter {
    obj_id: Option<String>,
    attributes: Condition,
}

impl DefinitionFilter {
    /// Every definition of the tenant
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_type(obj_id: impl Into<String>) -> Self {
        Self {
            obj_id: Some(obj_id.into()),
            attributes: Condition::new(),
        }
    }

    /// Additional attribute predicates (e.g. `name`, metadata keys)
    pub fn with_attributes(mut self, attributes: Condition) -> Self {
        self.attributes.extend(attributes);
        self
    }

    pub fn obj_id(&self) -> Option<&str> {
        self.obj_id.as_deref()
    }
}

/// Resolves which object definitions a tenant can see
pub struct DefinitionResolver<'a> {
    catalog: &'a dyn DefinitionCatalog,
}

impl<'a> DefinitionResolver<'a> {
    pub fn new(catalog: &'a dyn DefinitionCatalog) -> Self {
        Self { catalog }
    }

    /// Definitions of `tenant` matching `filter`, in catalog order
    ///
    /// No match is an empty list, not an error.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if `tenant` is empty
    /// - `MalformedFilter` if the attribute filter targets `owner_id`
    /// - `CatalogUnavailable` if the catalog fails
    /// - `Cancelled` if the request was cancelled
    pub fn find_definitions(
        &self,
        ctx: &RequestContext,
        tenant: &str,
        filter: &DefinitionFilter,
    ) -> Result<Vec<ObjectDefinition>> {
        if tenant.trim().is_empty() {
            return Err(CoreError::EmptyTenant.into());
        }

        let mut cond = Condition::new();
        cond.field(OWNER_ID_FIELD).eq(tenant);
        if let Some(obj_id) = &filter.obj_id {
            cond.field(OBJ_ID_FIELD).eq(obj_id.as_str());
        }

        let mut attributes = filter.attributes.clone();
        let tenant_value = FieldValue::from(tenant);
        for p in attributes.take_field(OWNER_ID_FIELD) {
            if !(p.is_eq() && p.value.loose_eq(&tenant_value)) {
                return Err(CoreError::ReservedFieldOverride {
                    field: OWNER_ID_FIELD.to_string(),
                    expected: tenant.to_string(),
                    supplied: format!("{} {}", p.op, p.value),
                }
                .into());
            }
        }
        cond.extend(attributes);

        if ctx.is_cancelled() {
            return Err(CoreError::Cancelled {
                op: "resolve_definitions".to_string(),
            }
            .into());
        }

        let found = self
            .catalog
            .find_definitions(ctx, &cond)
            .map_err(|e| catalog_failure(e, tenant))?;

        let (visible, foreign): (Vec<_>, Vec<_>) =
            found.into_iter().partition(|d| d.owner_id == tenant);
        if !foreign.is_empty() {
            tracing::warn!(
                tenant,
                dropped = foreign.len(),
                "catalog returned definitions of another tenant"
            );
        }

        tracing::debug!(tenant, definitions = visible.len(), "resolved definitions");
        Ok(visible)
    }

    /// The single definition of `obj_id` for `tenant`
    ///
    /// # Errors
    ///
    /// As for `find_definitions`, plus `ValidationFailed` when zero or more
    /// than one definition matches.
    pub fn find_single(
        &self,
        ctx: &RequestContext,
        tenant: &str,
        obj_id: &str,
    ) -> Result<ObjectDefinition> {
        let mut defs = self.find_definitions(ctx, tenant, &DefinitionFilter::by_type(obj_id))?;
        match defs.len() {
            0 => Err(CoreError::DefinitionNotFound {
                tenant: tenant.to_string(),
                obj_id: obj_id.to_string(),
            }
            .into()),
            1 => Ok(defs.remove(0)),
            count => Err(CoreError::AmbiguousDefinition {
                tenant: tenant.to_string(),
                obj_id: obj_id.to_string(),
                count,
            }
            .into()),
        }
    }
}

/// Caller errors and cancellation pass through; anything else means the
/// catalog is unavailable
fn catalog_failure(err: ExError, tenant: &str) -> ExError {
    match err.kind() {
        ExErrorKind::MalformedFilter
        | ExErrorKind::ValidationFailed
        | ExErrorKind::Cancelled
        | ExErrorKind::CatalogUnavailable => err,
        _ => ExError::new(ExErrorKind::CatalogUnavailable)
            .with_op("resolve_definitions")
            .with_tenant(tenant)
            .with_message("definition catalog failed")
            .with_source(err),
    }
}
