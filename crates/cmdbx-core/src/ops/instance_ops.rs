use cmdbx_core_types::RequestContext;

use super::{collection_for, InstanceStorage};
use crate::condition::Condition;
use crate::errors::{CoreError, ExError, Result};
use crate::model::{
    FieldValue, Instance, MapStr, ObjectDefinition, INST_ID_FIELD, OBJ_ID_FIELD, OWNER_ID_FIELD,
};
use crate::query::TranslatedQuery;

/// Executes create/update/delete/find against one resolved definition
///
/// Conditions are taken as built `Condition` values only, so every predicate
/// reaching storage went through the builder. Each call re-binds the
/// tenant and object type before touching storage.
pub struct InstanceOperation<'a> {
    storage: &'a dyn InstanceStorage,
}

impl<'a> InstanceOperation<'a> {
    pub fn new(storage: &'a dyn InstanceStorage) -> Self {
        Self { storage }
    }

    /// Create one instance of `def` owned by `tenant`
    ///
    /// `owner_id` and `obj_id` in `fields` are accepted only when they equal
    /// the context values; `inst_id` is always assigned here.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` on a foreign definition or a conflicting identity field
    /// - `Persistence` on storage failure
    /// - `Cancelled` if the request was cancelled
    pub fn create(
        &self,
        ctx: &RequestContext,
        tenant: &str,
        def: &ObjectDefinition,
        mut fields: MapStr,
    ) -> Result<Instance> {
        check_cancelled(ctx, "create")?;
        check_owner(tenant, def)?;
        strip_identity(&mut fields, tenant, def, None)?;

        let inst_id = self.storage.next_inst_id(ctx)?;
        let instance = Instance {
            inst_id,
            owner_id: tenant.to_string(),
            obj_id: def.obj_id.clone(),
            fields,
        };

        self.storage
            .insert(ctx, collection_for(&def.obj_id), &instance.to_document())?;
        tracing::debug!(tenant, obj_id = %def.obj_id, inst_id, "instance created");
        Ok(instance)
    }

    /// Overlay `fields` onto every instance of `def` matching `cond`
    ///
    /// Zero matches is success with a count of 0.
    ///
    /// # Errors
    ///
    /// - `MalformedFilter` if `cond` contradicts the tenant or type
    /// - `ValidationFailed` if `fields` changes an identity field
    /// - `Persistence` on storage failure
    /// - `Cancelled` if the request was cancelled
    pub fn update(
        &self,
        ctx: &RequestContext,
        tenant: &str,
        def: &ObjectDefinition,
        cond: &Condition,
        fields: &MapStr,
    ) -> Result<u64> {
        check_cancelled(ctx, "update")?;
        check_owner(tenant, def)?;
        let bound = bind_scope(cond, tenant, def)?;

        let mut data = fields.clone();
        strip_identity(&mut data, tenant, def, bound.eq_value(INST_ID_FIELD))?;

        let count = self
            .storage
            .update(ctx, collection_for(&def.obj_id), &bound, &data)?;
        tracing::debug!(tenant, obj_id = %def.obj_id, count, "instances updated");
        Ok(count)
    }

    /// Remove every instance of `def` matching `cond`
    ///
    /// # Errors
    ///
    /// As for `update`, without the identity check.
    pub fn delete(
        &self,
        ctx: &RequestContext,
        tenant: &str,
        def: &ObjectDefinition,
        cond: &Condition,
    ) -> Result<u64> {
        check_cancelled(ctx, "delete")?;
        check_owner(tenant, def)?;
        let bound = bind_scope(cond, tenant, def)?;

        let count = self.storage.delete(ctx, collection_for(&def.obj_id), &bound)?;
        tracing::debug!(tenant, obj_id = %def.obj_id, count, "instances deleted");
        Ok(count)
    }

    /// Total match count and the requested page of instances of `def`
    ///
    /// # Errors
    ///
    /// - `MalformedFilter` if `cond` contradicts the tenant or type
    /// - `Persistence` on storage failure
    /// - `Serialization` if a stored document lacks identity fields
    /// - `Cancelled` if the request was cancelled
    pub fn find(
        &self,
        ctx: &RequestContext,
        tenant: &str,
        def: &ObjectDefinition,
        query: &TranslatedQuery,
    ) -> Result<(u64, Vec<Instance>)> {
        check_cancelled(ctx, "find")?;
        check_owner(tenant, def)?;
        let bound = bind_scope(&query.condition, tenant, def)?;

        let (count, docs) = self
            .storage
            .find(ctx, collection_for(&def.obj_id), &bound, &query.page)?;

        let mut info = Vec::with_capacity(docs.len());
        for doc in docs {
            let instance = Instance::from_document(doc)?;
            if instance.owner_id != tenant || instance.obj_id != def.obj_id {
                return Err(ExError::from(CoreError::Internal {
                    message: "storage returned an instance outside the query scope".to_string(),
                })
                .with_op("find")
                .with_tenant(tenant)
                .with_obj_id(def.obj_id.as_str())
                .with_inst_id(instance.inst_id));
            }
            info.push(instance);
        }
        Ok((count, info))
    }
}

fn check_cancelled(ctx: &RequestContext, op: &str) -> Result<()> {
    if ctx.is_cancelled() {
        return Err(CoreError::Cancelled { op: op.to_string() }.into());
    }
    Ok(())
}

fn check_owner(tenant: &str, def: &ObjectDefinition) -> Result<()> {
    if tenant.trim().is_empty() {
        return Err(CoreError::EmptyTenant.into());
    }
    if def.owner_id != tenant {
        return Err(CoreError::DefinitionNotFound {
            tenant: tenant.to_string(),
            obj_id: def.obj_id.clone(),
        }
        .into());
    }
    Ok(())
}

/// Ensure `cond` carries the tenant and type equalities
///
/// Missing scope predicates are added in front; a predicate on either field
/// that is not an equality on the context value is rejected.
fn bind_scope(cond: &Condition, tenant: &str, def: &ObjectDefinition) -> Result<Condition> {
    let mut rest = cond.clone();
    let mut bound = Condition::new();

    for (field, expected) in [(OWNER_ID_FIELD, tenant), (OBJ_ID_FIELD, def.obj_id.as_str())] {
        let want = FieldValue::from(expected);
        for p in rest.take_field(field) {
            if !(p.is_eq() && p.value.loose_eq(&want)) {
                return Err(CoreError::ReservedFieldOverride {
                    field: field.to_string(),
                    expected: expected.to_string(),
                    supplied: format!("{} {}", p.op, p.value),
                }
                .into());
            }
        }
        bound.field(field).eq(expected);
    }

    bound.extend(rest);
    Ok(bound)
}

/// Remove identity fields from write data, refusing any that would change
///
/// `inst_id` is only tolerated when it equals the one the condition pins.
fn strip_identity(
    data: &mut MapStr,
    tenant: &str,
    def: &ObjectDefinition,
    pinned_inst_id: Option<&FieldValue>,
) -> Result<()> {
    let checks = [
        (OWNER_ID_FIELD, Some(FieldValue::from(tenant))),
        (OBJ_ID_FIELD, Some(FieldValue::from(def.obj_id.as_str()))),
        (INST_ID_FIELD, pinned_inst_id.cloned()),
    ];
    for (field, allowed) in checks {
        let Some(supplied) = data.remove(field) else {
            continue;
        };
        let unchanged = allowed.is_some_and(|v| v.loose_eq(&supplied));
        if !unchanged {
            return Err(CoreError::IdentityFieldChange {
                field: field.to_string(),
            }
            .into());
        }
    }
    Ok(())
}
