//! Transport-facing entry points
//!
//! One call per logical operation. Each resolves definitions for the tenant,
//! builds a scoped condition, fans the per-definition operation out and
//! merges the results. Every call logs one start and one end event.

use std::sync::Arc;
use std::time::Instant;

use cmdbx_core_types::RequestContext;

use crate::config::CoreConfig;
use crate::condition::Condition;
use crate::errors::{CoreError, ExError, Result};
use crate::model::{Instance, MapStr, ObjectDefinition};
use crate::ops::{
    DefinitionCatalog, DefinitionExecutor, DefinitionFilter, DefinitionResolver, FanOut,
    InstanceOperation, InstanceStorage, SearchResult,
};
use crate::query::{scope_condition, translate, Page, Scope, TranslatedQuery};
use crate::{log_op_end, log_op_error, log_op_start};

/// Parse a path-supplied instance identifier
///
/// # Errors
///
/// `InvalidInstanceId` if `raw` is not a base-10 64-bit integer.
pub fn parse_inst_id(raw: &str) -> std::result::Result<i64, CoreError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| CoreError::InvalidInstanceId {
            raw: raw.to_string(),
        })
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Generic instance access over a catalog and a storage backend
#[derive(Clone)]
pub struct InstanceService {
    catalog: Arc<dyn DefinitionCatalog>,
    storage: Arc<dyn InstanceStorage>,
    fanout: FanOut,
}

impl InstanceService {
    pub fn new(catalog: Arc<dyn DefinitionCatalog>, storage: Arc<dyn InstanceStorage>) -> Self {
        Self {
            catalog,
            storage,
            fanout: FanOut::sequential(),
        }
    }

    pub fn from_config(
        catalog: Arc<dyn DefinitionCatalog>,
        storage: Arc<dyn InstanceStorage>,
        config: &CoreConfig,
    ) -> Self {
        Self::new(catalog, storage).with_fanout(config.fanout.to_fanout())
    }

    pub fn with_fanout(mut self, fanout: FanOut) -> Self {
        self.fanout = fanout;
        self
    }

    fn resolver(&self) -> DefinitionResolver<'_> {
        DefinitionResolver::new(self.catalog.as_ref())
    }

    fn operation(&self) -> InstanceOperation<'_> {
        InstanceOperation::new(self.storage.as_ref())
    }

    /// Create one instance of `obj_id` for `tenant`
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if `obj_id` does not resolve to exactly one
    ///   definition or `fields` conflicts with an identity field
    /// - `CatalogUnavailable`, `Persistence` or `Cancelled` from collaborators
    pub fn create_instance(
        &self,
        ctx: &RequestContext,
        tenant: &str,
        obj_id: &str,
        fields: MapStr,
    ) -> Result<Instance> {
        let start = Instant::now();
        log_op_start!(
            "create_instance",
            request_id = %ctx.request_id,
            tenant = tenant,
            obj_id = obj_id
        );

        let result = self
            .resolver()
            .find_single(ctx, tenant, obj_id)
            .and_then(|def| {
                self.operation()
                    .create(ctx, tenant, &def, fields)
                    .map_err(|e| e.in_definition("create", &def.obj_id))
            })
            .map_err(|e| e.with_request_id(ctx.request_id.clone()));

        match &result {
            Ok(inst) => log_op_end!(
                "create_instance",
                duration_ms = elapsed_ms(start),
                request_id = %ctx.request_id,
                inst_id = inst.inst_id
            ),
            Err(e) => log_op_error!(
                "create_instance",
                *e,
                duration_ms = elapsed_ms(start),
                request_id = %ctx.request_id
            ),
        }
        result
    }

    /// Apply `fields` to the instance `inst_id` under every definition of `obj_id`
    ///
    /// Returns the number of instances updated; an unknown instance is 0.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` for an unparsable `inst_id` or an identity change
    /// - `CatalogUnavailable`, `Persistence` or `Cancelled` from collaborators
    pub fn update_instance(
        &self,
        ctx: &RequestContext,
        tenant: &str,
        obj_id: &str,
        inst_id: &str,
        fields: &MapStr,
    ) -> Result<u64> {
        let start = Instant::now();
        log_op_start!(
            "update_instance",
            request_id = %ctx.request_id,
            tenant = tenant,
            obj_id = obj_id
        );

        let result = self
            .scoped_by_id(ctx, tenant, obj_id, inst_id)
            .and_then(|(defs, cond)| {
                let executor = UpdateExecutor {
                    ops: self.operation(),
                    tenant,
                    cond: &cond,
                    fields,
                };
                self.fanout.run(ctx, &defs, &executor)
            })
            .map(|counts| counts.into_iter().sum::<u64>())
            .and_then(|count| discard_if_cancelled(ctx, "update_instance", count))
            .map_err(|e| e.with_request_id(ctx.request_id.clone()));

        match &result {
            Ok(count) => log_op_end!(
                "update_instance",
                duration_ms = elapsed_ms(start),
                request_id = %ctx.request_id,
                result_count = *count
            ),
            Err(e) => log_op_error!(
                "update_instance",
                *e,
                duration_ms = elapsed_ms(start),
                request_id = %ctx.request_id
            ),
        }
        result
    }

    /// Remove the instance `inst_id` under every definition of `obj_id`
    ///
    /// Deleting an instance that does not exist succeeds with 0.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` for an unparsable `inst_id`
    /// - `CatalogUnavailable`, `Persistence` or `Cancelled` from collaborators
    pub fn delete_instance(
        &self,
        ctx: &RequestContext,
        tenant: &str,
        obj_id: &str,
        inst_id: &str,
    ) -> Result<u64> {
        let start = Instant::now();
        log_op_start!(
            "delete_instance",
            request_id = %ctx.request_id,
            tenant = tenant,
            obj_id = obj_id
        );

        let result = self
            .scoped_by_id(ctx, tenant, obj_id, inst_id)
            .and_then(|(defs, cond)| {
                let executor = DeleteExecutor {
                    ops: self.operation(),
                    tenant,
                    cond: &cond,
                };
                self.fanout.run(ctx, &defs, &executor)
            })
            .map(|counts| counts.into_iter().sum::<u64>())
            .and_then(|count| discard_if_cancelled(ctx, "delete_instance", count))
            .map_err(|e| e.with_request_id(ctx.request_id.clone()));

        match &result {
            Ok(count) => log_op_end!(
                "delete_instance",
                duration_ms = elapsed_ms(start),
                request_id = %ctx.request_id,
                result_count = *count
            ),
            Err(e) => log_op_error!(
                "delete_instance",
                *e,
                duration_ms = elapsed_ms(start),
                request_id = %ctx.request_id
            ),
        }
        result
    }

    /// Search every definition of `obj_id` with a caller filter payload
    ///
    /// # Errors
    ///
    /// - `MalformedFilter` for an undecodable payload or a scope override
    /// - `CatalogUnavailable`, `Persistence` or `Cancelled` from collaborators
    pub fn search_instances(
        &self,
        ctx: &RequestContext,
        tenant: &str,
        obj_id: &str,
        payload: &serde_json::Value,
    ) -> Result<SearchResult> {
        self.search(ctx, tenant, &DefinitionFilter::by_type(obj_id), payload)
    }

    /// Search every definition matching `filter`
    ///
    /// The payload is translated once and the same condition is applied to
    /// every resolved definition. Results follow resolver order.
    ///
    /// # Errors
    ///
    /// As for `search_instances`.
    pub fn search(
        &self,
        ctx: &RequestContext,
        tenant: &str,
        filter: &DefinitionFilter,
        payload: &serde_json::Value,
    ) -> Result<SearchResult> {
        let start = Instant::now();
        let obj_id = filter.obj_id().unwrap_or("*");
        log_op_start!(
            "search_instances",
            request_id = %ctx.request_id,
            tenant = tenant,
            obj_id = obj_id
        );

        let mut scope = Scope::new(tenant);
        if let Some(obj_id) = filter.obj_id() {
            scope = scope.with_obj_id(obj_id);
        }

        let result = translate(payload, &scope)
            .map_err(ExError::from)
            .and_then(|query| -> Result<SearchResult> {
                let defs = self.resolver().find_definitions(ctx, tenant, filter)?;
                self.fan_out_find(ctx, tenant, &defs, &query)
            })
            .map_err(|e| e.with_request_id(ctx.request_id.clone()));

        match &result {
            Ok(found) => log_op_end!(
                "search_instances",
                duration_ms = elapsed_ms(start),
                request_id = %ctx.request_id,
                result_count = found.count
            ),
            Err(e) => log_op_error!(
                "search_instances",
                *e,
                duration_ms = elapsed_ms(start),
                request_id = %ctx.request_id
            ),
        }
        result
    }

    /// Fetch the instance `inst_id` under every definition of `obj_id`
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` for an unparsable `inst_id`
    /// - `CatalogUnavailable`, `Persistence` or `Cancelled` from collaborators
    pub fn search_instance_by_id(
        &self,
        ctx: &RequestContext,
        tenant: &str,
        obj_id: &str,
        inst_id: &str,
    ) -> Result<SearchResult> {
        let start = Instant::now();
        log_op_start!(
            "search_instance_by_id",
            request_id = %ctx.request_id,
            tenant = tenant,
            obj_id = obj_id
        );

        let result = self
            .scoped_by_id(ctx, tenant, obj_id, inst_id)
            .and_then(|(defs, condition)| {
                let query = TranslatedQuery {
                    condition,
                    page: Page::unbounded(),
                };
                self.fan_out_find(ctx, tenant, &defs, &query)
            })
            .map_err(|e| e.with_request_id(ctx.request_id.clone()));

        match &result {
            Ok(found) => log_op_end!(
                "search_instance_by_id",
                duration_ms = elapsed_ms(start),
                request_id = %ctx.request_id,
                result_count = found.count
            ),
            Err(e) => log_op_error!(
                "search_instance_by_id",
                *e,
                duration_ms = elapsed_ms(start),
                request_id = %ctx.request_id
            ),
        }
        result
    }

    /// Definitions of `obj_id` plus the condition pinning `inst_id`
    fn scoped_by_id(
        &self,
        ctx: &RequestContext,
        tenant: &str,
        obj_id: &str,
        inst_id: &str,
    ) -> Result<(Vec<ObjectDefinition>, Condition)> {
        let inst_id = parse_inst_id(inst_id)?;
        let scope = Scope::new(tenant).with_obj_id(obj_id).with_inst_id(inst_id);
        let cond = scope_condition(&scope)?;
        let defs = self
            .resolver()
            .find_definitions(ctx, tenant, &DefinitionFilter::by_type(obj_id))?;
        Ok((defs, cond))
    }

    fn fan_out_find(
        &self,
        ctx: &RequestContext,
        tenant: &str,
        defs: &[ObjectDefinition],
        query: &TranslatedQuery,
    ) -> Result<SearchResult> {
        let executor = FindExecutor {
            ops: self.operation(),
            tenant,
            query,
        };
        let parts = self.fanout.run(ctx, defs, &executor)?;
        discard_if_cancelled(ctx, "search_instances", SearchResult::merge(parts))
    }
}

/// Partial aggregates are never returned once the caller has gone
fn discard_if_cancelled<T>(ctx: &RequestContext, op: &str, value: T) -> Result<T> {
    if ctx.is_cancelled() {
        return Err(CoreError::Cancelled { op: op.to_string() }.into());
    }
    Ok(value)
}

struct FindExecutor<'a> {
    ops: InstanceOperation<'a>,
    tenant: &'a str,
    query: &'a TranslatedQuery,
}

impl DefinitionExecutor for FindExecutor<'_> {
    type Output = (u64, Vec<Instance>);

    fn op(&self) -> &'static str {
        "find"
    }

    fn execute(&self, ctx: &RequestContext, def: &ObjectDefinition) -> Result<Self::Output> {
        self.ops.find(ctx, self.tenant, def, self.query)
    }
}

struct UpdateExecutor<'a> {
    ops: InstanceOperation<'a>,
    tenant: &'a str,
    cond: &'a Condition,
    fields: &'a MapStr,
}

impl DefinitionExecutor for UpdateExecutor<'_> {
    type Output = u64;

    fn op(&self) -> &'static str {
        "update"
    }

    fn execute(&self, ctx: &RequestContext, def: &ObjectDefinition) -> Result<u64> {
        self.ops.update(ctx, self.tenant, def, self.cond, self.fields)
    }
}

struct DeleteExecutor<'a> {
    ops: InstanceOperation<'a>,
    tenant: &'a str,
    cond: &'a Condition,
}

impl DefinitionExecutor for DeleteExecutor<'_> {
    type Output = u64;

    fn op(&self) -> &'static str {
        "delete"
    }

    fn execute(&self, ctx: &RequestContext, def: &ObjectDefinition) -> Result<u64> {
        self.ops.delete(ctx, self.tenant, def, self.cond)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inst_id() {
        assert_eq!(parse_inst_id("42").unwrap(), 42);
        assert_eq!(parse_inst_id(" 7 ").unwrap(), 7);
        assert!(matches!(
            parse_inst_id("abc"),
            Err(CoreError::InvalidInstanceId { .. })
        ));
        assert!(parse_inst_id("").is_err());
        assert!(parse_inst_id("99999999999999999999").is_err());
    }
}
