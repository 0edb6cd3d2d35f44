use cmdbx_core_types::RequestContext;

use crate::condition::Condition;
use crate::errors::Result;
use crate::model::MapStr;
use crate::query::Page;

/// Generic document storage keyed by collection
///
/// Conditions handed to storage always carry the tenant and object-type
/// predicates; implementations must apply every predicate.
pub trait InstanceStorage: Send + Sync {
    /// Allocate a fresh, system-wide unique instance identifier
    ///
    /// # Errors
    ///
    /// `Persistence` on storage failure.
    fn next_inst_id(&self, ctx: &RequestContext) -> Result<i64>;

    /// # Errors
    ///
    /// `Persistence` on storage failure.
    fn insert(&self, ctx: &RequestContext, collection: &str, doc: &MapStr) -> Result<()>;

    /// Overlay `data` onto every matching document, returning the match count
    ///
    /// # Errors
    ///
    /// `Persistence` on storage failure, `MalformedFilter` for predicates the
    /// engine cannot express.
    fn update(
        &self,
        ctx: &RequestContext,
        collection: &str,
        cond: &Condition,
        data: &MapStr,
    ) -> Result<u64>;

    /// # Errors
    ///
    /// As for `update`.
    fn delete(&self, ctx: &RequestContext, collection: &str, cond: &Condition) -> Result<u64>;

    /// Total match count (ignoring paging) and the requested page
    ///
    /// # Errors
    ///
    /// As for `update`.
    fn find(
        &self,
        ctx: &RequestContext,
        collection: &str,
        cond: &Condition,
        page: &Page,
    ) -> Result<(u64, Vec<MapStr>)>;
}

/// Storage collection holding instances of `obj_id`
///
/// Built-in topology objects have dedicated collections; every custom model
/// shares the generic object collection.
pub fn collection_for(obj_id: &str) -> &'static str {
    match obj_id {
        "host" => "cc_HostBase",
        "set" => "cc_SetBase",
        "module" => "cc_ModuleBase",
        "biz" => "cc_ApplicationBase",
        "plat" => "cc_PlatBase",
        _ => "cc_ObjectBase",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_collections() {
        assert_eq!(collection_for("host"), "cc_HostBase");
        assert_eq!(collection_for("biz"), "cc_ApplicationBase");
    }

    #[test]
    fn test_custom_models_share_collection() {
        assert_eq!(collection_for("switch"), collection_for("router"));
    }
}
