use cmdbx_core_types::RequestContext;

use crate::condition::Condition;
use crate::errors::Result;
use crate::model::ObjectDefinition;

/// Object-definition catalog consumed by the resolver
///
/// The filter always carries an equality on `owner_id`; implementations
/// match it against `ObjectDefinition::attributes`. Ordering of the result
/// must be deterministic per query.
pub trait DefinitionCatalog: Send + Sync {
    /// # Errors
    ///
    /// `CatalogUnavailable` when the catalog cannot be reached.
    fn find_definitions(
        &self,
        ctx: &RequestContext,
        filter: &Condition,
    ) -> Result<Vec<ObjectDefinition>>;
}
