use serde::{Deserialize, Serialize};

use super::{MapStr, OBJ_ID_FIELD, OWNER_ID_FIELD};

/// Metadata describing one object type for one tenant
///
/// A definition is unique per `(owner_id, obj_id)`; the same `obj_id` may
/// exist under several tenants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDefinition {
    /// Catalog row identifier
    pub id: i64,

    /// Owning tenant
    pub owner_id: String,

    /// Object type identifier (e.g. `host`, `set`, a custom model id)
    pub obj_id: String,

    /// Display name; not used by the core
    #[serde(default)]
    pub name: String,

    /// Remaining display metadata
    #[serde(default)]
    pub metadata: MapStr,
}

impl ObjectDefinition {
    pub fn new(id: i64, owner_id: impl Into<String>, obj_id: impl Into<String>) -> Self {
        let obj_id = obj_id.into();
        Self {
            id,
            owner_id: owner_id.into(),
            name: obj_id.clone(),
            obj_id,
            metadata: MapStr::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_metadata(mut self, metadata: MapStr) -> Self {
        self.metadata = metadata;
        self
    }

    /// Flat attribute view used when matching catalog filters
    ///
    /// Metadata keys never shadow the identifying columns.
    pub fn attributes(&self) -> MapStr {
        let mut attrs = self.metadata.clone();
        attrs
            .set("id", self.id)
            .set(OWNER_ID_FIELD, self.owner_id.as_str())
            .set(OBJ_ID_FIELD, self.obj_id.as_str())
            .set("name", self.name.as_str());
        attrs
    }
}
