use serde::{Deserialize, Serialize};

use super::{MapStr, INST_ID_FIELD, OBJ_ID_FIELD, OWNER_ID_FIELD};
use crate::errors::CoreError;

/// A stored record of an object definition
///
/// Identity fields are kept apart from the user field map; on the wire and
/// in storage documents they are flattened side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub inst_id: i64,
    pub owner_id: String,
    /// Never changes after creation
    pub obj_id: String,
    #[serde(flatten)]
    pub fields: MapStr,
}

impl Instance {
    /// Storage document: user fields plus identity fields
    pub fn to_document(&self) -> MapStr {
        let mut doc = self.fields.clone();
        doc.set(INST_ID_FIELD, self.inst_id)
            .set(OWNER_ID_FIELD, self.owner_id.as_str())
            .set(OBJ_ID_FIELD, self.obj_id.as_str());
        doc
    }

    /// Split a storage document back into identity and user fields
    pub fn from_document(mut doc: MapStr) -> Result<Self, CoreError> {
        let inst_id = doc.int64(INST_ID_FIELD).map_err(|_| CoreError::Serialization {
            message: format!("stored document has no integer '{}'", INST_ID_FIELD),
        })?;
        let owner_id = take_string(&mut doc, OWNER_ID_FIELD)?;
        let obj_id = take_string(&mut doc, OBJ_ID_FIELD)?;
        doc.remove(INST_ID_FIELD);

        Ok(Self {
            inst_id,
            owner_id,
            obj_id,
            fields: doc,
        })
    }
}

fn take_string(doc: &mut MapStr, key: &str) -> Result<String, CoreError> {
    match doc.remove(key) {
        Some(super::FieldValue::String(s)) => Ok(s),
        _ => Err(CoreError::Serialization {
            message: format!("stored document has no string '{}'", key),
        }),
    }
}
