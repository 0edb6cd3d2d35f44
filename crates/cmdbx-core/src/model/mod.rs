pub mod definition;
pub mod instance;
pub mod value;

pub use definition::ObjectDefinition;
pub use instance::Instance;
pub use value::{FieldValue, MapStr};

/// Tenant (supplier account) column stamped on definitions and instances
pub const OWNER_ID_FIELD: &str = "owner_id";
/// Object-type back-reference from an instance to its definition
pub const OBJ_ID_FIELD: &str = "obj_id";
/// System-wide instance identifier
pub const INST_ID_FIELD: &str = "inst_id";

/// Fields only the core may write
pub const IDENTITY_FIELDS: [&str; 3] = [OWNER_ID_FIELD, OBJ_ID_FIELD, INST_ID_FIELD];

pub fn is_identity_field(name: &str) -> bool {
    IDENTITY_FIELDS.contains(&name)
}
