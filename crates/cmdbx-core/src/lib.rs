//! cmdbx Core - generic instance access for a multi-tenant CMDB
//!
//! Object definitions are created at runtime per tenant; instances are open
//! field maps stored under the definition they belong to. This crate
//! provides:
//! - A typed condition builder with a mapping wire form
//! - Tenant-scoped definition resolution
//! - Translation of caller filter payloads into scoped conditions
//! - Per-definition create/update/delete/find with identity invariants
//! - Fan-out across resolved definitions, sequential or bounded-parallel
//!
//! Catalog and storage are collaborators behind `DefinitionCatalog` and
//! `InstanceStorage`; `MemoryStore` implements both in memory.

pub mod condition;
pub mod config;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod ops;
pub mod query;
pub mod service;

#[doc(hidden)]
pub use cmdbx_core_types;
#[doc(hidden)]
pub use tracing;

// Re-export commonly used types
pub use condition::{CompareOp, Condition, Predicate};
pub use config::CoreConfig;
pub use errors::{CoreError, ExError, ExErrorKind, Result};
pub use model::{FieldValue, Instance, MapStr, ObjectDefinition};
pub use ops::{
    DefinitionCatalog, DefinitionFilter, FanOut, InstanceStorage, MemoryStore, SearchResult,
};
pub use service::InstanceService;
