//! cmdbx Store - SQLite catalog and instance storage
//!
//! Provides:
//! - SQLite schema with a checksummed migrations framework
//! - Translation of `Condition` values into parameterised SQL
//! - `SqliteBackend`, implementing both `DefinitionCatalog` and
//!   `InstanceStorage`

pub mod backend;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod sql;

// Re-export key types
pub use backend::SqliteBackend;
pub use errors::Result;
