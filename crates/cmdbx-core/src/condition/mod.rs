//! Condition Builder
//!
//! A `Condition` is an ordered conjunction of `(field, operator, value)`
//! predicates. It is built fresh per request, serialised to a generic
//! mapping for the storage engine, and can merge caller-supplied mappings.

mod builder;
mod eval;
mod mapping;
mod op;

pub use builder::{Condition, FieldBuilder, Predicate};
pub use op::CompareOp;

/// Conjunction key in the mapping wire form
pub const AND_KEY: &str = "$and";
