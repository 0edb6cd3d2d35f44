//! Query Translator
//!
//! Turns a caller payload into a scoped `Condition` plus paging directives.

pub mod envelope;
pub mod translator;

pub use envelope::{parse_payload, Page, QueryEnvelope, SortKey};
pub use translator::{scope_condition, translate, Scope, TranslatedQuery};
