//! Core types shared across cmdbx facilities
//!
//! This crate provides foundational types used by the instance core, the
//! storage backends and the logging facility:
//!
//! - **Correlation types**: RequestId, RequestContext
//! - **Cancellation**: every RequestContext carries a cancellation token
//! - **Schema constants**: Canonical log event names

pub mod correlation;
pub mod schema;

pub use correlation::{RequestContext, RequestId};
