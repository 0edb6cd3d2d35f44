//! Request correlation and cancellation
//!
//! A `RequestContext` travels with every top-level instance operation. It
//! identifies the request for log correlation and carries the cancellation
//! token the transport layer trips when the caller goes away.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Unique identifier for a single request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new time-ordered RequestId (UUIDv7)
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Adopt an identifier minted upstream (e.g. an `X-Request-Id` header)
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Context carried through every instance operation
///
/// Cloning a context shares its cancellation token, so a clone handed to a
/// worker thread observes a cancel issued on the original.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: RequestId,
    cancel: CancellationToken,
}

impl RequestContext {
    /// Create a new context with a fresh RequestId and an untripped token
    pub fn new() -> Self {
        Self {
            request_id: RequestId::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            ..Self::new()
        }
    }

    /// Bind the context to a token owned by the transport layer
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Derive a context whose token is cancelled with this one, but can
    /// also be cancelled on its own
    pub fn child(&self) -> Self {
        Self {
            request_id: self.request_id.clone(),
            cancel: self.cancel.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_generation() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();

        assert_ne!(id1, id2);
        assert!(!id1.as_str().is_empty());
    }

    #[test]
    fn test_request_id_display() {
        let id = RequestId::new();
        assert_eq!(format!("{}", id), id.as_str());
    }

    #[test]
    fn test_request_id_serialization() {
        let id = RequestId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: RequestId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn test_context_starts_uncancelled() {
        let ctx = RequestContext::new();
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_cancel_is_shared_by_clones() {
        let ctx = RequestContext::new();
        let clone = ctx.clone();
        ctx.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_child_follows_parent_but_not_reverse() {
        let parent = RequestContext::new();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_cancelled());

        let other = parent.child();
        parent.cancel();
        assert!(other.is_cancelled());
        assert_eq!(other.request_id, parent.request_id);
    }

    #[test]
    fn test_adopted_request_id() {
        let ctx = RequestContext::with_request_id(RequestId::from_string("req-42".to_string()));
        assert_eq!(ctx.request_id.as_str(), "req-42");
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_external_token_binding() {
        let token = CancellationToken::new();
        let ctx = RequestContext::new().with_cancellation(token.clone());
        token.cancel();
        assert!(ctx.is_cancelled());
    }
}
