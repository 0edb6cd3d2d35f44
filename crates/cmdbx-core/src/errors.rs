use cmdbx_core_types::RequestId;
use thiserror::Error;

/// Result type alias using the canonical error facility
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that the transport layer can turn
/// into a status. Caller errors (`MalformedFilter`, `ValidationFailed`) are
/// surfaced verbatim; collaborator errors (`CatalogUnavailable`,
/// `Persistence`) surface as service errors and are never retried here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Caller input
    MalformedFilter,
    ValidationFailed,

    // Collaborators
    CatalogUnavailable,
    Persistence,

    // Request lifecycle
    Cancelled,

    // Generic
    Serialization,
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::MalformedFilter => "ERR_MALFORMED_FILTER",
            ExErrorKind::ValidationFailed => "ERR_VALIDATION_FAILED",
            ExErrorKind::CatalogUnavailable => "ERR_CATALOG_UNAVAILABLE",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Cancelled => "ERR_CANCELLED",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether the error was caused by the caller's input
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ExErrorKind::MalformedFilter | ExErrorKind::ValidationFailed
        )
    }
}

/// Canonical structured error type
///
/// Carries classification for programmatic handling plus the scope the
/// failure happened in (operation, tenant, object type, instance).
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    tenant: Option<String>,
    obj_id: Option<String>,
    inst_id: Option<i64>,
    request_id: Option<RequestId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            tenant: None,
            obj_id: None,
            inst_id: None,
            request_id: None,
            message: String::new(),
            source: None,
        }
    }

    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    pub fn with_obj_id(mut self, obj_id: impl Into<String>) -> Self {
        self.obj_id = Some(obj_id.into());
        self
    }

    pub fn with_inst_id(mut self, inst_id: i64) -> Self {
        self.inst_id = Some(inst_id);
        self
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Wrap this error with the definition and operation it failed under.
    ///
    /// The wrapper keeps the original kind so callers can still classify it.
    pub fn in_definition(self, op: &str, obj_id: &str) -> Self {
        ExError::new(self.kind)
            .with_op(op)
            .with_obj_id(obj_id)
            .with_message(format!("{} failed for object '{}'", op, obj_id))
            .with_source(self)
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn tenant(&self) -> Option<&str> {
        self.tenant.as_deref()
    }

    pub fn obj_id(&self) -> Option<&str> {
        self.obj_id.as_deref()
    }

    pub fn inst_id(&self) -> Option<i64> {
        self.inst_id
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }

    /// Walk to the innermost error in the source chain
    pub fn root_cause(&self) -> &ExError {
        let mut current = self;
        while let Some(next) = current.source.as_deref() {
            current = next;
        }
        current
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(tenant) = &self.tenant {
            write!(f, " (tenant: {})", tenant)?;
        }
        if let Some(obj_id) = &self.obj_id {
            write!(f, " (obj_id: {})", obj_id)?;
        }
        if let Some(inst_id) = self.inst_id {
            write!(f, " (inst_id: {})", inst_id)?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, " (request_id: {})", request_id)?;
        }
        if let Some(source) = &self.source {
            write!(f, " <- {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Typed error cases raised inside the instance core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    // ===== Caller input =====
    /// Filter payload or condition mapping could not be decoded
    #[error("Malformed filter: {reason}")]
    MalformedFilter { reason: String },

    /// Caller tried to set a scoping field to something other than the
    /// context-derived value
    #[error("Reserved field '{field}' cannot be overridden (context: {expected}, supplied: {supplied})")]
    ReservedFieldOverride {
        field: String,
        expected: String,
        supplied: String,
    },

    /// Generic validation failure on identifying data
    #[error("Validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Tenant must not be empty")]
    EmptyTenant,

    /// Object type could not be resolved to a definition for the tenant
    #[error("No object definition '{obj_id}' for tenant '{tenant}'")]
    DefinitionNotFound { tenant: String, obj_id: String },

    /// More than one definition matched where exactly one was required
    #[error("Object '{obj_id}' resolved to {count} definitions for tenant '{tenant}'")]
    AmbiguousDefinition {
        tenant: String,
        obj_id: String,
        count: usize,
    },

    /// Instance identifier path parameter is not an integer
    #[error("Invalid instance id: {raw}")]
    InvalidInstanceId { raw: String },

    /// Field map tries to rewrite an identity field of an instance
    #[error("Identity field '{field}' cannot be changed")]
    IdentityFieldChange { field: String },

    // ===== Collaborators =====
    #[error("Definition catalog unavailable: {reason}")]
    CatalogUnavailable { reason: String },

    #[error("Persistence error: {reason}")]
    Persistence { reason: String },

    // ===== Lifecycle =====
    #[error("Request cancelled during {op}")]
    Cancelled { op: String },

    // ===== Generic =====
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<CoreError> for ExError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::MalformedFilter { .. } => {
                ExError::new(ExErrorKind::MalformedFilter).with_message(message)
            }
            CoreError::ReservedFieldOverride { .. } => ExError::new(ExErrorKind::MalformedFilter)
                .with_op("translate")
                .with_message(message),
            CoreError::ValidationFailed { .. } | CoreError::IdentityFieldChange { .. } => {
                ExError::new(ExErrorKind::ValidationFailed).with_message(message)
            }
            CoreError::EmptyTenant => ExError::new(ExErrorKind::ValidationFailed)
                .with_op("resolve_definitions")
                .with_message(message),
            CoreError::DefinitionNotFound { tenant, obj_id }
            | CoreError::AmbiguousDefinition { tenant, obj_id, .. } => {
                ExError::new(ExErrorKind::ValidationFailed)
                    .with_op("resolve_definitions")
                    .with_tenant(tenant)
                    .with_obj_id(obj_id)
                    .with_message(message)
            }
            CoreError::InvalidInstanceId { .. } => ExError::new(ExErrorKind::ValidationFailed)
                .with_op("parse_inst_id")
                .with_message(message),
            CoreError::CatalogUnavailable { .. } => {
                ExError::new(ExErrorKind::CatalogUnavailable).with_message(message)
            }
            CoreError::Persistence { .. } => {
                ExError::new(ExErrorKind::Persistence).with_message(message)
            }
            CoreError::Cancelled { op } => ExError::new(ExErrorKind::Cancelled)
                .with_op(op)
                .with_message(message),
            CoreError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
            CoreError::Internal { .. } => ExError::new(ExErrorKind::Internal).with_message(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let kinds = [
            ExErrorKind::MalformedFilter,
            ExErrorKind::ValidationFailed,
            ExErrorKind::CatalogUnavailable,
            ExErrorKind::Persistence,
            ExErrorKind::Cancelled,
            ExErrorKind::Serialization,
            ExErrorKind::Internal,
        ];
        let mut codes: Vec<_> = kinds.iter().map(|k| k.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_reserved_override_is_malformed_filter() {
        let err: ExError = CoreError::ReservedFieldOverride {
            field: "owner_id".to_string(),
            expected: "acme".to_string(),
            supplied: "globex".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ExErrorKind::MalformedFilter);
        assert!(err.message().contains("owner_id"));
    }

    #[test]
    fn test_in_definition_keeps_kind_and_source() {
        let inner = ExError::new(ExErrorKind::Persistence).with_message("disk gone");
        let wrapped = inner.in_definition("search", "host");

        assert_eq!(wrapped.kind(), ExErrorKind::Persistence);
        assert_eq!(wrapped.obj_id(), Some("host"));
        assert_eq!(wrapped.op(), Some("search"));
        assert_eq!(wrapped.root_cause().message(), "disk gone");
        assert!(std::error::Error::source(&wrapped).is_some());
    }

    #[test]
    fn test_display_includes_scope() {
        let err = ExError::new(ExErrorKind::ValidationFailed)
            .with_op("create")
            .with_tenant("acme")
            .with_obj_id("host")
            .with_inst_id(5)
            .with_message("bad");
        let shown = err.to_string();
        assert!(shown.starts_with("[ERR_VALIDATION_FAILED] in operation 'create': bad"));
        assert!(shown.contains("(tenant: acme)"));
        assert!(shown.contains("(inst_id: 5)"));
    }

    #[test]
    fn test_collaborator_variants_keep_their_kind() {
        let cases = [
            (
                CoreError::CatalogUnavailable {
                    reason: "down".to_string(),
                },
                ExErrorKind::CatalogUnavailable,
            ),
            (
                CoreError::Persistence {
                    reason: "locked".to_string(),
                },
                ExErrorKind::Persistence,
            ),
            (
                CoreError::Internal {
                    message: "bug".to_string(),
                },
                ExErrorKind::Internal,
            ),
        ];
        for (err, kind) in cases {
            assert_eq!(ExError::from(err).kind(), kind);
        }
    }

    #[test]
    fn test_display_includes_request_id() {
        let err = ExError::new(ExErrorKind::Persistence)
            .with_request_id(RequestId::from_string("req-9".to_string()));
        assert!(err.to_string().contains("(request_id: req-9)"));
    }

    #[test]
    fn test_caller_error_classification() {
        assert!(ExErrorKind::MalformedFilter.is_caller_error());
        assert!(!ExErrorKind::Persistence.is_caller_error());
    }
}
