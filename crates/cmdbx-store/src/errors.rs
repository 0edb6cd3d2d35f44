//! Error handling for cmdbx-store
//!
//! Maps SQLite and JSON failures onto cmdbx-core `ExError` kinds

use cmdbx_core::errors::{ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// An applied migration whose SQL has since changed
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: recorded {}, embedded {}",
            migration_id, expected, actual
        ))
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Any failure while reading definitions means the catalog is unavailable
pub fn catalog_error(err: ExError) -> ExError {
    if err.kind() != ExErrorKind::Persistence {
        return err;
    }
    ExError::new(ExErrorKind::CatalogUnavailable)
        .with_op("find_definitions")
        .with_message("definition catalog query failed")
        .with_source(err)
}

/// A stored JSON column that no longer parses
pub fn corrupt_document(table: &str, err: serde_json::Error) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op("decode_document")
        .with_message(format!("corrupt JSON in {}: {}", table, err))
}

/// A poisoned connection lock
pub fn lock_poisoned() -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message("connection lock poisoned")
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_error_wraps_persistence() {
        let err = catalog_error(from_rusqlite(rusqlite::Error::InvalidQuery));
        assert_eq!(err.kind(), ExErrorKind::CatalogUnavailable);
        assert_eq!(err.root_cause().kind(), ExErrorKind::Persistence);
    }

    #[test]
    fn test_catalog_error_keeps_caller_errors() {
        let err = catalog_error(ExError::new(ExErrorKind::MalformedFilter));
        assert_eq!(err.kind(), ExErrorKind::MalformedFilter);
    }
}
