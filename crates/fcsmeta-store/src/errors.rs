//! Error handling for fcsmeta-store
//!
//! Wraps the core `ExError` facility with store-specific constructors.

use fcsmeta_core::errors::{ExError, ExErrorKind};
use std::path::Path;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Create a database error from rusqlite::Error
///
/// Constraint failures (foreign key, unique, check) classify as `Integrity`.
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    let kind = if is_constraint_violation(&err) {
        ExErrorKind::Integrity
    } else {
        ExErrorKind::Persistence
    };
    ExError::new(kind)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create a schema (DDL or connection) error
pub fn schema_error(op: &str, err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Schema)
        .with_op(op)
        .with_message(err.to_string())
}

/// Create an IO error for a file
pub fn io_error(op: &str, path: &Path, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(op)
        .with_file(path.display().to_string())
        .with_message(err.to_string())
}

/// Create an error from a csv::Error; I/O failures stay `Io`
pub fn csv_error(op: &str, path: &Path, err: csv::Error) -> ExError {
    let kind = if err.is_io_error() {
        ExErrorKind::Io
    } else {
        ExErrorKind::Serialization
    };
    ExError::new(kind)
        .with_op(op)
        .with_file(path.display().to_string())
        .with_message(err.to_string())
}
