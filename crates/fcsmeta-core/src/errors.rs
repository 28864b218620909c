use std::fmt;
use thiserror::Error;

/// Result type alias using FcsMetaError
pub type Result<T> = std::result::Result<T, FcsMetaError>;

/// Classification shared by every failure the store reports.
///
/// The CLI prints [`ExErrorKind::code`] and tests match on it, so codes
/// never change once published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    InvalidInput,
    NotFound,
    /// A lookup matched more than one record, or a referential constraint would break
    Integrity,
    /// DDL or connection failure while ensuring or rebuilding the schema
    Schema,
    /// An import file lacks the required identifier/classification columns
    SchemaMismatch,
    Io,
    Serialization,
    /// SQLite rejected a statement outside schema management
    Persistence,
    /// A component returned something its caller cannot handle
    Internal,
}

impl ExErrorKind {
    pub fn code(&self) -> &'static str {
        use ExErrorKind::*;
        match self {
            InvalidInput => "ERR_INVALID_INPUT",
            NotFound => "ERR_NOT_FOUND",
            Integrity => "ERR_INTEGRITY",
            Schema => "ERR_SCHEMA",
            SchemaMismatch => "ERR_SCHEMA_MISMATCH",
            Io => "ERR_IO",
            Serialization => "ERR_SERIALIZATION",
            Persistence => "ERR_PERSISTENCE",
            Internal => "ERR_INTERNAL",
        }
    }
}

/// Where a failure happened. Every slot is optional.
#[derive(Debug, Clone, Default)]
struct Location {
    op: Option<String>,
    entity_id: Option<String>,
    table: Option<String>,
    column: Option<String>,
    file: Option<String>,
}

/// Structured error returned across crate boundaries.
///
/// Built from a kind plus whatever context the raising layer knows:
///
/// ```
/// # use fcsmeta_core::errors::{ExError, ExErrorKind};
/// let err = ExError::new(ExErrorKind::NotFound)
///     .with_op("set_flag")
///     .with_table("TubeCases")
///     .with_entity_id("42");
/// assert_eq!(err.code(), "ERR_NOT_FOUND");
/// ```
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    at: Location,
    message: String,
}

impl ExError {
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            at: Location::default(),
            message: String::new(),
        }
    }

    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.at.op = Some(op.into());
        self
    }

    /// Case number or case_tube_idx the failure concerns
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.at.entity_id = Some(id.into());
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.at.table = Some(table.into());
        self
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.at.column = Some(column.into());
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.at.file = Some(file.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.at.op.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.at.entity_id.as_deref()
    }

    pub fn table(&self) -> Option<&str> {
        self.at.table.as_deref()
    }

    pub fn column(&self) -> Option<&str> {
        self.at.column.as_deref()
    }

    pub fn file(&self) -> Option<&str> {
        self.at.file.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ExError {
    /// `[CODE] in operation 'op': message (entity_id: ..) (table: ..)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = self.op() {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        let labelled = [
            ("entity_id", self.entity_id()),
            ("table", self.table()),
            ("column", self.column()),
            ("file", self.file()),
        ];
        for (label, value) in labelled {
            if let Some(value) = value {
                write!(f, " ({}: {})", label, value)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

/// Domain error taxonomy for metadata store operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FcsMetaError {
    // ===== Flag state =====
    /// Flag string is not one of the closed enumeration values
    #[error("Unknown flag value: {value}")]
    UnknownFlag { value: String },

    /// Flag and error message disagree (message without error flag or vice versa)
    #[error("Flag {flag} {requirement}")]
    FlagMessageMismatch { flag: String, requirement: String },

    /// No tube record matched the requested index
    #[error("TubeCase not found: case_tube_idx {case_tube_idx}")]
    TubeCaseNotFound { case_tube_idx: i64 },

    /// More than one tube record matched an index that must be unique
    #[error("case_tube_idx {case_tube_idx} matched {matches} TubeCases, expected exactly one")]
    DuplicateTubeCase { case_tube_idx: i64, matches: usize },

    // ===== Cases =====
    /// Case not present in Cases
    #[error("Case not found: {case_number}")]
    CaseNotFound { case_number: String },

    // ===== Tables =====
    /// Table name is not part of the persisted schema
    #[error("Unknown table: {name}")]
    UnknownTable { name: String },

    /// Table exists but is not a bulk-replaceable reference table
    #[error("Table {table} is not a replaceable reference table")]
    TableNotReplaceable { table: String },

    /// Supplied data has columns the destination does not declare
    #[error("Table {table} does not declare columns: {}", .columns.join(", "))]
    UnknownColumns { table: String, columns: Vec<String> },

    /// A data row's width does not match the header
    #[error("Row {row} has {found} values, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    // ===== Import =====
    /// No column looks like a case identifier
    #[error("File {file} has no case identifier column; required columns: {}", .required.join(", "))]
    MissingCaseColumn { file: String, required: Vec<String> },

    /// After filtering, no column of the input is recognised by the destination
    #[error("File {file} does not have columns {}", .required.join(", "))]
    NoRecognizedColumns { file: String, required: Vec<String> },

    // ===== Query criteria =====
    /// Date string could not be parsed as YYYY-MM-DD
    #[error("Invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { value: String },

    /// Date range start is after its end
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange { start: String, end: String },

    /// Record limit must be positive
    #[error("record_n must be greater than zero")]
    InvalidRecordLimit,

    /// Random and date ordering were both requested
    #[error("random_order and date_order are mutually exclusive")]
    ConflictingOrder,
}

impl From<FcsMetaError> for ExError {
    fn from(err: FcsMetaError) -> Self {
        let message = err.to_string();
        match err {
            FcsMetaError::UnknownFlag { value } => ExError::new(ExErrorKind::InvalidInput)
                .with_op("parse_flag")
                .with_entity_id(value),
            FcsMetaError::FlagMessageMismatch { flag, .. } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_op("set_flag")
                    .with_entity_id(flag)
            }
            FcsMetaError::TubeCaseNotFound { case_tube_idx } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_table("TubeCases")
                    .with_entity_id(case_tube_idx.to_string())
            }
            FcsMetaError::DuplicateTubeCase { case_tube_idx, .. } => {
                ExError::new(ExErrorKind::Integrity)
                    .with_table("TubeCases")
                    .with_entity_id(case_tube_idx.to_string())
            }
            FcsMetaError::CaseNotFound { case_number } => ExError::new(ExErrorKind::NotFound)
                .with_table("Cases")
                .with_entity_id(case_number),
            FcsMetaError::UnknownTable { name } => {
                ExError::new(ExErrorKind::InvalidInput).with_table(name)
            }
            FcsMetaError::TableNotReplaceable { table } => {
                ExError::new(ExErrorKind::InvalidInput).with_table(table)
            }
            FcsMetaError::UnknownColumns { table, columns } => {
                ExError::new(ExErrorKind::SchemaMismatch)
                    .with_table(table)
                    .with_column(columns.join(","))
            }
            FcsMetaError::RaggedRow { .. } => ExError::new(ExErrorKind::Serialization),
            FcsMetaError::MissingCaseColumn { file, .. } => {
                ExError::new(ExErrorKind::SchemaMismatch)
                    .with_table("CustomCaseData")
                    .with_column("case_number")
                    .with_file(file)
            }
            FcsMetaError::NoRecognizedColumns { file, .. } => {
                ExError::new(ExErrorKind::SchemaMismatch)
                    .with_table("CustomCaseData")
                    .with_file(file)
            }
            FcsMetaError::InvalidDate { .. }
            | FcsMetaError::InvalidDateRange { .. }
            | FcsMetaError::InvalidRecordLimit
            | FcsMetaError::ConflictingOrder => {
                ExError::new(ExErrorKind::InvalidInput).with_op("query_criteria")
            }
        }
        .with_message(message)
    }
}
