//! fcsmeta Core - domain kernel for the FCS metadata store
//!
//! This crate provides the storage-independent pieces of the system:
//! - Structured error facility (`ExError`, `ExErrorKind`) and the domain error enum
//! - Logging facility with boundary macros and a test capture layer
//! - Domain model: processing flags, persisted table names, tube/case records
//! - Typed query criteria for the query delegate
//! - Column inference heuristics for externally curated classification files

pub mod columns;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod query;

// Re-export commonly used types
pub use errors::{ExError, ExErrorKind, FcsMetaError, Result};
pub use model::{Flag, TableData, TableName};
pub use query::{ExportType, QueryCriteria, QueryCriteriaBuilder};
