//! fcsmeta Store - SQLite persistence for the FCS metadata store
//!
//! Provides:
//! - Connection management and store configuration
//! - `SchemaStore`: ensure/rebuild of the embedded schema
//! - Per-table repositories (cases, tubes, custom case data, reference tables)
//! - Delimited-text table I/O
//! - The `QueryEngine` contract and its SQLite implementation

pub mod db;
pub mod errors;
pub mod query;
pub mod repo;
pub mod schema;
pub mod tabular;

// Re-export key types
pub use db::{JournalMode, StoreConfig};
pub use errors::Result;
pub use query::{QueryEngine, QueryResults, SqliteQueryEngine};
pub use schema::SchemaStore;
