//! Query delegation
//!
//! The gateway hands every read-side request to a `QueryEngine`. Results come
//! back in the shape the caller asked for: a nested map keyed by case and tube,
//! or a flat column-ordered table.

mod sqlite_engine;

pub use sqlite_engine::SqliteQueryEngine;

use crate::errors::Result;
use chrono::{DateTime, Utc};
use fcsmeta_core::model::TableData;
use fcsmeta_core::query::{ExportType, QueryRequest};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// One result row keyed by column name.
pub type Row = BTreeMap<String, Value>;

/// case_number -> case_tube_idx -> rows
pub type NestedRows = BTreeMap<String, BTreeMap<i64, Vec<Row>>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResults {
    Nested(NestedRows),
    Table(TableData),
    Cases(Vec<String>),
    CreationDate(Option<DateTime<Utc>>),
}

impl QueryResults {
    /// Number of leaf rows (tube or channel rows, cases, or timestamps).
    pub fn row_count(&self) -> usize {
        match self {
            QueryResults::Nested(nested) => nested
                .values()
                .flat_map(|tubes| tubes.values())
                .map(Vec::len)
                .sum(),
            QueryResults::Table(table) => table.len(),
            QueryResults::Cases(cases) => cases.len(),
            QueryResults::CreationDate(date) => usize::from(date.is_some()),
        }
    }

    /// Flatten into a table for CSV output.
    pub fn to_table(&self) -> TableData {
        match self {
            QueryResults::Table(table) => table.clone(),
            QueryResults::Nested(nested) => {
                let rows: Vec<&Row> = nested
                    .values()
                    .flat_map(|tubes| tubes.values())
                    .flatten()
                    .collect();
                let columns: Vec<String> = rows
                    .first()
                    .map(|row| row.keys().cloned().collect())
                    .unwrap_or_default();
                TableData {
                    rows: rows
                        .iter()
                        .map(|row| {
                            columns
                                .iter()
                                .map(|c| row.get(c).cloned().unwrap_or(Value::Null))
                                .collect()
                        })
                        .collect(),
                    columns,
                }
            }
            QueryResults::Cases(cases) => TableData {
                columns: vec!["case_number".to_string()],
                rows: cases.iter().map(|c| vec![Value::String(c.clone())]).collect(),
            },
            QueryResults::CreationDate(date) => TableData {
                columns: vec!["creation_date".to_string()],
                rows: date
                    .iter()
                    .map(|d| vec![Value::String(d.to_rfc3339())])
                    .collect(),
            },
        }
    }
}

/// Read-side contract consumed by the gateway.
pub trait QueryEngine {
    /// Answer `request` against `conn`, shaped by `export`.
    ///
    /// # Errors
    ///
    /// `Persistence` for engine failures; `Serialization` for unreadable
    /// stored values.
    fn execute(
        &self,
        conn: &Connection,
        request: &QueryRequest,
        export: ExportType,
    ) -> Result<QueryResults>;
}
