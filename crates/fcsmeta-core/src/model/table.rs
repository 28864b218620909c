//! Persisted table names and in-memory tabular data

use crate::errors::{FcsMetaError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Tables of the persisted schema. Names are part of the on-disk contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableName {
    MetaTable,
    TubeTypes,
    TubeTypesInstances,
    Antigens,
    Fluorophores,
    Cases,
    TubeCases,
    PmtTubeCases,
    CustomCaseData,
}

impl TableName {
    /// All tables, referenced tables before the tables that reference them.
    pub const CREATION_ORDER: [TableName; 9] = [
        TableName::MetaTable,
        TableName::TubeTypes,
        TableName::TubeTypesInstances,
        TableName::Antigens,
        TableName::Fluorophores,
        TableName::Cases,
        TableName::TubeCases,
        TableName::PmtTubeCases,
        TableName::CustomCaseData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::MetaTable => "MetaTable",
            TableName::TubeTypes => "TubeTypes",
            TableName::TubeTypesInstances => "TubeTypesInstances",
            TableName::Antigens => "Antigens",
            TableName::Fluorophores => "Fluorophores",
            TableName::Cases => "Cases",
            TableName::TubeCases => "TubeCases",
            TableName::PmtTubeCases => "PmtTubeCases",
            TableName::CustomCaseData => "CustomCaseData",
        }
    }

    /// Dependents first, so drops never trip a foreign key.
    pub fn drop_order() -> impl Iterator<Item = TableName> {
        Self::CREATION_ORDER.into_iter().rev()
    }

    /// Reference tables that may be bulk-replaced through `replace_table`.
    pub fn is_replaceable(&self) -> bool {
        matches!(
            self,
            TableName::TubeTypesInstances | TableName::Antigens | TableName::Fluorophores
        )
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableName {
    type Err = FcsMetaError;

    /// Matches table names case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        Self::CREATION_ORDER
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FcsMetaError::UnknownTable {
                name: s.to_string(),
            })
    }
}

/// Column-ordered rows, the common currency between CSV files, tables and
/// query results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl TableData {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row; its width must match the header.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(FcsMetaError::RaggedRow {
                row: self.rows.len() + 1,
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column, in row order.
    pub fn column_values(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Project onto `columns` (each must exist), keeping row order.
    pub fn select(&self, columns: &[String]) -> Option<TableData> {
        let indices = columns
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Option<Vec<_>>>()?;
        Some(TableData {
            columns: columns.to_vec(),
            rows: self
                .rows
                .iter()
                .map(|r| indices.iter().map(|&i| r[i].clone()).collect())
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Render a cell the way delimited text expects it (NULL becomes empty).
pub fn cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
