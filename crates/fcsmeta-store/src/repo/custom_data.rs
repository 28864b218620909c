//! CustomCaseData table

use crate::errors::{from_rusqlite, Result};
use crate::tabular::{self, cell_text};
use fcsmeta_core::columns::CASE_NUMBER;
use fcsmeta_core::model::{TableData, TableName};
use rusqlite::Connection;
use std::collections::BTreeSet;

/// Delete every CustomCaseData row and insert `data` in its place.
///
/// `data` columns must be a subset of the declared columns.
pub fn replace_custom_case_data(conn: &Connection, data: &TableData) -> Result<usize> {
    let removed = conn
        .execute("DELETE FROM CustomCaseData", [])
        .map_err(from_rusqlite)?;
    let inserted = tabular::insert_rows(conn, TableName::CustomCaseData, data)?;
    tracing::debug!(removed, inserted, "custom case data replaced");
    Ok(inserted)
}

/// Distinct non-blank case numbers in `data`.
pub fn distinct_case_numbers(data: &TableData) -> BTreeSet<String> {
    data.column_values(CASE_NUMBER)
        .map(|values| {
            values
                .into_iter()
                .filter_map(cell_text)
                .map(|s| s.trim().to_string())
                .collect()
        })
        .unwrap_or_default()
}

pub fn read_custom_case_data(conn: &Connection) -> Result<TableData> {
    tabular::read_table(conn, TableName::CustomCaseData)
}
