//! Delimited-text and table I/O
//!
//! Moves `TableData` between delimited files and SQLite tables. Import files
//! may be tab- or comma-delimited (sniffed from the header line); exports are
//! always UTF-8 CSV with a header row and no index column.

use crate::errors::{csv_error, from_rusqlite, io_error, Result};
use fcsmeta_core::errors::ExError;
use fcsmeta_core::errors::FcsMetaError;
use fcsmeta_core::model::{cell_to_string, TableData, TableName};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Connection;
use serde_json::Value;
use std::path::Path;

/// Pick the delimiter from the first line: tab if present, otherwise comma.
pub fn sniff_delimiter(text: &str) -> u8 {
    match text.lines().next() {
        Some(header) if header.contains('\t') => b'\t',
        _ => b',',
    }
}

/// Parse delimited text. Empty cells become `Null`; a blank input yields a
/// table with no columns.
pub fn parse_delimited(text: &str, source: &Path) -> Result<TableData> {
    if text.trim().is_empty() {
        return Ok(TableData::default());
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(text))
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| csv_error("read_delimited", source, e))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    let mut data = TableData::new(headers);

    for record in reader.records() {
        let record = record.map_err(|e| csv_error("read_delimited", source, e))?;
        let row = record
            .iter()
            .map(|cell| {
                if cell.is_empty() {
                    Value::Null
                } else {
                    Value::String(cell.to_string())
                }
            })
            .collect();
        data.push_row(row).map_err(|e| {
            ExError::from(e)
                .with_op("read_delimited")
                .with_file(source.display().to_string())
        })?;
    }

    Ok(data)
}

/// Read a delimited file from disk.
pub fn read_delimited(path: &Path) -> Result<TableData> {
    let text = std::fs::read_to_string(path).map_err(|e| io_error("read_delimited", path, e))?;
    parse_delimited(&text, path)
}

/// Write `data` as CSV (header row, no index column).
pub fn write_csv(path: &Path, data: &TableData) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error("write_csv", path, e))?;
    writer
        .write_record(&data.columns)
        .map_err(|e| csv_error("write_csv", path, e))?;
    for row in &data.rows {
        writer
            .write_record(row.iter().map(cell_to_string))
            .map_err(|e| csv_error("write_csv", path, e))?;
    }
    writer
        .flush()
        .map_err(|e| io_error("write_csv", path, e))?;
    Ok(())
}

pub(crate) fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

pub(crate) fn from_sql_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
    }
}

/// Run `sql` and collect every row into a `TableData`.
pub fn query_table(
    conn: &Connection,
    sql: &str,
    params: &[SqlValue],
) -> Result<TableData> {
    let mut stmt = conn.prepare(sql).map_err(from_rusqlite)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();
    let mut data = TableData::new(columns);

    let mut rows = stmt
        .query(rusqlite::params_from_iter(params.iter()))
        .map_err(from_rusqlite)?;
    while let Some(row) = rows.next().map_err(from_rusqlite)? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(from_sql_value(row.get_ref(i).map_err(from_rusqlite)?));
        }
        data.rows.push(values);
    }
    Ok(data)
}

/// Entire contents of `table` in insertion (rowid) order.
pub fn read_table(conn: &Connection, table: TableName) -> Result<TableData> {
    query_table(
        conn,
        &format!("SELECT * FROM \"{}\" ORDER BY rowid", table.as_str()),
        &[],
    )
}

/// Insert every row of `data` into `table`. Columns must already be
/// validated against the table's declaration.
pub fn insert_rows(conn: &Connection, table: TableName, data: &TableData) -> Result<usize> {
    if data.columns.is_empty() {
        return Ok(0);
    }
    let column_list = data
        .columns
        .iter()
        .map(|c| format!("\"{}\"", c.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=data.columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO \"{}\" ({}) VALUES ({})",
        table.as_str(),
        column_list,
        placeholders
    );

    let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
    for row in &data.rows {
        stmt.execute(rusqlite::params_from_iter(row.iter().map(to_sql_value)))
            .map_err(|e| from_rusqlite(e).with_table(table.as_str()))?;
    }
    Ok(data.rows.len())
}

/// Reject columns `table` does not declare.
pub fn check_columns(declared: &[String], table: TableName, data: &TableData) -> Result<()> {
    let unknown: Vec<String> = data
        .columns
        .iter()
        .filter(|c| !declared.contains(c))
        .cloned()
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(ExError::from(FcsMetaError::UnknownColumns {
            table: table.as_str().to_string(),
            columns: unknown,
        }))
    }
}

/// Non-empty text of a cell, if it has any.
pub fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => {
            let s = cell_to_string(other);
            (!s.trim().is_empty()).then_some(s)
        }
    }
}
