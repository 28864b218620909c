//! Schema lifecycle
//!
//! `SchemaStore` owns the declared schema (embedded at compile time) and the
//! two ways of bringing a database in line with it:
//! - `ensure_schema`: additive, idempotent, never deletes data
//! - `rebuild_schema`: drops every declared table and starts over

use crate::errors::{from_rusqlite, schema_error, Result};
use chrono::{DateTime, Utc};
use fcsmeta_core::errors::{ExError, ExErrorKind};
use fcsmeta_core::model::TableName;
use rusqlite::{Connection, OptionalExtension};

/// Declared schema, applied verbatim by both ensure and rebuild.
const SCHEMA_SQL: &str = include_str!("fcs_schema.sql");

/// Schema lifecycle operations over a borrowed connection
pub struct SchemaStore;

impl SchemaStore {
    /// Create any declared table that does not exist yet.
    ///
    /// # Errors
    ///
    /// `Schema` if any DDL statement fails.
    pub fn ensure_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| schema_error("ensure_schema", e))?;
        tracing::debug!("schema ensured");
        Ok(())
    }

    /// Drop and recreate every declared table, stamp MetaTable, refresh
    /// planner statistics. Destroys all stored data.
    ///
    /// Drops, creates and the MetaTable insert share one transaction, so a
    /// failure leaves the previous schema and data in place.
    ///
    /// # Errors
    ///
    /// `Schema` if any DDL statement fails.
    pub fn rebuild_schema(conn: &mut Connection) -> Result<DateTime<Utc>> {
        let tx = conn
            .transaction()
            .map_err(|e| schema_error("rebuild_schema", e))?;

        for table in TableName::drop_order() {
            tx.execute_batch(&format!("DROP TABLE IF EXISTS \"{}\"", table.as_str()))
                .map_err(|e| schema_error("rebuild_schema", e))?;
        }
        tx.execute_batch(SCHEMA_SQL)
            .map_err(|e| schema_error("rebuild_schema", e))?;

        let created = Utc::now();
        tx.execute(
            "INSERT INTO MetaTable (id, creation_date) VALUES (1, ?1)",
            [created.to_rfc3339()],
        )
        .map_err(|e| schema_error("rebuild_schema", e))?;

        tx.commit().map_err(|e| schema_error("rebuild_schema", e))?;

        conn.execute_batch("ANALYZE")
            .map_err(|e| schema_error("rebuild_schema", e))?;

        tracing::debug!(creation_date = %created, "schema rebuilt");
        Ok(created)
    }

    /// Creation timestamp recorded by the last rebuild, if any.
    pub fn creation_date(conn: &Connection) -> Result<Option<DateTime<Utc>>> {
        let raw: Option<String> = conn
            .query_row("SELECT creation_date FROM MetaTable WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()
            .map_err(from_rusqlite)?;

        raw.map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    ExError::new(ExErrorKind::Serialization)
                        .with_op("creation_date")
                        .with_table(TableName::MetaTable.as_str())
                        .with_message(format!("Invalid creation_date '{}': {}", s, e))
                })
        })
        .transpose()
    }

    /// Column names of `table` in declaration order.
    pub fn declared_columns(conn: &Connection, table: TableName) -> Result<Vec<String>> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info(\"{}\")", table.as_str()))
            .map_err(from_rusqlite)?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        if columns.is_empty() {
            return Err(ExError::new(ExErrorKind::Schema)
                .with_op("declared_columns")
                .with_table(table.as_str())
                .with_message("Table does not exist; ensure the schema first"));
        }
        Ok(columns)
    }

    /// Whether `table` exists in the connected database.
    pub fn table_exists(conn: &Connection, table: TableName) -> Result<bool> {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table.as_str()],
            |row| row.get::<_, i64>(0),
        )
        .map(|n| n > 0)
        .map_err(from_rusqlite)
    }
}
