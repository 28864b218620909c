//! Reference tables: TubeTypes, TubeTypesInstances, Antigens, Fluorophores

use crate::errors::{from_rusqlite, Result};
use crate::schema::SchemaStore;
use crate::tabular;
use fcsmeta_core::errors::{ExError, FcsMetaError};
use fcsmeta_core::model::{TableData, TableName};
use rusqlite::Connection;

/// Drop every row of a replaceable reference table and load `data`.
///
/// Foreign keys are checked at commit (`defer_foreign_keys`), so the caller
/// must run this inside a transaction. Replacing `TubeTypesInstances` also
/// syncs `TubeTypes` to its distinct `tube_type` values.
pub fn replace_reference_table(conn: &Connection, table: TableName, data: &TableData) -> Result<usize> {
    if !table.is_replaceable() {
        return Err(ExError::from(FcsMetaError::TableNotReplaceable {
            table: table.as_str().to_string(),
        }));
    }

    let declared = SchemaStore::declared_columns(conn, table)?;
    tabular::check_columns(&declared, table, data)?;

    conn.pragma_update(None, "defer_foreign_keys", true)
        .map_err(from_rusqlite)?;
    conn.execute(&format!("DELETE FROM \"{}\"", table.as_str()), [])
        .map_err(|e| from_rusqlite(e).with_table(table.as_str()))?;
    let inserted = tabular::insert_rows(conn, table, data)?;

    if table == TableName::TubeTypesInstances {
        sync_tube_types(conn)?;
    }

    tracing::debug!(table = table.as_str(), inserted, "reference table replaced");
    Ok(inserted)
}

/// Make TubeTypes hold exactly the categories TubeTypesInstances references.
fn sync_tube_types(conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO TubeTypes (tube_type)
         SELECT DISTINCT tube_type FROM TubeTypesInstances WHERE tube_type IS NOT NULL",
        [],
    )
    .map_err(|e| from_rusqlite(e).with_table(TableName::TubeTypes.as_str()))?;
    conn.execute(
        "DELETE FROM TubeTypes
         WHERE tube_type NOT IN (SELECT tube_type FROM TubeTypesInstances WHERE tube_type IS NOT NULL)",
        [],
    )
    .map_err(|e| from_rusqlite(e).with_table(TableName::TubeTypes.as_str()))?;
    Ok(())
}

/// Raw-to-canonical tube type mapping, ordered by raw name.
pub fn tube_type_mapping(conn: &Connection) -> Result<TableData> {
    tabular::query_table(
        conn,
        "SELECT tube_type_raw, tube_type FROM TubeTypesInstances ORDER BY tube_type_raw",
        &[],
    )
}

pub fn insert_antigen(conn: &Connection, antigen: &str) -> Result<()> {
    conn.execute("INSERT OR IGNORE INTO Antigens (antigen) VALUES (?1)", [antigen])
        .map_err(from_rusqlite)?;
    Ok(())
}

pub fn insert_fluorophore(conn: &Connection, fluorophore: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO Fluorophores (fluorophore) VALUES (?1)",
        [fluorophore],
    )
    .map_err(from_rusqlite)?;
    Ok(())
}
