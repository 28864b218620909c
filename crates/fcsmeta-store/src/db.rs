//! Database connection management
//!
//! Opening and configuring SQLite connections for the metadata store.

use crate::errors::{schema_error, Result};
use rusqlite::Connection;
use serde::Deserialize;
use std::path::Path;

/// SQLite journal mode applied on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    #[default]
    Wal,
    Delete,
    Memory,
}

impl JournalMode {
    fn as_pragma(&self) -> &'static str {
        match self {
            JournalMode::Wal => "WAL",
            JournalMode::Delete => "DELETE",
            JournalMode::Memory => "MEMORY",
        }
    }
}

/// Storage-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Have the engine enforce foreign keys (`PRAGMA foreign_keys`)
    pub enforce_foreign_keys: bool,
    pub journal_mode: JournalMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enforce_foreign_keys: true,
            journal_mode: JournalMode::Wal,
        }
    }
}

/// Open a SQLite database at the given path
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Connection::open(path).map_err(|e| schema_error("open", e))
}

/// Open an in-memory SQLite database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(|e| schema_error("open", e))
}

/// Apply `config` to a freshly opened connection
pub fn configure(conn: &Connection, config: &StoreConfig) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", config.enforce_foreign_keys)
        .map_err(|e| schema_error("configure", e))?;

    // journal_mode answers with the resulting mode; in-memory databases stay "memory".
    let journal_mode: String = conn
        .pragma_update_and_check(None, "journal_mode", config.journal_mode.as_pragma(), |row| {
            row.get(0)
        })
        .map_err(|e| schema_error("configure", e))?;

    tracing::debug!(
        enforce_foreign_keys = config.enforce_foreign_keys,
        journal_mode = %journal_mode,
        "connection configured"
    );
    Ok(())
}

/// Open and configure in one step
pub fn open_configured<P: AsRef<Path>>(path: P, config: &StoreConfig) -> Result<Connection> {
    let conn = open(path)?;
    configure(&conn, config)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configure_enables_foreign_keys() {
        let conn = open_in_memory().unwrap();
        configure(&conn, &StoreConfig::default()).unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |r| r.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_configure_can_disable_foreign_keys() {
        let conn = open_in_memory().unwrap();
        let config = StoreConfig {
            enforce_foreign_keys: false,
            journal_mode: JournalMode::Memory,
        };
        configure(&conn, &config).unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |r| r.get(0))
            .unwrap();
        assert_eq!(fk, 0);
    }

    #[test]
    fn test_store_config_defaults_from_partial_json() {
        let config: StoreConfig = serde_json::from_str(r#"{"journal_mode":"delete"}"#).unwrap();
        assert!(config.enforce_foreign_keys);
        assert_eq!(config.journal_mode, JournalMode::Delete);
    }
}
