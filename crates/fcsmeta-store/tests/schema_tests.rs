// Integration tests for schema lifecycle: ensure vs rebuild

use chrono::Utc;
use fcsmeta_core::errors::ExErrorKind;
use fcsmeta_core::model::{Case, Flag, TableName, TubeCase};
use fcsmeta_store::db::{self, JournalMode, StoreConfig};
use fcsmeta_store::repo::{cases, tube_cases};
use fcsmeta_store::SchemaStore;
use rusqlite::Connection;
use tempfile::TempDir;

fn setup_test_db() -> Connection {
    let conn = db::open_in_memory().unwrap();
    let config = StoreConfig {
        journal_mode: JournalMode::Memory,
        ..StoreConfig::default()
    };
    db::configure(&conn, &config).unwrap();
    SchemaStore::ensure_schema(&conn).unwrap();
    conn
}

fn count(conn: &Connection, table: TableName) -> i64 {
    conn.query_row(
        &format!("SELECT COUNT(*) FROM \"{}\"", table.as_str()),
        [],
        |r| r.get(0),
    )
    .unwrap()
}

fn seed_case_with_tube(conn: &Connection) {
    cases::insert_case(conn, &Case::new("A100")).unwrap();
    tube_cases::insert_tube_case(conn, &TubeCase::new(1, "A100")).unwrap();
    conn.execute(
        "INSERT INTO CustomCaseData (case_number, category) VALUES ('A100', 'typeX')",
        [],
    )
    .unwrap();
}

#[test]
fn test_rebuild_empties_tables_and_stamps_meta_table() {
    // Given: a populated store
    let mut conn = setup_test_db();
    seed_case_with_tube(&conn);
    let before = Utc::now();

    // When: the schema is rebuilt
    let created = SchemaStore::rebuild_schema(&mut conn).unwrap();

    // Then: every data table is empty
    for table in [
        TableName::Cases,
        TableName::TubeCases,
        TableName::PmtTubeCases,
        TableName::CustomCaseData,
    ] {
        assert_eq!(count(&conn, table), 0, "{} should be empty", table);
    }

    // And: MetaTable holds exactly one row, not in the future
    assert_eq!(count(&conn, TableName::MetaTable), 1);
    let stored = SchemaStore::creation_date(&conn).unwrap().unwrap();
    assert!(stored >= before - chrono::Duration::seconds(1));
    assert!(stored <= Utc::now());
    assert_eq!(stored.timestamp(), created.timestamp());
}

#[test]
fn test_rebuild_twice_keeps_single_meta_row() {
    let mut conn = setup_test_db();
    SchemaStore::rebuild_schema(&mut conn).unwrap();
    SchemaStore::rebuild_schema(&mut conn).unwrap();
    assert_eq!(count(&conn, TableName::MetaTable), 1);
}

#[test]
fn test_ensure_preserves_existing_data() {
    let conn = setup_test_db();
    seed_case_with_tube(&conn);

    SchemaStore::ensure_schema(&conn).unwrap();

    assert_eq!(count(&conn, TableName::Cases), 1);
    assert_eq!(count(&conn, TableName::TubeCases), 1);
    assert_eq!(count(&conn, TableName::CustomCaseData), 1);
}

#[test]
fn test_file_backed_store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fcs.db");

    {
        let conn = db::open_configured(&path, &StoreConfig::default()).unwrap();
        SchemaStore::ensure_schema(&conn).unwrap();
        seed_case_with_tube(&conn);
    }

    let conn = db::open_configured(&path, &StoreConfig::default()).unwrap();
    SchemaStore::ensure_schema(&conn).unwrap();
    assert_eq!(count(&conn, TableName::TubeCases), 1);
}

#[test]
fn test_error_flag_without_message_violates_check() {
    let conn = setup_test_db();
    cases::insert_case(&conn, &Case::new("A100")).unwrap();
    let mut tube = TubeCase::new(1, "A100");
    tube.flag = Flag::Error;

    let err = tube_cases::insert_tube_case(&conn, &tube).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Integrity);
}

#[test]
fn test_tube_requires_existing_case() {
    let conn = setup_test_db();
    let err = tube_cases::insert_tube_case(&conn, &TubeCase::new(1, "NOPE")).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Integrity);
}

#[test]
fn test_case_tube_idx_is_immutable() {
    let conn = setup_test_db();
    seed_case_with_tube(&conn);

    let result = conn.execute(
        "UPDATE TubeCases SET case_tube_idx = 99 WHERE case_tube_idx = 1",
        [],
    );
    assert!(result.is_err());
    assert!(tube_cases::get_tube_case(&conn, 1).unwrap().is_some());
}
