// Integration tests for per-table repositories

use fcsmeta_core::errors::ExErrorKind;
use fcsmeta_core::model::{Case, Flag, PmtTubeCase, TableData, TableName, TubeCase};
use fcsmeta_store::db::{self, JournalMode, StoreConfig};
use fcsmeta_store::repo::{cases, custom_data, reference, tube_cases};
use fcsmeta_store::tabular::read_table;
use fcsmeta_store::SchemaStore;
use rusqlite::Connection;
use serde_json::{json, Value};

fn open_configured_memory() -> Connection {
    let conn = db::open_in_memory().unwrap();
    let config = StoreConfig {
        journal_mode: JournalMode::Memory,
        ..StoreConfig::default()
    };
    db::configure(&conn, &config).unwrap();
    conn
}

fn setup_test_db() -> Connection {
    let conn = open_configured_memory();
    SchemaStore::ensure_schema(&conn).unwrap();
    conn
}

fn table(columns: &[&str], rows: Vec<Vec<Value>>) -> TableData {
    let mut data = TableData::new(columns.iter().map(|c| c.to_string()).collect());
    for row in rows {
        data.push_row(row).unwrap();
    }
    data
}

fn channel(idx: i64, number: i64, antigen: &str) -> PmtTubeCase {
    PmtTubeCase {
        case_tube_idx: idx,
        channel_number: number,
        channel_name: Some(format!("FL{}", number)),
        antigen: Some(antigen.to_string()),
        fluorophore: None,
        voltage: Some(500.0),
    }
}

#[test]
fn test_update_flag_writes_flag_and_message_together() {
    let conn = setup_test_db();
    cases::insert_case(&conn, &Case::new("A100")).unwrap();
    tube_cases::insert_tube_case(&conn, &TubeCase::new(1, "A100")).unwrap();
    tube_cases::insert_tube_case(&conn, &TubeCase::new(2, "A100")).unwrap();

    let updated = tube_cases::update_flag(&conn, 1, Flag::Error, Some("bad gating")).unwrap();
    assert_eq!(updated, 1);

    let tube = tube_cases::get_tube_case(&conn, 1).unwrap().unwrap();
    assert_eq!(tube.flag, Flag::Error);
    assert_eq!(tube.error_message.as_deref(), Some("bad gating"));

    let other = tube_cases::get_tube_case(&conn, 2).unwrap().unwrap();
    assert_eq!(other.flag, Flag::Pending);
    assert!(other.error_message.is_none());
}

#[test]
fn test_count_by_idx_sees_legacy_duplicates() {
    // Given: a legacy TubeCases table created without a unique key
    let conn = open_configured_memory();
    conn.execute_batch(
        "CREATE TABLE TubeCases (
             case_tube_idx INTEGER,
             case_number TEXT,
             flag TEXT,
             error_message TEXT,
             filename TEXT,
             tube_type_raw TEXT,
             date TEXT,
             cytometer TEXT,
             cytnum TEXT,
             specimen TEXT,
             total_events INTEGER
         );
         INSERT INTO TubeCases (case_tube_idx, case_number, flag) VALUES (7, 'A', 'Pending');
         INSERT INTO TubeCases (case_tube_idx, case_number, flag) VALUES (7, 'B', 'Pending');",
    )
    .unwrap();
    SchemaStore::ensure_schema(&conn).unwrap();

    assert_eq!(tube_cases::count_by_idx(&conn, 7).unwrap(), 2);
    assert_eq!(tube_cases::count_by_idx(&conn, 8).unwrap(), 0);
}

#[test]
fn test_next_case_tube_idx() {
    let conn = setup_test_db();
    assert_eq!(tube_cases::next_case_tube_idx(&conn).unwrap(), 1);

    cases::insert_case(&conn, &Case::new("A100")).unwrap();
    tube_cases::insert_tube_case(&conn, &TubeCase::new(41, "A100")).unwrap();
    assert_eq!(tube_cases::next_case_tube_idx(&conn).unwrap(), 42);
}

#[test]
fn test_insert_case_if_absent_does_not_duplicate() {
    let conn = setup_test_db();
    assert!(cases::insert_case_if_absent(&conn, &Case::new("A100")).unwrap());
    assert!(!cases::insert_case_if_absent(&conn, &Case::new("A100")).unwrap());
    assert_eq!(cases::all_case_numbers(&conn).unwrap().len(), 1);

    let err = cases::insert_case(&conn, &Case::new("A100")).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Integrity);
}

#[test]
fn test_replace_custom_case_data_is_total() {
    let conn = setup_test_db();
    let first = table(
        &["case_number", "category"],
        vec![
            vec![json!("A100"), json!("typeX")],
            vec![json!("A200"), json!("typeY")],
        ],
    );
    let second = table(&["case_number", "category"], vec![vec![json!("B1"), json!("typeZ")]]);

    custom_data::replace_custom_case_data(&conn, &first).unwrap();
    custom_data::replace_custom_case_data(&conn, &second).unwrap();

    let stored = custom_data::read_custom_case_data(&conn).unwrap();
    assert_eq!(stored.columns, vec!["case_number", "category"]);
    assert_eq!(stored.rows, second.rows);
}

#[test]
fn test_distinct_case_numbers_skips_blanks() {
    let data = table(
        &["case_number"],
        vec![
            vec![json!("A100")],
            vec![json!("A100")],
            vec![Value::Null],
            vec![json!(" A200 ")],
        ],
    );
    let cases: Vec<String> = custom_data::distinct_case_numbers(&data).into_iter().collect();
    assert_eq!(cases, vec!["A100", "A200"]);
}

#[test]
fn test_backfill_categories_from_custom_data() {
    let conn = setup_test_db();
    cases::insert_case(&conn, &Case::new("A100")).unwrap();
    cases::insert_case(&conn, &Case::new("A300")).unwrap();
    custom_data::replace_custom_case_data(
        &conn,
        &table(
            &["case_number", "category"],
            vec![
                vec![json!("A100"), json!("typeX")],
                vec![json!("A100"), json!("typeQ")],
            ],
        ),
    )
    .unwrap();

    cases::backfill_categories(&conn).unwrap();

    let a100 = cases::get_case(&conn, "A100").unwrap().unwrap();
    assert_eq!(a100.category.as_deref(), Some("typeX"));
    let a300 = cases::get_case(&conn, "A300").unwrap().unwrap();
    assert!(a300.category.is_none());
}

#[test]
fn test_replace_tube_type_instances_refreshes_tube_types() {
    let mut conn = setup_test_db();
    let data = table(
        &["tube_type_raw", "tube_type"],
        vec![
            vec![json!("M1"), json!("Myeloid 1")],
            vec![json!("Myeloid_1"), json!("Myeloid 1")],
            vec![json!("L"), json!("Lymphoid")],
        ],
    );

    let tx = conn.transaction().unwrap();
    reference::replace_reference_table(&tx, TableName::TubeTypesInstances, &data).unwrap();
    tx.commit().unwrap();

    let types = read_table(&conn, TableName::TubeTypes).unwrap();
    let mut names: Vec<&Value> = types.rows.iter().map(|r| &r[0]).collect();
    names.sort_by_key(|v| v.to_string());
    assert_eq!(names, vec![&json!("Lymphoid"), &json!("Myeloid 1")]);

    // Replacing again drops categories no longer referenced
    let smaller = table(
        &["tube_type_raw", "tube_type"],
        vec![vec![json!("L"), json!("Lymphoid")]],
    );
    let tx = conn.transaction().unwrap();
    reference::replace_reference_table(&tx, TableName::TubeTypesInstances, &smaller).unwrap();
    tx.commit().unwrap();
    assert_eq!(read_table(&conn, TableName::TubeTypes).unwrap().len(), 1);
    assert_eq!(reference::tube_type_mapping(&conn).unwrap().len(), 1);
}

#[test]
fn test_replace_rejects_non_reference_table() {
    let conn = setup_test_db();
    let err = reference::replace_reference_table(&conn, TableName::Cases, &TableData::default())
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);
}

#[test]
fn test_replace_rejects_unknown_columns() {
    let conn = setup_test_db();
    let data = table(&["antigen", "colour"], vec![vec![json!("CD45"), json!("red")]]);
    let err = reference::replace_reference_table(&conn, TableName::Antigens, &data).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::SchemaMismatch);
}

#[test]
fn test_replace_antigens_still_referenced_fails_at_commit() {
    let mut conn = setup_test_db();
    cases::insert_case(&conn, &Case::new("A100")).unwrap();
    tube_cases::insert_tube_case(&conn, &TubeCase::new(1, "A100")).unwrap();
    reference::insert_antigen(&conn, "CD45").unwrap();
    tube_cases::insert_pmt_tube_case(&conn, &channel(1, 1, "CD45")).unwrap();

    let data = table(&["antigen"], vec![vec![json!("CD3")]]);
    let tx = conn.transaction().unwrap();
    reference::replace_reference_table(&tx, TableName::Antigens, &data).unwrap();
    let err = tx.commit().unwrap_err();
    assert_eq!(
        fcsmeta_store::errors::from_rusqlite(err).kind(),
        ExErrorKind::Integrity
    );

    // Rolled back: the original antigen is still there
    let antigens = read_table(&conn, TableName::Antigens).unwrap();
    assert_eq!(antigens.rows, vec![vec![json!("CD45")]]);
}

#[test]
fn test_delete_tubes_and_find_orphans() {
    let conn = setup_test_db();
    reference::insert_antigen(&conn, "CD45").unwrap();
    for case in ["A100", "A200"] {
        cases::insert_case(&conn, &Case::new(case)).unwrap();
    }
    tube_cases::insert_tube_case(&conn, &TubeCase::new(1, "A100")).unwrap();
    tube_cases::insert_tube_case(&conn, &TubeCase::new(2, "A100")).unwrap();
    tube_cases::insert_tube_case(&conn, &TubeCase::new(3, "A200")).unwrap();
    tube_cases::insert_pmt_tube_case(&conn, &channel(1, 1, "CD45")).unwrap();
    tube_cases::insert_pmt_tube_case(&conn, &channel(1, 2, "CD45")).unwrap();

    let (tubes, channels) = tube_cases::delete_tube_cases(&conn, &[1, 3]).unwrap();
    assert_eq!((tubes, channels), (2, 2));

    let parents = vec!["A100".to_string(), "A200".to_string()];
    assert_eq!(cases::orphaned_cases(&conn, &parents).unwrap(), vec!["A200"]);
    assert_eq!(tube_cases::idxs_for_cases(&conn, &parents).unwrap(), vec![2]);
    assert!(tube_cases::list_channels(&conn, 1).unwrap().is_empty());
}
