// Integration tests for custom case data import and reconciliation

use fcsmeta_core::errors::{ExError, ExErrorKind};
use fcsmeta_core::model::{Case, Flag, TableName, TubeCase, PLACEHOLDER_ERROR_MESSAGE};
use fcsmeta_core::query::{ExportType, QueryRequest};
use fcsmeta_engine::{GatewayOptions, MetadataGateway};
use fcsmeta_store::repo::{cases, tube_cases};
use fcsmeta_store::{db, QueryEngine, QueryResults};
use rusqlite::Connection;
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;

fn setup_gateway() -> MetadataGateway {
    MetadataGateway::open_in_memory(&GatewayOptions::default()).unwrap()
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn seed_case(gateway: &MetadataGateway, case_number: &str, idx: i64) {
    let conn = gateway.connection();
    cases::insert_case(conn, &Case::new(case_number)).unwrap();
    tube_cases::insert_tube_case(conn, &TubeCase::new(idx, case_number)).unwrap();
}

fn tubes_of(gateway: &MetadataGateway, case_number: &str) -> Vec<TubeCase> {
    tube_cases::list_for_case(gateway.connection(), case_number).unwrap()
}

#[test]
fn test_import_synthesizes_placeholder_for_unknown_case() {
    // Given: a store that knows only A100
    let dir = TempDir::new().unwrap();
    let mut gateway = setup_gateway();
    seed_case(&gateway, "A100", 1);
    let file = write_file(&dir, "classes.csv", "CaseNum,Category\nA100,typeX\nA200,typeY\n");

    // When: the classification file is imported
    let summary = gateway.import_custom_case_data(&file).unwrap();

    // Then: CustomCaseData holds both rows under the declared column names
    let stored = gateway.read_table(TableName::CustomCaseData).unwrap();
    assert_eq!(stored.columns, vec!["case_number", "category"]);
    assert_eq!(
        stored.rows,
        vec![
            vec![json!("A100"), json!("typeX")],
            vec![json!("A200"), json!("typeY")],
        ]
    );

    // And: exactly one placeholder tube was added, for A200
    assert_eq!(summary.placeholders, vec!["A200"]);
    let a200 = tubes_of(&gateway, "A200");
    assert_eq!(a200.len(), 1);
    assert_eq!(a200[0].flag, Flag::CustomDataOnly);
    assert_eq!(
        a200[0].error_message.as_deref(),
        Some(PLACEHOLDER_ERROR_MESSAGE)
    );
    assert_eq!(a200[0].case_tube_idx, 2);
    assert_eq!(tubes_of(&gateway, "A100").len(), 1);

    // And: categories were copied onto the cases
    let a100 = cases::get_case(gateway.connection(), "A100").unwrap().unwrap();
    assert_eq!(a100.category.as_deref(), Some("typeX"));
    assert_eq!(summary.categories_updated, 2);
}

#[test]
fn test_second_import_replaces_first_without_duplicate_cases() {
    let dir = TempDir::new().unwrap();
    let mut gateway = setup_gateway();
    let first = write_file(&dir, "one.csv", "case,category\nB1,x\nB2,y\n");
    let second = write_file(&dir, "two.csv", "case,category\nB2,z\n");

    gateway.import_custom_case_data(&first).unwrap();
    let summary = gateway.import_custom_case_data(&second).unwrap();

    let stored = gateway.read_table(TableName::CustomCaseData).unwrap();
    assert_eq!(stored.rows, vec![vec![json!("B2"), json!("z")]]);
    assert!(summary.placeholders.is_empty());
    assert_eq!(gateway.cases(false).unwrap(), vec!["B1", "B2"]);
    assert_eq!(tubes_of(&gateway, "B2").len(), 1);
}

#[test]
fn test_case_id_header_is_inferred() {
    let dir = TempDir::new().unwrap();
    let mut gateway = setup_gateway();
    let file = write_file(&dir, "ids.csv", "CASE_ID,category\nC9,typeQ\n");

    let summary = gateway.import_custom_case_data(&file).unwrap();

    assert_eq!(summary.case_source.as_deref(), Some("CASE_ID"));
    assert_eq!(summary.columns, vec!["case_number", "category"]);
    assert_eq!(summary.placeholders, vec!["C9"]);
}

#[test]
fn test_tab_delimited_file_with_unrelated_columns() {
    let dir = TempDir::new().unwrap();
    let mut gateway = setup_gateway();
    let file = write_file(
        &dir,
        "classes.tsv",
        "Notes\tCase Number\tCategory\nseen twice\tD1\tAML\n",
    );

    let summary = gateway.import_custom_case_data(&file).unwrap();

    assert_eq!(summary.columns, vec!["case_number", "category"]);
    let stored = gateway.read_table(TableName::CustomCaseData).unwrap();
    assert_eq!(stored.rows, vec![vec![json!("D1"), json!("AML")]]);
}

#[test]
fn test_missing_case_column_leaves_custom_data_unchanged() {
    let dir = TempDir::new().unwrap();
    let mut gateway = setup_gateway();
    let good = write_file(&dir, "good.csv", "case,category\nE1,x\n");
    let bad = write_file(&dir, "bad.csv", "patient,category\nE2,y\n");
    gateway.import_custom_case_data(&good).unwrap();

    let err = gateway.import_custom_case_data(&bad).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::SchemaMismatch);
    assert_eq!(err.table(), Some("CustomCaseData"));
    let stored = gateway.read_table(TableName::CustomCaseData).unwrap();
    assert_eq!(stored.rows, vec![vec![json!("E1"), json!("x")]]);
    assert!(cases::get_case(gateway.connection(), "E2").unwrap().is_none());
}

/// Fails every case-universe lookup, after CustomCaseData is already replaced.
struct UnavailableCaseIndex;

impl QueryEngine for UnavailableCaseIndex {
    fn execute(
        &self,
        _conn: &Connection,
        request: &QueryRequest,
        _export: ExportType,
    ) -> fcsmeta_store::Result<QueryResults> {
        Err(ExError::new(ExErrorKind::Persistence)
            .with_op("execute")
            .with_message(format!("case index unavailable for {:?}", request)))
    }
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        .unwrap()
}

#[test]
fn test_failed_reconciliation_rolls_back_custom_data_and_cases() {
    // Given: a file-backed store with one case and an earlier import
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fcs.db");
    {
        let mut gateway = MetadataGateway::open(&path, &GatewayOptions::default()).unwrap();
        seed_case(&gateway, "G1", 1);
        let first = write_file(&dir, "first.csv", "case,category\nG1,x\n");
        gateway.import_custom_case_data(&first).unwrap();
    }

    // When: the case lookup fails midway through the next import
    let conn = db::open(&path).unwrap();
    let mut gateway =
        MetadataGateway::with_engine(conn, UnavailableCaseIndex, &GatewayOptions::default())
            .unwrap();
    let second = write_file(&dir, "second.csv", "case,category\nG2,y\nG3,z\n");
    let err = gateway.import_custom_case_data(&second).unwrap_err();

    // Then: the error surfaces and nothing from the second file persisted
    assert_eq!(err.kind(), ExErrorKind::Persistence);
    let stored = gateway.read_table(TableName::CustomCaseData).unwrap();
    assert_eq!(stored.rows, vec![vec![json!("G1"), json!("x")]]);
    let conn = gateway.connection();
    assert_eq!(count(conn, "Cases"), 1);
    assert_eq!(count(conn, "TubeCases"), 1);
    assert!(cases::get_case(conn, "G2").unwrap().is_none());
}

#[test]
fn test_second_column_assumed_to_be_category() {
    let dir = TempDir::new().unwrap();
    let mut gateway = setup_gateway();
    let file = write_file(&dir, "dx.csv", "CaseNum,Diagnosis\nF1,CLL\n");

    let summary = gateway.import_custom_case_data(&file).unwrap();

    assert!(summary.second_column_assumed);
    assert_eq!(summary.columns, vec!["case_number", "category"]);
    let stored = gateway.read_table(TableName::CustomCaseData).unwrap();
    assert_eq!(stored.rows, vec![vec![json!("F1"), json!("CLL")]]);
}

#[test]
fn test_single_column_file_keeps_only_case_number() {
    let dir = TempDir::new().unwrap();
    let mut gateway = setup_gateway();
    let file = write_file(&dir, "ids.csv", "case id\nG1\nG2\n");

    let summary = gateway.import_custom_case_data(&file).unwrap();

    assert_eq!(summary.columns, vec!["case_number"]);
    assert_eq!(summary.categories_updated, 0);
    let stored = gateway.read_table(TableName::CustomCaseData).unwrap();
    assert_eq!(stored.rows, vec![vec![json!("G1"), Value::Null], vec![json!("G2"), Value::Null]]);
}

#[test]
fn test_empty_file_empties_custom_data() {
    let dir = TempDir::new().unwrap();
    let mut gateway = setup_gateway();
    let good = write_file(&dir, "good.csv", "case,category\nH1,x\n");
    let empty = write_file(&dir, "empty.csv", "");
    gateway.import_custom_case_data(&good).unwrap();

    let summary = gateway.import_custom_case_data(&empty).unwrap();

    assert_eq!(summary.rows, 0);
    assert!(gateway.read_table(TableName::CustomCaseData).unwrap().is_empty());
}

#[test]
fn test_blank_and_duplicate_case_ids() {
    let dir = TempDir::new().unwrap();
    let mut gateway = setup_gateway();
    let file = write_file(&dir, "dups.csv", "case,category\n,x\nJ1,y\nJ1,z\n");

    let summary = gateway.import_custom_case_data(&file).unwrap();

    assert_eq!(summary.rows, 3);
    assert_eq!(summary.placeholders, vec!["J1"]);
    assert_eq!(tubes_of(&gateway, "J1").len(), 1);
    assert_eq!(gateway.cases(false).unwrap(), vec!["J1"]);
}

#[test]
fn test_flagged_cases_count_as_existing() {
    let dir = TempDir::new().unwrap();
    let mut gateway = setup_gateway();
    seed_case(&gateway, "K1", 1);
    gateway.set_flag(1, Flag::Error, Some("bad file")).unwrap();
    let file = write_file(&dir, "k.csv", "case,category\nK1,x\n");

    let summary = gateway.import_custom_case_data(&file).unwrap();

    assert!(summary.placeholders.is_empty());
    assert_eq!(tubes_of(&gateway, "K1").len(), 1);
}

#[test]
fn test_unreadable_file_is_io_error() {
    let mut gateway = setup_gateway();
    let err = gateway
        .import_custom_case_data(std::path::Path::new("/nonexistent/classes.csv"))
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Io);
}
