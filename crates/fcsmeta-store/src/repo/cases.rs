//! Cases table

use crate::errors::{from_rusqlite, Result};
use fcsmeta_core::model::Case;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;

/// Insert a case; fails with `Integrity` if it already exists.
pub fn insert_case(conn: &Connection, case: &Case) -> Result<()> {
    conn.execute(
        "INSERT INTO Cases (case_number, date, category) VALUES (?1, ?2, ?3)",
        params![case.case_number, case.date, case.category],
    )
    .map_err(|e| from_rusqlite(e).with_entity_id(case.case_number.as_str()))?;
    Ok(())
}

/// Insert a case unless one with the same number exists. Returns whether a
/// row was written.
pub fn insert_case_if_absent(conn: &Connection, case: &Case) -> Result<bool> {
    let written = conn
        .execute(
            "INSERT OR IGNORE INTO Cases (case_number, date, category) VALUES (?1, ?2, ?3)",
            params![case.case_number, case.date, case.category],
        )
        .map_err(from_rusqlite)?;
    Ok(written == 1)
}

pub fn get_case(conn: &Connection, case_number: &str) -> Result<Option<Case>> {
    conn.query_row(
        "SELECT case_number, date, category FROM Cases WHERE case_number = ?1",
        [case_number],
        |row| {
            Ok(Case {
                case_number: row.get(0)?,
                date: row.get(1)?,
                category: row.get(2)?,
            })
        },
    )
    .optional()
    .map_err(from_rusqlite)
}

/// Every case number in the store.
pub fn all_case_numbers(conn: &Connection) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare("SELECT case_number FROM Cases")
        .map_err(from_rusqlite)?;
    let cases = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<BTreeSet<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(cases)
}

/// Copy each case's category from its first CustomCaseData row.
///
/// Cases without classification keep their current category.
pub fn backfill_categories(conn: &Connection) -> Result<usize> {
    conn.execute(
        "UPDATE Cases
         SET category = (
             SELECT d.category FROM CustomCaseData d
             WHERE d.case_number = Cases.case_number
             ORDER BY d.rowid LIMIT 1
         )
         WHERE case_number IN (SELECT case_number FROM CustomCaseData)",
        [],
    )
    .map_err(from_rusqlite)
}

/// Delete cases by number. Callers remove dependent tubes first.
pub fn delete_cases(conn: &Connection, case_numbers: &[String]) -> Result<usize> {
    let mut stmt = conn
        .prepare("DELETE FROM Cases WHERE case_number = ?1")
        .map_err(from_rusqlite)?;
    let mut deleted = 0;
    for case_number in case_numbers {
        deleted += stmt
            .execute([case_number])
            .map_err(|e| from_rusqlite(e).with_entity_id(case_number.as_str()))?;
    }
    Ok(deleted)
}

/// Cases among `case_numbers` that no longer have any tube.
pub fn orphaned_cases(conn: &Connection, case_numbers: &[String]) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT COUNT(*) FROM TubeCases WHERE case_number = ?1",
        )
        .map_err(from_rusqlite)?;
    let mut orphans = Vec::new();
    for case_number in case_numbers {
        let tubes: i64 = stmt
            .query_row([case_number], |row| row.get(0))
            .map_err(from_rusqlite)?;
        if tubes == 0 && !orphans.contains(case_number) {
            orphans.push(case_number.clone());
        }
    }
    Ok(orphans)
}
