//! TubeCases and PmtTubeCases tables

use crate::errors::{from_rusqlite, Result};
use fcsmeta_core::errors::{ExError, ExErrorKind};
use fcsmeta_core::model::{Flag, PmtTubeCase, TubeCase};
use rusqlite::{params, Connection, OptionalExtension, Row};

const TUBE_COLUMNS: &str = "case_tube_idx, case_number, flag, error_message, filename, \
     tube_type_raw, date, cytometer, cytnum, specimen, total_events";

fn tube_from_row(row: &Row<'_>) -> rusqlite::Result<(TubeCase, String)> {
    let flag_raw: String = row.get(2)?;
    Ok((
        TubeCase {
            case_tube_idx: row.get(0)?,
            case_number: row.get(1)?,
            // Placeholder; replaced after the flag string is validated.
            flag: Flag::Pending,
            error_message: row.get(3)?,
            filename: row.get(4)?,
            tube_type_raw: row.get(5)?,
            date: row.get(6)?,
            cytometer: row.get(7)?,
            cytnum: row.get(8)?,
            specimen: row.get(9)?,
            total_events: row.get(10)?,
        },
        flag_raw,
    ))
}

fn with_parsed_flag((mut tube, flag_raw): (TubeCase, String)) -> Result<TubeCase> {
    tube.flag = flag_raw.parse::<Flag>().map_err(|e| {
        ExError::from(e)
            .with_table("TubeCases")
            .with_entity_id(tube.case_tube_idx.to_string())
    })?;
    Ok(tube)
}

pub fn insert_tube_case(conn: &Connection, tube: &TubeCase) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO TubeCases ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            TUBE_COLUMNS
        ),
        params![
            tube.case_tube_idx,
            tube.case_number,
            tube.flag.as_str(),
            tube.error_message,
            tube.filename,
            tube.tube_type_raw,
            tube.date,
            tube.cytometer,
            tube.cytnum,
            tube.specimen,
            tube.total_events,
        ],
    )
    .map_err(|e| from_rusqlite(e).with_entity_id(tube.case_tube_idx.to_string()))?;
    Ok(())
}

pub fn get_tube_case(conn: &Connection, case_tube_idx: i64) -> Result<Option<TubeCase>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM TubeCases WHERE case_tube_idx = ?1",
            TUBE_COLUMNS
        ),
        [case_tube_idx],
        tube_from_row,
    )
    .optional()
    .map_err(from_rusqlite)?
    .map(with_parsed_flag)
    .transpose()
}

/// Tubes of one case, ordered by index.
pub fn list_for_case(conn: &Connection, case_number: &str) -> Result<Vec<TubeCase>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM TubeCases WHERE case_number = ?1 ORDER BY case_tube_idx",
            TUBE_COLUMNS
        ))
        .map_err(from_rusqlite)?;
    let raw = stmt
        .query_map([case_number], tube_from_row)
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    raw.into_iter().map(with_parsed_flag).collect()
}

/// Number of TubeCases carrying `case_tube_idx`.
pub fn count_by_idx(conn: &Connection, case_tube_idx: i64) -> Result<usize> {
    let n: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM TubeCases WHERE case_tube_idx = ?1",
            [case_tube_idx],
            |row| row.get(0),
        )
        .map_err(from_rusqlite)?;
    Ok(n as usize)
}

/// Write flag and error message together on every row with `case_tube_idx`.
/// Returns the number of rows updated.
pub fn update_flag(
    conn: &Connection,
    case_tube_idx: i64,
    flag: Flag,
    error_message: Option<&str>,
) -> Result<usize> {
    conn.execute(
        "UPDATE TubeCases SET flag = ?1, error_message = ?2 WHERE case_tube_idx = ?3",
        params![flag.as_str(), error_message, case_tube_idx],
    )
    .map_err(|e| from_rusqlite(e).with_entity_id(case_tube_idx.to_string()))
}

/// Next unused tube index (one past the current maximum).
pub fn next_case_tube_idx(conn: &Connection) -> Result<i64> {
    let max: Option<i64> = conn
        .query_row("SELECT MAX(case_tube_idx) FROM TubeCases", [], |row| {
            row.get(0)
        })
        .map_err(from_rusqlite)?;
    let next = max.unwrap_or(0).checked_add(1).ok_or_else(|| {
        ExError::new(ExErrorKind::Integrity)
            .with_table("TubeCases")
            .with_message("case_tube_idx space exhausted")
    })?;
    Ok(next)
}

/// Tube indexes belonging to the given cases.
pub fn idxs_for_cases(conn: &Connection, case_numbers: &[String]) -> Result<Vec<i64>> {
    let mut stmt = conn
        .prepare("SELECT case_tube_idx FROM TubeCases WHERE case_number = ?1 ORDER BY case_tube_idx")
        .map_err(from_rusqlite)?;
    let mut idxs = Vec::new();
    for case_number in case_numbers {
        let found = stmt
            .query_map([case_number], |row| row.get::<_, i64>(0))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        idxs.extend(found);
    }
    Ok(idxs)
}

/// Parent case numbers of the given tubes (missing tubes are skipped).
pub fn case_numbers_for_idxs(conn: &Connection, idxs: &[i64]) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT case_number FROM TubeCases WHERE case_tube_idx = ?1")
        .map_err(from_rusqlite)?;
    let mut cases = Vec::new();
    for idx in idxs {
        let case: Option<String> = stmt
            .query_row([idx], |row| row.get(0))
            .optional()
            .map_err(from_rusqlite)?;
        if let Some(case) = case {
            if !cases.contains(&case) {
                cases.push(case);
            }
        }
    }
    Ok(cases)
}

/// Delete tubes and their channels. Returns (tubes, channels) deleted.
pub fn delete_tube_cases(conn: &Connection, idxs: &[i64]) -> Result<(usize, usize)> {
    let mut channels = 0;
    let mut tubes = 0;
    for idx in idxs {
        channels += conn
            .execute("DELETE FROM PmtTubeCases WHERE case_tube_idx = ?1", [idx])
            .map_err(from_rusqlite)?;
        tubes += conn
            .execute("DELETE FROM TubeCases WHERE case_tube_idx = ?1", [idx])
            .map_err(|e| from_rusqlite(e).with_entity_id(idx.to_string()))?;
    }
    Ok((tubes, channels))
}

pub fn insert_pmt_tube_case(conn: &Connection, channel: &PmtTubeCase) -> Result<()> {
    conn.execute(
        "INSERT INTO PmtTubeCases
             (case_tube_idx, channel_number, channel_name, antigen, fluorophore, voltage)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            channel.case_tube_idx,
            channel.channel_number,
            channel.channel_name,
            channel.antigen,
            channel.fluorophore,
            channel.voltage,
        ],
    )
    .map_err(|e| from_rusqlite(e).with_entity_id(channel.case_tube_idx.to_string()))?;
    Ok(())
}

pub fn list_channels(conn: &Connection, case_tube_idx: i64) -> Result<Vec<PmtTubeCase>> {
    let mut stmt = conn
        .prepare(
            "SELECT case_tube_idx, channel_number, channel_name, antigen, fluorophore, voltage
             FROM PmtTubeCases WHERE case_tube_idx = ?1 ORDER BY channel_number",
        )
        .map_err(from_rusqlite)?;
    let channels = stmt
        .query_map([case_tube_idx], |row| {
            Ok(PmtTubeCase {
                case_tube_idx: row.get(0)?,
                channel_number: row.get(1)?,
                channel_name: row.get(2)?,
                antigen: row.get(3)?,
                fluorophore: row.get(4)?,
                voltage: row.get(5)?,
            })
        })
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(channels)
}
