//! Column inference for externally curated classification files
//!
//! Classification files come from a loosely controlled workflow, so their
//! headers vary (`CaseNum`, `CASE_ID`, `case number`, ...). The rules here map
//! such headers onto the declared columns of the destination table:
//!
//! 1. headers are trimmed and lower-cased
//! 2. the first header whose first four characters are `case` is the case
//!    identifier and is renamed to [`CASE_NUMBER`]
//! 3. only headers the destination declares are kept
//! 4. when just one header survives and the destination declares more than
//!    one column, the input's second column is taken to be the destination's
//!    second declared column

use crate::errors::{FcsMetaError, Result};

/// Canonical case identifier column name.
pub const CASE_NUMBER: &str = "case_number";

/// Classification column of CustomCaseData and Cases.
pub const CATEGORY: &str = "category";

/// Outcome of matching an input header row against a destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    /// The full input header row after normalisation and renames
    pub headers: Vec<String>,
    /// Columns to load, in input order, each a declared destination column
    pub keep: Vec<String>,
    /// Original header that was recognised as the case identifier
    pub case_source: String,
    /// Whether the second-column heuristic renamed an input column
    pub second_column_assumed: bool,
}

pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

fn is_case_header(normalized: &str) -> bool {
    normalized.get(..4) == Some("case")
}

/// Match `headers` from `file` against the `declared` destination columns.
///
/// # Errors
///
/// `MissingCaseColumn` when no header looks like a case identifier,
/// `NoRecognizedColumns` when nothing survives the intersection.
pub fn plan_columns(file: &str, headers: &[String], declared: &[String]) -> Result<ColumnPlan> {
    let mut normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

    let case_index = normalized
        .iter()
        .position(|h| is_case_header(h))
        .ok_or_else(|| FcsMetaError::MissingCaseColumn {
            file: file.to_string(),
            required: declared.to_vec(),
        })?;
    let case_source = headers[case_index].clone();
    normalized[case_index] = CASE_NUMBER.to_string();

    let mut keep: Vec<String> = Vec::new();
    for header in &normalized {
        if declared.contains(header) && !keep.contains(header) {
            keep.push(header.clone());
        }
    }

    let mut second_column_assumed = false;
    if declared.len() > 1 && keep.len() == 1 && normalized.len() > 1 {
        // "second column" means the first column after the case identifier's
        // slot; when the identifier itself is second, fall back to the first.
        let target = if case_index == 1 { 0 } else { 1 };
        let second = declared[1].clone();
        if !keep.contains(&second) {
            normalized[target] = second.clone();
            keep.push(second);
            keep.sort_by_key(|c| normalized.iter().position(|h| h == c));
            second_column_assumed = true;
        }
    }

    if keep.is_empty() {
        return Err(FcsMetaError::NoRecognizedColumns {
            file: file.to_string(),
            required: declared.to_vec(),
        });
    }

    Ok(ColumnPlan {
        headers: normalized,
        keep,
        case_source,
        second_column_assumed,
    })
}
