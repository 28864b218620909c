//! Custom case data import and reconciliation
//!
//! A classification file lists case numbers with a category. Importing it:
//! 1. infers which column holds the case number (see `fcsmeta_core::columns`)
//! 2. replaces CustomCaseData with the recognised columns
//! 3. gives every listed case missing from the store a Case and a placeholder
//!    tube flagged `CustomData_ONLY`, so each classification has a record
//! 4. copies categories onto the matching Cases
//!
//! Steps 2-4 share one transaction.

use crate::flag_registry::FlagRegistry;
use fcsmeta_core::columns::{plan_columns, ColumnPlan, CATEGORY};
use fcsmeta_core::errors::{ExError, ExErrorKind};
use fcsmeta_core::model::{Case, Flag, TableData, TableName, TubeCase, PLACEHOLDER_ERROR_MESSAGE};
use fcsmeta_core::query::{ExportType, QueryRequest};
use fcsmeta_core::{log_op_end, log_op_error, log_op_start};
use fcsmeta_store::errors::{from_rusqlite, Result};
use fcsmeta_store::repo::{cases, custom_data, tube_cases};
use fcsmeta_store::{tabular, QueryEngine, QueryResults, SchemaStore};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

/// What an import changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Rows now held by CustomCaseData
    pub rows: usize,
    /// Columns loaded, in input order
    pub columns: Vec<String>,
    /// Input header recognised as the case identifier
    pub case_source: Option<String>,
    pub second_column_assumed: bool,
    /// Case numbers that received a placeholder tube
    pub placeholders: Vec<String>,
    /// Cases whose category was updated
    pub categories_updated: usize,
}

/// Imports classification tables, consulting `engine` for the case universe.
pub struct CaseReconciler<'a> {
    engine: &'a dyn QueryEngine,
}

impl<'a> CaseReconciler<'a> {
    pub fn new(engine: &'a dyn QueryEngine) -> Self {
        Self { engine }
    }

    /// Import a delimited classification file.
    ///
    /// # Errors
    ///
    /// - `Io`/`Serialization` if the file cannot be read or parsed
    /// - `SchemaMismatch` if no case identifier column is found
    /// - `Persistence`/`Integrity` if the store rejects the writes
    pub fn import_custom_case_data(&self, conn: &mut Connection, path: &Path) -> Result<ImportSummary> {
        let file = path.display().to_string();
        log_op_start!("import_custom_case_data", file = %file);
        let start = std::time::Instant::now();

        let summary = tabular::read_delimited(path)
            .and_then(|data| self.import_table_impl(conn, &file, data))
            .map_err(|e| {
                log_op_error!(
                    "import_custom_case_data",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                e
            })?;

        log_op_end!(
            "import_custom_case_data",
            duration_ms = start.elapsed().as_millis() as u64,
            rows = summary.rows,
            placeholders = summary.placeholders.len()
        );
        Ok(summary)
    }

    /// Import an already-parsed table; `source` names it in errors.
    ///
    /// # Errors
    ///
    /// As [`CaseReconciler::import_custom_case_data`], minus file errors.
    pub fn import_table(&self, conn: &mut Connection, source: &str, data: TableData) -> Result<ImportSummary> {
        log_op_start!("import_custom_case_data", file = source);
        let start = std::time::Instant::now();

        let summary = self.import_table_impl(conn, source, data).map_err(|e| {
            log_op_error!(
                "import_custom_case_data",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            "import_custom_case_data",
            duration_ms = start.elapsed().as_millis() as u64,
            rows = summary.rows,
            placeholders = summary.placeholders.len()
        );
        Ok(summary)
    }

    fn import_table_impl(&self, conn: &mut Connection, source: &str, data: TableData) -> Result<ImportSummary> {
        // A blank file still replaces the stored classification.
        if data.columns.is_empty() {
            let tx = conn.transaction().map_err(from_rusqlite)?;
            custom_data::replace_custom_case_data(&tx, &TableData::default())?;
            tx.commit().map_err(from_rusqlite)?;
            return Ok(ImportSummary::default());
        }

        let declared = SchemaStore::declared_columns(conn, TableName::CustomCaseData)?;
        let plan = plan_columns(source, &data.columns, &declared)
            .map_err(|e| ExError::from(e).with_op("import_custom_case_data"))?;
        let filtered = apply_plan(data, &plan)?;

        let tx = conn.transaction().map_err(from_rusqlite)?;

        let rows = custom_data::replace_custom_case_data(&tx, &filtered)?;

        let universe = self.case_universe(&tx)?;
        let listed = custom_data::distinct_case_numbers(&filtered);
        let missing: Vec<String> = listed.difference(&universe).cloned().collect();

        for case_number in &missing {
            cases::insert_case_if_absent(&tx, &Case::new(case_number.as_str()))?;
            let idx = tube_cases::next_case_tube_idx(&tx)?;
            tube_cases::insert_tube_case(&tx, &TubeCase::new(idx, case_number.as_str()))?;
            FlagRegistry::apply(&tx, idx, Flag::CustomDataOnly, Some(PLACEHOLDER_ERROR_MESSAGE))?;
            tracing::debug!(case_number = %case_number, case_tube_idx = idx, "placeholder tube added");
        }

        let categories_updated = if plan.keep.iter().any(|c| c == CATEGORY) {
            cases::backfill_categories(&tx)?
        } else {
            0
        };

        tx.commit().map_err(from_rusqlite)?;

        Ok(ImportSummary {
            rows,
            columns: plan.keep,
            case_source: Some(plan.case_source),
            second_column_assumed: plan.second_column_assumed,
            placeholders: missing,
            categories_updated,
        })
    }

    fn case_universe(&self, conn: &Connection) -> Result<BTreeSet<String>> {
        match self
            .engine
            .execute(conn, &QueryRequest::Cases { not_flagged: false }, ExportType::Table)?
        {
            QueryResults::Cases(found) => Ok(found.into_iter().collect()),
            other => Err(ExError::new(ExErrorKind::Internal)
                .with_op("import_custom_case_data")
                .with_message(format!("case query returned {:?}", other))),
        }
    }
}

/// Rename headers per `plan` and project onto its kept columns.
fn apply_plan(mut data: TableData, plan: &ColumnPlan) -> Result<TableData> {
    data.columns = plan.headers.clone();
    data.select(&plan.keep).ok_or_else(|| {
        ExError::new(ExErrorKind::Internal)
            .with_op("import_custom_case_data")
            .with_message("planned column missing from input")
    })
}
