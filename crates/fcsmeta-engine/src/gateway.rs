//! MetadataGateway: the single entry point callers use
//!
//! The gateway owns the SQLite connection and a query engine; the registry and
//! reconciler borrow them per call. Opening a gateway always brings the schema
//! up to date, destructively only when `GatewayOptions::rebuild` is set.

use crate::flag_registry::FlagRegistry;
use crate::reconciler::{CaseReconciler, ImportSummary};
use chrono::{DateTime, Utc};
use fcsmeta_core::columns::normalize_header;
use fcsmeta_core::errors::{ExError, ExErrorKind, FcsMetaError};
use fcsmeta_core::model::{Flag, TableData, TableName};
use fcsmeta_core::query::{ExportType, QueryRequest};
use fcsmeta_core::{log_op_end, log_op_error, log_op_start};
use fcsmeta_store::db::{self, StoreConfig};
use fcsmeta_store::errors::{from_rusqlite, Result};
use fcsmeta_store::repo::{cases, reference, tube_cases};
use fcsmeta_store::{tabular, QueryEngine, QueryResults, SchemaStore, SqliteQueryEngine};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Options applied when a gateway opens its store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GatewayOptions {
    /// Drop and recreate every table on open. Never read from configuration
    /// files; only set by an explicit caller.
    #[serde(skip)]
    pub rebuild: bool,
    pub store: StoreConfig,
}

/// Query results, either returned or written to a CSV file.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Rows(QueryResults),
    Written { path: PathBuf, rows: usize },
}

/// Rows deleted per table by a removal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemovalSummary {
    pub cases: usize,
    pub tube_cases: usize,
    pub pmt_tube_cases: usize,
}

pub struct MetadataGateway<Q: QueryEngine = SqliteQueryEngine> {
    conn: Connection,
    engine: Q,
}

impl MetadataGateway<SqliteQueryEngine> {
    /// Open (creating if needed) the store at `path`.
    ///
    /// # Errors
    ///
    /// `Schema` if the database cannot be opened or the schema applied.
    pub fn open<P: AsRef<Path>>(path: P, options: &GatewayOptions) -> Result<Self> {
        let conn = db::open(path)?;
        Self::with_engine(conn, SqliteQueryEngine::new(), options)
    }

    /// Open a private in-memory store.
    ///
    /// # Errors
    ///
    /// `Schema` if the schema cannot be applied.
    pub fn open_in_memory(options: &GatewayOptions) -> Result<Self> {
        let conn = db::open_in_memory()?;
        Self::with_engine(conn, SqliteQueryEngine::new(), options)
    }
}

impl<Q: QueryEngine> MetadataGateway<Q> {
    /// Wrap an open connection with a custom query engine.
    ///
    /// # Errors
    ///
    /// `Schema` if configuring the connection or applying the schema fails.
    pub fn with_engine(mut conn: Connection, engine: Q, options: &GatewayOptions) -> Result<Self> {
        log_op_start!("open_gateway", rebuild = options.rebuild);
        let start = std::time::Instant::now();

        let prepared = db::configure(&conn, &options.store).and_then(|_| {
            if options.rebuild {
                SchemaStore::rebuild_schema(&mut conn).map(|_| ())
            } else {
                SchemaStore::ensure_schema(&conn)
            }
        });
        prepared.map_err(|e| {
            log_op_error!(
                "open_gateway",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            "open_gateway",
            duration_ms = start.elapsed().as_millis() as u64
        );
        Ok(Self { conn, engine })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Drop and recreate every table. Destroys all data.
    ///
    /// # Errors
    ///
    /// `Schema` if any DDL statement fails; the previous schema is kept.
    pub fn rebuild_schema(&mut self) -> Result<DateTime<Utc>> {
        log_op_start!("rebuild_schema");
        let start = std::time::Instant::now();

        let created = SchemaStore::rebuild_schema(&mut self.conn).map_err(|e| {
            log_op_error!(
                "rebuild_schema",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            "rebuild_schema",
            duration_ms = start.elapsed().as_millis() as u64,
            creation_date = %created
        );
        Ok(created)
    }

    /// Timestamp of the last rebuild; `None` if the store was never rebuilt.
    ///
    /// # Errors
    ///
    /// Propagates query engine failures.
    pub fn creation_date(&self) -> Result<Option<DateTime<Utc>>> {
        match self
            .engine
            .execute(&self.conn, &QueryRequest::CreationDate, ExportType::Table)?
        {
            QueryResults::CreationDate(date) => Ok(date),
            other => Err(unexpected_results("creation_date", &other)),
        }
    }

    /// See [`FlagRegistry::set_flag`].
    ///
    /// # Errors
    ///
    /// `InvalidInput`, `NotFound` or `Integrity`.
    pub fn set_flag(&mut self, case_tube_idx: i64, flag: Flag, error_message: Option<&str>) -> Result<()> {
        FlagRegistry::set_flag(&mut self.conn, case_tube_idx, flag, error_message)
    }

    /// See [`CaseReconciler::import_custom_case_data`].
    ///
    /// # Errors
    ///
    /// `Io`, `Serialization`, `SchemaMismatch` or store failures.
    pub fn import_custom_case_data(&mut self, path: &Path) -> Result<ImportSummary> {
        CaseReconciler::new(&self.engine).import_custom_case_data(&mut self.conn, path)
    }

    /// See [`CaseReconciler::import_table`].
    ///
    /// # Errors
    ///
    /// `SchemaMismatch` or store failures.
    pub fn import_custom_case_table(&mut self, source: &str, data: TableData) -> Result<ImportSummary> {
        CaseReconciler::new(&self.engine).import_table(&mut self.conn, source, data)
    }

    /// Entire contents of `table` in insertion order.
    ///
    /// # Errors
    ///
    /// `Persistence` if the table cannot be read.
    pub fn read_table(&self, table: TableName) -> Result<TableData> {
        tabular::read_table(&self.conn, table)
    }

    /// Write `table` to `out_file` as CSV. Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be written.
    pub fn export_table(&self, table: TableName, out_file: &Path) -> Result<usize> {
        log_op_start!("export_table", table = table.as_str(), file = %out_file.display());
        let start = std::time::Instant::now();

        let rows = tabular::read_table(&self.conn, table)
            .and_then(|data| tabular::write_csv(out_file, &data).map(|_| data.len()))
            .map_err(|e| {
                log_op_error!(
                    "export_table",
                    e.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                e
            })?;

        log_op_end!(
            "export_table",
            duration_ms = start.elapsed().as_millis() as u64,
            rows = rows
        );
        Ok(rows)
    }

    /// Replace a reference table wholesale with `data`.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for tables that are not reference tables
    /// - `SchemaMismatch` for undeclared columns
    /// - `Integrity` if rows still reference removed keys
    pub fn replace_table(&mut self, table: TableName, data: &TableData) -> Result<usize> {
        log_op_start!("replace_table", table = table.as_str(), rows = data.len());
        let start = std::time::Instant::now();

        let inserted = self.replace_table_impl(table, data).map_err(|e| {
            log_op_error!(
                "replace_table",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            "replace_table",
            duration_ms = start.elapsed().as_millis() as u64,
            rows = inserted
        );
        Ok(inserted)
    }

    fn replace_table_impl(&mut self, table: TableName, data: &TableData) -> Result<usize> {
        let tx = self.conn.transaction().map_err(from_rusqlite)?;
        let inserted = reference::replace_reference_table(&tx, table, data)?;
        tx.commit()
            .map_err(|e| from_rusqlite(e).with_op("replace_table").with_table(table.as_str()))?;
        Ok(inserted)
    }

    /// Load a raw-to-canonical tube type mapping from a delimited file.
    ///
    /// # Errors
    ///
    /// As [`MetadataGateway::replace_table`], plus file errors.
    pub fn import_tube_types(&mut self, path: &Path) -> Result<usize> {
        let mut data = tabular::read_delimited(path)?;
        data.columns = data.columns.iter().map(|c| normalize_header(c)).collect();
        self.replace_table(TableName::TubeTypesInstances, &data)
    }

    /// Write the tube type mapping to `path` as CSV.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be written.
    pub fn export_tube_types(&self, path: &Path) -> Result<usize> {
        let data = reference::tube_type_mapping(&self.conn)?;
        tabular::write_csv(path, &data)?;
        Ok(data.len())
    }

    /// Hand `request` to the query engine; with `out_file`, write the rows
    /// there as CSV instead of returning them.
    ///
    /// # Errors
    ///
    /// Query engine failures, or `Io` writing `out_file`.
    pub fn query(
        &self,
        request: &QueryRequest,
        export: ExportType,
        out_file: Option<&Path>,
    ) -> Result<QueryOutput> {
        log_op_start!("query", request = request_kind(request));
        let start = std::time::Instant::now();

        let output = self.query_impl(request, export, out_file).map_err(|e| {
            log_op_error!(
                "query",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            "query",
            duration_ms = start.elapsed().as_millis() as u64
        );
        Ok(output)
    }

    fn query_impl(
        &self,
        request: &QueryRequest,
        export: ExportType,
        out_file: Option<&Path>,
    ) -> Result<QueryOutput> {
        let results = self.engine.execute(&self.conn, request, export)?;
        match out_file {
            None => Ok(QueryOutput::Rows(results)),
            Some(path) => {
                let table = results.to_table();
                tabular::write_csv(path, &table)?;
                Ok(QueryOutput::Written {
                    path: path.to_path_buf(),
                    rows: table.len(),
                })
            }
        }
    }

    /// Case numbers; with `not_flagged`, only cases with an unflagged tube.
    ///
    /// # Errors
    ///
    /// Query engine failures.
    pub fn cases(&self, not_flagged: bool) -> Result<Vec<String>> {
        match self.engine.execute(
            &self.conn,
            &QueryRequest::Cases { not_flagged },
            ExportType::Table,
        )? {
            QueryResults::Cases(found) => Ok(found),
            other => Err(unexpected_results("cases", &other)),
        }
    }

    /// Delete cases with all their tubes and channels.
    ///
    /// # Errors
    ///
    /// `NotFound` if any case does not exist; nothing is deleted then.
    pub fn remove_cases(&mut self, case_numbers: &[String]) -> Result<RemovalSummary> {
        log_op_start!("remove_cases", cases = case_numbers.len());
        let start = std::time::Instant::now();

        let summary = self.remove_cases_impl(case_numbers).map_err(|e| {
            log_op_error!(
                "remove_cases",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            "remove_cases",
            duration_ms = start.elapsed().as_millis() as u64,
            cases = summary.cases,
            tube_cases = summary.tube_cases
        );
        Ok(summary)
    }

    fn remove_cases_impl(&mut self, case_numbers: &[String]) -> Result<RemovalSummary> {
        let mut unique: Vec<String> = Vec::new();
        for case_number in case_numbers {
            if !unique.contains(case_number) {
                unique.push(case_number.clone());
            }
        }

        let tx = self.conn.transaction().map_err(from_rusqlite)?;
        for case_number in &unique {
            if cases::get_case(&tx, case_number)?.is_none() {
                return Err(FcsMetaError::CaseNotFound {
                    case_number: case_number.clone(),
                }
                .into());
            }
        }

        let idxs = tube_cases::idxs_for_cases(&tx, &unique)?;
        let (tubes, channels) = tube_cases::delete_tube_cases(&tx, &idxs)?;
        let deleted = cases::delete_cases(&tx, &unique)?;
        tx.commit().map_err(from_rusqlite)?;

        Ok(RemovalSummary {
            cases: deleted,
            tube_cases: tubes,
            pmt_tube_cases: channels,
        })
    }

    /// Delete tubes with their channels, then any case left without tubes.
    ///
    /// # Errors
    ///
    /// `NotFound` if any tube does not exist; nothing is deleted then.
    pub fn remove_tube_cases(&mut self, case_tube_idxs: &[i64]) -> Result<RemovalSummary> {
        log_op_start!("remove_tube_cases", tubes = case_tube_idxs.len());
        let start = std::time::Instant::now();

        let summary = self.remove_tube_cases_impl(case_tube_idxs).map_err(|e| {
            log_op_error!(
                "remove_tube_cases",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            "remove_tube_cases",
            duration_ms = start.elapsed().as_millis() as u64,
            cases = summary.cases,
            tube_cases = summary.tube_cases
        );
        Ok(summary)
    }

    fn remove_tube_cases_impl(&mut self, case_tube_idxs: &[i64]) -> Result<RemovalSummary> {
        let tx = self.conn.transaction().map_err(from_rusqlite)?;
        for &case_tube_idx in case_tube_idxs {
            if tube_cases::count_by_idx(&tx, case_tube_idx)? == 0 {
                return Err(FcsMetaError::TubeCaseNotFound { case_tube_idx }.into());
            }
        }

        let parents = tube_cases::case_numbers_for_idxs(&tx, case_tube_idxs)?;
        let (tubes, channels) = tube_cases::delete_tube_cases(&tx, case_tube_idxs)?;
        let orphans = cases::orphaned_cases(&tx, &parents)?;
        let deleted = cases::delete_cases(&tx, &orphans)?;
        tx.commit().map_err(from_rusqlite)?;

        Ok(RemovalSummary {
            cases: deleted,
            tube_cases: tubes,
            pmt_tube_cases: channels,
        })
    }
}

fn request_kind(request: &QueryRequest) -> &'static str {
    match request {
        QueryRequest::Records(_) => "records",
        QueryRequest::Files(_) => "files",
        QueryRequest::Cases { .. } => "cases",
        QueryRequest::CreationDate => "creation_date",
    }
}

fn unexpected_results(op: &str, results: &QueryResults) -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_op(op)
        .with_message(format!("query engine returned {:?}", results))
}
