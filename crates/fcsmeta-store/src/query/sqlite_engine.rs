//! `QueryEngine` backed by the store's own SQLite database

use super::{NestedRows, QueryEngine, QueryResults, Row};
use crate::errors::{from_rusqlite, Result};
use crate::schema::SchemaStore;
use crate::tabular::query_table;
use fcsmeta_core::errors::{ExError, ExErrorKind};
use fcsmeta_core::model::{Flag, TableData};
use fcsmeta_core::query::{ExportType, QueryCriteria, QueryRequest};
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use serde_json::Value;

const TUBE_SELECT: &str = "t.case_number, t.case_tube_idx, t.filename, t.tube_type_raw, \
     tti.tube_type, t.date, t.cytometer, t.cytnum, t.specimen, t.total_events, t.flag, \
     t.error_message";

const CHANNEL_SELECT: &str =
    "p.channel_number, p.channel_name, p.antigen, p.fluorophore, p.voltage";

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteQueryEngine;

impl SqliteQueryEngine {
    pub fn new() -> Self {
        Self
    }
}

impl QueryEngine for SqliteQueryEngine {
    fn execute(
        &self,
        conn: &Connection,
        request: &QueryRequest,
        export: ExportType,
    ) -> Result<QueryResults> {
        match request {
            QueryRequest::Records(criteria) => {
                criteria.validate()?;
                let table = select_tubes(conn, criteria, true)?;
                shape(table, export)
            }
            QueryRequest::Files(criteria) => {
                criteria.validate()?;
                let table = select_tubes(conn, criteria, false)?;
                shape(table, export)
            }
            QueryRequest::Cases { not_flagged } => {
                select_cases(conn, *not_flagged).map(QueryResults::Cases)
            }
            QueryRequest::CreationDate => {
                SchemaStore::creation_date(conn).map(QueryResults::CreationDate)
            }
        }
    }
}

/// Accumulates WHERE clauses and their positional parameters.
#[derive(Default)]
struct Filter {
    clauses: Vec<String>,
    params: Vec<SqlValue>,
}

impl Filter {
    fn push_in<T, F>(&mut self, column: &str, values: &[T], to_sql: F)
    where
        F: Fn(&T) -> SqlValue,
    {
        if values.is_empty() {
            return;
        }
        let marks = vec!["?"; values.len()].join(", ");
        self.clauses.push(format!("{} IN ({})", column, marks));
        self.params.extend(values.iter().map(to_sql));
    }

    fn push(&mut self, clause: &str, params: impl IntoIterator<Item = SqlValue>) {
        self.clauses.push(clause.to_string());
        self.params.extend(params);
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

fn text(s: &String) -> SqlValue {
    SqlValue::Text(s.clone())
}

fn int(i: &i64) -> SqlValue {
    SqlValue::Integer(*i)
}

fn flagged_list() -> String {
    Flag::ALL
        .iter()
        .filter(|f| f.is_flagged())
        .map(|f| format!("'{}'", f.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn channel_filter(criteria: &QueryCriteria) -> Filter {
    let mut filter = Filter::default();
    filter.push_in("p.antigen", &criteria.antigens, text);
    filter.push_in("p.channel_name", &criteria.channel_names, text);
    filter.push_in("p.channel_number", &criteria.channel_numbers, int);
    filter
}

fn select_tubes(conn: &Connection, criteria: &QueryCriteria, channels: bool) -> Result<TableData> {
    let mut filter = Filter::default();

    filter.push_in("tti.tube_type", &criteria.tubes, text);
    filter.push_in("t.case_number", &criteria.cases, text);
    filter.push_in("t.specimen", &criteria.specimens, text);
    filter.push_in("t.cytnum", &criteria.cytnums, text);
    filter.push_in("t.case_tube_idx", &criteria.case_tube_idxs, int);
    if let Some(range) = criteria.daterange {
        filter.push(
            "date(t.date) BETWEEN ? AND ?",
            [
                SqlValue::Text(range.start.format("%Y-%m-%d").to_string()),
                SqlValue::Text(range.end.format("%Y-%m-%d").to_string()),
            ],
        );
    }
    if let Some(min_events) = criteria.total_events {
        filter.push("t.total_events >= ?", [SqlValue::Integer(min_events)]);
    }
    if !criteria.include_flagged {
        filter.push(&format!("t.flag NOT IN ({})", flagged_list()), []);
    }

    let channel = channel_filter(criteria);
    let (select, from) = if channels {
        let mut clauses = channel.clauses;
        clauses.append(&mut filter.clauses);
        let mut params = channel.params;
        params.append(&mut filter.params);
        filter = Filter { clauses, params };
        (
            format!("{}, {}", TUBE_SELECT, CHANNEL_SELECT),
            "TubeCases t JOIN PmtTubeCases p ON p.case_tube_idx = t.case_tube_idx",
        )
    } else {
        if criteria.filters_channels() {
            filter.push(
                &format!(
                    "EXISTS (SELECT 1 FROM PmtTubeCases p WHERE p.case_tube_idx = t.case_tube_idx AND {})",
                    channel.clauses.join(" AND ")
                ),
                channel.params,
            );
        }
        (TUBE_SELECT.to_string(), "TubeCases t")
    };

    let order = if criteria.random_order {
        " ORDER BY RANDOM()"
    } else if criteria.date_order {
        if channels {
            " ORDER BY t.date, t.case_tube_idx, p.channel_number"
        } else {
            " ORDER BY t.date, t.case_tube_idx"
        }
    } else if channels {
        " ORDER BY t.case_number, t.case_tube_idx, p.channel_number"
    } else {
        " ORDER BY t.case_number, t.case_tube_idx"
    };

    let limit = criteria
        .record_n
        .map(|n| format!(" LIMIT {}", n))
        .unwrap_or_default();

    let sql = format!(
        "SELECT {} FROM {} LEFT JOIN TubeTypesInstances tti ON tti.tube_type_raw = t.tube_type_raw{}{}{}",
        select,
        from,
        filter.where_sql(),
        order,
        limit
    );
    tracing::debug!(sql = %sql, params = filter.params.len(), "query");
    query_table(conn, &sql, &filter.params)
}

fn select_cases(conn: &Connection, not_flagged: bool) -> Result<Vec<String>> {
    let sql = if not_flagged {
        format!(
            "SELECT c.case_number FROM Cases c
             WHERE EXISTS (
                 SELECT 1 FROM TubeCases t
                 WHERE t.case_number = c.case_number AND t.flag NOT IN ({})
             )
             ORDER BY c.case_number",
            flagged_list()
        )
    } else {
        "SELECT case_number FROM Cases ORDER BY case_number".to_string()
    };
    let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
    let cases = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(cases)
}

fn shape(table: TableData, export: ExportType) -> Result<QueryResults> {
    match export {
        ExportType::Table => Ok(QueryResults::Table(table)),
        ExportType::DictDict => nest(&table).map(QueryResults::Nested),
    }
}

fn nest(table: &TableData) -> Result<NestedRows> {
    let (case_col, idx_col) = match (
        table.column_index("case_number"),
        table.column_index("case_tube_idx"),
    ) {
        (Some(c), Some(i)) => (c, i),
        _ => {
            return Err(ExError::new(ExErrorKind::Internal)
                .with_op("query")
                .with_message("result lacks case_number/case_tube_idx columns"))
        }
    };

    let mut nested = NestedRows::new();
    for row in &table.rows {
        let case_number = match &row[case_col] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let idx = row[idx_col].as_i64().ok_or_else(|| {
            ExError::new(ExErrorKind::Serialization)
                .with_op("query")
                .with_table("TubeCases")
                .with_column("case_tube_idx")
                .with_message(format!("non-integer case_tube_idx {}", row[idx_col]))
        })?;
        let record: Row = table
            .columns
            .iter()
            .cloned()
            .zip(row.iter().cloned())
            .collect();
        nested
            .entry(case_number)
            .or_default()
            .entry(idx)
            .or_default()
            .push(record);
    }
    Ok(nested)
}
