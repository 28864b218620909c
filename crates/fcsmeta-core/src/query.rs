//! Typed query criteria for the query delegate
//!
//! Criteria are assembled with [`QueryCriteriaBuilder`] and validated in
//! [`QueryCriteriaBuilder::build`]. Values built by hand or deserialized skip
//! the builder, so query engines call [`QueryCriteria::validate`] again before
//! running them.

use crate::errors::{FcsMetaError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Shape of query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportType {
    /// Nested map: case_number -> case_tube_idx -> rows
    #[default]
    DictDict,
    /// Column-ordered table
    Table,
}

/// Inclusive date bounds on the tube acquisition date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Validated selection criteria.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryCriteria {
    pub tubes: Vec<String>,
    pub antigens: Vec<String>,
    pub channel_names: Vec<String>,
    pub channel_numbers: Vec<i64>,
    pub daterange: Option<DateRange>,
    pub cases: Vec<String>,
    pub specimens: Vec<String>,
    pub cytnums: Vec<String>,
    pub case_tube_idxs: Vec<i64>,
    pub random_order: bool,
    pub date_order: bool,
    pub record_n: Option<u64>,
    pub total_events: Option<i64>,
    /// Include tubes flagged `Error`/`CustomData_ONLY`
    pub include_flagged: bool,
}

impl QueryCriteria {
    pub fn builder() -> QueryCriteriaBuilder {
        QueryCriteriaBuilder::default()
    }

    /// True when any channel-level filter is set.
    pub fn filters_channels(&self) -> bool {
        !self.antigens.is_empty()
            || !self.channel_names.is_empty()
            || !self.channel_numbers.is_empty()
    }

    /// Check the invariants `build()` enforces.
    ///
    /// # Errors
    ///
    /// `InvalidDateRange`, `InvalidRecordLimit`, `ConflictingOrder`.
    pub fn validate(&self) -> Result<()> {
        if let Some(range) = self.daterange {
            if range.start > range.end {
                return Err(FcsMetaError::InvalidDateRange {
                    start: range.start.to_string(),
                    end: range.end.to_string(),
                });
            }
        }
        if self.record_n == Some(0) {
            return Err(FcsMetaError::InvalidRecordLimit);
        }
        if self.random_order && self.date_order {
            return Err(FcsMetaError::ConflictingOrder);
        }
        Ok(())
    }
}

/// Builder for [`QueryCriteria`].
#[derive(Debug, Clone, Default)]
pub struct QueryCriteriaBuilder {
    criteria: QueryCriteria,
    daterange: Option<(String, String)>,
    record_n: Option<i64>,
}

impl QueryCriteriaBuilder {
    pub fn tubes<I, S>(mut self, tubes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.criteria.tubes = tubes.into_iter().map(Into::into).collect();
        self
    }

    pub fn antigens<I, S>(mut self, antigens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.criteria.antigens = antigens.into_iter().map(Into::into).collect();
        self
    }

    pub fn channel_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.criteria.channel_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn channel_numbers(mut self, numbers: impl IntoIterator<Item = i64>) -> Self {
        self.criteria.channel_numbers = numbers.into_iter().collect();
        self
    }

    /// Dates as `YYYY-MM-DD`; parsed and checked in `build()`.
    pub fn daterange(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.daterange = Some((start.into(), end.into()));
        self
    }

    pub fn cases<I, S>(mut self, cases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.criteria.cases = cases.into_iter().map(Into::into).collect();
        self
    }

    pub fn specimens<I, S>(mut self, specimens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.criteria.specimens = specimens.into_iter().map(Into::into).collect();
        self
    }

    pub fn cytnums<I, S>(mut self, cytnums: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.criteria.cytnums = cytnums.into_iter().map(Into::into).collect();
        self
    }

    pub fn case_tube_idxs(mut self, idxs: impl IntoIterator<Item = i64>) -> Self {
        self.criteria.case_tube_idxs = idxs.into_iter().collect();
        self
    }

    pub fn random_order(mut self, on: bool) -> Self {
        self.criteria.random_order = on;
        self
    }

    pub fn date_order(mut self, on: bool) -> Self {
        self.criteria.date_order = on;
        self
    }

    pub fn record_n(mut self, n: i64) -> Self {
        self.record_n = Some(n);
        self
    }

    pub fn total_events(mut self, min_events: i64) -> Self {
        self.criteria.total_events = Some(min_events);
        self
    }

    pub fn include_flagged(mut self, on: bool) -> Self {
        self.criteria.include_flagged = on;
        self
    }

    /// Validate and produce the criteria.
    ///
    /// # Errors
    ///
    /// `InvalidDate`, `InvalidDateRange`, `InvalidRecordLimit`, `ConflictingOrder`.
    pub fn build(self) -> Result<QueryCriteria> {
        let mut criteria = self.criteria;

        if let Some((start, end)) = self.daterange {
            let start_date = parse_date(&start)?;
            let end_date = parse_date(&end)?;
            if start_date > end_date {
                return Err(FcsMetaError::InvalidDateRange { start, end });
            }
            criteria.daterange = Some(DateRange {
                start: start_date,
                end: end_date,
            });
        }

        if let Some(n) = self.record_n {
            if n <= 0 {
                return Err(FcsMetaError::InvalidRecordLimit);
            }
            criteria.record_n = Some(n as u64);
        }

        criteria.validate()?;
        Ok(criteria)
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| FcsMetaError::InvalidDate {
        value: value.to_string(),
    })
}

/// A request handed to the query delegate.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryRequest {
    /// Channel-level rows (tube joined with its detector channels)
    Records(QueryCriteria),
    /// Tube-level rows, one per matching file
    Files(QueryCriteria),
    /// Case identifiers; `not_flagged` restricts to cases with an unflagged tube
    Cases { not_flagged: bool },
    /// The MetaTable creation timestamp
    CreationDate,
}
