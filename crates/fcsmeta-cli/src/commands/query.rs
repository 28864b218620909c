//! Query command
//!
//! Usage: fcsmeta query [filters] [--files] [--table] [--out FILE]
//!
//! Without `--out` the results are printed as JSON.

use crate::config::Settings;
use clap::Args;
use fcsmeta_core::query::{ExportType, QueryCriteria, QueryRequest};
use fcsmeta_engine::QueryOutput;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Canonical tube types
    #[arg(long, value_delimiter = ',')]
    pub tubes: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub antigens: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub channel_names: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub channel_numbers: Vec<i64>,
    /// Acquisition date bounds, YYYY-MM-DD
    #[arg(long, num_args = 2, value_names = ["START", "END"])]
    pub daterange: Option<Vec<String>>,
    #[arg(long, value_delimiter = ',')]
    pub cases: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub specimens: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub cytnums: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub case_tube_idxs: Vec<i64>,
    #[arg(long)]
    pub random_order: bool,
    #[arg(long)]
    pub date_order: bool,
    /// Maximum number of rows
    #[arg(long)]
    pub record_n: Option<i64>,
    /// Minimum total events per tube
    #[arg(long)]
    pub total_events: Option<i64>,
    /// Include tubes flagged Error or CustomData_ONLY
    #[arg(long)]
    pub include_flagged: bool,
    /// One row per tube instead of per channel
    #[arg(long)]
    pub files: bool,
    /// Flat table shape instead of case -> tube nesting
    #[arg(long)]
    pub table: bool,
    /// Write CSV here instead of printing
    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl QueryArgs {
    fn criteria(&self) -> Result<QueryCriteria, Box<dyn std::error::Error>> {
        let mut builder = QueryCriteria::builder()
            .tubes(self.tubes.clone())
            .antigens(self.antigens.clone())
            .channel_names(self.channel_names.clone())
            .channel_numbers(self.channel_numbers.clone())
            .cases(self.cases.clone())
            .specimens(self.specimens.clone())
            .cytnums(self.cytnums.clone())
            .case_tube_idxs(self.case_tube_idxs.clone())
            .random_order(self.random_order)
            .date_order(self.date_order)
            .include_flagged(self.include_flagged);
        if let Some([start, end]) = self.daterange.as_deref() {
            builder = builder.daterange(start.as_str(), end.as_str());
        }
        if let Some(n) = self.record_n {
            builder = builder.record_n(n);
        }
        if let Some(min_events) = self.total_events {
            builder = builder.total_events(min_events);
        }
        Ok(builder.build()?)
    }
}

pub fn execute(args: QueryArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let criteria = args.criteria()?;
    let request = if args.files {
        QueryRequest::Files(criteria)
    } else {
        QueryRequest::Records(criteria)
    };
    let export = if args.table {
        ExportType::Table
    } else {
        ExportType::DictDict
    };

    let gateway = settings.open_gateway()?;
    match gateway.query(&request, export, args.out.as_deref())? {
        QueryOutput::Rows(results) => {
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        QueryOutput::Written { path, rows } => {
            println!("✓ Wrote {} rows to {}", rows, path.display());
        }
    }
    Ok(())
}
