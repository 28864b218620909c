//! Table export and reference table import
//!
//! Usage: fcsmeta table export <TABLE> [--out FILE]
//!        fcsmeta table import-tube-types <FILE>

use crate::config::Settings;
use clap::{Args, Subcommand};
use fcsmeta_core::model::TableName;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct TableArgs {
    #[command(subcommand)]
    pub command: TableCommand,
}

#[derive(Debug, Subcommand)]
pub enum TableCommand {
    /// Write a table to CSV
    Export {
        /// Table name, e.g. Cases or TubeTypesInstances
        table: String,
        /// Output file (default: <Table>.csv)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace the tube type mapping from a delimited file
    ImportTubeTypes {
        /// File with tube_type_raw and tube_type columns
        file: PathBuf,
    },
}

pub fn execute(args: TableArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        TableCommand::Export { table, out } => {
            let table: TableName = table.parse()?;
            let out = out.unwrap_or_else(|| PathBuf::from(format!("{}.csv", table)));
            let gateway = settings.open_gateway()?;
            let rows = gateway.export_table(table, &out)?;
            println!("✓ Exported {} rows of {} to {}", rows, table, out.display());
            Ok(())
        }
        TableCommand::ImportTubeTypes { file } => {
            let mut gateway = settings.open_gateway()?;
            let rows = gateway.import_tube_types(&file)?;
            println!("✓ Imported {} tube type mappings", rows);
            Ok(())
        }
    }
}
