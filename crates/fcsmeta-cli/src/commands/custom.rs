//! Custom case data import
//!
//! Usage: fcsmeta custom import <FILE>

use crate::config::Settings;
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct CustomArgs {
    #[command(subcommand)]
    pub command: CustomCommand,
}

#[derive(Debug, Subcommand)]
pub enum CustomCommand {
    /// Replace CustomCaseData with a classification file
    Import {
        /// Tab- or comma-delimited file with a header row
        file: PathBuf,
    },
}

pub fn execute(args: CustomArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        CustomCommand::Import { file } => {
            let mut gateway = settings.open_gateway()?;
            let summary = gateway.import_custom_case_data(&file)?;
            println!(
                "✓ Imported {} rows ({})",
                summary.rows,
                summary.columns.join(", ")
            );
            if summary.second_column_assumed {
                println!("  second column taken as category");
            }
            for case_number in &summary.placeholders {
                println!("  placeholder added for {}", case_number);
            }
            Ok(())
        }
    }
}
