//! Case listing and removal
//!
//! Usage: fcsmeta cases list [--not-flagged]
//!        fcsmeta cases remove <CASE>...

use crate::config::Settings;
use clap::{Args, Subcommand};

#[derive(Debug, Args)]
pub struct CasesArgs {
    #[command(subcommand)]
    pub command: CasesCommand,
}

#[derive(Debug, Subcommand)]
pub enum CasesCommand {
    /// Print case numbers, one per line
    List {
        /// Only cases with at least one unflagged tube
        #[arg(long)]
        not_flagged: bool,
    },
    /// Delete cases with their tubes and channels
    Remove {
        #[arg(required = true)]
        cases: Vec<String>,
    },
}

pub fn execute(args: CasesArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        CasesCommand::List { not_flagged } => {
            let gateway = settings.open_gateway()?;
            for case_number in gateway.cases(not_flagged)? {
                println!("{}", case_number);
            }
            Ok(())
        }
        CasesCommand::Remove { cases } => {
            let mut gateway = settings.open_gateway()?;
            let summary = gateway.remove_cases(&cases)?;
            println!(
                "✓ Removed {} cases, {} tubes, {} channels",
                summary.cases, summary.tube_cases, summary.pmt_tube_cases
            );
            Ok(())
        }
    }
}
