//! Tube flag updates
//!
//! Usage: fcsmeta flag set <IDX> <FLAG> [--message MSG]

use crate::config::Settings;
use clap::{Args, Subcommand};
use fcsmeta_core::model::Flag;

#[derive(Debug, Args)]
pub struct FlagArgs {
    #[command(subcommand)]
    pub command: FlagCommand,
}

#[derive(Debug, Subcommand)]
pub enum FlagCommand {
    /// Set a tube's flag and error message
    Set {
        case_tube_idx: i64,
        /// Pending, Processed, CustomData_ONLY or Error
        flag: String,
        /// Required for Error and CustomData_ONLY
        #[arg(long)]
        message: Option<String>,
    },
}

pub fn execute(args: FlagArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        FlagCommand::Set {
            case_tube_idx,
            flag,
            message,
        } => {
            let flag: Flag = flag.parse()?;
            let mut gateway = settings.open_gateway()?;
            gateway.set_flag(case_tube_idx, flag, message.as_deref())?;
            println!("✓ Tube {} flagged {}", case_tube_idx, flag);
            Ok(())
        }
    }
}
