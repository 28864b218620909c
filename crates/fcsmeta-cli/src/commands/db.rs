//! Schema lifecycle commands
//!
//! Usage: fcsmeta db ensure | rebuild --yes | info

use crate::config::Settings;
use clap::{Args, Subcommand};
use fcsmeta_core::model::TableName;
use fcsmeta_engine::GatewayOptions;

#[derive(Debug, Args)]
pub struct DbArgs {
    #[command(subcommand)]
    pub command: DbCommand,
}

#[derive(Debug, Subcommand)]
pub enum DbCommand {
    /// Create any missing tables (keeps data)
    Ensure,
    /// Drop and recreate every table (destroys data)
    Rebuild {
        /// Confirm the data loss
        #[arg(long)]
        yes: bool,
    },
    /// Show creation date and row counts
    Info,
}

pub fn execute(args: DbArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        DbCommand::Ensure => {
            settings.open_gateway()?;
            println!("✓ Schema ensured at {}", settings.db.display());
            Ok(())
        }
        DbCommand::Rebuild { yes } => {
            if !yes {
                return Err("rebuild destroys all data; pass --yes to confirm".into());
            }
            let options = GatewayOptions {
                rebuild: true,
                ..settings.gateway.clone()
            };
            let gateway = settings.open_gateway_with(&options)?;
            let created = gateway
                .creation_date()?
                .map(|d| d.to_rfc3339())
                .unwrap_or_default();
            println!("✓ Schema rebuilt at {} ({})", settings.db.display(), created);
            Ok(())
        }
        DbCommand::Info => {
            let gateway = settings.open_gateway()?;
            match gateway.creation_date()? {
                Some(date) => println!("creation_date: {}", date.to_rfc3339()),
                None => println!("creation_date: never rebuilt"),
            }
            for table in TableName::CREATION_ORDER {
                println!("{}: {}", table, gateway.read_table(table)?.len());
            }
            Ok(())
        }
    }
}
