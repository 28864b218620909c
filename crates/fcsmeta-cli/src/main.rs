//! fcsmeta CLI
//!
//! Command-line interface for the FCS metadata store

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod commands;
mod config;

#[derive(Debug, Parser)]
#[command(name = "fcsmeta")]
#[command(about = "fcsmeta - Flow cytometry metadata store", long_about = None)]
struct Cli {
    /// Database file (default: .fcsmeta/fcs.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Schema lifecycle and store information
    Db(commands::db::DbArgs),
    /// Custom case data (classification) import
    Custom(commands::custom::CustomArgs),
    /// Table export and reference table import
    Table(commands::table::TableArgs),
    /// Tube flag updates
    Flag(commands::flag::FlagArgs),
    /// Query tubes or channel records
    Query(commands::query::QueryArgs),
    /// List or remove cases
    Cases(commands::cases::CasesArgs),
}

fn main() {
    let cli = Cli::parse();

    let settings = match config::Settings::resolve(cli.db, cli.config.as_deref(), cli.log_format) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    settings.init_logging();

    let result = match cli.command {
        Commands::Db(args) => commands::db::execute(args, &settings),
        Commands::Custom(args) => commands::custom::execute(args, &settings),
        Commands::Table(args) => commands::table::execute(args, &settings),
        Commands::Flag(args) => commands::flag::execute(args, &settings),
        Commands::Query(args) => commands::query::execute(args, &settings),
        Commands::Cases(args) => commands::cases::execute(args, &settings),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
