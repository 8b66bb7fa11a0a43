//! Command-line interface.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

/// Fraud case screening orchestrator.
#[derive(Debug, Parser)]
#[command(name = "casegate", version, about)]
pub struct Cli {
    /// Emit machine-readable JSON output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Initialize project config and database schema
    Init(commands::init::InitArgs),
    /// Submit and inspect screening cases
    Case(commands::case::CaseArgs),
    /// Respond to customer verification sessions
    Verify(commands::verify::VerifyArgs),
}

/// Print an error and exit non-zero.
pub fn handle_error(err: anyhow::Error, json: bool) {
    if json {
        let payload = serde_json::json!({ "error": format!("{err:#}") });
        eprintln!("{payload}");
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
