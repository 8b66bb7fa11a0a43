//! `casegate verify` — respond to customer verification sessions.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use std::sync::Arc;

use crate::adapters::sqlite::SqliteVerificationRepository;
use crate::infrastructure::config::ConfigLoader;
use crate::services::{VerificationOutcome, VerificationService};

use super::bootstrap;

#[derive(Debug, Args)]
pub struct VerifyArgs {
    #[command(subcommand)]
    pub command: VerifyCommands,
}

#[derive(Debug, Subcommand)]
pub enum VerifyCommands {
    /// Apply a customer's response to an open session
    Respond {
        /// The raw session token delivered to the customer
        #[arg(long)]
        token: String,
        /// The customer's answer: confirmed or disputed
        #[arg(long)]
        outcome: String,
    },
}

pub async fn execute(args: VerifyArgs, json: bool) -> Result<()> {
    let config = ConfigLoader::load()?;

    match args.command {
        VerifyCommands::Respond { token, outcome } => {
            let outcome = VerificationOutcome::from_str(&outcome)
                .ok_or_else(|| anyhow!("Invalid outcome '{outcome}': expected confirmed or disputed"))?;

            let (orchestrator, pool) = bootstrap(&config).await?;
            let service = VerificationService::new(
                Arc::new(SqliteVerificationRepository::new(pool.clone())),
                orchestrator.clone(),
            );

            let resolution = service
                .respond(&token, outcome)
                .await
                .context("Verification response failed")?;

            // Let the re-synthesis finish before reporting.
            orchestrator.dispatcher().drain().await;

            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "case_id": resolution.case_id,
                        "status": resolution.status.as_str(),
                        "human_review": resolution.human_review,
                    })
                );
            } else {
                println!(
                    "Verification for case {} recorded as {}",
                    resolution.case_id,
                    resolution.status.as_str()
                );
                if resolution.human_review {
                    println!("Case escalated for human review");
                }
            }

            pool.close().await;
        }
    }

    Ok(())
}
