//! `casegate case` — submit and inspect screening cases.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use std::collections::HashMap;

use crate::cli::output::format_case_table;
use crate::domain::models::{CaseInput, CaseStatus};
use crate::domain::ports::{CaseFilters, CaseRepository, StepRepository};
use crate::adapters::sqlite::{SqliteCaseRepository, SqliteStepRepository};
use crate::infrastructure::config::ConfigLoader;

use super::bootstrap;

#[derive(Debug, Args)]
pub struct CaseArgs {
    #[command(subcommand)]
    pub command: CaseCommands,
}

#[derive(Debug, Subcommand)]
pub enum CaseCommands {
    /// Submit a case for screening
    Submit {
        /// Globally unique case identifier
        #[arg(long)]
        id: String,
        /// Transaction amount
        #[arg(long)]
        amount: f64,
        /// ISO currency code
        #[arg(long, default_value = "USD")]
        currency: String,
        /// Subject user identifier
        #[arg(long)]
        user: String,
        /// Counterparty identifier
        #[arg(long)]
        counterparty: Option<String>,
        /// Context entries as key=value (value parsed as JSON, else string)
        #[arg(long = "context", value_name = "KEY=VALUE")]
        context: Vec<String>,
        /// Return immediately without waiting for the pipeline
        #[arg(long)]
        no_wait: bool,
    },
    /// Show one case with its step history
    Show {
        /// Case identifier
        id: String,
    },
    /// List cases
    List {
        /// Filter by status: processing, completed, failed
        #[arg(long)]
        status: Option<String>,
        /// Maximum rows
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
}

pub async fn execute(args: CaseArgs, json: bool) -> Result<()> {
    let config = ConfigLoader::load()?;

    match args.command {
        CaseCommands::Submit {
            id,
            amount,
            currency,
            user,
            counterparty,
            context,
            no_wait,
        } => {
            let (orchestrator, pool) = bootstrap(&config).await?;

            let input = CaseInput {
                case_id: id,
                amount,
                currency,
                user_id: user,
                counterparty_id: counterparty,
                context: parse_context(&context)?,
            };

            let outcome = orchestrator
                .submit(input)
                .await
                .context("Case submission failed")?;

            if !no_wait {
                orchestrator.dispatcher().drain().await;
            }

            let cases = SqliteCaseRepository::new(pool.clone());
            let case = cases.get(&outcome.case_id).await?;

            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "case_id": outcome.case_id,
                        "status": case.as_ref().map(|c| c.status.as_str()),
                        "resumed": outcome.resumed,
                        "resumed_from": outcome.resumed_from.map(|s| s.as_str()),
                        "final_decision": case.as_ref().and_then(|c| c.final_decision).map(|v| v.as_str()),
                        "confidence": case.as_ref().and_then(|c| c.decision_confidence),
                        "total_cost": case.as_ref().map(|c| c.total_cost),
                    })
                );
            } else {
                println!("Case {} submitted", outcome.case_id);
                if outcome.resumed {
                    match outcome.resumed_from {
                        Some(stage) => println!("  Resumed from: {}", stage.as_str()),
                        None => println!("  Resumed: bookkeeping completed"),
                    }
                }
                if let Some(case) = case {
                    println!("  Status: {}", case.status.as_str());
                    if let Some(verdict) = case.final_decision {
                        println!(
                            "  Decision: {} (confidence {:.2})",
                            verdict.as_str(),
                            case.decision_confidence.unwrap_or_default()
                        );
                    }
                    println!("  Cost: {:.2}", case.total_cost);
                    if case.verification_required {
                        println!("  Customer verification requested");
                    }
                }
            }

            pool.close().await;
        }
        CaseCommands::Show { id } => {
            let (_, pool) = bootstrap(&config).await?;
            let cases = SqliteCaseRepository::new(pool.clone());
            let steps = SqliteStepRepository::new(pool.clone());

            let case = cases
                .get(&id)
                .await?
                .ok_or_else(|| anyhow!("Case not found: {id}"))?;
            let history = steps.list_for_case(&id).await?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "case": case,
                        "steps": history,
                    }))?
                );
            } else {
                println!("Case {}", case.id);
                println!("  Amount: {:.2} {}", case.amount, case.currency);
                println!("  Status: {}", case.status.as_str());
                if let Some(score) = case.risk_score {
                    println!("  Risk score: {score:.2}");
                }
                if let Some(verdict) = case.final_decision {
                    println!(
                        "  Decision: {} (confidence {:.2})",
                        verdict.as_str(),
                        case.decision_confidence.unwrap_or_default()
                    );
                }
                println!("  Cost: {:.2}", case.total_cost);
                if let Some(reason) = &case.failure_reason {
                    println!("  Failure: {reason}");
                }
                if case.human_review {
                    println!("  Flagged for human review");
                }
                println!("  Steps:");
                for step in history {
                    println!(
                        "    #{} {} {} at {}",
                        step.step_number,
                        step.stage.as_str(),
                        step.action.as_str(),
                        step.created_at.to_rfc3339()
                    );
                }
            }

            pool.close().await;
        }
        CaseCommands::List { status, limit } => {
            let (_, pool) = bootstrap(&config).await?;
            let cases = SqliteCaseRepository::new(pool.clone());

            let status = status
                .map(|s| {
                    CaseStatus::from_str(&s).ok_or_else(|| anyhow!("Invalid status filter: {s}"))
                })
                .transpose()?;

            let results = cases
                .list(CaseFilters {
                    status,
                    user_id: None,
                    limit: Some(limit),
                })
                .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                println!("No cases found.");
            } else {
                println!("{}", format_case_table(&results));
                println!("\nShowing {} case(s)", results.len());
            }

            pool.close().await;
        }
    }

    Ok(())
}

/// Parse `key=value` context entries; values that parse as JSON keep
/// their type, anything else becomes a string.
fn parse_context(entries: &[String]) -> Result<HashMap<String, serde_json::Value>> {
    let mut context = HashMap::new();
    for entry in entries {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("Invalid context entry '{entry}': expected KEY=VALUE"))?;
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        context.insert(key.to_string(), value);
    }
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_context_types() {
        let entries = vec![
            "new_account=true".to_string(),
            "account_age_days=12".to_string(),
            "note=manual review".to_string(),
        ];
        let context = parse_context(&entries).unwrap();
        assert_eq!(context["new_account"], serde_json::json!(true));
        assert_eq!(context["account_age_days"], serde_json::json!(12));
        assert_eq!(context["note"], serde_json::json!("manual review"));
    }

    #[test]
    fn test_parse_context_rejects_missing_equals() {
        assert!(parse_context(&["broken".to_string()]).is_err());
    }
}
