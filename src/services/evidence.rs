//! Evidence buyer and verdict synthesizer stage.
//!
//! Purchases are independently fallible: a single failed purchase is
//! logged and skipped, never aborting the remaining purchases or the
//! verdict. The budget is incremented exactly once per confirmed
//! purchase; evidence the case already owns is reused for free.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Case, Decision, Signal, SignalType};
use crate::domain::ports::{
    BudgetRepository, CaseBrief, DecisionRepository, EvidenceItem, PriorJudgment,
    ProcurementGateway, ReasoningGateway, SignalRepository, StructuredVerdict, VerdictRequest,
};

/// What happened to each requested purchase.
#[derive(Debug, Clone, Default)]
pub struct PurchaseReport {
    /// Types bought this run.
    pub purchased: Vec<SignalType>,
    /// Types already owned (unexpired) and reused for free.
    pub reused: Vec<SignalType>,
    /// Types whose purchase failed, with the reason.
    pub failed: Vec<(SignalType, String)>,
    /// Total spent this run.
    pub spent: f64,
}

/// Buys evidence and synthesizes verdicts for one case.
pub struct EvidenceBuyer {
    signals: Arc<dyn SignalRepository>,
    budgets: Arc<dyn BudgetRepository>,
    decisions: Arc<dyn DecisionRepository>,
    procurement: Arc<dyn ProcurementGateway>,
    reasoning: Arc<dyn ReasoningGateway>,
    signal_ttl: Duration,
}

impl EvidenceBuyer {
    pub fn new(
        signals: Arc<dyn SignalRepository>,
        budgets: Arc<dyn BudgetRepository>,
        decisions: Arc<dyn DecisionRepository>,
        procurement: Arc<dyn ProcurementGateway>,
        reasoning: Arc<dyn ReasoningGateway>,
        signal_ttl_minutes: i64,
    ) -> Self {
        Self {
            signals,
            budgets,
            decisions,
            procurement,
            reasoning,
            signal_ttl: Duration::minutes(signal_ttl_minutes),
        }
    }

    /// Attempt every purchase on the list, tolerating per-item failure.
    pub async fn buy(&self, case: &Case, purchase_list: &[SignalType]) -> DomainResult<PurchaseReport> {
        let mut report = PurchaseReport::default();
        let now = Utc::now();

        for &signal_type in purchase_list {
            // Evidence already owned by the case is shared for free.
            if let Some(existing) = self.signals.find_active(&case.id, signal_type, now).await? {
                info!(
                    case_id = %case.id,
                    signal = signal_type.as_str(),
                    purchased_at = %existing.purchased_at,
                    "reusing previously purchased signal"
                );
                report.reused.push(signal_type);
                continue;
            }

            match self
                .procurement
                .purchase(signal_type, &case.id, &case.user_id)
                .await
            {
                Ok(purchased) => {
                    // Increment-and-check: a concurrent retrigger must
                    // not push spend past the ceiling.
                    match self
                        .budgets
                        .record_spend(&case.id, signal_type, purchased.actual_cost)
                        .await
                    {
                        Ok(remaining) => {
                            let signal = Signal::new(
                                &case.id,
                                signal_type,
                                purchased.actual_cost,
                                purchased.payload,
                                self.signal_ttl,
                            );
                            self.signals.insert(&signal).await?;
                            report.spent += purchased.actual_cost;
                            report.purchased.push(signal_type);
                            info!(
                                case_id = %case.id,
                                signal = signal_type.as_str(),
                                cost = purchased.actual_cost,
                                remaining,
                                "signal purchased"
                            );
                        }
                        Err(err @ DomainError::BudgetExceeded { .. }) => {
                            warn!(
                                case_id = %case.id,
                                signal = signal_type.as_str(),
                                error = %err,
                                "purchase discarded: ceiling would be crossed"
                            );
                            report.failed.push((signal_type, err.to_string()));
                        }
                        Err(err) => return Err(err),
                    }
                }
                Err(err) => {
                    warn!(
                        case_id = %case.id,
                        signal = signal_type.as_str(),
                        error = %err,
                        "signal purchase failed; continuing with partial evidence"
                    );
                    report.failed.push((signal_type, err.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Assemble all evidence the case owns plus prior judgments and ask
    /// the reasoning gateway for a verdict.
    pub async fn synthesize(
        &self,
        case: &Case,
        verification_outcome: Option<String>,
    ) -> DomainResult<(StructuredVerdict, Vec<SignalType>)> {
        let now = Utc::now();
        let owned = self.signals.list_active(&case.id, now).await?;
        let signal_types: Vec<SignalType> = owned.iter().map(|s| s.signal_type).collect();

        let evidence: Vec<EvidenceItem> = owned
            .into_iter()
            .map(|s| EvidenceItem {
                signal_type: s.signal_type,
                payload: s.payload,
            })
            .collect();

        let prior_decisions: Vec<PriorJudgment> = self
            .decisions
            .list_for_case(&case.id)
            .await?
            .into_iter()
            .map(|d: Decision| PriorJudgment {
                stage: d.stage,
                verdict: d.verdict,
                confidence: d.confidence,
                reasoning: d.reasoning,
            })
            .collect();

        let request = VerdictRequest {
            case: case_brief(case),
            evidence,
            prior_decisions,
            verification_outcome,
        };

        let verdict = self.reasoning.synthesize_verdict(&request).await?;
        Ok((verdict, signal_types))
    }
}

/// Project a case into the brief shared with the reasoning service.
pub fn case_brief(case: &Case) -> CaseBrief {
    CaseBrief {
        case_id: case.id.clone(),
        amount: case.amount,
        currency: case.currency.clone(),
        user_id: case.user_id.clone(),
        counterparty_id: case.counterparty_id.clone(),
        risk_score: case.risk_score,
        context: serde_json::to_value(&case.context).unwrap_or_default(),
    }
}
