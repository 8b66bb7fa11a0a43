//! Crash-recovery planner.
//!
//! Reconstructs a case's pipeline position from the visited-stage set
//! (the canonical progress marker; never timestamps) and the outputs
//! recorded in the step log, then resumes at the correct stage. Every
//! resumption writes a SYSTEM_RECOVERED step naming the rule that
//! fired before the next stage triggers. When no rule matches,
//! recovery fails closed; it never auto-retries indefinitely and never
//! completes a case in an indeterminate state.

use serde::Deserialize;
use tracing::{info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Case, CaseStatus, PipelineStage, SignalType, StageStep, StepAction};

use super::orchestrator::{NextStage, Orchestrator};
use super::policy_gate::{PolicyOutcome, PolicyRoute};

/// What recovery decided for a case.
#[derive(Debug, Clone)]
pub struct RecoveryOutcome {
    pub resumed: bool,
    /// Stage the case resumed from; `None` for a pure bookkeeping fix.
    pub resumed_from: Option<PipelineStage>,
    /// The rule that fired, for audit transparency.
    pub rule: &'static str,
}

/// Shape of the VOI selection step output we read back.
#[derive(Debug, Deserialize)]
struct VoiStepOutput {
    purchases: Vec<SignalType>,
}

/// Applies the ordered resume rules.
pub struct RecoveryPlanner {
    orchestrator: Orchestrator,
}

impl RecoveryPlanner {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    /// Resume an in-flight case. The first matching rule wins.
    pub async fn recover(&self, case: &Case) -> DomainResult<RecoveryOutcome> {
        let (next, rule, reason) = self.plan(case).await?;

        match next {
            Some(next) => {
                let resumed_from = next.stage();
                self.record_recovery(&case.id, resumed_from, rule, &reason)
                    .await?;
                info!(
                    case_id = %case.id,
                    rule,
                    resumed_from = resumed_from.as_str(),
                    "case recovered; resuming"
                );
                self.orchestrator.dispatch(&case.id, next);
                Ok(RecoveryOutcome {
                    resumed: true,
                    resumed_from: Some(resumed_from),
                    rule,
                })
            }
            None => {
                // Bookkeeping gap: a final decision exists but the
                // status never flipped. Close the case directly.
                let mut case = case.clone();
                let stage = case.current_stage.unwrap_or(PipelineStage::EvidencePurchase);
                self.record_recovery(&case.id, stage, rule, &reason).await?;
                case.status = CaseStatus::Completed;
                case.updated_at = chrono::Utc::now();
                self.orchestrator.cases().update(&case).await?;
                info!(case_id = %case.id, rule, "bookkeeping gap closed");
                Ok(RecoveryOutcome {
                    resumed: true,
                    resumed_from: None,
                    rule,
                })
            }
        }
    }

    /// Decide which rule applies. Returns the continuation (`None`
    /// means a direct status fix), the rule name, and the reason.
    async fn plan(
        &self,
        case: &Case,
    ) -> DomainResult<(Option<NextStage>, &'static str, String)> {
        // Rule 1: intake never ran.
        if !case.has_visited(PipelineStage::Intake) {
            return Ok((
                Some(NextStage::Intake),
                "intake_never_visited",
                "no stage completed; restarting from intake".to_string(),
            ));
        }

        // Rule 2: policy gate never ran.
        if !case.has_visited(PipelineStage::PolicyGate) {
            return Ok((
                Some(NextStage::PolicyGate),
                "policy_gate_never_visited",
                "intake completed; running policy gate".to_string(),
            ));
        }

        // Rule 3: neither selector nor buyer ran; the gate's recorded
        // route decides which comes next.
        if !case.has_visited(PipelineStage::VoiSelection)
            && !case.has_visited(PipelineStage::EvidencePurchase)
        {
            let outcome = self.read_policy_outcome(&case.id).await?;
            return match outcome.route {
                PolicyRoute::FastPath => Ok((
                    Some(NextStage::Evidence {
                        purchases: Vec::new(),
                        verification_outcome: None,
                    }),
                    "fast_path_evidence",
                    "policy gate fast-pathed; synthesizing with no purchases".to_string(),
                )),
                PolicyRoute::Escalate => Ok((
                    Some(NextStage::VoiSelection),
                    "voi_never_visited",
                    "policy gate escalated; running evidence selection".to_string(),
                )),
            };
        }

        // Rule 4: selector ran, buyer did not; replay its purchase list.
        if !case.has_visited(PipelineStage::EvidencePurchase) {
            let purchases = self.read_purchase_list(&case.id).await?;
            return Ok((
                Some(NextStage::Evidence {
                    purchases,
                    verification_outcome: None,
                }),
                "evidence_never_visited",
                "selection recorded; replaying purchase list".to_string(),
            ));
        }

        // Rule 5: buyer ran but no verdict landed. A transient failure,
        // not a logic error; re-run with the same purchase list.
        if case.final_decision.is_none() {
            let purchases = if case.has_visited(PipelineStage::VoiSelection) {
                self.read_purchase_list(&case.id).await?
            } else {
                Vec::new()
            };
            return Ok((
                Some(NextStage::Evidence {
                    purchases,
                    verification_outcome: None,
                }),
                "evidence_retry",
                "evidence stage left no verdict; retrying synthesis".to_string(),
            ));
        }

        // Rule 6: verdict exists but status never flipped.
        if case.status == CaseStatus::Processing {
            return Ok((
                None,
                "bookkeeping_gap",
                "final decision recorded; completing status directly".to_string(),
            ));
        }

        Err(DomainError::Unrecoverable {
            case_id: case.id.clone(),
            reason: format!(
                "no resume rule matches (status {}, visited {:?})",
                case.status.as_str(),
                case.stages_visited
            ),
        })
    }

    /// Read the policy gate's last recorded output. Fails closed when
    /// the step log contradicts the visited set.
    async fn read_policy_outcome(&self, case_id: &str) -> DomainResult<PolicyOutcome> {
        let step = self
            .orchestrator
            .steps()
            .last_for_stage(case_id, PipelineStage::PolicyGate)
            .await?
            .ok_or_else(|| DomainError::Unrecoverable {
                case_id: case_id.to_string(),
                reason: "policy gate marked visited but no step recorded".to_string(),
            })?;

        parse_step_output(case_id, &step, "policy gate")
    }

    /// Read the purchase list from the selector's last recorded output.
    async fn read_purchase_list(&self, case_id: &str) -> DomainResult<Vec<SignalType>> {
        let step = self
            .orchestrator
            .steps()
            .last_for_stage(case_id, PipelineStage::VoiSelection)
            .await?;

        match step {
            Some(step) => {
                let output: VoiStepOutput = parse_step_output(case_id, &step, "voi selection")?;
                Ok(output.purchases)
            }
            None => {
                warn!(case_id = %case_id, "selection marked visited but no step recorded; retrying with no purchases");
                Ok(Vec::new())
            }
        }
    }

    async fn record_recovery(
        &self,
        case_id: &str,
        stage: PipelineStage,
        rule: &'static str,
        reason: &str,
    ) -> DomainResult<()> {
        let step = StageStep::new(case_id, stage, StepAction::SystemRecovered).with_metadata(
            serde_json::json!({
                "rule": rule,
                "reason": reason,
            }),
        );
        self.orchestrator.steps().append(step).await?;
        Ok(())
    }
}

fn parse_step_output<T: serde::de::DeserializeOwned>(
    case_id: &str,
    step: &StageStep,
    what: &str,
) -> DomainResult<T> {
    let output = step.output.clone().ok_or_else(|| DomainError::Unrecoverable {
        case_id: case_id.to_string(),
        reason: format!("{what} step has no recorded output"),
    })?;

    serde_json::from_value(output).map_err(|e| DomainError::Unrecoverable {
        case_id: case_id.to_string(),
        reason: format!("{what} step output unreadable: {e}"),
    })
}
