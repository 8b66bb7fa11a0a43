//! Case orchestrator.
//!
//! Drives stage transitions and is the only component allowed to
//! trigger the next stage. Submission is exactly-once: the atomic
//! insert-or-detect on the case ledger is the sole guard against
//! double creation, and a duplicate submission either returns the
//! completed case unchanged or hands the case to the recovery planner.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Budget, Case, CaseInput, CaseStatus, Decision, NotificationConfig, PipelineStage,
    ScreeningConfig, SignalType, StageStep, StepAction, Verdict, VerificationChannel,
    VerificationSession, VerificationStatus,
};
use crate::domain::ports::{
    BudgetRepository, CaseRepository, DecisionRepository, EvidenceItem, NotificationGateway,
    ProcurementGateway, ReasoningGateway, SignalRepository, StepRepository,
    VerificationRepository,
};

use super::dispatcher::StageDispatcher;
use super::evidence::EvidenceBuyer;
use super::policy_gate::{self, PolicyRoute};
use super::recovery::RecoveryPlanner;
use super::tribunal::Tribunal;
use super::{intake, voi_selector};

/// Repository and gateway wiring for the orchestrator.
#[derive(Clone)]
pub struct PipelineDeps {
    pub cases: Arc<dyn CaseRepository>,
    pub budgets: Arc<dyn BudgetRepository>,
    pub steps: Arc<dyn StepRepository>,
    pub decisions: Arc<dyn DecisionRepository>,
    pub signals: Arc<dyn SignalRepository>,
    pub verifications: Arc<dyn VerificationRepository>,
    pub reasoning: Arc<dyn ReasoningGateway>,
    pub procurement: Arc<dyn ProcurementGateway>,
    pub notification: Arc<dyn NotificationGateway>,
}

/// Result of a case submission.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub case_id: String,
    pub status: CaseStatus,
    /// Whether this submission resumed an in-flight case.
    pub resumed: bool,
    /// The stage recovery resumed from, when it did.
    pub resumed_from: Option<PipelineStage>,
}

/// The stage continuation a dispatch carries.
#[derive(Debug, Clone)]
pub enum NextStage {
    Intake,
    PolicyGate,
    VoiSelection,
    Evidence {
        purchases: Vec<SignalType>,
        verification_outcome: Option<String>,
    },
    Tribunal,
}

impl NextStage {
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::Intake => PipelineStage::Intake,
            Self::PolicyGate => PipelineStage::PolicyGate,
            Self::VoiSelection => PipelineStage::VoiSelection,
            Self::Evidence { .. } => PipelineStage::EvidencePurchase,
            Self::Tribunal => PipelineStage::Tribunal,
        }
    }
}

/// Drives the screening pipeline for all cases.
#[derive(Clone)]
pub struct Orchestrator {
    deps: PipelineDeps,
    screening: ScreeningConfig,
    default_channel: VerificationChannel,
    dispatcher: Arc<StageDispatcher>,
}

impl Orchestrator {
    pub fn new(
        deps: PipelineDeps,
        screening: ScreeningConfig,
        notification: &NotificationConfig,
        dispatcher: Arc<StageDispatcher>,
    ) -> Self {
        let default_channel = VerificationChannel::from_str(&notification.default_channel)
            .unwrap_or(VerificationChannel::Sms);

        Self {
            deps,
            screening,
            default_channel,
            dispatcher,
        }
    }

    /// The dispatcher, for shutdown draining.
    pub fn dispatcher(&self) -> Arc<StageDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Submit a case. Returns immediately; stage execution continues in
    /// the background.
    pub async fn submit(&self, input: CaseInput) -> DomainResult<SubmitOutcome> {
        if input.case_id.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "case_id cannot be empty".to_string(),
            ));
        }
        if input.amount < 0.0 {
            return Err(DomainError::ValidationFailed(
                "amount cannot be negative".to_string(),
            ));
        }

        let input_snapshot = serde_json::to_value(&input)?;
        let case = Case::new(input);
        let created = self.deps.cases.try_create(&case).await?;

        if created {
            let budget = Budget::new(&case.id, self.screening.budget_ceiling);
            self.deps.budgets.create(&budget).await?;

            let step = StageStep::new(&case.id, PipelineStage::Intake, StepAction::CaseCreated)
                .with_input(input_snapshot);
            self.deps.steps.append(step).await?;

            info!(case_id = %case.id, amount = case.amount, "case created");
            self.dispatch(&case.id, NextStage::Intake);

            return Ok(SubmitOutcome {
                case_id: case.id,
                status: CaseStatus::Processing,
                resumed: false,
                resumed_from: None,
            });
        }

        // Duplicate submission: never re-insert.
        let existing = self
            .deps
            .cases
            .get(&case.id)
            .await?
            .ok_or_else(|| DomainError::CaseNotFound(case.id.clone()))?;

        match existing.status {
            CaseStatus::Completed => {
                debug!(case_id = %existing.id, "duplicate submission of completed case");
                Ok(SubmitOutcome {
                    case_id: existing.id,
                    status: CaseStatus::Completed,
                    resumed: false,
                    resumed_from: None,
                })
            }
            CaseStatus::Processing => {
                let recovery = RecoveryPlanner::new(self.clone()).recover(&existing).await?;
                Ok(SubmitOutcome {
                    case_id: existing.id,
                    status: CaseStatus::Processing,
                    resumed: recovery.resumed,
                    resumed_from: recovery.resumed_from,
                })
            }
            CaseStatus::Failed => Err(DomainError::CorruptedCase {
                case_id: existing.id,
                status: existing.status.as_str().to_string(),
            }),
        }
    }

    /// Fire-and-forget handoff to the next stage through the
    /// supervised dispatcher.
    pub(crate) fn dispatch(&self, case_id: &str, next: NextStage) {
        let this = self.clone();
        let id = case_id.to_string();
        let label = next.stage().as_str();
        self.dispatcher.spawn(case_id, label, async move {
            this.execute_stage(&id, next).await;
            Ok(())
        });
    }

    /// Run one stage, classifying failures per the error taxonomy:
    /// transient failures leave the case `Processing` (recoverable),
    /// structural failures mark it `Failed`.
    async fn execute_stage(&self, case_id: &str, next: NextStage) {
        let stage = next.stage();
        match self.run_stage(case_id, next).await {
            Ok(()) => {}
            Err(err) if err.is_transient() => {
                warn!(
                    case_id = %case_id,
                    stage = stage.as_str(),
                    error = %err,
                    "transient stage failure; case remains recoverable"
                );
                self.append_failure_step(case_id, stage, &err, true).await;
            }
            Err(err) => {
                warn!(
                    case_id = %case_id,
                    stage = stage.as_str(),
                    error = %err,
                    "structural stage failure; marking case failed"
                );
                self.append_failure_step(case_id, stage, &err, false).await;
                self.mark_failed(case_id, stage, &err).await;
            }
        }
    }

    async fn run_stage(&self, case_id: &str, next: NextStage) -> DomainResult<()> {
        match next {
            NextStage::Intake => self.run_intake(case_id).await,
            NextStage::PolicyGate => self.run_policy_gate(case_id).await,
            NextStage::VoiSelection => self.run_voi_selection(case_id).await,
            NextStage::Evidence {
                purchases,
                verification_outcome,
            } => self.run_evidence(case_id, purchases, verification_outcome).await,
            NextStage::Tribunal => self.run_tribunal(case_id).await,
        }
    }

    async fn run_intake(&self, case_id: &str) -> DomainResult<()> {
        let started = Instant::now();
        let mut case = self.load_case(case_id).await?;
        self.require_budget(case_id).await?;

        let assessment = intake::assess(&case);
        case.risk_score = Some(assessment.score);
        case.mark_visited(PipelineStage::Intake);
        self.deps.cases.update(&case).await?;

        let step = StageStep::new(case_id, PipelineStage::Intake, StepAction::StageCompleted)
            .with_output(serde_json::to_value(&assessment)?)
            .with_duration_ms(elapsed_ms(started));
        self.deps.steps.append(step).await?;

        info!(
            case_id = %case_id,
            risk_score = assessment.score,
            "intake complete"
        );

        self.dispatch(case_id, NextStage::PolicyGate);
        Ok(())
    }

    async fn run_policy_gate(&self, case_id: &str) -> DomainResult<()> {
        let started = Instant::now();
        let mut case = self.load_case(case_id).await?;
        let risk_score = case.risk_score.ok_or_else(|| {
            DomainError::ValidationFailed("risk score missing; intake has not run".to_string())
        })?;

        let outcome = policy_gate::evaluate(risk_score, self.screening.approve_threshold);

        if outcome.route == PolicyRoute::FastPath {
            // Advisory approval: the verdict synthesizer retains final
            // override authority.
            let decision = Decision::new(
                case_id,
                PipelineStage::PolicyGate,
                Verdict::Approve,
                outcome.confidence,
                format!(
                    "risk score {risk_score:.2} below threshold {:.2}; fast-path approval",
                    outcome.threshold
                ),
            );
            self.deps.decisions.insert(&decision).await?;
        }

        case.mark_visited(PipelineStage::PolicyGate);
        self.deps.cases.update(&case).await?;

        let step = StageStep::new(case_id, PipelineStage::PolicyGate, StepAction::StageCompleted)
            .with_output(serde_json::to_value(outcome)?)
            .with_duration_ms(elapsed_ms(started));
        self.deps.steps.append(step).await?;

        info!(
            case_id = %case_id,
            route = outcome.route.as_str(),
            "policy gate routed"
        );

        match outcome.route {
            PolicyRoute::FastPath => self.dispatch(
                case_id,
                NextStage::Evidence {
                    purchases: Vec::new(),
                    verification_outcome: None,
                },
            ),
            PolicyRoute::Escalate => self.dispatch(case_id, NextStage::VoiSelection),
        }
        Ok(())
    }

    async fn run_voi_selection(&self, case_id: &str) -> DomainResult<()> {
        let started = Instant::now();
        let mut case = self.load_case(case_id).await?;
        let budget = self.require_budget(case_id).await?;
        let risk_score = case.risk_score.ok_or_else(|| {
            DomainError::ValidationFailed("risk score missing; intake has not run".to_string())
        })?;

        let selection = voi_selector::select(
            case_id,
            case.amount,
            risk_score,
            budget.remaining(),
            &self.screening.signals,
        );
        self.deps
            .budgets
            .append_evaluations(&selection.evaluations)
            .await?;

        case.mark_visited(PipelineStage::VoiSelection);
        self.deps.cases.update(&case).await?;

        let step = StageStep::new(case_id, PipelineStage::VoiSelection, StepAction::StageCompleted)
            .with_output(serde_json::json!({
                "purchases": selection.purchases,
                "candidates_evaluated": selection.evaluations.len(),
            }))
            .with_duration_ms(elapsed_ms(started));
        self.deps.steps.append(step).await?;

        info!(
            case_id = %case_id,
            purchases = selection.purchases.len(),
            "evidence selected"
        );

        self.dispatch(
            case_id,
            NextStage::Evidence {
                purchases: selection.purchases,
                verification_outcome: None,
            },
        );
        Ok(())
    }

    async fn run_evidence(
        &self,
        case_id: &str,
        purchases: Vec<SignalType>,
        verification_outcome: Option<String>,
    ) -> DomainResult<()> {
        let started = Instant::now();
        let mut case = self.load_case(case_id).await?;

        let buyer = EvidenceBuyer::new(
            Arc::clone(&self.deps.signals),
            Arc::clone(&self.deps.budgets),
            Arc::clone(&self.deps.decisions),
            Arc::clone(&self.deps.procurement),
            Arc::clone(&self.deps.reasoning),
            self.screening.signal_ttl_minutes,
        );

        let report = buyer.buy(&case, &purchases).await?;
        let budget = self.require_budget(case_id).await?;
        case.total_cost = budget.spent;

        let (verdict, signals_used) = buyer.synthesize(&case, verification_outcome.clone()).await?;

        let decision = Decision::new(
            case_id,
            PipelineStage::EvidencePurchase,
            verdict.decision,
            verdict.confidence,
            &verdict.reasoning,
        )
        .with_risk_factors(verdict.risk_factors.clone())
        .with_mitigating_factors(verdict.mitigating_factors.clone())
        .with_signals(signals_used)
        .with_cost(report.spent);
        self.deps.decisions.insert(&decision).await?;

        case.mark_visited(PipelineStage::EvidencePurchase);

        let step = StageStep::new(
            case_id,
            PipelineStage::EvidencePurchase,
            StepAction::StageCompleted,
        )
        .with_output(serde_json::json!({
            "decision": verdict.decision,
            "confidence": verdict.confidence,
        }))
        .with_metadata(serde_json::json!({
            "purchased": report.purchased,
            "reused": report.reused,
            "failed": report.failed,
            "spent": report.spent,
        }))
        .with_duration_ms(elapsed_ms(started));
        self.deps.steps.append(step).await?;

        // High-stakes escalated cases get the tribunal's deeper look;
        // its ruling supersedes this verdict. Verification re-entries
        // finalize directly.
        let needs_tribunal = verification_outcome.is_none()
            && case.has_visited(PipelineStage::VoiSelection)
            && !case.has_visited(PipelineStage::Tribunal)
            && case.amount >= self.screening.tribunal_min_amount;

        if needs_tribunal {
            self.deps.cases.update(&case).await?;
            info!(case_id = %case_id, "convening tribunal for high-stakes case");
            self.dispatch(case_id, NextStage::Tribunal);
            return Ok(());
        }

        self.finalize(case, decision.id, verdict.decision, verdict.confidence)
            .await
    }

    async fn run_tribunal(&self, case_id: &str) -> DomainResult<()> {
        let started = Instant::now();
        let mut case = self.load_case(case_id).await?;

        let evidence: Vec<EvidenceItem> = self
            .deps
            .signals
            .list_active(case_id, chrono::Utc::now())
            .await?
            .into_iter()
            .map(|s| EvidenceItem {
                signal_type: s.signal_type,
                payload: s.payload,
            })
            .collect();

        let tribunal = Tribunal::new(Arc::clone(&self.deps.reasoning));
        let synthesis = tribunal.deliberate(&case, evidence).await?;

        let decision = Decision::new(
            case_id,
            PipelineStage::Tribunal,
            synthesis.decision,
            synthesis.confidence,
            &synthesis.reasoning,
        )
        .with_risk_factors(synthesis.deciding_factors.clone());
        self.deps.decisions.insert(&decision).await?;

        case.mark_visited(PipelineStage::Tribunal);

        let step = StageStep::new(case_id, PipelineStage::Tribunal, StepAction::StageCompleted)
            .with_output(serde_json::json!({
                "decision": synthesis.decision,
                "confidence": synthesis.confidence,
                "defense_strength": synthesis.defense_strength,
                "prosecution_strength": synthesis.prosecution_strength,
            }))
            .with_duration_ms(elapsed_ms(started));
        self.deps.steps.append(step).await?;

        self.finalize(case, decision.id, synthesis.decision, synthesis.confidence)
            .await
    }

    /// Complete the case: apply the medium-band verification
    /// escalation, stamp the final decision, and flip the exclusive
    /// `is_final` flag.
    async fn finalize(
        &self,
        mut case: Case,
        decision_id: uuid::Uuid,
        verdict: Verdict,
        confidence: f64,
    ) -> DomainResult<()> {
        let risk_score = case.risk_score.unwrap_or(0.0);

        let needs_verification = case.verification_status.is_none()
            && (self.screening.medium_confidence.contains(confidence)
                || self.screening.medium_risk.contains(risk_score));

        if needs_verification {
            case.verification_required = true;
            case.verification_status = Some(VerificationStatus::Pending);
            self.ensure_verification_session(&case).await?;
            info!(
                case_id = %case.id,
                confidence,
                risk_score,
                "medium-band outcome; customer verification requested"
            );
        }

        // Verification augments the outcome; it never blocks it.
        case.status = CaseStatus::Completed;
        case.final_decision = Some(verdict);
        case.decision_confidence = Some(confidence);
        case.updated_at = chrono::Utc::now();
        self.deps.cases.update(&case).await?;
        self.deps.decisions.mark_final(&case.id, decision_id).await?;

        info!(
            case_id = %case.id,
            verdict = verdict.as_str(),
            confidence,
            total_cost = case.total_cost,
            "case completed"
        );
        Ok(())
    }

    /// Create the case's verification session unless an open one
    /// already exists. Notification failure leaves the session unsent;
    /// it never fails session creation.
    async fn ensure_verification_session(&self, case: &Case) -> DomainResult<()> {
        if let Some(session) = self.deps.verifications.find_open_for_case(&case.id).await? {
            debug!(
                case_id = %case.id,
                session_id = %session.id,
                "reusing open verification session"
            );
            return Ok(());
        }

        let (mut session, token) = VerificationSession::new(
            &case.id,
            self.default_channel,
            chrono::Duration::minutes(self.screening.verification_expiry_minutes),
        );

        let message = format!(
            "Please confirm transaction {} for {:.2} {}. Reply with code {token}.",
            case.id, case.amount, case.currency
        );

        session.notification_sent = match self
            .deps
            .notification
            .notify(self.default_channel, &case.user_id, &message)
            .await
        {
            Ok(delivered) => delivered,
            Err(err) => {
                warn!(
                    case_id = %case.id,
                    error = %err,
                    "verification notification failed; session created unsent"
                );
                false
            }
        };

        self.deps.verifications.insert(&session).await?;
        Ok(())
    }

    async fn append_failure_step(
        &self,
        case_id: &str,
        stage: PipelineStage,
        err: &DomainError,
        transient: bool,
    ) {
        let step = StageStep::new(case_id, stage, StepAction::StageFailed).with_metadata(
            serde_json::json!({
                "reason": err.to_string(),
                "transient": transient,
            }),
        );
        if let Err(append_err) = self.deps.steps.append(step).await {
            warn!(
                case_id = %case_id,
                error = %append_err,
                "failed to record stage failure step"
            );
        }
    }

    async fn mark_failed(&self, case_id: &str, stage: PipelineStage, err: &DomainError) {
        match self.deps.cases.get(case_id).await {
            Ok(Some(mut case)) => {
                case.status = CaseStatus::Failed;
                case.failure_reason = Some(format!("{}: {err}", stage.as_str()));
                case.updated_at = chrono::Utc::now();
                if let Err(update_err) = self.deps.cases.update(&case).await {
                    warn!(
                        case_id = %case_id,
                        error = %update_err,
                        "failed to mark case failed"
                    );
                }
            }
            Ok(None) | Err(_) => {
                warn!(case_id = %case_id, "failed case could not be loaded for bookkeeping");
            }
        }
    }

    pub(crate) async fn load_case(&self, case_id: &str) -> DomainResult<Case> {
        self.deps
            .cases
            .get(case_id)
            .await?
            .ok_or_else(|| DomainError::CaseNotFound(case_id.to_string()))
    }

    pub(crate) async fn require_budget(&self, case_id: &str) -> DomainResult<Budget> {
        self.deps
            .budgets
            .get(case_id)
            .await?
            .ok_or_else(|| DomainError::BudgetNotFound(case_id.to_string()))
    }

    pub(crate) fn steps(&self) -> Arc<dyn StepRepository> {
        Arc::clone(&self.deps.steps)
    }

    pub(crate) fn cases(&self) -> Arc<dyn CaseRepository> {
        Arc::clone(&self.deps.cases)
    }
}

fn elapsed_ms(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}
