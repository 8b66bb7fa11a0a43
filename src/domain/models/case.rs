//! Case domain model.
//!
//! A case is one financial transaction under fraud screening. It moves
//! through the stage pipeline exactly once; crash recovery replays the
//! pipeline position from `stages_visited`, never from timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::verification::VerificationStatus;

/// Lifecycle status of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    /// Pipeline is running (or crashed mid-run and is recoverable).
    Processing,
    /// A final decision has been recorded.
    Completed,
    /// A structural failure stopped the pipeline; manual intervention required.
    Failed,
}

impl Default for CaseStatus {
    fn default() -> Self {
        Self::Processing
    }
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "processing" => Some(Self::Processing),
            "completed" | "complete" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Final call on a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Approve,
    Deny,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "APPROVE",
            Self::Deny => "DENY",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "APPROVE" => Some(Self::Approve),
            "DENY" => Some(Self::Deny),
            _ => None,
        }
    }
}

/// One named step of the screening pipeline.
///
/// The visited-stage set built from this enum is the canonical progress
/// marker for crash recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Case admission and risk scoring.
    Intake,
    /// Deterministic threshold routing.
    PolicyGate,
    /// Value-of-information evidence selection.
    VoiSelection,
    /// Paid evidence purchase and verdict synthesis.
    EvidencePurchase,
    /// Two-sided argument plus synthesis for high-stakes cases.
    Tribunal,
    /// Customer verification loop.
    Verification,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intake => "intake",
            Self::PolicyGate => "policy_gate",
            Self::VoiSelection => "voi_selection",
            Self::EvidencePurchase => "evidence_purchase",
            Self::Tribunal => "tribunal",
            Self::Verification => "verification",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "intake" => Some(Self::Intake),
            "policy_gate" => Some(Self::PolicyGate),
            "voi_selection" => Some(Self::VoiSelection),
            "evidence_purchase" => Some(Self::EvidencePurchase),
            "tribunal" => Some(Self::Tribunal),
            "verification" => Some(Self::Verification),
            _ => None,
        }
    }
}

/// Caller-supplied input for case creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseInput {
    /// Globally unique, caller-supplied case identifier.
    pub case_id: String,
    /// Transaction amount.
    pub amount: f64,
    /// ISO currency code.
    pub currency: String,
    /// Subject user identifier.
    pub user_id: String,
    /// Counterparty identifier, if known.
    pub counterparty_id: Option<String>,
    /// Free-form context map (account age, transfer flags, ...).
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
}

/// A financial transaction under fraud screening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    /// Caller-supplied identifier; created exactly once.
    pub id: String,
    /// Transaction amount.
    pub amount: f64,
    /// ISO currency code.
    pub currency: String,
    /// Subject user identifier.
    pub user_id: String,
    /// Counterparty identifier, if known.
    pub counterparty_id: Option<String>,
    /// Free-form context map, mutated as stages run.
    pub context: HashMap<String, serde_json::Value>,
    /// Lifecycle status.
    pub status: CaseStatus,
    /// Stage currently executing (or last executed).
    pub current_stage: Option<PipelineStage>,
    /// Ordered list of stages that have completed.
    pub stages_visited: Vec<PipelineStage>,
    /// Risk score in [0, 1], recorded by intake.
    pub risk_score: Option<f64>,
    /// Final decision; `status = Completed` implies this is set.
    pub final_decision: Option<Verdict>,
    /// Confidence of the final decision, in [0, 1].
    pub decision_confidence: Option<f64>,
    /// Cumulative cost of purchased signals.
    pub total_cost: f64,
    /// Whether a customer verification was required.
    pub verification_required: bool,
    /// Latest verification session status, if any.
    pub verification_status: Option<VerificationStatus>,
    /// Escalation flag: a human must review this case.
    pub human_review: bool,
    /// Why the case failed, when `status = Failed`.
    pub failure_reason: Option<String>,
    /// When created.
    pub created_at: DateTime<Utc>,
    /// When last updated.
    pub updated_at: DateTime<Utc>,
}

impl Case {
    /// Create a new case in `Processing` state from caller input.
    pub fn new(input: CaseInput) -> Self {
        let now = Utc::now();
        Self {
            id: input.case_id,
            amount: input.amount,
            currency: input.currency,
            user_id: input.user_id,
            counterparty_id: input.counterparty_id,
            context: input.context,
            status: CaseStatus::Processing,
            current_stage: None,
            stages_visited: Vec::new(),
            risk_score: None,
            final_decision: None,
            decision_confidence: None,
            total_cost: 0.0,
            verification_required: false,
            verification_status: None,
            human_review: false,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `stage` has completed for this case.
    pub fn has_visited(&self, stage: PipelineStage) -> bool {
        self.stages_visited.contains(&stage)
    }

    /// Record a completed stage. Idempotent: re-running a stage during
    /// recovery does not duplicate the entry.
    pub fn mark_visited(&mut self, stage: PipelineStage) {
        if !self.has_visited(stage) {
            self.stages_visited.push(stage);
        }
        self.current_stage = Some(stage);
        self.updated_at = Utc::now();
    }

    /// Read a boolean context flag, treating absence as false.
    pub fn context_flag(&self, key: &str) -> bool {
        self.context
            .get(key)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// Read a numeric context field.
    pub fn context_number(&self, key: &str) -> Option<f64> {
        self.context.get(key).and_then(serde_json::Value::as_f64)
    }

    /// Validate the invariant `Completed ⇒ final_decision != null`.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Case id cannot be empty".to_string());
        }
        if self.amount < 0.0 {
            return Err("Case amount cannot be negative".to_string());
        }
        if self.status == CaseStatus::Completed && self.final_decision.is_none() {
            return Err("Completed case must carry a final decision".to_string());
        }
        Ok(())
    }
}
