//! Reasoning gateway port.
//!
//! The qualitative judgment calls are opaque: each method sends a
//! structured context and expects a structured verdict back. A
//! malformed response fails closed; callers must not retry silently.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;
use crate::domain::models::{PipelineStage, SignalType, Verdict};

/// Case fields shared with the reasoning service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseBrief {
    pub case_id: String,
    pub amount: f64,
    pub currency: String,
    pub user_id: String,
    pub counterparty_id: Option<String>,
    pub risk_score: Option<f64>,
    pub context: serde_json::Value,
}

/// One piece of purchased evidence included in a judgment request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub signal_type: SignalType,
    pub payload: serde_json::Value,
}

/// A prior stage judgment included for context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorJudgment {
    pub stage: PipelineStage,
    pub verdict: Verdict,
    pub confidence: f64,
    pub reasoning: String,
}

/// Request for a standalone verdict synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictRequest {
    pub case: CaseBrief,
    pub evidence: Vec<EvidenceItem>,
    pub prior_decisions: Vec<PriorJudgment>,
    /// Customer verification outcome, when re-synthesizing after one.
    pub verification_outcome: Option<String>,
}

/// Structured verdict returned by the reasoning service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredVerdict {
    pub decision: Verdict,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub mitigating_factors: Vec<String>,
}

/// Which side a tribunal argument generator is constrained to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentSide {
    /// Argues only the APPROVE position.
    Defense,
    /// Argues only the DENY position.
    Prosecution,
}

impl ArgumentSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Defense => "defense",
            Self::Prosecution => "prosecution",
        }
    }
}

/// Request for a one-sided argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgumentRequest {
    pub side: ArgumentSide,
    pub case: CaseBrief,
    pub evidence: Vec<EvidenceItem>,
}

/// One side's argument brief.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgumentBrief {
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub factors: Vec<String>,
}

/// Request for the tribunal synthesis. The only call permitted to see
/// both sides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TribunalRequest {
    pub case: CaseBrief,
    pub evidence: Vec<EvidenceItem>,
    pub defense: ArgumentBrief,
    pub prosecution: ArgumentBrief,
}

/// The tribunal's synthesized ruling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TribunalSynthesis {
    pub decision: Verdict,
    pub confidence: f64,
    pub reasoning: String,
    pub defense_strength: f64,
    pub prosecution_strength: f64,
    #[serde(default)]
    pub deciding_factors: Vec<String>,
}

/// Port for the external reasoning service.
#[async_trait]
pub trait ReasoningGateway: Send + Sync {
    /// Synthesize a verdict from the assembled evidence bundle.
    async fn synthesize_verdict(&self, request: &VerdictRequest)
        -> DomainResult<StructuredVerdict>;

    /// Generate a one-sided argument for the tribunal.
    async fn argue_position(&self, request: &ArgumentRequest) -> DomainResult<ArgumentBrief>;

    /// Synthesize the tribunal ruling from both arguments.
    async fn synthesize_tribunal(&self, request: &TribunalRequest)
        -> DomainResult<TribunalSynthesis>;
}
