//! Stage judgments.
//!
//! Every stage that reaches a verdict writes a Decision row, not only
//! the final one. Exactly one row per case carries `is_final = true`
//! once the case completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::case::{PipelineStage, Verdict};
use super::signal::SignalType;

/// One judgment emitted by a pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Row identity.
    pub id: Uuid,
    /// Owning case.
    pub case_id: String,
    /// Stage that issued the judgment.
    pub stage: PipelineStage,
    /// The verdict.
    pub verdict: Verdict,
    /// Confidence in [0, 1]. Deterministic stages report 1.0.
    pub confidence: f64,
    /// Rationale text.
    pub reasoning: String,
    /// Factors arguing for denial.
    pub risk_factors: Vec<String>,
    /// Factors arguing for approval.
    pub mitigating_factors: Vec<String>,
    /// Signals consulted for this judgment.
    pub signals_used: Vec<SignalType>,
    /// Cost attributed to this judgment.
    pub cost: f64,
    /// Whether this is the case's final decision.
    pub is_final: bool,
    /// When recorded.
    pub created_at: DateTime<Utc>,
}

impl Decision {
    pub fn new(
        case_id: impl Into<String>,
        stage: PipelineStage,
        verdict: Verdict,
        confidence: f64,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            case_id: case_id.into(),
            stage,
            verdict,
            confidence,
            reasoning: reasoning.into(),
            risk_factors: Vec::new(),
            mitigating_factors: Vec::new(),
            signals_used: Vec::new(),
            cost: 0.0,
            is_final: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_risk_factors(mut self, factors: Vec<String>) -> Self {
        self.risk_factors = factors;
        self
    }

    pub fn with_mitigating_factors(mut self, factors: Vec<String>) -> Self {
        self.mitigating_factors = factors;
        self
    }

    pub fn with_signals(mut self, signals: Vec<SignalType>) -> Self {
        self.signals_used = signals;
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }
}
