//! Per-case budget ledger.
//!
//! One budget per case, with a hard ceiling fixed at intake. Every
//! increment is paired with a confirmed signal purchase; the VOI
//! evaluation log is the audit artifact for why money was or was not
//! spent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::signal::SignalType;

/// Outcome of one value-of-information computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoiDecision {
    Buy,
    Skip,
}

impl VoiDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Skip => "SKIP",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "BUY" => Some(Self::Buy),
            "SKIP" => Some(Self::Skip),
            _ => None,
        }
    }
}

/// One candidate's full VOI computation, recorded regardless of outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiEvaluation {
    /// Row identity.
    pub id: Uuid,
    /// Owning case.
    pub case_id: String,
    /// Candidate evidence type.
    pub signal_type: SignalType,
    /// Quoted price.
    pub price: f64,
    /// `amount × risk_score` at evaluation time.
    pub expected_loss: f64,
    /// Per-type heuristic confidence gain constant.
    pub confidence_gain: f64,
    /// `confidence_gain × expected_loss − price`.
    pub voi: f64,
    /// Buy or skip.
    pub decision: VoiDecision,
    /// Human-readable justification.
    pub rationale: String,
    /// When computed.
    pub evaluated_at: DateTime<Utc>,
}

/// Durable per-case spend tracker with a hard ceiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// Owning case (one-to-one).
    pub case_id: String,
    /// Fixed spend ceiling.
    pub ceiling: f64,
    /// Amount spent so far; never exceeds `ceiling`.
    pub spent: f64,
    /// Spend broken down by signal type.
    pub spend_by_type: HashMap<SignalType, f64>,
    /// Ordered log of VOI evaluations.
    pub evaluations: Vec<VoiEvaluation>,
    /// When created.
    pub created_at: DateTime<Utc>,
    /// When last updated.
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    /// Create a fresh budget with nothing spent.
    pub fn new(case_id: impl Into<String>, ceiling: f64) -> Self {
        let now = Utc::now();
        Self {
            case_id: case_id.into(),
            ceiling,
            spent: 0.0,
            spend_by_type: HashMap::new(),
            evaluations: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Budget still available for purchases.
    pub fn remaining(&self) -> f64 {
        (self.ceiling - self.spent).max(0.0)
    }

    /// Whether a purchase of `cost` fits under the ceiling.
    pub fn can_afford(&self, cost: f64) -> bool {
        self.spent + cost <= self.ceiling
    }
}
