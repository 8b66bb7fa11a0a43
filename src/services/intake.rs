//! Intake stage: case admission and risk scoring.
//!
//! The score is a deterministic heuristic over the transaction
//! features carried in the case context. An upstream anomaly model may
//! pre-compute a score and pass it as `risk_score` in the context; the
//! heuristic is the fallback when none is supplied.

use crate::domain::models::Case;

/// Result of intake risk assessment.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RiskAssessment {
    /// Risk score in [0, 1].
    pub score: f64,
    /// Factors that contributed to the score.
    pub factors: Vec<String>,
}

/// Amount above which a transaction counts as high-value.
const HIGH_AMOUNT: f64 = 5_000.0;

/// Account age below which an account counts as young.
const YOUNG_ACCOUNT_DAYS: f64 = 30.0;

/// Assess a case's risk from its context features.
pub fn assess(case: &Case) -> RiskAssessment {
    let mut factors = Vec::new();

    // An upstream model's score wins outright when present.
    if let Some(score) = case.context_number("risk_score") {
        let score = score.clamp(0.0, 1.0);
        factors.push(format!("model risk score {score:.2}"));
        return RiskAssessment { score, factors };
    }

    let mut score: f64 = 0.05;

    let amount_weight = (case.amount / 10_000.0).min(1.0) * 0.30;
    score += amount_weight;
    if case.amount > HIGH_AMOUNT {
        factors.push(format!("high amount ({:.2} {})", case.amount, case.currency));
    }

    if case.context_flag("new_account") {
        score += 0.20;
        factors.push("new account".to_string());
    }

    if case.context_flag("international_transfer") {
        score += 0.15;
        factors.push("international transfer".to_string());
    }

    if case.context_flag("unusual_hour") {
        score += 0.10;
        factors.push("unusual hour".to_string());
    }

    let flag_count = case.context_number("risk_flag_count").unwrap_or(0.0);
    if flag_count > 0.0 {
        score += (flag_count * 0.05).min(0.20);
        if flag_count > 2.0 {
            factors.push(format!("multiple risk flags ({flag_count})"));
        }
    }

    if let Some(age_days) = case.context_number("account_age_days") {
        if age_days < YOUNG_ACCOUNT_DAYS {
            score += 0.10;
            factors.push(format!("account only {age_days} days old"));
        }
    }

    RiskAssessment {
        score: score.clamp(0.0, 1.0),
        factors,
    }
}
