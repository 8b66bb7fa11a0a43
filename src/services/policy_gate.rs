//! Policy gate stage: deterministic threshold routing.
//!
//! A pure function of the risk score against the configured threshold.
//! No external calls; the same score and threshold always produce the
//! same route. Confidence is always 1.0.

use serde::{Deserialize, Serialize};

/// Where the gate routes the case next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyRoute {
    /// Below threshold: advisory approval, straight to verdict
    /// synthesis with an empty purchase list.
    FastPath,
    /// At or above threshold: escalate to the VOI selector.
    Escalate,
}

impl PolicyRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FastPath => "fast_path",
            Self::Escalate => "escalate",
        }
    }
}

/// The gate's recorded outcome; persisted as the stage step output and
/// read back by the recovery planner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyOutcome {
    pub route: PolicyRoute,
    pub risk_score: f64,
    pub threshold: f64,
    /// Rule application is not probabilistic.
    pub confidence: f64,
}

/// Evaluate the gate.
pub fn evaluate(risk_score: f64, threshold: f64) -> PolicyOutcome {
    let route = if risk_score < threshold {
        PolicyRoute::FastPath
    } else {
        PolicyRoute::Escalate
    };

    PolicyOutcome {
        route,
        risk_score,
        threshold,
        confidence: 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_threshold_fast_paths() {
        let outcome = evaluate(0.1, 0.3);
        assert_eq!(outcome.route, PolicyRoute::FastPath);
        assert!((outcome.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_at_threshold_escalates() {
        assert_eq!(evaluate(0.3, 0.3).route, PolicyRoute::Escalate);
        assert_eq!(evaluate(0.9, 0.3).route, PolicyRoute::Escalate);
    }

    #[test]
    fn test_deterministic() {
        for _ in 0..10 {
            assert_eq!(evaluate(0.29, 0.3).route, PolicyRoute::FastPath);
        }
    }

    #[test]
    fn test_outcome_round_trips_through_json() {
        let outcome = evaluate(0.5, 0.3);
        let json = serde_json::to_value(outcome).unwrap();
        let parsed: PolicyOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.route, PolicyRoute::Escalate);
    }
}
