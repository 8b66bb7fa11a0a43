//! Value-of-information selector stage.
//!
//! For each catalog candidate:
//!
//! ```text
//! expected_loss = amount × risk_score
//! voi           = confidence_gain × expected_loss − price
//! ```
//!
//! `voi > 0` buys, anything else skips. Every candidate's full
//! computation is recorded to the budget's evaluation log regardless of
//! outcome. The emitted purchase list never exceeds the remaining
//! budget: when the cumulative selected cost would, lowest-VOI items
//! are dropped first.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::models::{SignalCatalogEntry, SignalType, VoiDecision, VoiEvaluation};

/// Outcome of one selector run.
#[derive(Debug, Clone)]
pub struct VoiSelection {
    /// Every candidate's computation, in catalog order.
    pub evaluations: Vec<VoiEvaluation>,
    /// The types to buy, highest VOI first.
    pub purchases: Vec<SignalType>,
}

/// Run the selector over the catalog.
pub fn select(
    case_id: &str,
    amount: f64,
    risk_score: f64,
    remaining_budget: f64,
    catalog: &[SignalCatalogEntry],
) -> VoiSelection {
    let expected_loss = amount * risk_score;
    let now = Utc::now();

    let mut evaluations: Vec<VoiEvaluation> = catalog
        .iter()
        .map(|entry| {
            let voi = entry.confidence_gain * expected_loss - entry.price;
            let decision = if voi > 0.0 {
                VoiDecision::Buy
            } else {
                VoiDecision::Skip
            };
            let rationale = match decision {
                VoiDecision::Buy => format!(
                    "expected loss {expected_loss:.2}; gain {:.2} worth {:.2} exceeds price {:.2}",
                    entry.confidence_gain,
                    entry.confidence_gain * expected_loss,
                    entry.price
                ),
                VoiDecision::Skip => format!(
                    "expected loss {expected_loss:.2}; gain {:.2} worth {:.2} does not beat price {:.2}",
                    entry.confidence_gain,
                    entry.confidence_gain * expected_loss,
                    entry.price
                ),
            };

            VoiEvaluation {
                id: Uuid::new_v4(),
                case_id: case_id.to_string(),
                signal_type: entry.signal_type,
                price: entry.price,
                expected_loss,
                confidence_gain: entry.confidence_gain,
                voi,
                decision,
                rationale,
                evaluated_at: now,
            }
        })
        .collect();

    // Enforce the ceiling by construction: drop lowest-VOI buys until
    // the cumulative price fits the remaining budget.
    loop {
        let selected_cost: f64 = evaluations
            .iter()
            .filter(|e| e.decision == VoiDecision::Buy)
            .map(|e| e.price)
            .sum();

        if selected_cost <= remaining_budget {
            break;
        }

        let Some(lowest) = evaluations
            .iter_mut()
            .filter(|e| e.decision == VoiDecision::Buy)
            .min_by(|a, b| a.voi.partial_cmp(&b.voi).unwrap_or(std::cmp::Ordering::Equal))
        else {
            break;
        };

        lowest.decision = VoiDecision::Skip;
        lowest.rationale = format!(
            "{}; dropped: cumulative cost would exceed remaining budget {remaining_budget:.2}",
            lowest.rationale
        );
    }

    let mut purchases: Vec<(SignalType, f64)> = evaluations
        .iter()
        .filter(|e| e.decision == VoiDecision::Buy)
        .map(|e| (e.signal_type, e.voi))
        .collect();
    purchases.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    VoiSelection {
        evaluations,
        purchases: purchases.into_iter().map(|(t, _)| t).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(signal_type: SignalType, price: f64, confidence_gain: f64) -> SignalCatalogEntry {
        SignalCatalogEntry {
            signal_type,
            price,
            confidence_gain,
        }
    }

    #[test]
    fn test_high_stakes_velocity_buy() {
        // amount=10000, risk=0.8, velocity price=0.10, gain=0.20:
        // expected_loss=8000, voi=1599.90
        let selection = select(
            "txn-1",
            10_000.0,
            0.8,
            25.0,
            &[entry(SignalType::Velocity, 0.10, 0.20)],
        );

        assert_eq!(selection.purchases, vec![SignalType::Velocity]);
        let eval = &selection.evaluations[0];
        assert!((eval.expected_loss - 8_000.0).abs() < 1e-9);
        assert!((eval.voi - 1_599.90).abs() < 1e-9);
        assert_eq!(eval.decision, VoiDecision::Buy);
    }

    #[test]
    fn test_small_amount_network_boundary_is_buy() {
        // amount=5, risk=0.7, network price=0.25, gain=0.15:
        // expected_loss=3.50, voi = 0.15*3.5 - 0.25 = 0.275 > 0 → BUY,
        // despite the small amount.
        let selection = select(
            "txn-1",
            5.0,
            0.7,
            25.0,
            &[entry(SignalType::Network, 0.25, 0.15)],
        );

        let eval = &selection.evaluations[0];
        assert!((eval.expected_loss - 3.5).abs() < 1e-9);
        assert!((eval.voi - 0.275).abs() < 1e-9);
        assert_eq!(eval.decision, VoiDecision::Buy);
        assert_eq!(selection.purchases, vec![SignalType::Network]);
    }

    #[test]
    fn test_zero_voi_is_skip() {
        // gain × expected_loss exactly equals price → voi = 0 → SKIP.
        let selection = select(
            "txn-1",
            100.0,
            0.5,
            25.0,
            &[entry(SignalType::Velocity, 10.0, 0.2)],
        );

        let eval = &selection.evaluations[0];
        assert!(eval.voi.abs() < 1e-9);
        assert_eq!(eval.decision, VoiDecision::Skip);
        assert!(selection.purchases.is_empty());
    }

    #[test]
    fn test_price_above_value_is_skip() {
        let selection = select(
            "txn-1",
            100.0,
            0.1,
            25.0,
            &[entry(SignalType::Network, 5.0, 0.15)],
        );
        assert_eq!(selection.evaluations[0].decision, VoiDecision::Skip);
    }

    #[test]
    fn test_every_candidate_is_recorded() {
        let catalog = vec![
            entry(SignalType::Velocity, 0.10, 0.20),
            entry(SignalType::Network, 500.0, 0.01),
        ];
        let selection = select("txn-1", 1_000.0, 0.5, 25.0, &catalog);

        assert_eq!(selection.evaluations.len(), 2);
        assert_eq!(selection.evaluations[0].decision, VoiDecision::Buy);
        assert_eq!(selection.evaluations[1].decision, VoiDecision::Skip);
        assert!(!selection.evaluations[1].rationale.is_empty());
    }

    #[test]
    fn test_budget_cap_drops_lowest_voi_first() {
        // Both profitable, but only one fits the remaining budget.
        let catalog = vec![
            entry(SignalType::Velocity, 0.60, 0.20),
            entry(SignalType::Network, 0.50, 0.05),
        ];
        let selection = select("txn-1", 1_000.0, 0.8, 1.0, &catalog);

        // Velocity voi = 0.2*800 - 0.6 = 159.4; network voi = 0.05*800 - 0.5 = 39.5.
        // Cumulative price 1.10 > 1.0, so the lower-VOI network drops.
        assert_eq!(selection.purchases, vec![SignalType::Velocity]);
        let network = selection
            .evaluations
            .iter()
            .find(|e| e.signal_type == SignalType::Network)
            .unwrap();
        assert_eq!(network.decision, VoiDecision::Skip);
        assert!(network.rationale.contains("remaining budget"));
    }

    #[test]
    fn test_purchases_ordered_by_voi_descending() {
        let catalog = vec![
            entry(SignalType::Network, 0.25, 0.15),
            entry(SignalType::Velocity, 0.10, 0.20),
        ];
        let selection = select("txn-1", 10_000.0, 0.8, 25.0, &catalog);
        assert_eq!(
            selection.purchases,
            vec![SignalType::Velocity, SignalType::Network]
        );
    }

    proptest! {
        // The buy/skip boundary is exactly voi > 0, for any inputs.
        #[test]
        fn prop_decision_matches_voi_sign(
            amount in 0.0_f64..100_000.0,
            risk in 0.0_f64..1.0,
            price in 0.0_f64..100.0,
            gain in 0.0_f64..1.0,
        ) {
            let selection = select(
                "txn-p",
                amount,
                risk,
                f64::INFINITY,
                &[entry(SignalType::Velocity, price, gain)],
            );
            let eval = &selection.evaluations[0];
            let expected = if gain * (amount * risk) - price > 0.0 {
                VoiDecision::Buy
            } else {
                VoiDecision::Skip
            };
            prop_assert_eq!(eval.decision, expected);
        }

        // The emitted purchase list never exceeds the remaining budget.
        #[test]
        fn prop_purchases_fit_budget(
            remaining in 0.0_f64..2.0,
            amount in 0.0_f64..100_000.0,
            risk in 0.0_f64..1.0,
        ) {
            let catalog = vec![
                entry(SignalType::Velocity, 0.10, 0.20),
                entry(SignalType::Network, 0.25, 0.15),
                entry(SignalType::DeviceFingerprint, 0.18, 0.12),
                entry(SignalType::AccountHistory, 0.15, 0.10),
            ];
            let selection = select("txn-p", amount, risk, remaining, &catalog);
            let total: f64 = selection
                .evaluations
                .iter()
                .filter(|e| e.decision == VoiDecision::Buy)
                .map(|e| e.price)
                .sum();
            prop_assert!(total <= remaining + 1e-9);
        }
    }
}
