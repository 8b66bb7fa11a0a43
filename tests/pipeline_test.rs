//! End-to-end pipeline behavior over scripted gateways.

mod helpers;

use std::collections::HashMap;
use std::sync::atomic::Ordering;

use casegate::domain::models::{CaseInput, CaseStatus, SignalType, Verdict, VerificationStatus};
use casegate::domain::ports::{CaseRepository, DecisionRepository, StepRepository};
use casegate::domain::ports::BudgetRepository;
use casegate::domain::ports::VerificationRepository;

use helpers::{build_pipeline, screening_without_tribunal};

fn input(id: &str, amount: f64, risk_score: f64) -> CaseInput {
    let mut context = HashMap::new();
    context.insert("risk_score".to_string(), serde_json::json!(risk_score));
    CaseInput {
        case_id: id.to_string(),
        amount,
        currency: "USD".to_string(),
        user_id: "user-1".to_string(),
        counterparty_id: Some("merchant-9".to_string()),
        context,
    }
}

#[tokio::test]
async fn test_fast_path_spends_nothing() {
    let pipeline = build_pipeline(screening_without_tribunal()).await;

    // amount=100, risk=0.1 < threshold 0.3: policy gate fast-paths,
    // the buyer runs with an empty purchase list.
    let outcome = pipeline
        .orchestrator
        .submit(input("txn-fast", 100.0, 0.1))
        .await
        .unwrap();
    assert!(!outcome.resumed);
    pipeline.drain().await;

    let case = pipeline.cases().get("txn-fast").await.unwrap().unwrap();
    assert_eq!(case.status, CaseStatus::Completed);
    assert_eq!(case.final_decision, Some(Verdict::Approve));
    assert!(case.total_cost.abs() < f64::EPSILON);

    let budget = pipeline.budgets().get("txn-fast").await.unwrap().unwrap();
    assert!(budget.spent.abs() < f64::EPSILON);
    assert_eq!(pipeline.procurement.call_count(), 0);
}

#[tokio::test]
async fn test_escalated_case_buys_evidence_and_completes() {
    let pipeline = build_pipeline(screening_without_tribunal()).await;

    let outcome = pipeline
        .orchestrator
        .submit(input("txn-esc", 10_000.0, 0.85))
        .await
        .unwrap();
    assert_eq!(outcome.status, CaseStatus::Processing);
    pipeline.drain().await;

    let case = pipeline.cases().get("txn-esc").await.unwrap().unwrap();
    assert_eq!(case.status, CaseStatus::Completed);
    assert!(case.final_decision.is_some());

    // All four catalog signals are profitable at this expected loss.
    let budget = pipeline.budgets().get("txn-esc").await.unwrap().unwrap();
    assert!((budget.spent - 0.68).abs() < 1e-9);
    assert!((case.total_cost - 0.68).abs() < 1e-9);
    assert_eq!(budget.spend_by_type.len(), 4);
    assert_eq!(budget.evaluations.len(), 4);
    assert!(budget.spent <= budget.ceiling);

    // Verdict saw the purchased evidence.
    let seen = pipeline.reasoning.last_evidence_types.lock().unwrap().clone();
    assert_eq!(seen.len(), 4);
}

#[tokio::test]
async fn test_partial_purchase_failure_still_produces_verdict() {
    let pipeline = build_pipeline(screening_without_tribunal()).await;
    pipeline.procurement.fail_type(SignalType::Network);

    pipeline
        .orchestrator
        .submit(input("txn-partial", 10_000.0, 0.85))
        .await
        .unwrap();
    pipeline.drain().await;

    let case = pipeline.cases().get("txn-partial").await.unwrap().unwrap();
    // One failed purchase never fails the case.
    assert_eq!(case.status, CaseStatus::Completed);
    assert!(case.final_decision.is_some());

    let budget = pipeline.budgets().get("txn-partial").await.unwrap().unwrap();
    assert!((budget.spent - 0.43).abs() < 1e-9); // 0.68 minus network's 0.25
    assert!(!budget.spend_by_type.contains_key(&SignalType::Network));

    // The verdict was synthesized from the three successful signals.
    let seen = pipeline.reasoning.last_evidence_types.lock().unwrap().clone();
    assert_eq!(seen.len(), 3);
    assert!(!seen.contains(&SignalType::Network));
}

#[tokio::test]
async fn test_duplicate_submission_is_idempotent() {
    let pipeline = build_pipeline(screening_without_tribunal()).await;

    pipeline
        .orchestrator
        .submit(input("txn-dup", 100.0, 0.1))
        .await
        .unwrap();
    pipeline.drain().await;

    let calls_before = pipeline.reasoning.verdict_calls.load(Ordering::SeqCst);

    let second = pipeline
        .orchestrator
        .submit(input("txn-dup", 100.0, 0.1))
        .await
        .unwrap();
    pipeline.drain().await;

    // Completed case returned unchanged; nothing re-ran.
    assert_eq!(second.status, CaseStatus::Completed);
    assert!(!second.resumed);
    assert_eq!(
        pipeline.reasoning.verdict_calls.load(Ordering::SeqCst),
        calls_before
    );

    let all = pipeline
        .cases()
        .list(casegate::domain::ports::CaseFilters::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_tribunal_supersedes_evidence_verdict() {
    // Default screening: tribunal convenes at amount >= 1000 for
    // escalated cases.
    let pipeline = build_pipeline(casegate::domain::models::ScreeningConfig::default()).await;

    pipeline
        .orchestrator
        .submit(input("txn-tribunal", 5_000.0, 0.85))
        .await
        .unwrap();
    pipeline.drain().await;

    let case = pipeline.cases().get("txn-tribunal").await.unwrap().unwrap();
    assert_eq!(case.status, CaseStatus::Completed);
    // Scripted synthesis denies even though the standalone verdict
    // approves: the tribunal has final authority.
    assert_eq!(case.final_decision, Some(Verdict::Deny));

    assert_eq!(pipeline.reasoning.argument_calls.load(Ordering::SeqCst), 2);
    assert_eq!(pipeline.reasoning.synthesis_calls.load(Ordering::SeqCst), 1);

    // Exactly one final decision row, and it is the tribunal's.
    let decisions = pipeline.decisions().list_for_case("txn-tribunal").await.unwrap();
    let finals: Vec<_> = decisions.iter().filter(|d| d.is_final).collect();
    assert_eq!(finals.len(), 1);
    assert_eq!(
        finals[0].stage,
        casegate::domain::models::PipelineStage::Tribunal
    );
}

#[tokio::test]
async fn test_medium_confidence_requests_verification() {
    let pipeline = build_pipeline(screening_without_tribunal()).await;
    pipeline.reasoning.set_verdict(Verdict::Approve, 0.60);

    pipeline
        .orchestrator
        .submit(input("txn-verify", 200.0, 0.85))
        .await
        .unwrap();
    pipeline.drain().await;

    let case = pipeline.cases().get("txn-verify").await.unwrap().unwrap();
    // Verification augments the outcome; the case still completes.
    assert_eq!(case.status, CaseStatus::Completed);
    assert!(case.verification_required);
    assert_eq!(case.verification_status, Some(VerificationStatus::Pending));

    // The customer was notified with a session token.
    let messages = pipeline.notification.messages.lock().unwrap().clone();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].1.contains("code "));
}

#[tokio::test]
async fn test_notification_failure_does_not_block_session() {
    let pipeline = build_pipeline(screening_without_tribunal()).await;
    pipeline.reasoning.set_verdict(Verdict::Approve, 0.60);
    pipeline
        .notification
        .fail
        .store(true, Ordering::SeqCst);

    pipeline
        .orchestrator
        .submit(input("txn-unsent", 200.0, 0.85))
        .await
        .unwrap();
    pipeline.drain().await;

    let case = pipeline.cases().get("txn-unsent").await.unwrap().unwrap();
    assert_eq!(case.status, CaseStatus::Completed);
    assert!(case.verification_required);

    let session = pipeline
        .verifications()
        .find_open_for_case("txn-unsent")
        .await
        .unwrap()
        .expect("session should exist despite notification failure");
    assert!(!session.notification_sent);
}

#[tokio::test]
async fn test_transient_reasoning_failure_leaves_case_recoverable() {
    let pipeline = build_pipeline(screening_without_tribunal()).await;
    pipeline
        .reasoning
        .fail_next_verdict
        .store(true, Ordering::SeqCst);

    pipeline
        .orchestrator
        .submit(input("txn-outage", 10_000.0, 0.85))
        .await
        .unwrap();
    pipeline.drain().await;

    // The verdict call failed after purchases; the case is still
    // processing, not failed.
    let case = pipeline.cases().get("txn-outage").await.unwrap().unwrap();
    assert_eq!(case.status, CaseStatus::Processing);
    let spent_before = pipeline.budgets().get("txn-outage").await.unwrap().unwrap().spent;
    let purchases_before = pipeline.procurement.call_count();

    // Resubmission recovers; owned signals are reused, not re-bought.
    let outcome = pipeline
        .orchestrator
        .submit(input("txn-outage", 10_000.0, 0.85))
        .await
        .unwrap();
    assert!(outcome.resumed);
    pipeline.drain().await;

    let case = pipeline.cases().get("txn-outage").await.unwrap().unwrap();
    assert_eq!(case.status, CaseStatus::Completed);

    let budget = pipeline.budgets().get("txn-outage").await.unwrap().unwrap();
    assert!((budget.spent - spent_before).abs() < 1e-9);
    assert_eq!(pipeline.procurement.call_count(), purchases_before);
}

#[tokio::test]
async fn test_completed_case_has_decision_and_cost_within_ceiling() {
    let pipeline = build_pipeline(screening_without_tribunal()).await;

    for (id, amount, risk) in [
        ("txn-a", 100.0, 0.1),
        ("txn-b", 10_000.0, 0.85),
        ("txn-c", 5.0, 0.95),
    ] {
        pipeline
            .orchestrator
            .submit(input(id, amount, risk))
            .await
            .unwrap();
    }
    pipeline.drain().await;

    for id in ["txn-a", "txn-b", "txn-c"] {
        let case = pipeline.cases().get(id).await.unwrap().unwrap();
        assert_eq!(case.status, CaseStatus::Completed, "case {id}");
        assert!(case.final_decision.is_some(), "case {id}");

        let budget = pipeline.budgets().get(id).await.unwrap().unwrap();
        assert!(budget.spent <= budget.ceiling, "case {id}");
        assert!((case.total_cost - budget.spent).abs() < 1e-9, "case {id}");
    }
}

#[tokio::test]
async fn test_step_log_is_ordered_and_complete() {
    let pipeline = build_pipeline(screening_without_tribunal()).await;

    pipeline
        .orchestrator
        .submit(input("txn-steps", 100.0, 0.1))
        .await
        .unwrap();
    pipeline.drain().await;

    let steps = pipeline.steps().list_for_case("txn-steps").await.unwrap();
    assert!(steps.len() >= 4); // created + intake + gate + evidence

    // Step numbering is monotonic, starting at 1.
    for (i, step) in steps.iter().enumerate() {
        assert_eq!(step.step_number, i as i64 + 1);
    }

    assert_eq!(
        steps[0].action,
        casegate::domain::models::StepAction::CaseCreated
    );
}
