//! Customer verification loop behavior.

mod helpers;

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use casegate::domain::errors::DomainError;
use casegate::domain::models::{CaseInput, CaseStatus, Verdict, VerificationStatus};
use casegate::domain::ports::{CaseRepository, VerificationRepository};
use casegate::services::{VerificationOutcome, VerificationService};

use helpers::gateways::extract_token;
use helpers::{build_pipeline, screening_without_tribunal, TestPipeline};

fn input(id: &str) -> CaseInput {
    let mut context = HashMap::new();
    context.insert("risk_score".to_string(), serde_json::json!(0.85));
    CaseInput {
        case_id: id.to_string(),
        amount: 200.0,
        currency: "USD".to_string(),
        user_id: "user-1".to_string(),
        counterparty_id: None,
        context,
    }
}

/// Drive a case into the pending-verification state and return the
/// delivered session token.
async fn escalate_to_verification(pipeline: &TestPipeline, id: &str) -> String {
    pipeline.reasoning.set_verdict(Verdict::Approve, 0.60);
    pipeline.orchestrator.submit(input(id)).await.unwrap();
    pipeline.drain().await;

    let case = pipeline.cases().get(id).await.unwrap().unwrap();
    assert_eq!(case.verification_status, Some(VerificationStatus::Pending));

    let messages = pipeline.notification.messages.lock().unwrap();
    let (_, message) = messages.last().expect("customer should have been notified");
    extract_token(message)
}

fn service(pipeline: &TestPipeline) -> VerificationService {
    VerificationService::new(
        Arc::new(pipeline.verifications()),
        pipeline.orchestrator.clone(),
    )
}

#[tokio::test]
async fn test_disputed_sets_human_review_and_never_clears_it() {
    let pipeline = build_pipeline(screening_without_tribunal()).await;
    let token = escalate_to_verification(&pipeline, "txn-v1").await;

    // The re-synthesis after the dispute approves; the review flag
    // must survive it.
    pipeline.reasoning.set_verdict(Verdict::Approve, 0.95);

    let resolution = service(&pipeline)
        .respond(&token, VerificationOutcome::Disputed)
        .await
        .unwrap();
    pipeline.drain().await;

    assert!(resolution.human_review);
    assert_eq!(resolution.status, VerificationStatus::Disputed);

    let case = pipeline.cases().get("txn-v1").await.unwrap().unwrap();
    assert_eq!(case.status, CaseStatus::Completed);
    assert_eq!(case.verification_status, Some(VerificationStatus::Disputed));
    assert!(case.human_review, "a dispute never silently resolves");

    // The synthesizer saw the dispute.
    assert_eq!(
        pipeline
            .reasoning
            .last_verification_outcome
            .lock()
            .unwrap()
            .as_deref(),
        Some("disputed")
    );
}

#[tokio::test]
async fn test_confirmed_resynthesizes_without_review_flag() {
    let pipeline = build_pipeline(screening_without_tribunal()).await;
    let token = escalate_to_verification(&pipeline, "txn-v2").await;

    let calls_before = pipeline.reasoning.verdict_calls.load(Ordering::SeqCst);
    pipeline.reasoning.set_verdict(Verdict::Approve, 0.95);

    let resolution = service(&pipeline)
        .respond(&token, VerificationOutcome::Confirmed)
        .await
        .unwrap();
    pipeline.drain().await;

    assert!(!resolution.human_review);

    let case = pipeline.cases().get("txn-v2").await.unwrap().unwrap();
    assert_eq!(case.status, CaseStatus::Completed);
    assert_eq!(case.verification_status, Some(VerificationStatus::Confirmed));
    assert!(!case.human_review);
    assert_eq!(case.final_decision, Some(Verdict::Approve));

    // One more synthesis ran with the outcome injected.
    assert_eq!(
        pipeline.reasoning.verdict_calls.load(Ordering::SeqCst),
        calls_before + 1
    );
}

#[tokio::test]
async fn test_unknown_token_is_rejected() {
    let pipeline = build_pipeline(screening_without_tribunal()).await;
    escalate_to_verification(&pipeline, "txn-v3").await;

    let result = service(&pipeline)
        .respond("not-a-token", VerificationOutcome::Confirmed)
        .await;
    assert!(matches!(
        result,
        Err(DomainError::VerificationSessionNotFound)
    ));
}

#[tokio::test]
async fn test_closed_session_rejects_second_response() {
    let pipeline = build_pipeline(screening_without_tribunal()).await;
    let token = escalate_to_verification(&pipeline, "txn-v4").await;

    let svc = service(&pipeline);
    svc.respond(&token, VerificationOutcome::Confirmed)
        .await
        .unwrap();
    pipeline.drain().await;

    let result = svc.respond(&token, VerificationOutcome::Disputed).await;
    assert!(matches!(result, Err(DomainError::ValidationFailed(_))));
}

#[tokio::test]
async fn test_expired_session_is_marked_at_read_time() {
    use casegate::domain::models::{Case, VerificationChannel, VerificationSession};

    let pipeline = build_pipeline(screening_without_tribunal()).await;

    // Seed a case with a session that already lapsed.
    let case = Case::new(input("txn-v5"));
    assert!(pipeline.cases().try_create(&case).await.unwrap());

    let (mut session, token) = VerificationSession::new(
        "txn-v5",
        VerificationChannel::Sms,
        chrono::Duration::minutes(30),
    );
    session.expires_at = chrono::Utc::now() - chrono::Duration::minutes(1);
    pipeline.verifications().insert(&session).await.unwrap();

    let result = service(&pipeline)
        .respond(&token, VerificationOutcome::Confirmed)
        .await;
    assert!(matches!(result, Err(DomainError::VerificationExpired(_))));

    // Both the session and the case record the expiry.
    let session = pipeline
        .verifications()
        .find_by_token_hash(&casegate::domain::models::hash_token(&token))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, VerificationStatus::Expired);

    let case = pipeline.cases().get("txn-v5").await.unwrap().unwrap();
    assert_eq!(case.verification_status, Some(VerificationStatus::Expired));
}
