//! Customer verification loop.
//!
//! Handles the customer's response to an outstanding verification
//! session. CONFIRMED and DISPUTED close the session, stamp the case,
//! and re-enter the orchestrator so the verdict synthesizer can account
//! for the outcome. DISPUTED additionally pins the case for human
//! review; no later automated verdict clears that flag.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    hash_token, PipelineStage, StageStep, StepAction, VerificationStatus,
};
use crate::domain::ports::VerificationRepository;

use super::orchestrator::{NextStage, Orchestrator};

/// A customer's answer to a verification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The customer confirms the transaction is legitimate.
    Confirmed,
    /// The customer disputes the transaction.
    Disputed,
}

impl VerificationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Disputed => "disputed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "confirmed" | "confirm" => Some(Self::Confirmed),
            "disputed" | "dispute" => Some(Self::Disputed),
            _ => None,
        }
    }

    fn status(self) -> VerificationStatus {
        match self {
            Self::Confirmed => VerificationStatus::Confirmed,
            Self::Disputed => VerificationStatus::Disputed,
        }
    }
}

/// Result of processing a verification response.
#[derive(Debug, Clone)]
pub struct VerificationResolution {
    pub case_id: String,
    pub status: VerificationStatus,
    pub human_review: bool,
}

/// Processes customer verification responses.
pub struct VerificationService {
    verifications: Arc<dyn VerificationRepository>,
    orchestrator: Orchestrator,
}

impl VerificationService {
    pub fn new(verifications: Arc<dyn VerificationRepository>, orchestrator: Orchestrator) -> Self {
        Self {
            verifications,
            orchestrator,
        }
    }

    /// Apply a customer's response, identified by the raw session
    /// token. Expiry is enforced here, at read time.
    pub async fn respond(
        &self,
        token: &str,
        outcome: VerificationOutcome,
    ) -> DomainResult<VerificationResolution> {
        let mut session = self
            .verifications
            .find_by_token_hash(&hash_token(token))
            .await?
            .ok_or(DomainError::VerificationSessionNotFound)?;

        if session.status.is_terminal() {
            return Err(DomainError::ValidationFailed(
                "verification session already closed".to_string(),
            ));
        }

        let now = Utc::now();
        if session.is_expired(now) {
            session.status = VerificationStatus::Expired;
            session.closed_at = Some(now);
            self.verifications.update(&session).await?;

            let mut case = self.orchestrator.load_case(&session.case_id).await?;
            case.verification_status = Some(VerificationStatus::Expired);
            case.updated_at = now;
            self.orchestrator.cases().update(&case).await?;

            return Err(DomainError::VerificationExpired(session.case_id));
        }

        let status = outcome.status();
        session.status = status;
        session.identity_verified = true;
        session.closed_at = Some(now);
        self.verifications.update(&session).await?;

        let mut case = self.orchestrator.load_case(&session.case_id).await?;
        case.verification_status = Some(status);
        if outcome == VerificationOutcome::Disputed {
            // Fatal to automation, not to the process.
            case.human_review = true;
        }
        case.context.insert(
            "verification_outcome".to_string(),
            serde_json::json!(outcome.as_str()),
        );
        case.mark_visited(PipelineStage::Verification);
        self.orchestrator.cases().update(&case).await?;

        let step = StageStep::new(
            &case.id,
            PipelineStage::Verification,
            StepAction::VerificationResolved,
        )
        .with_output(serde_json::json!({
            "outcome": outcome.as_str(),
            "human_review": case.human_review,
        }));
        self.orchestrator.steps().append(step).await?;

        info!(
            case_id = %case.id,
            outcome = outcome.as_str(),
            human_review = case.human_review,
            "verification resolved; re-synthesizing verdict"
        );

        // Re-enter the pipeline so the synthesizer sees the outcome.
        self.orchestrator.dispatch(
            &case.id,
            NextStage::Evidence {
                purchases: Vec::new(),
                verification_outcome: Some(outcome.as_str().to_string()),
            },
        );

        Ok(VerificationResolution {
            case_id: case.id,
            status,
            human_review: case.human_review,
        })
    }
}
