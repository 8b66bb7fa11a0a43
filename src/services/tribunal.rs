//! Adversarial tribunal stage.
//!
//! Two independent, order-independent argument generators run in
//! parallel over the same evidence bundle: one constrained to argue
//! only the APPROVE position, one only the DENY position. A third
//! synthesis call is the only one permitted to see both sides and may
//! rule either way.

use std::sync::Arc;
use tracing::info;

use crate::domain::errors::DomainResult;
use crate::domain::models::Case;
use crate::domain::ports::{
    ArgumentRequest, ArgumentSide, EvidenceItem, ReasoningGateway, TribunalRequest,
    TribunalSynthesis,
};

use super::evidence::case_brief;

/// Runs the two-sided argument-then-verdict pattern.
pub struct Tribunal {
    reasoning: Arc<dyn ReasoningGateway>,
}

impl Tribunal {
    pub fn new(reasoning: Arc<dyn ReasoningGateway>) -> Self {
        Self { reasoning }
    }

    /// Deliberate over the case's evidence bundle.
    pub async fn deliberate(
        &self,
        case: &Case,
        evidence: Vec<EvidenceItem>,
    ) -> DomainResult<TribunalSynthesis> {
        let brief = case_brief(case);

        let defense_request = ArgumentRequest {
            side: ArgumentSide::Defense,
            case: brief.clone(),
            evidence: evidence.clone(),
        };
        let prosecution_request = ArgumentRequest {
            side: ArgumentSide::Prosecution,
            case: brief.clone(),
            evidence: evidence.clone(),
        };

        // No data dependency between the two sides; run them in
        // parallel and keep them blind to each other.
        let (defense, prosecution) = futures::try_join!(
            self.reasoning.argue_position(&defense_request),
            self.reasoning.argue_position(&prosecution_request),
        )?;

        info!(
            case_id = %case.id,
            defense_confidence = defense.confidence,
            prosecution_confidence = prosecution.confidence,
            "tribunal arguments collected"
        );

        let synthesis_request = TribunalRequest {
            case: brief,
            evidence,
            defense,
            prosecution,
        };

        self.reasoning.synthesize_tribunal(&synthesis_request).await
    }
}
