//! Domain errors for the casegate screening system.

use thiserror::Error;

use super::models::PipelineStage;

/// Domain-level errors that can occur while screening a case.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Case not found: {0}")]
    CaseNotFound(String),

    #[error("Budget not found for case: {0}")]
    BudgetNotFound(String),

    #[error("Verification session not found")]
    VerificationSessionNotFound,

    #[error("Verification session expired for case {0}")]
    VerificationExpired(String),

    #[error("Case {case_id} is in state {status} and cannot be processed")]
    CorruptedCase { case_id: String, status: String },

    #[error("Case {case_id} is unrecoverable: {reason}")]
    Unrecoverable { case_id: String, reason: String },

    #[error("Budget ceiling exceeded for case {case_id}: spend of {attempted} over remaining {remaining}")]
    BudgetExceeded {
        case_id: String,
        attempted: f64,
        remaining: f64,
    },

    #[error("Reasoning gateway failure at {stage:?}: {reason}")]
    ReasoningFailed { stage: PipelineStage, reason: String },

    #[error("Signal purchase failed: {0}")]
    ProcurementFailed(String),

    #[error("Notification delivery failed: {0}")]
    NotificationFailed(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Whether this error is a transient external failure: the case
    /// stays `Processing` and is eligible for recovery retry. Anything
    /// else is structural and fails the stage for good.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ReasoningFailed { .. }
                | Self::ProcurementFailed(_)
                | Self::NotificationFailed(_)
                | Self::DatabaseError(_)
        )
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
