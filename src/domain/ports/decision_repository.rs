use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Decision;

/// Repository port for stage judgments.
#[async_trait]
pub trait DecisionRepository: Send + Sync {
    /// Insert a judgment row.
    async fn insert(&self, decision: &Decision) -> DomainResult<()>;

    /// All judgments for a case, oldest first.
    async fn list_for_case(&self, case_id: &str) -> DomainResult<Vec<Decision>>;

    /// Mark `decision_id` as the case's final decision, clearing the
    /// flag on every other row for the case first. Exactly one row per
    /// completed case carries the flag.
    async fn mark_final(&self, case_id: &str, decision_id: Uuid) -> DomainResult<()>;
}
