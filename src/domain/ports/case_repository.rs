use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Case, CaseStatus};

/// Filters for querying cases
#[derive(Default, Debug, Clone)]
pub struct CaseFilters {
    pub status: Option<CaseStatus>,
    pub user_id: Option<String>,
    pub limit: Option<i64>,
}

/// Repository port for the case ledger.
#[async_trait]
pub trait CaseRepository: Send + Sync {
    /// Atomically insert the case if no row with its id exists.
    ///
    /// Returns `true` when this call created the row. This is the sole
    /// concurrency guard against double-creation: it must be an atomic
    /// insert-or-detect, never a read-then-write.
    async fn try_create(&self, case: &Case) -> DomainResult<bool>;

    /// Get a case by its caller-supplied id.
    async fn get(&self, id: &str) -> DomainResult<Option<Case>>;

    /// Update an existing case. Cases are never deleted.
    async fn update(&self, case: &Case) -> DomainResult<()>;

    /// List cases with optional filters, newest first.
    async fn list(&self, filters: CaseFilters) -> DomainResult<Vec<Case>>;
}
