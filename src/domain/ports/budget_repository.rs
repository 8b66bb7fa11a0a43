use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Budget, SignalType, VoiEvaluation};

/// Repository port for the per-case budget ledger.
#[async_trait]
pub trait BudgetRepository: Send + Sync {
    /// Create the budget paired with a freshly created case.
    async fn create(&self, budget: &Budget) -> DomainResult<()>;

    /// Load a budget with its spend breakdown and evaluation log.
    async fn get(&self, case_id: &str) -> DomainResult<Option<Budget>>;

    /// Atomically record a confirmed purchase: increments `spent` only
    /// if the ceiling holds, appends the per-type breakdown row, and
    /// returns the remaining budget read back after the increment.
    ///
    /// Returns `DomainError::BudgetExceeded` when the increment would
    /// cross the ceiling; the ledger is left untouched in that case.
    async fn record_spend(
        &self,
        case_id: &str,
        signal_type: SignalType,
        amount: f64,
    ) -> DomainResult<f64>;

    /// Append VOI evaluations to the audit log. Every candidate's
    /// computation is recorded regardless of its buy/skip outcome.
    async fn append_evaluations(&self, evaluations: &[VoiEvaluation]) -> DomainResult<()>;
}
