use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{PipelineStage, StageStep};

/// Repository port for the append-only step log.
#[async_trait]
pub trait StepRepository: Send + Sync {
    /// Append a step, assigning the next monotonic step number for the
    /// case. Returns the step as persisted. Steps are never mutated.
    async fn append(&self, step: StageStep) -> DomainResult<StageStep>;

    /// All steps for a case in step-number order.
    async fn list_for_case(&self, case_id: &str) -> DomainResult<Vec<StageStep>>;

    /// The most recent step recorded for a given stage of a case, if
    /// any. Recovery reads stage outputs back through this.
    async fn last_for_stage(
        &self,
        case_id: &str,
        stage: PipelineStage,
    ) -> DomainResult<Option<StageStep>>;
}
