//! Append-only stage execution log.
//!
//! One row per stage execution, monotonically numbered per case. The
//! highest step number plus the case's visited-stage set is the sole
//! source of truth for crash recovery. Rows are never mutated after
//! insertion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::case::PipelineStage;

/// What kind of event a step records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepAction {
    /// Case row and budget were created.
    CaseCreated,
    /// A pipeline stage ran to completion.
    StageCompleted,
    /// A stage failed; the case may remain recoverable.
    StageFailed,
    /// The recovery planner resumed the case.
    SystemRecovered,
    /// A customer verification response was processed.
    VerificationResolved,
}

impl StepAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CaseCreated => "CASE_CREATED",
            Self::StageCompleted => "STAGE_COMPLETED",
            Self::StageFailed => "STAGE_FAILED",
            Self::SystemRecovered => "SYSTEM_RECOVERED",
            Self::VerificationResolved => "VERIFICATION_RESOLVED",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CASE_CREATED" => Some(Self::CaseCreated),
            "STAGE_COMPLETED" => Some(Self::StageCompleted),
            "STAGE_FAILED" => Some(Self::StageFailed),
            "SYSTEM_RECOVERED" => Some(Self::SystemRecovered),
            "VERIFICATION_RESOLVED" => Some(Self::VerificationResolved),
            _ => None,
        }
    }
}

/// One stage execution record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageStep {
    /// Row identity.
    pub id: Uuid,
    /// Owning case.
    pub case_id: String,
    /// Monotonic per-case sequence number; assigned on append.
    pub step_number: i64,
    /// Stage that executed.
    pub stage: PipelineStage,
    /// Event tag.
    pub action: StepAction,
    /// Input snapshot.
    pub input: Option<serde_json::Value>,
    /// Output snapshot.
    pub output: Option<serde_json::Value>,
    /// Free-form metadata (failure lists, recovery rule, ...).
    pub metadata: Option<serde_json::Value>,
    /// Wall-clock duration of the stage, when measured.
    pub duration_ms: Option<i64>,
    /// When recorded.
    pub created_at: DateTime<Utc>,
}

impl StageStep {
    /// Build a step record; `step_number` is assigned by the repository
    /// on append.
    pub fn new(case_id: impl Into<String>, stage: PipelineStage, action: StepAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            case_id: case_id.into(),
            step_number: 0,
            stage,
            action,
            input: None,
            output: None,
            metadata: None,
            duration_ms: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_output(mut self, output: serde_json::Value) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: i64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}
