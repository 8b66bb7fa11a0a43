//! SQLite implementation of the StepRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{PipelineStage, StageStep, StepAction};
use crate::domain::ports::StepRepository;

use super::{parse_datetime, parse_optional_json, parse_uuid};

#[derive(Clone)]
pub struct SqliteStepRepository {
    pool: SqlitePool,
}

impl SqliteStepRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StepRepository for SqliteStepRepository {
    async fn append(&self, mut step: StageStep) -> DomainResult<StageStep> {
        let input_json = step.input.as_ref().map(serde_json::to_string).transpose()?;
        let output_json = step.output.as_ref().map(serde_json::to_string).transpose()?;
        let metadata_json = step
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        // The MAX+1 subquery runs inside the INSERT, so numbering never
        // regresses even under concurrent appends; the UNIQUE
        // constraint backstops it.
        sqlx::query(
            r#"INSERT INTO stage_steps (id, case_id, step_number, stage, action, input, output,
               metadata, duration_ms, created_at)
               VALUES (?1, ?2,
                 (SELECT COALESCE(MAX(step_number), 0) + 1 FROM stage_steps WHERE case_id = ?2),
                 ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
        )
        .bind(step.id.to_string())
        .bind(&step.case_id)
        .bind(step.stage.as_str())
        .bind(step.action.as_str())
        .bind(&input_json)
        .bind(&output_json)
        .bind(&metadata_json)
        .bind(step.duration_ms)
        .bind(step.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let (step_number,): (i64,) =
            sqlx::query_as("SELECT step_number FROM stage_steps WHERE id = ?")
                .bind(step.id.to_string())
                .fetch_one(&self.pool)
                .await?;

        step.step_number = step_number;
        Ok(step)
    }

    async fn list_for_case(&self, case_id: &str) -> DomainResult<Vec<StageStep>> {
        let rows: Vec<StepRow> = sqlx::query_as(
            "SELECT * FROM stage_steps WHERE case_id = ? ORDER BY step_number",
        )
        .bind(case_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn last_for_stage(
        &self,
        case_id: &str,
        stage: PipelineStage,
    ) -> DomainResult<Option<StageStep>> {
        let row: Option<StepRow> = sqlx::query_as(
            r#"SELECT * FROM stage_steps WHERE case_id = ? AND stage = ?
               ORDER BY step_number DESC LIMIT 1"#,
        )
        .bind(case_id)
        .bind(stage.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct StepRow {
    id: String,
    case_id: String,
    step_number: i64,
    stage: String,
    action: String,
    input: Option<String>,
    output: Option<String>,
    metadata: Option<String>,
    duration_ms: Option<i64>,
    created_at: String,
}

impl TryFrom<StepRow> for StageStep {
    type Error = DomainError;

    fn try_from(row: StepRow) -> Result<Self, Self::Error> {
        let stage = PipelineStage::from_str(&row.stage).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid stage: {}", row.stage))
        })?;
        let action = StepAction::from_str(&row.action).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid action: {}", row.action))
        })?;

        Ok(StageStep {
            id: parse_uuid(&row.id)?,
            case_id: row.case_id,
            step_number: row.step_number,
            stage,
            action,
            input: parse_optional_json(row.input)?,
            output: parse_optional_json(row.output)?,
            metadata: parse_optional_json(row.metadata)?,
            duration_ms: row.duration_ms,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}
