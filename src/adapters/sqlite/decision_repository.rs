//! SQLite implementation of the DecisionRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Decision, PipelineStage, SignalType, Verdict};
use crate::domain::ports::DecisionRepository;

use super::{parse_datetime, parse_json_or_default, parse_uuid};

#[derive(Clone)]
pub struct SqliteDecisionRepository {
    pool: SqlitePool,
}

impl SqliteDecisionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DecisionRepository for SqliteDecisionRepository {
    async fn insert(&self, decision: &Decision) -> DomainResult<()> {
        let risk_json = serde_json::to_string(&decision.risk_factors)?;
        let mitigating_json = serde_json::to_string(&decision.mitigating_factors)?;
        let signals_json = serde_json::to_string(&decision.signals_used)?;

        sqlx::query(
            r#"INSERT INTO decisions (id, case_id, stage, verdict, confidence, reasoning,
               risk_factors, mitigating_factors, signals_used, cost, is_final, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(decision.id.to_string())
        .bind(&decision.case_id)
        .bind(decision.stage.as_str())
        .bind(decision.verdict.as_str())
        .bind(decision.confidence)
        .bind(&decision.reasoning)
        .bind(&risk_json)
        .bind(&mitigating_json)
        .bind(&signals_json)
        .bind(decision.cost)
        .bind(decision.is_final)
        .bind(decision.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_case(&self, case_id: &str) -> DomainResult<Vec<Decision>> {
        let rows: Vec<DecisionRow> = sqlx::query_as(
            "SELECT * FROM decisions WHERE case_id = ? ORDER BY created_at, id",
        )
        .bind(case_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn mark_final(&self, case_id: &str, decision_id: Uuid) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE decisions SET is_final = 0 WHERE case_id = ?")
            .bind(case_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("UPDATE decisions SET is_final = 1 WHERE id = ? AND case_id = ?")
            .bind(decision_id.to_string())
            .bind(case_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::DatabaseError(format!(
                "Decision {decision_id} not found for case {case_id}"
            )));
        }

        tx.commit().await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct DecisionRow {
    id: String,
    case_id: String,
    stage: String,
    verdict: String,
    confidence: f64,
    reasoning: String,
    risk_factors: Option<String>,
    mitigating_factors: Option<String>,
    signals_used: Option<String>,
    cost: f64,
    is_final: bool,
    created_at: String,
}

impl TryFrom<DecisionRow> for Decision {
    type Error = DomainError;

    fn try_from(row: DecisionRow) -> Result<Self, Self::Error> {
        let stage = PipelineStage::from_str(&row.stage).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid stage: {}", row.stage))
        })?;
        let verdict = Verdict::from_str(&row.verdict).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid verdict: {}", row.verdict))
        })?;

        let risk_factors: Vec<String> = parse_json_or_default(row.risk_factors)?;
        let mitigating_factors: Vec<String> = parse_json_or_default(row.mitigating_factors)?;
        let signals_used: Vec<SignalType> = parse_json_or_default(row.signals_used)?;

        Ok(Decision {
            id: parse_uuid(&row.id)?,
            case_id: row.case_id,
            stage,
            verdict,
            confidence: row.confidence,
            reasoning: row.reasoning,
            risk_factors,
            mitigating_factors,
            signals_used,
            cost: row.cost,
            is_final: row.is_final,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}
