//! SQLite implementation of the CaseRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashMap;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Case, CaseStatus, PipelineStage, Verdict, VerificationStatus};
use crate::domain::ports::{CaseFilters, CaseRepository};

use super::{parse_datetime, parse_json_or_default};

#[derive(Clone)]
pub struct SqliteCaseRepository {
    pool: SqlitePool,
}

impl SqliteCaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CaseRepository for SqliteCaseRepository {
    async fn try_create(&self, case: &Case) -> DomainResult<bool> {
        let context_json = serde_json::to_string(&case.context)?;
        let visited_json = serde_json::to_string(&case.stages_visited)?;

        // ON CONFLICT DO NOTHING makes creation an atomic
        // insert-or-detect; rows_affected tells the two apart.
        let result = sqlx::query(
            r#"INSERT INTO cases (id, amount, currency, user_id, counterparty_id, context,
               status, current_stage, stages_visited, risk_score, final_decision,
               decision_confidence, total_cost, verification_required, verification_status,
               human_review, failure_reason, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO NOTHING"#,
        )
        .bind(&case.id)
        .bind(case.amount)
        .bind(&case.currency)
        .bind(&case.user_id)
        .bind(&case.counterparty_id)
        .bind(&context_json)
        .bind(case.status.as_str())
        .bind(case.current_stage.map(|s| s.as_str()))
        .bind(&visited_json)
        .bind(case.risk_score)
        .bind(case.final_decision.map(|v| v.as_str()))
        .bind(case.decision_confidence)
        .bind(case.total_cost)
        .bind(case.verification_required)
        .bind(case.verification_status.map(|s| s.as_str()))
        .bind(case.human_review)
        .bind(&case.failure_reason)
        .bind(case.created_at.to_rfc3339())
        .bind(case.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get(&self, id: &str) -> DomainResult<Option<Case>> {
        let row: Option<CaseRow> = sqlx::query_as("SELECT * FROM cases WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn update(&self, case: &Case) -> DomainResult<()> {
        let context_json = serde_json::to_string(&case.context)?;
        let visited_json = serde_json::to_string(&case.stages_visited)?;

        let result = sqlx::query(
            r#"UPDATE cases SET amount = ?, currency = ?, user_id = ?, counterparty_id = ?,
               context = ?, status = ?, current_stage = ?, stages_visited = ?, risk_score = ?,
               final_decision = ?, decision_confidence = ?, total_cost = ?,
               verification_required = ?, verification_status = ?, human_review = ?,
               failure_reason = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(case.amount)
        .bind(&case.currency)
        .bind(&case.user_id)
        .bind(&case.counterparty_id)
        .bind(&context_json)
        .bind(case.status.as_str())
        .bind(case.current_stage.map(|s| s.as_str()))
        .bind(&visited_json)
        .bind(case.risk_score)
        .bind(case.final_decision.map(|v| v.as_str()))
        .bind(case.decision_confidence)
        .bind(case.total_cost)
        .bind(case.verification_required)
        .bind(case.verification_status.map(|s| s.as_str()))
        .bind(case.human_review)
        .bind(&case.failure_reason)
        .bind(case.updated_at.to_rfc3339())
        .bind(&case.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::CaseNotFound(case.id.clone()));
        }

        Ok(())
    }

    async fn list(&self, filters: CaseFilters) -> DomainResult<Vec<Case>> {
        let mut query = String::from("SELECT * FROM cases WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(status) = &filters.status {
            query.push_str(" AND status = ?");
            bindings.push(status.as_str().to_string());
        }
        if let Some(user_id) = &filters.user_id {
            query.push_str(" AND user_id = ?");
            bindings.push(user_id.clone());
        }

        query.push_str(" ORDER BY created_at DESC");
        if let Some(limit) = filters.limit {
            query.push_str(&format!(" LIMIT {limit}"));
        }

        let mut q = sqlx::query_as::<_, CaseRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<CaseRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct CaseRow {
    id: String,
    amount: f64,
    currency: String,
    user_id: String,
    counterparty_id: Option<String>,
    context: Option<String>,
    status: String,
    current_stage: Option<String>,
    stages_visited: Option<String>,
    risk_score: Option<f64>,
    final_decision: Option<String>,
    decision_confidence: Option<f64>,
    total_cost: f64,
    verification_required: bool,
    verification_status: Option<String>,
    human_review: bool,
    failure_reason: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<CaseRow> for Case {
    type Error = DomainError;

    fn try_from(row: CaseRow) -> Result<Self, Self::Error> {
        let status = CaseStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid status: {}", row.status)))?;

        let current_stage = row
            .current_stage
            .as_deref()
            .map(|s| {
                PipelineStage::from_str(s)
                    .ok_or_else(|| DomainError::SerializationError(format!("Invalid stage: {s}")))
            })
            .transpose()?;

        let final_decision = row
            .final_decision
            .as_deref()
            .map(|s| {
                Verdict::from_str(s)
                    .ok_or_else(|| DomainError::SerializationError(format!("Invalid verdict: {s}")))
            })
            .transpose()?;

        let verification_status = row
            .verification_status
            .as_deref()
            .map(|s| {
                VerificationStatus::from_str(s).ok_or_else(|| {
                    DomainError::SerializationError(format!("Invalid verification status: {s}"))
                })
            })
            .transpose()?;

        let context: HashMap<String, serde_json::Value> = parse_json_or_default(row.context)?;
        let stages_visited: Vec<PipelineStage> = parse_json_or_default(row.stages_visited)?;

        Ok(Case {
            id: row.id,
            amount: row.amount,
            currency: row.currency,
            user_id: row.user_id,
            counterparty_id: row.counterparty_id,
            context,
            status,
            current_stage,
            stages_visited,
            risk_score: row.risk_score,
            final_decision,
            decision_confidence: row.decision_confidence,
            total_cost: row.total_cost,
            verification_required: row.verification_required,
            verification_status,
            human_review: row.human_review,
            failure_reason: row.failure_reason,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}
