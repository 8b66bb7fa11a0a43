//! SQLite implementation of the BudgetRepository.
//!
//! The spend increment is guarded in SQL (`spent + ? <= ceiling`) so
//! the ceiling holds even when recovery re-triggers a stage that is
//! still running concurrently.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Budget, SignalType, VoiDecision, VoiEvaluation};
use crate::domain::ports::BudgetRepository;

use super::{parse_datetime, parse_uuid};

#[derive(Clone)]
pub struct SqliteBudgetRepository {
    pool: SqlitePool,
}

impl SqliteBudgetRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BudgetRepository for SqliteBudgetRepository {
    async fn create(&self, budget: &Budget) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO budgets (case_id, ceiling, spent, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(&budget.case_id)
        .bind(budget.ceiling)
        .bind(budget.spent)
        .bind(budget.created_at.to_rfc3339())
        .bind(budget.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, case_id: &str) -> DomainResult<Option<Budget>> {
        let row: Option<BudgetRow> = sqlx::query_as("SELECT * FROM budgets WHERE case_id = ?")
            .bind(case_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let spend_rows: Vec<(String, f64)> = sqlx::query_as(
            "SELECT signal_type, SUM(amount) FROM budget_spend WHERE case_id = ? GROUP BY signal_type",
        )
        .bind(case_id)
        .fetch_all(&self.pool)
        .await?;

        let mut spend_by_type = HashMap::new();
        for (type_str, amount) in spend_rows {
            let signal_type = SignalType::from_str(&type_str).ok_or_else(|| {
                DomainError::SerializationError(format!("Invalid signal type: {type_str}"))
            })?;
            spend_by_type.insert(signal_type, amount);
        }

        let eval_rows: Vec<EvaluationRow> = sqlx::query_as(
            "SELECT * FROM voi_evaluations WHERE case_id = ? ORDER BY evaluated_at, id",
        )
        .bind(case_id)
        .fetch_all(&self.pool)
        .await?;

        let evaluations = eval_rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(Some(Budget {
            case_id: row.case_id,
            ceiling: row.ceiling,
            spent: row.spent,
            spend_by_type,
            evaluations,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        }))
    }

    async fn record_spend(
        &self,
        case_id: &str,
        signal_type: SignalType,
        amount: f64,
    ) -> DomainResult<f64> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"UPDATE budgets SET spent = spent + ?1, updated_at = ?2
               WHERE case_id = ?3 AND spent + ?1 <= ceiling"#,
        )
        .bind(amount)
        .bind(&now)
        .bind(case_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish a missing budget from a ceiling violation.
            let row: Option<(f64, f64)> =
                sqlx::query_as("SELECT ceiling, spent FROM budgets WHERE case_id = ?")
                    .bind(case_id)
                    .fetch_optional(&self.pool)
                    .await?;
            return match row {
                None => Err(DomainError::BudgetNotFound(case_id.to_string())),
                Some((ceiling, spent)) => Err(DomainError::BudgetExceeded {
                    case_id: case_id.to_string(),
                    attempted: amount,
                    remaining: (ceiling - spent).max(0.0),
                }),
            };
        }

        sqlx::query(
            r#"INSERT INTO budget_spend (id, case_id, signal_type, amount, recorded_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(case_id)
        .bind(signal_type.as_str())
        .bind(amount)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let (ceiling, spent): (f64, f64) =
            sqlx::query_as("SELECT ceiling, spent FROM budgets WHERE case_id = ?")
                .bind(case_id)
                .fetch_one(&self.pool)
                .await?;

        Ok((ceiling - spent).max(0.0))
    }

    async fn append_evaluations(&self, evaluations: &[VoiEvaluation]) -> DomainResult<()> {
        for eval in evaluations {
            sqlx::query(
                r#"INSERT INTO voi_evaluations (id, case_id, signal_type, price, expected_loss,
                   confidence_gain, voi, decision, rationale, evaluated_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(eval.id.to_string())
            .bind(&eval.case_id)
            .bind(eval.signal_type.as_str())
            .bind(eval.price)
            .bind(eval.expected_loss)
            .bind(eval.confidence_gain)
            .bind(eval.voi)
            .bind(eval.decision.as_str())
            .bind(&eval.rationale)
            .bind(eval.evaluated_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct BudgetRow {
    case_id: String,
    ceiling: f64,
    spent: f64,
    created_at: String,
    updated_at: String,
}

#[derive(sqlx::FromRow)]
struct EvaluationRow {
    id: String,
    case_id: String,
    signal_type: String,
    price: f64,
    expected_loss: f64,
    confidence_gain: f64,
    voi: f64,
    decision: String,
    rationale: String,
    evaluated_at: String,
}

impl TryFrom<EvaluationRow> for VoiEvaluation {
    type Error = DomainError;

    fn try_from(row: EvaluationRow) -> Result<Self, Self::Error> {
        let signal_type = SignalType::from_str(&row.signal_type).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid signal type: {}", row.signal_type))
        })?;
        let decision = VoiDecision::from_str(&row.decision).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid VOI decision: {}", row.decision))
        })?;

        Ok(VoiEvaluation {
            id: parse_uuid(&row.id)?,
            case_id: row.case_id,
            signal_type,
            price: row.price,
            expected_loss: row.expected_loss,
            confidence_gain: row.confidence_gain,
            voi: row.voi,
            decision,
            rationale: row.rationale,
            evaluated_at: parse_datetime(&row.evaluated_at)?,
        })
    }
}
