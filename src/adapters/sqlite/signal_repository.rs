//! SQLite implementation of the SignalRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Signal, SignalType};
use crate::domain::ports::SignalRepository;

use super::{parse_datetime, parse_uuid};

#[derive(Clone)]
pub struct SqliteSignalRepository {
    pool: SqlitePool,
}

impl SqliteSignalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SignalRepository for SqliteSignalRepository {
    async fn insert(&self, signal: &Signal) -> DomainResult<()> {
        let payload_json = serde_json::to_string(&signal.payload)?;

        sqlx::query(
            r#"INSERT INTO signals (id, case_id, signal_type, cost, payload, purchased_at, expires_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(signal.id.to_string())
        .bind(&signal.case_id)
        .bind(signal.signal_type.as_str())
        .bind(signal.cost)
        .bind(&payload_json)
        .bind(signal.purchased_at.to_rfc3339())
        .bind(signal.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_active(&self, case_id: &str, now: DateTime<Utc>) -> DomainResult<Vec<Signal>> {
        let rows: Vec<SignalRow> = sqlx::query_as(
            r#"SELECT * FROM signals WHERE case_id = ? AND expires_at > ?
               ORDER BY purchased_at"#,
        )
        .bind(case_id)
        .bind(now.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_active(
        &self,
        case_id: &str,
        signal_type: SignalType,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<Signal>> {
        let row: Option<SignalRow> = sqlx::query_as(
            r#"SELECT * FROM signals WHERE case_id = ? AND signal_type = ? AND expires_at > ?
               ORDER BY purchased_at DESC LIMIT 1"#,
        )
        .bind(case_id)
        .bind(signal_type.as_str())
        .bind(now.to_rfc3339())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct SignalRow {
    id: String,
    case_id: String,
    signal_type: String,
    cost: f64,
    payload: String,
    purchased_at: String,
    expires_at: String,
}

impl TryFrom<SignalRow> for Signal {
    type Error = DomainError;

    fn try_from(row: SignalRow) -> Result<Self, Self::Error> {
        let signal_type = SignalType::from_str(&row.signal_type).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid signal type: {}", row.signal_type))
        })?;

        Ok(Signal {
            id: parse_uuid(&row.id)?,
            case_id: row.case_id,
            signal_type,
            cost: row.cost,
            payload: serde_json::from_str(&row.payload)?,
            purchased_at: parse_datetime(&row.purchased_at)?,
            expires_at: parse_datetime(&row.expires_at)?,
        })
    }
}
