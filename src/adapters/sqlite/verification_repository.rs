//! SQLite implementation of the VerificationRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{VerificationChannel, VerificationSession, VerificationStatus};
use crate::domain::ports::VerificationRepository;

use super::{parse_datetime, parse_optional_datetime, parse_uuid};

#[derive(Clone)]
pub struct SqliteVerificationRepository {
    pool: SqlitePool,
}

impl SqliteVerificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VerificationRepository for SqliteVerificationRepository {
    async fn insert(&self, session: &VerificationSession) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO verification_sessions (id, case_id, token_hash, status, channel,
               identity_verified, notification_sent, expires_at, created_at, closed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(session.id.to_string())
        .bind(&session.case_id)
        .bind(&session.token_hash)
        .bind(session.status.as_str())
        .bind(session.channel.as_str())
        .bind(session.identity_verified)
        .bind(session.notification_sent)
        .bind(session.expires_at.to_rfc3339())
        .bind(session.created_at.to_rfc3339())
        .bind(session.closed_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, session: &VerificationSession) -> DomainResult<()> {
        let result = sqlx::query(
            r#"UPDATE verification_sessions SET status = ?, identity_verified = ?,
               notification_sent = ?, closed_at = ? WHERE id = ?"#,
        )
        .bind(session.status.as_str())
        .bind(session.identity_verified)
        .bind(session.notification_sent)
        .bind(session.closed_at.map(|t| t.to_rfc3339()))
        .bind(session.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::VerificationSessionNotFound);
        }

        Ok(())
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> DomainResult<Option<VerificationSession>> {
        let row: Option<SessionRow> =
            sqlx::query_as("SELECT * FROM verification_sessions WHERE token_hash = ?")
                .bind(token_hash)
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_open_for_case(
        &self,
        case_id: &str,
    ) -> DomainResult<Option<VerificationSession>> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"SELECT * FROM verification_sessions
               WHERE case_id = ? AND status IN ('pending', 'verified')
               ORDER BY created_at DESC LIMIT 1"#,
        )
        .bind(case_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    case_id: String,
    token_hash: String,
    status: String,
    channel: String,
    identity_verified: bool,
    notification_sent: bool,
    expires_at: String,
    created_at: String,
    closed_at: Option<String>,
}

impl TryFrom<SessionRow> for VerificationSession {
    type Error = DomainError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let status = VerificationStatus::from_str(&row.status).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid verification status: {}", row.status))
        })?;
        let channel = VerificationChannel::from_str(&row.channel).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid channel: {}", row.channel))
        })?;

        Ok(VerificationSession {
            id: parse_uuid(&row.id)?,
            case_id: row.case_id,
            token_hash: row.token_hash,
            status,
            channel,
            identity_verified: row.identity_verified,
            notification_sent: row.notification_sent,
            expires_at: parse_datetime(&row.expires_at)?,
            created_at: parse_datetime(&row.created_at)?,
            closed_at: parse_optional_datetime(row.closed_at)?,
        })
    }
}
