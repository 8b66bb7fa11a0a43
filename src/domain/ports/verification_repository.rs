use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::VerificationSession;

/// Repository port for customer verification sessions.
#[async_trait]
pub trait VerificationRepository: Send + Sync {
    /// Insert a new session. Only the token hash is persisted.
    async fn insert(&self, session: &VerificationSession) -> DomainResult<()>;

    /// Update a session in place (status, flags, closed_at).
    async fn update(&self, session: &VerificationSession) -> DomainResult<()>;

    /// Look a session up by the hash of a presented token.
    async fn find_by_token_hash(&self, token_hash: &str)
        -> DomainResult<Option<VerificationSession>>;

    /// The newest non-terminal session for a case, if one exists.
    /// Sessions are reused rather than duplicated per escalation.
    async fn find_open_for_case(&self, case_id: &str)
        -> DomainResult<Option<VerificationSession>>;
}
