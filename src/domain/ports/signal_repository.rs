use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::{Signal, SignalType};

/// Repository port for purchased evidence.
#[async_trait]
pub trait SignalRepository: Send + Sync {
    /// Insert a purchased signal.
    async fn insert(&self, signal: &Signal) -> DomainResult<()>;

    /// Unexpired signals owned by the case as of `now`. Expired
    /// evidence is never returned (time-boxing invariant).
    async fn list_active(&self, case_id: &str, now: DateTime<Utc>) -> DomainResult<Vec<Signal>>;

    /// The unexpired signal of a given type, if the case already owns
    /// one. Callers check this before purchasing to avoid double
    /// spend on re-triggered stages.
    async fn find_active(
        &self,
        case_id: &str,
        signal_type: SignalType,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<Signal>>;
}
