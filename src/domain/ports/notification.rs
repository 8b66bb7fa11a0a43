//! Notification gateway port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::VerificationChannel;

/// Port for the customer notification channel.
///
/// Delivery failure must never fail verification session creation;
/// callers fold an `Err` into `delivered = false`.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Returns whether the message was delivered.
    async fn notify(
        &self,
        channel: VerificationChannel,
        target: &str,
        message: &str,
    ) -> DomainResult<bool>;
}
