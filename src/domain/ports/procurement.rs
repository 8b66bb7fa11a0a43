//! Signal procurement gateway port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;
use crate::domain::models::SignalType;

/// A priced evidence payload returned by the vendor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchasedPayload {
    pub payload: serde_json::Value,
    /// What the purchase actually cost (may differ from the quote).
    pub actual_cost: f64,
}

/// Port for the external signal vendor.
///
/// Callers are expected to check for an existing unexpired signal
/// before purchasing; the vendor is idempotent-safe but each call
/// costs money.
#[async_trait]
pub trait ProcurementGateway: Send + Sync {
    async fn purchase(
        &self,
        signal_type: SignalType,
        case_id: &str,
        subject_id: &str,
    ) -> DomainResult<PurchasedPayload>;
}
