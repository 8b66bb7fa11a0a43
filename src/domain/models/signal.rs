//! Purchased evidence signals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of purchasable evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    /// Transaction velocity history for the subject account.
    Velocity,
    /// Counterparty network / graph risk.
    Network,
    /// Device fingerprint reputation.
    DeviceFingerprint,
    /// Long-horizon account history summary.
    AccountHistory,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Velocity => "velocity",
            Self::Network => "network",
            Self::DeviceFingerprint => "device_fingerprint",
            Self::AccountHistory => "account_history",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "velocity" => Some(Self::Velocity),
            "network" => Some(Self::Network),
            "device_fingerprint" => Some(Self::DeviceFingerprint),
            "account_history" => Some(Self::AccountHistory),
            _ => None,
        }
    }
}

/// A purchased, time-boxed evidence payload.
///
/// Once purchased for a case, a signal is shared for free by every
/// later stage of that same case until it expires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Row identity.
    pub id: Uuid,
    /// Owning case.
    pub case_id: String,
    /// Evidence kind.
    pub signal_type: SignalType,
    /// What the purchase actually cost.
    pub cost: f64,
    /// Vendor payload.
    pub payload: serde_json::Value,
    /// When purchased.
    pub purchased_at: DateTime<Utc>,
    /// Evidence must not be reused past this instant.
    pub expires_at: DateTime<Utc>,
}

impl Signal {
    pub fn new(
        case_id: impl Into<String>,
        signal_type: SignalType,
        cost: f64,
        payload: serde_json::Value,
        ttl: chrono::Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            case_id: case_id.into(),
            signal_type,
            cost,
            payload,
            purchased_at: now,
            expires_at: now + ttl,
        }
    }

    /// Whether this signal is still usable at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}
