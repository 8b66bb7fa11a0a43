//! Customer verification sessions.
//!
//! Created when a medium-confidence verdict needs a human-in-the-loop
//! confirmation. Only a hash of the session token is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Session lifecycle. Terminal statuses re-enter the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Waiting for the customer.
    Pending,
    /// Customer identity confirmed; transaction answer still pending.
    Verified,
    /// Customer confirmed the transaction as legitimate.
    Confirmed,
    /// Customer disputed the transaction.
    Disputed,
    /// Session expired before a response arrived.
    Expired,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Confirmed => "confirmed",
            Self::Disputed => "disputed",
            Self::Expired => "expired",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "verified" => Some(Self::Verified),
            "confirmed" => Some(Self::Confirmed),
            "disputed" => Some(Self::Disputed),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    /// Whether the session is closed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Disputed | Self::Expired)
    }
}

/// Channel used to reach the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationChannel {
    Sms,
    Email,
    Push,
}

impl VerificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Email => "email",
            Self::Push => "push",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sms" => Some(Self::Sms),
            "email" => Some(Self::Email),
            "push" => Some(Self::Push),
            _ => None,
        }
    }
}

/// A human-in-the-loop confirmation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationSession {
    /// Row identity.
    pub id: Uuid,
    /// Owning case.
    pub case_id: String,
    /// SHA-256 hex of the session token. The raw token is returned to
    /// the caller once and never stored.
    pub token_hash: String,
    /// Current status; expiry is applied at read time.
    pub status: VerificationStatus,
    /// Channel used for the outbound notification.
    pub channel: VerificationChannel,
    /// Whether the customer's identity was verified.
    pub identity_verified: bool,
    /// Whether the outbound notification was delivered.
    pub notification_sent: bool,
    /// Hard expiry.
    pub expires_at: DateTime<Utc>,
    /// When created.
    pub created_at: DateTime<Utc>,
    /// When closed (terminal status reached).
    pub closed_at: Option<DateTime<Utc>>,
}

/// Hash a session token the way the store persists it.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl VerificationSession {
    /// Create a pending session. Returns the session and the raw token;
    /// the token is the caller's only chance to capture it.
    pub fn new(
        case_id: impl Into<String>,
        channel: VerificationChannel,
        ttl: chrono::Duration,
    ) -> (Self, String) {
        let token = Uuid::new_v4().to_string();
        let now = Utc::now();
        let session = Self {
            id: Uuid::new_v4(),
            case_id: case_id.into(),
            token_hash: hash_token(&token),
            status: VerificationStatus::Pending,
            channel,
            identity_verified: false,
            notification_sent: false,
            expires_at: now + ttl,
            created_at: now,
            closed_at: None,
        };
        (session, token)
    }

    /// Whether the session has passed its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
