//! HTTP gateway error classification.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors from an external HTTP gateway, classified so retry logic can
/// tell transient failures from permanent ones.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Rate limited (429): {0}")]
    RateLimited(String),

    #[error("Server error ({status}): {body}")]
    ServerError { status: u16, body: String },

    #[error("Client error ({status}): {body}")]
    ClientError { status: u16, body: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl GatewayError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS {
            Self::RateLimited(body)
        } else if status.is_server_error() {
            Self::ServerError {
                status: status.as_u16(),
                body,
            }
        } else {
            Self::ClientError {
                status: status.as_u16(),
                body,
            }
        }
    }

    /// Wrap a reqwest transport error.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.to_string())
        }
    }

    /// Transient errors are safe to retry with backoff. Malformed
    /// responses and client errors are permanent: retrying them
    /// silently would mask a contract violation.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::ServerError { .. } | Self::Timeout | Self::Network(_)
        )
    }
}
