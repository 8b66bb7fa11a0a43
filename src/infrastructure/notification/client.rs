//! HTTP client for the customer notification channel.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{NotificationConfig, VerificationChannel};
use crate::domain::ports::NotificationGateway;
use crate::infrastructure::gateway::GatewayError;

/// HTTP implementation of the [`NotificationGateway`] port.
pub struct HttpNotificationGateway {
    http_client: ReqwestClient,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct NotifyResponse {
    delivered: bool,
}

impl HttpNotificationGateway {
    pub fn new(config: &NotificationConfig) -> Result<Self> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build notification HTTP client")?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl NotificationGateway for HttpNotificationGateway {
    async fn notify(
        &self,
        channel: VerificationChannel,
        target: &str,
        message: &str,
    ) -> DomainResult<bool> {
        let body = serde_json::json!({
            "channel": channel.as_str(),
            "target": target,
            "message": message,
        });

        let response = self
            .http_client
            .post(format!("{}/v1/notify", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                DomainError::NotificationFailed(GatewayError::from_reqwest(&e).to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::NotificationFailed(
                GatewayError::from_status(status, body).to_string(),
            ));
        }

        let notify: NotifyResponse = response
            .json()
            .await
            .map_err(|e| DomainError::NotificationFailed(format!("Malformed response: {e}")))?;

        Ok(notify.delivered)
    }
}
