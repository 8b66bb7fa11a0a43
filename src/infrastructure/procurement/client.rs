//! HTTP client for the signal procurement gateway.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ProcurementConfig, SignalType};
use crate::domain::ports::{ProcurementGateway, PurchasedPayload};
use crate::infrastructure::gateway::GatewayError;

/// HTTP implementation of the [`ProcurementGateway`] port.
///
/// No retry layer here: a purchase costs money, and the evidence buyer
/// already tolerates per-item failure. Timeouts are bounded by the
/// client configuration.
pub struct HttpProcurementGateway {
    http_client: ReqwestClient,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct PurchaseResponse {
    payload: serde_json::Value,
    actual_cost: f64,
}

impl HttpProcurementGateway {
    pub fn new(config: &ProcurementConfig) -> Result<Self> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build procurement HTTP client")?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ProcurementGateway for HttpProcurementGateway {
    async fn purchase(
        &self,
        signal_type: SignalType,
        case_id: &str,
        subject_id: &str,
    ) -> DomainResult<PurchasedPayload> {
        let body = serde_json::json!({
            "case_id": case_id,
            "subject_id": subject_id,
        });

        let response = self
            .http_client
            .post(format!(
                "{}/v1/signals/{}",
                self.base_url,
                signal_type.as_str()
            ))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                DomainError::ProcurementFailed(GatewayError::from_reqwest(&e).to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::ProcurementFailed(
                GatewayError::from_status(status, body).to_string(),
            ));
        }

        let purchase: PurchaseResponse = response
            .json()
            .await
            .map_err(|e| DomainError::ProcurementFailed(format!("Malformed response: {e}")))?;

        Ok(PurchasedPayload {
            payload: purchase.payload,
            actual_cost: purchase.actual_cost,
        })
    }
}
