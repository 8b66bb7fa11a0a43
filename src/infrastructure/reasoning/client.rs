//! HTTP client for the reasoning gateway.
//!
//! Sends a structured context and an expected-schema tag; expects a
//! structured verdict back. Transient failures are retried with
//! backoff behind a token-bucket rate limiter; a malformed response is
//! a permanent failure and propagates (fail closed, no silent retry).

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{PipelineStage, ReasoningConfig};
use crate::domain::ports::{
    ArgumentBrief, ArgumentRequest, ReasoningGateway, StructuredVerdict, TribunalRequest,
    TribunalSynthesis, VerdictRequest,
};
use crate::infrastructure::gateway::{GatewayError, RetryPolicy, TokenBucketRateLimiter};

/// HTTP implementation of the [`ReasoningGateway`] port.
pub struct HttpReasoningGateway {
    http_client: ReqwestClient,
    base_url: String,
    api_key: Option<String>,
    rate_limiter: TokenBucketRateLimiter,
    retry_policy: RetryPolicy,
}

impl HttpReasoningGateway {
    pub fn new(config: &ReasoningConfig) -> Result<Self> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build reasoning HTTP client")?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            rate_limiter: TokenBucketRateLimiter::new(config.rate_limit_rps),
            retry_policy: RetryPolicy::new(
                config.retry.max_retries,
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ),
        })
    }

    async fn judge<Req, Resp>(&self, expected_schema: &str, request: &Req) -> Result<Resp, GatewayError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        self.rate_limiter.acquire().await;

        self.retry_policy
            .execute(|| self.send_request(expected_schema, request))
            .await
    }

    async fn send_request<Req, Resp>(
        &self,
        expected_schema: &str,
        request: &Req,
    ) -> Result<Resp, GatewayError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let body = serde_json::json!({
            "expected_schema": expected_schema,
            "context": request,
        });

        let mut builder = self
            .http_client
            .post(format!("{}/v1/judge", self.base_url))
            .header("content-type", "application/json")
            .json(&body);

        if let Some(api_key) = &self.api_key {
            builder = builder.header("x-api-key", api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(GatewayError::from_status(status, body));
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))
    }
}

fn to_domain(stage: PipelineStage, err: GatewayError) -> DomainError {
    DomainError::ReasoningFailed {
        stage,
        reason: err.to_string(),
    }
}

#[async_trait]
impl ReasoningGateway for HttpReasoningGateway {
    async fn synthesize_verdict(
        &self,
        request: &VerdictRequest,
    ) -> DomainResult<StructuredVerdict> {
        self.judge("verdict", request)
            .await
            .map_err(|e| to_domain(PipelineStage::EvidencePurchase, e))
    }

    async fn argue_position(&self, request: &ArgumentRequest) -> DomainResult<ArgumentBrief> {
        self.judge("argument", request)
            .await
            .map_err(|e| to_domain(PipelineStage::Tribunal, e))
    }

    async fn synthesize_tribunal(
        &self,
        request: &TribunalRequest,
    ) -> DomainResult<TribunalSynthesis> {
        self.judge("tribunal_synthesis", request)
            .await
            .map_err(|e| to_domain(PipelineStage::Tribunal, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::RetryConfig;
    use crate::domain::ports::CaseBrief;

    fn config(base_url: String) -> ReasoningConfig {
        ReasoningConfig {
            base_url,
            api_key: None,
            timeout_secs: 5,
            rate_limit_rps: 100.0,
            retry: RetryConfig {
                max_retries: 1,
                initial_backoff_ms: 10,
                max_backoff_ms: 50,
            },
        }
    }

    fn verdict_request() -> VerdictRequest {
        VerdictRequest {
            case: CaseBrief {
                case_id: "txn-1".to_string(),
                amount: 500.0,
                currency: "USD".to_string(),
                user_id: "user-1".to_string(),
                counterparty_id: None,
                risk_score: Some(0.6),
                context: serde_json::json!({}),
            },
            evidence: vec![],
            prior_decisions: vec![],
            verification_outcome: None,
        }
    }

    #[tokio::test]
    async fn test_synthesize_verdict_parses_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/judge")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"decision":"DENY","confidence":0.9,"reasoning":"velocity anomaly","risk_factors":["burst"]}"#,
            )
            .create_async()
            .await;

        let gateway = HttpReasoningGateway::new(&config(server.url())).unwrap();
        let verdict = gateway
            .synthesize_verdict(&verdict_request())
            .await
            .expect("verdict should parse");

        assert_eq!(verdict.decision, crate::domain::models::Verdict::Deny);
        assert!((verdict.confidence - 0.9).abs() < f64::EPSILON);
        assert_eq!(verdict.risk_factors, vec!["burst".to_string()]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_malformed_response_fails_closed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/judge")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"not_a_verdict": true}"#)
            .expect(1)
            .create_async()
            .await;

        let gateway = HttpReasoningGateway::new(&config(server.url())).unwrap();
        let result = gateway.synthesize_verdict(&verdict_request()).await;

        // Permanent failure: exactly one request, no silent retry.
        assert!(matches!(
            result,
            Err(DomainError::ReasoningFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/judge")
            .with_status(503)
            .with_body("unavailable")
            .expect(2)
            .create_async()
            .await;

        let gateway = HttpReasoningGateway::new(&config(server.url())).unwrap();
        let result = gateway.synthesize_verdict(&verdict_request()).await;

        assert!(result.is_err());
        mock.assert_async().await;
    }
}
