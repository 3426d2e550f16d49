//! REST implementation of [`Custodian`].
//!
//! `RestCustodian` wraps a `reqwest::Client` and translates both trait
//! methods into HTTP calls against the custodial execution API, with
//! automatic retry + exponential back-off on transient (5xx / timeout)
//! failures. 4xx responses are permanent and never retried.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;

use la_domain::error::{Error, Result};
use la_domain::tool::ToolOutcome;

use crate::provider::Custodian;
use crate::types::{CustodianConfig, ExecRequestDto, ExecResponseDto};

/// A REST-based client for the custodial execution API.
///
/// Created once and reused for the lifetime of the agent process; the
/// underlying `reqwest::Client` maintains a connection pool.
#[derive(Debug, Clone)]
pub struct RestCustodian {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    max_retries: u32,
}

impl RestCustodian {
    pub fn new(cfg: &CustodianConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            api_key: cfg.api_key.clone(),
            max_retries: cfg.max_retries,
        })
    }

    // ── request helpers ──────────────────────────────────────────────

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Decorate a request with the credential and correlation headers.
    fn decorate(&self, rb: RequestBuilder, request_id: &str) -> RequestBuilder {
        let mut rb = rb.header("X-Request-Id", request_id);
        if let Some(ref key) = self.api_key {
            rb = rb.header("X-Api-Key", key);
        }
        rb
    }

    /// Execute with retry + exponential back-off on transient errors.
    async fn post_with_retry(
        &self,
        path: &str,
        request_id: &str,
        body: &ExecRequestDto<'_>,
    ) -> Result<ToolOutcome> {
        let url = self.url(path);
        let mut attempt = 0u32;
        loop {
            let rb = self.decorate(self.http.post(&url), request_id).json(body);
            match rb.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let dto: ExecResponseDto = resp
                            .json()
                            .await
                            .map_err(|e| Error::Custodian(format!("bad response body: {e}")))?;
                        return Ok(dto.into());
                    }
                    if status.is_server_error() && attempt < self.max_retries {
                        attempt += 1;
                        backoff(attempt).await;
                        continue;
                    }
                    let text = resp.text().await.unwrap_or_default();
                    return Err(classify_status(status, &text));
                }
                Err(e) if e.is_timeout() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, path, "custodian request timed out; retrying");
                    backoff(attempt).await;
                }
                Err(e) if e.is_timeout() => {
                    return Err(Error::Timeout(format!("custodian {path}: {e}")));
                }
                Err(e) => return Err(Error::Http(e.to_string())),
            }
        }
    }
}

/// 1s, 2s, 4s, ... capped at 8s.
async fn backoff(attempt: u32) {
    let secs = 1u64 << attempt.min(3);
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

fn classify_status(status: StatusCode, body: &str) -> Error {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::Custodian(format!("permission denied ({status}): {body}"))
        }
        StatusCode::NOT_FOUND => Error::Custodian(format!("not found: {body}")),
        StatusCode::TOO_MANY_REQUESTS => Error::Custodian(format!("rate limit exceeded: {body}")),
        _ => Error::Custodian(format!("{status}: {body}")),
    }
}

#[async_trait]
impl Custodian for RestCustodian {
    async fn execute(
        &self,
        owner_id: &str,
        tool: &str,
        input: &Value,
        request_id: &str,
    ) -> Result<ToolOutcome> {
        let body = ExecRequestDto {
            owner_id,
            tool,
            input,
            confirmation_id: None,
        };
        self.post_with_retry("/v1/execute", request_id, &body).await
    }

    async fn execute_write(
        &self,
        owner_id: &str,
        tool: &str,
        input: &Value,
        request_id: &str,
        confirmation_id: &str,
    ) -> Result<ToolOutcome> {
        let body = ExecRequestDto {
            owner_id,
            tool,
            input,
            confirmation_id: Some(confirmation_id),
        };
        self.post_with_retry("/v1/execute/write", request_id, &body)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let c = RestCustodian::new(&CustodianConfig {
            base_url: "http://api.example.com/".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(c.url("/v1/execute"), "http://api.example.com/v1/execute");
    }

    #[test]
    fn status_classification() {
        let e = classify_status(StatusCode::FORBIDDEN, "nope");
        assert!(e.to_string().contains("permission denied"));
        let e = classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(e.to_string().contains("rate limit"));
        let e = classify_status(StatusCode::NOT_FOUND, "no such user");
        assert!(e.to_string().contains("not found"));
    }
}
