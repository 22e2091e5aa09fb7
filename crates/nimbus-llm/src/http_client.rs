//! Shared HTTP client infrastructure for HTTP-based LLM providers.
//!
//! A `reqwest::Client` configured once per process, with timeout and
//! retry policies for reliable communication with the LLM provider.

use crate::types::LlmError;
use nimbus_redaction::redact_credentials;
use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_MAX_HTTP_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 2;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Shared HTTP client for LLM providers: connection reuse, configurable
/// timeouts, and retry with exponential backoff on 5xx/network failures.
#[derive(Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    max_timeout: Duration,
}

impl HttpClient {
    /// # Errors
    /// Returns `LlmError::Misconfiguration` if the client cannot be built.
    pub fn new() -> Result<Self, LlmError> {
        Self::with_max_timeout(DEFAULT_MAX_HTTP_TIMEOUT)
    }

    /// # Errors
    /// Returns `LlmError::Misconfiguration` if the client cannot be built.
    pub fn with_max_timeout(max_timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| LlmError::Misconfiguration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client: Arc::new(client),
            max_timeout,
        })
    }

    /// Execute a request with a per-request timeout and retry policy:
    /// up to 2 retries for 5xx and network failures, exponential backoff
    /// (1s, 2s), no retries for 4xx errors.
    ///
    /// # Errors
    /// Returns `LlmError::ProviderAuth`/`ProviderQuota` for 401/403/429,
    /// `LlmError::ProviderOutage` for 5xx after retries are exhausted,
    /// `LlmError::Timeout` on timeout, `LlmError::Transport` otherwise.
    pub async fn execute_with_retry(
        &self,
        request_builder: reqwest::RequestBuilder,
        request_timeout: Duration,
        provider_name: &str,
    ) -> Result<Response, LlmError> {
        let effective_timeout = request_timeout.min(self.max_timeout);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let request = request_builder
                .try_clone()
                .ok_or_else(|| LlmError::Transport("failed to clone request for retry".into()))?
                .timeout(effective_timeout)
                .build()
                .map_err(|e| LlmError::Transport(format!("failed to build request: {e}")))?;

            debug!(
                provider = provider_name,
                attempt, timeout_secs = effective_timeout.as_secs(),
                "executing HTTP request"
            );

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_client_error() {
                        let body = response.text().await.unwrap_or_default();
                        let body = redact_credentials(&body);
                        return Err(map_client_error(status, provider_name, &body));
                    }

                    if status.is_server_error() {
                        if attempt <= MAX_RETRIES {
                            warn!(provider = provider_name, attempt, %status, "server error, retrying");
                            tokio::time::sleep(INITIAL_BACKOFF * attempt).await;
                            continue;
                        }
                        return Err(LlmError::ProviderOutage(format!(
                            "{provider_name} returned server error: {status}"
                        )));
                    }

                    return Ok(response);
                }
                Err(e) => {
                    if e.is_timeout() {
                        return Err(LlmError::Timeout {
                            duration: effective_timeout,
                        });
                    }

                    let message = redact_credentials(&e.to_string());
                    if attempt <= MAX_RETRIES {
                        warn!(provider = provider_name, attempt, error = %message, "network error, retrying");
                        tokio::time::sleep(INITIAL_BACKOFF * attempt).await;
                        continue;
                    }
                    return Err(LlmError::Transport(format!("{provider_name} request failed: {message}")));
                }
            }
        }
    }
}

/// Map a 4xx response onto an `LlmError`, folding the response body text
/// into the fallback `Transport` message so provider rejection text (e.g.
/// `"response_format not supported"`) survives to `is_schema_rejection`'s
/// regex match.
fn map_client_error(status: StatusCode, provider_name: &str, body: &str) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LlmError::ProviderAuth(provider_name.to_string())
        }
        StatusCode::TOO_MANY_REQUESTS => LlmError::ProviderQuota(provider_name.to_string()),
        _ if body.is_empty() => {
            LlmError::Transport(format!("{provider_name} returned client error: {status}"))
        }
        _ => LlmError::Transport(format!("{provider_name} returned client error: {status}: {body}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructs_with_defaults() {
        assert!(HttpClient::new().is_ok());
    }

    #[test]
    fn constructs_with_custom_timeout() {
        let client = HttpClient::with_max_timeout(Duration::from_secs(60)).unwrap();
        assert_eq!(client.max_timeout, Duration::from_secs(60));
    }

    #[test]
    fn maps_401_to_provider_auth() {
        assert!(matches!(
            map_client_error(StatusCode::UNAUTHORIZED, "openrouter", ""),
            LlmError::ProviderAuth(_)
        ));
    }

    #[test]
    fn maps_429_to_provider_quota() {
        assert!(matches!(
            map_client_error(StatusCode::TOO_MANY_REQUESTS, "openrouter", ""),
            LlmError::ProviderQuota(_)
        ));
    }

    #[test]
    fn maps_other_4xx_to_transport() {
        assert!(matches!(
            map_client_error(StatusCode::BAD_REQUEST, "openrouter", ""),
            LlmError::Transport(_)
        ));
    }

    #[test]
    fn client_error_message_folds_in_response_body() {
        let error = map_client_error(StatusCode::BAD_REQUEST, "openrouter", "response_format not supported");
        match error {
            LlmError::Transport(message) => assert!(message.contains("response_format not supported")),
            other => panic!("expected Transport, got {other:?}"),
        }
    }
}
