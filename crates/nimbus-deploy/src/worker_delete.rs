//! The edge-worker delete API client (spec §4.7 step 1), used only by
//! the cleanup sweeper. Distinct from the deploy driver above, which
//! publishes through `wrangler` inside the sandbox; deletion happens
//! well after the sandbox that built the worker is already gone, so it
//! talks to the edge platform directly.

use crate::error::DeployError;
use async_trait::async_trait;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A client capable of deleting a previously deployed edge worker by
/// name. Implemented by `CloudflareEdgeWorkerApi` and by test doubles.
#[async_trait]
pub trait EdgeWorkerApi: Send + Sync {
    /// Delete the named worker. HTTP 404 is treated as success by the
    /// implementation, matching spec §4.7 ("Treat HTTP 404 as success").
    ///
    /// # Errors
    /// Returns `DeployError::DeleteFailed` for any other non-2xx status
    /// or transport failure.
    async fn delete_worker(&self, worker_name: &str) -> Result<(), DeployError>;
}

/// Cloudflare Workers API adapter: `DELETE
/// /accounts/{account_id}/workers/scripts/{name}`.
pub struct CloudflareEdgeWorkerApi {
    http: reqwest::Client,
    account_id: String,
    api_token: String,
}

impl CloudflareEdgeWorkerApi {
    #[must_use]
    pub fn new(account_id: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            account_id: account_id.into(),
            api_token: api_token.into(),
        }
    }
}

#[async_trait]
impl EdgeWorkerApi for CloudflareEdgeWorkerApi {
    async fn delete_worker(&self, worker_name: &str) -> Result<(), DeployError> {
        let url = format!(
            "https://api.cloudflare.com/client/v4/accounts/{}/workers/scripts/{}",
            self.account_id, worker_name
        );

        let response = self
            .http
            .delete(&url)
            .bearer_auth(&self.api_token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| DeployError::DeleteFailed {
                worker_name: worker_name.to_string(),
                reason: e.to_string(),
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND || response.status().is_success() {
            return Ok(());
        }

        Err(DeployError::DeleteFailed {
            worker_name: worker_name.to_string(),
            reason: format!("unexpected status {}", response.status()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructs_with_account_and_token() {
        let api = CloudflareEdgeWorkerApi::new("account-1", "token-1");
        assert_eq!(api.account_id, "account-1");
    }
}
