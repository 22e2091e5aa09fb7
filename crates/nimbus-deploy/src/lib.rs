//! The deploy driver (spec §4.4, C6): invokes the edge-worker deploy
//! tool inside an already-built sandbox and parses the returned URL.

mod error;
mod worker_delete;

pub use error::DeployError;
pub use worker_delete::{CloudflareEdgeWorkerApi, EdgeWorkerApi};

use nimbus_redaction::redact_deploy_log;
use nimbus_sandbox::{ExecOpts, Sandbox};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::debug;

const DEPLOY_TIMEOUT: Duration = Duration::from_secs(120);
const DEPLOY_LOG_PATH: &str = ".nimbus/deploy.log";
const DEPLOYED_URL_PATTERN: &str = r"https://[A-Za-z0-9.-]+\.workers\.dev";

static DEPLOYED_URL: Lazy<Regex> = Lazy::new(|| Regex::new(DEPLOYED_URL_PATTERN).unwrap());

pub struct DeployResult {
    pub deployed_url: String,
    pub deploy_log: String,
}

/// Export Cloudflare credentials into the sandbox invocation and run the
/// deploy tool against the generated wrangler config.
///
/// # Errors
/// Returns `DeployError::Failed` on nonzero exit or an unparseable URL,
/// carrying a credential-sanitized log.
pub async fn deploy(
    sandbox: &dyn Sandbox,
    cloudflare_api_token: &str,
    cloudflare_account_id: &str,
) -> Result<DeployResult, DeployError> {
    let opts = ExecOpts::with_timeout(DEPLOY_TIMEOUT)
        .log_to(DEPLOY_LOG_PATH)
        .env("CLOUDFLARE_API_TOKEN", cloudflare_api_token)
        .env("CLOUDFLARE_ACCOUNT_ID", cloudflare_account_id);

    debug!(sandbox_id = sandbox.id(), "invoking wrangler deploy");

    let output = sandbox
        .exec("bunx", &["wrangler", "deploy", "--config", "wrangler.nimbus.toml"], opts)
        .await;

    let raw_log = sandbox
        .read_log_tail(DEPLOY_LOG_PATH, 200, 4000)
        .await
        .unwrap_or_default();
    let sanitized_log = redact_deploy_log(&raw_log);

    let exec_succeeded = matches!(&output, Ok(o) if o.success());
    if !exec_succeeded {
        return Err(DeployError::Failed { log: sanitized_log });
    }

    match DEPLOYED_URL.find(&raw_log) {
        Some(matched) => Ok(DeployResult {
            deployed_url: matched.as_str().to_string(),
            deploy_log: sanitized_log,
        }),
        None => Err(DeployError::Failed { log: sanitized_log }),
    }
}
