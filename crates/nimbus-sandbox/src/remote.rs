//! `RemoteSandbox` — the production adapter over an external
//! sandbox-provisioning HTTP API. The provisioning API itself is out of
//! scope (spec §1 "the container-sandbox runtime"); this is a thin client
//! stub against its documented `exec`/`writeFile`/`destroy` contract.

use crate::error::SandboxError;
use crate::sandbox::{ExecOpts, ExecOutput, Sandbox};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub struct RemoteSandbox {
    http: reqwest::Client,
    base_url: String,
    sandbox_id: String,
}

impl RemoteSandbox {
    /// Provision a new sandbox via the external API.
    ///
    /// # Errors
    /// Returns `SandboxError::Exec` if provisioning fails.
    pub async fn provision(base_url: impl Into<String>, job_id: &str) -> Result<Self, SandboxError> {
        let base_url = base_url.into();
        let http = reqwest::Client::new();

        #[derive(Serialize)]
        struct ProvisionRequest<'a> {
            job_id: &'a str,
        }
        #[derive(Deserialize)]
        struct ProvisionResponse {
            sandbox_id: String,
        }

        let response = http
            .post(format!("{base_url}/sandboxes"))
            .json(&ProvisionRequest { job_id })
            .send()
            .await
            .map_err(|e| SandboxError::Exec(e.to_string()))?;

        let parsed: ProvisionResponse = response
            .error_for_status()
            .map_err(|e| SandboxError::Exec(e.to_string()))?
            .json()
            .await
            .map_err(|e| SandboxError::Exec(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            sandbox_id: parsed.sandbox_id,
        })
    }
}

#[async_trait]
impl Sandbox for RemoteSandbox {
    fn id(&self) -> &str {
        &self.sandbox_id
    }

    async fn exec(&self, cmd: &str, args: &[&str], opts: ExecOpts) -> Result<ExecOutput, SandboxError> {
        #[derive(Serialize)]
        struct ExecRequest<'a> {
            cmd: &'a str,
            args: &'a [&'a str],
            timeout_ms: u64,
            log_file: Option<&'a str>,
            env: &'a [(String, String)],
        }

        let request = ExecRequest {
            cmd,
            args,
            timeout_ms: u64::try_from(opts.timeout.as_millis()).unwrap_or(u64::MAX),
            log_file: opts.log_file.as_deref(),
            env: &opts.env,
        };

        let response = self
            .http
            .post(format!("{}/sandboxes/{}/exec", self.base_url, self.sandbox_id))
            .json(&request)
            .send()
            .await
            .map_err(|e| SandboxError::Exec(e.to_string()))?;

        response
            .error_for_status()
            .map_err(|e| SandboxError::Exec(e.to_string()))?
            .json()
            .await
            .map_err(|e| SandboxError::Exec(e.to_string()))
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), SandboxError> {
        #[derive(Serialize)]
        struct WriteFileRequest<'a> {
            path: &'a str,
            contents: &'a [u8],
        }

        self.http
            .post(format!("{}/sandboxes/{}/files", self.base_url, self.sandbox_id))
            .json(&WriteFileRequest { path, contents })
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| SandboxError::WriteFile(e.to_string()))?;
        Ok(())
    }

    async fn file_exists(&self, path: &str) -> Result<bool, SandboxError> {
        let response = self
            .http
            .head(format!("{}/sandboxes/{}/files/{}", self.base_url, self.sandbox_id, path))
            .send()
            .await
            .map_err(|e| SandboxError::Exec(e.to_string()))?;
        Ok(response.status().is_success())
    }

    async fn read_log_tail(&self, path: &str, max_lines: usize, max_chars: usize) -> Result<String, SandboxError> {
        let response = self
            .http
            .get(format!(
                "{}/sandboxes/{}/files/{}?tail_lines={}&tail_chars={}",
                self.base_url, self.sandbox_id, path, max_lines, max_chars
            ))
            .send()
            .await
            .map_err(|e| SandboxError::Exec(e.to_string()))?;

        response
            .error_for_status()
            .map_err(|e| SandboxError::Exec(e.to_string()))?
            .text()
            .await
            .map_err(|e| SandboxError::Exec(e.to_string()))
    }

    async fn destroy(&self) -> Result<(), SandboxError> {
        self.http
            .delete(format!("{}/sandboxes/{}", self.base_url, self.sandbox_id))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| SandboxError::Destroy(e.to_string()))?;
        Ok(())
    }
}

impl<'de> Deserialize<'de> for ExecOutput {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Wire {
            exit_code: i32,
            stdout: String,
            stderr: String,
        }
        let wire = Wire::deserialize(deserializer)?;
        Ok(ExecOutput {
            exit_code: wire.exit_code,
            stdout: wire.stdout,
            stderr: wire.stderr,
        })
    }
}
