//! The `Sandbox` collaborator contract (spec §4.3 "Operations on the
//! sandbox collaborator"): a disposable container capable of `exec`,
//! `write_file`, and lifecycle `destroy`.

use crate::error::SandboxError;
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ExecOpts {
    pub timeout: Duration,
    /// When set, the sandbox redirects combined stdout+stderr into this
    /// path as the process runs, so a concurrent log-tail poller observes
    /// output before `exec` returns (spec §4.3 "redirecting to
    /// `.nimbus/install.log`").
    pub log_file: Option<String>,
    /// Extra environment variables for this invocation only.
    pub env: Vec<(String, String)>,
}

impl ExecOpts {
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            log_file: None,
            env: Vec::new(),
        }
    }

    #[must_use]
    pub fn log_to(mut self, path: impl Into<String>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A disposable sandbox environment. The driver must not assume
/// incremental stdout delivery from `exec` — interactive progress comes
/// from tailing log files the driver itself redirects into.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Opaque identifier for this sandbox instance, for error context.
    fn id(&self) -> &str;

    async fn exec(&self, cmd: &str, args: &[&str], opts: ExecOpts) -> Result<ExecOutput, SandboxError>;

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), SandboxError>;

    /// Whether a path exists in the sandbox filesystem, used for build
    /// artifact verification (spec §4.3 step 6).
    async fn file_exists(&self, path: &str) -> Result<bool, SandboxError>;

    /// Read the trailing bytes of a log file the sandbox has been
    /// redirecting an `exec` invocation into (spec §4.3 "Log tail
    /// reader").
    async fn read_log_tail(&self, path: &str, max_lines: usize, max_chars: usize) -> Result<String, SandboxError>;

    /// Tear the sandbox down. Takes `&self` rather than consuming
    /// ownership so the pipeline can hold the sandbox behind an `Arc`
    /// shared with the heartbeat and log-tail tickers (spec §4.1 step 8
    /// "teardown … always destroy the sandbox").
    async fn destroy(&self) -> Result<(), SandboxError>;
}
