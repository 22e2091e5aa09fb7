//! An in-process `Sandbox` over a `tempfile` directory, used by
//! integration tests to exercise the full build driver without a real
//! container (SPEC_FULL §4.3 "Sandbox trait").

use crate::error::SandboxError;
use crate::sandbox::{ExecOpts, ExecOutput, Sandbox};
use async_trait::async_trait;
use nimbus_runner::{CommandSpec, ProcessRunner, RunnerError, TokioProcessRunner};
use nimbus_utils::tail;
use std::path::{Path, PathBuf};
use tokio::fs;

pub struct LocalSandbox {
    id: String,
    root: tempfile::TempDir,
}

impl LocalSandbox {
    /// # Errors
    /// Returns `SandboxError::Exec` if a temporary directory cannot be
    /// created.
    pub fn new(id: impl Into<String>) -> Result<Self, SandboxError> {
        let root = tempfile::tempdir().map_err(|e| SandboxError::Exec(e.to_string()))?;
        Ok(Self { id: id.into(), root })
    }

    #[must_use]
    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    fn resolve(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }
}

#[async_trait]
impl Sandbox for LocalSandbox {
    fn id(&self) -> &str {
        &self.id
    }

    async fn exec(&self, cmd: &str, args: &[&str], opts: ExecOpts) -> Result<ExecOutput, SandboxError> {
        let mut spec = CommandSpec::new(cmd).args(args.iter().copied()).cwd(self.root.path());
        for (key, value) in &opts.env {
            spec = spec.env(key.as_str(), value.as_str());
        }

        let log_path = opts.log_file.as_ref().map(|name| self.resolve(name));

        let output = TokioProcessRunner
            .run_streaming(&spec, opts.timeout, log_path.as_deref())
            .await
            .map_err(|e| map_runner_error(e, cmd, args))?;

        Ok(ExecOutput {
            exit_code: output.exit_code.unwrap_or(-1),
            stdout: output.stdout_string(),
            stderr: output.stderr_string(),
        })
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), SandboxError> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| SandboxError::WriteFile(e.to_string()))?;
        }
        fs::write(&target, contents)
            .await
            .map_err(|e| SandboxError::WriteFile(e.to_string()))
    }

    async fn file_exists(&self, path: &str) -> Result<bool, SandboxError> {
        fs::try_exists(self.resolve(path))
            .await
            .map_err(|e| SandboxError::Exec(e.to_string()))
    }

    async fn read_log_tail(&self, path: &str, max_lines: usize, max_chars: usize) -> Result<String, SandboxError> {
        let target = self.resolve(path);
        let content = fs::read_to_string(&target)
            .await
            .map_err(|e| SandboxError::Exec(format!("reading {path}: {e}")))?;
        Ok(tail(&content, max_lines, max_chars))
    }

    async fn destroy(&self) -> Result<(), SandboxError> {
        Ok(())
    }
}

fn map_runner_error(error: RunnerError, cmd: &str, args: &[&str]) -> SandboxError {
    match error {
        RunnerError::Timeout { command, .. } => SandboxError::Timeout { command },
        RunnerError::ExecutionFailed { reason } => {
            SandboxError::Exec(format!("{cmd} {}: {reason}", args.join(" ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn writes_and_reads_back_a_file() {
        let sandbox = LocalSandbox::new("job_test1").unwrap();
        sandbox.write_file("index.html", b"<html></html>").await.unwrap();
        let content = fs::read_to_string(sandbox.root_path().join("index.html")).await.unwrap();
        assert_eq!(content, "<html></html>");
    }

    #[tokio::test]
    async fn write_file_creates_parent_directories() {
        let sandbox = LocalSandbox::new("job_test2").unwrap();
        sandbox.write_file("src/nested/file.js", b"x").await.unwrap();
        assert!(sandbox.root_path().join("src/nested/file.js").exists());
    }

    #[tokio::test]
    async fn exec_captures_stdout_and_exit_code() {
        let sandbox = LocalSandbox::new("job_test3").unwrap();
        let output = sandbox
            .exec("echo", &["hello"], ExecOpts::with_timeout(Duration::from_secs(5)))
            .await
            .unwrap();
        assert!(output.success());
        assert!(output.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn exec_tees_output_into_log_file() {
        let sandbox = LocalSandbox::new("job_test4").unwrap();
        sandbox
            .exec(
                "echo",
                &["building"],
                ExecOpts::with_timeout(Duration::from_secs(5)).log_to(".nimbus/build.log"),
            )
            .await
            .unwrap();
        let tail = sandbox.read_log_tail(".nimbus/build.log", 200, 4000).await.unwrap();
        assert!(tail.contains("building"));
    }

    #[tokio::test]
    async fn exec_times_out_on_slow_command() {
        let sandbox = LocalSandbox::new("job_test5").unwrap();
        let result = sandbox
            .exec("sleep", &["5"], ExecOpts::with_timeout(Duration::from_millis(50)))
            .await;
        assert!(matches!(result, Err(SandboxError::Timeout { .. })));
    }
}
