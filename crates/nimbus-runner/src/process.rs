use crate::command_spec::CommandSpec;
use crate::error::RunnerError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Output from a process execution.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl ProcessOutput {
    #[must_use]
    pub fn new(stdout: Vec<u8>, stderr: Vec<u8>, exit_code: Option<i32>, timed_out: bool) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
            timed_out,
        }
    }

    #[must_use]
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    #[must_use]
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out
    }
}

/// Process execution abstraction used by the sandbox driver's local
/// implementation (spec §4.3's `exec` primitive, minus the sandbox
/// boundary itself).
///
/// Implementations MUST use argv-style APIs only — `CommandSpec` is the
/// only way to build a command, so there is no shell string to inject
/// into.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError>;

    /// Like `run`, but tees stdout/stderr into `log_file` line by line as
    /// the process runs, rather than delivering output only once it exits
    /// — the sandbox driver's incremental log-tail contract (spec §4.3
    /// "redirecting to `.nimbus/install.log`") requires a concurrent
    /// reader to observe output before `exec` returns.
    async fn run_streaming(
        &self,
        cmd: &CommandSpec,
        timeout: Duration,
        log_file: Option<&Path>,
    ) -> Result<ProcessOutput, RunnerError>;
}

/// `ProcessRunner` backed by `tokio::process::Command`, racing the child
/// against a timer of the caller-specified duration.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        let child = cmd
            .to_tokio_command()
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(timeout, child).await {
            Ok(Ok(output)) => Ok(ProcessOutput::new(
                output.stdout,
                output.stderr,
                output.status.code(),
                false,
            )),
            Ok(Err(e)) => Err(RunnerError::ExecutionFailed {
                reason: e.to_string(),
            }),
            Err(_) => Err(RunnerError::Timeout {
                timeout_secs: timeout.as_secs(),
                command: cmd.display(),
            }),
        }
    }

    async fn run_streaming(
        &self,
        cmd: &CommandSpec,
        timeout: Duration,
        log_file: Option<&Path>,
    ) -> Result<ProcessOutput, RunnerError> {
        let mut child = cmd
            .to_tokio_command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RunnerError::ExecutionFailed { reason: e.to_string() })?;

        let stdout = child.stdout.take().expect("piped stdout");
        let stderr = child.stderr.take().expect("piped stderr");
        let log_file = log_file.map(Path::to_path_buf);

        let run = async {
            let (stdout_buf, stderr_buf) = tokio::join!(
                tee_stream(stdout, log_file.clone()),
                tee_stream(stderr, log_file.clone()),
            );
            let status = child
                .wait()
                .await
                .map_err(|e| RunnerError::ExecutionFailed { reason: e.to_string() })?;
            Ok::<_, RunnerError>((stdout_buf?, stderr_buf?, status))
        };

        match tokio::time::timeout(timeout, run).await {
            Ok(Ok((stdout, stderr, status))) => Ok(ProcessOutput::new(
                stdout.into_bytes(),
                stderr.into_bytes(),
                status.code(),
                false,
            )),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(RunnerError::Timeout {
                timeout_secs: timeout.as_secs(),
                command: cmd.display(),
            }),
        }
    }
}

/// Read a piped stream line by line, appending each line to `log_path`
/// (if set) as it arrives, and accumulating the full text for the batch
/// `ProcessOutput`.
async fn tee_stream<R>(reader: R, log_path: Option<PathBuf>) -> Result<String, RunnerError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut accumulated = String::new();
    let mut log_handle = match &log_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| RunnerError::ExecutionFailed { reason: e.to_string() })?;
            }
            Some(
                tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await
                    .map_err(|e| RunnerError::ExecutionFailed { reason: e.to_string() })?,
            )
        }
        None => None,
    };

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| RunnerError::ExecutionFailed { reason: e.to_string() })?
    {
        accumulated.push_str(&line);
        accumulated.push('\n');
        if let Some(file) = &mut log_handle {
            file.write_all(line.as_bytes())
                .await
                .map_err(|e| RunnerError::ExecutionFailed { reason: e.to_string() })?;
            file.write_all(b"\n")
                .await
                .map_err(|e| RunnerError::ExecutionFailed { reason: e.to_string() })?;
        }
    }

    Ok(accumulated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_requires_zero_exit_and_no_timeout() {
        assert!(ProcessOutput::new(vec![], vec![], Some(0), false).success());
        assert!(!ProcessOutput::new(vec![], vec![], Some(1), false).success());
        assert!(!ProcessOutput::new(vec![], vec![], Some(0), true).success());
        assert!(!ProcessOutput::new(vec![], vec![], None, false).success());
    }

    #[test]
    fn lossy_utf8_conversion_does_not_panic() {
        let invalid = vec![0xff, 0xfe, 0x00, 0x01];
        let output = ProcessOutput::new(invalid.clone(), invalid, Some(0), false);
        assert!(!output.stdout_string().is_empty());
        assert!(!output.stderr_string().is_empty());
    }

    #[tokio::test]
    async fn runs_a_real_command_to_completion() {
        let runner = TokioProcessRunner;
        let cmd = CommandSpec::new("echo").arg("hello");
        let output = runner.run(&cmd, Duration::from_secs(5)).await.unwrap();
        assert!(output.success());
        assert!(output.stdout_string().contains("hello"));
    }

    #[tokio::test]
    async fn nonzero_exit_is_not_success_but_not_an_error() {
        let runner = TokioProcessRunner;
        let cmd = CommandSpec::new("false");
        let output = runner.run(&cmd, Duration::from_secs(5)).await.unwrap();
        assert!(!output.success());
        assert!(!output.timed_out);
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let runner = TokioProcessRunner;
        let cmd = CommandSpec::new("sleep").arg("5");
        let result = runner.run(&cmd, Duration::from_millis(50)).await;
        assert!(matches!(result, Err(RunnerError::Timeout { .. })));
    }

    #[tokio::test]
    async fn run_streaming_tees_output_into_log_file() {
        let runner = TokioProcessRunner;
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("build.log");
        let cmd = CommandSpec::new("echo").arg("building");

        let output = runner
            .run_streaming(&cmd, Duration::from_secs(5), Some(&log_path))
            .await
            .unwrap();

        assert!(output.success());
        assert!(output.stdout_string().contains("building"));
        let logged = tokio::fs::read_to_string(&log_path).await.unwrap();
        assert!(logged.contains("building"));
    }

    #[tokio::test]
    async fn run_streaming_times_out_on_slow_command() {
        let runner = TokioProcessRunner;
        let cmd = CommandSpec::new("sleep").arg("5");
        let result = runner.run_streaming(&cmd, Duration::from_millis(50), None).await;
        assert!(matches!(result, Err(RunnerError::Timeout { .. })));
    }
}
