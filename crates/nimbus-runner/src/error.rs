use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("execution failed: {reason}")]
    ExecutionFailed { reason: String },

    #[error("command timed out after {timeout_secs}s: {command}")]
    Timeout { timeout_secs: u64, command: String },
}
