use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("sandbox exec failed: {0}")]
    Exec(String),

    #[error("sandbox write_file failed: {0}")]
    WriteFile(String),

    #[error("sandbox destroy failed: {0}")]
    Destroy(String),

    #[error("command timed out: {command}")]
    Timeout { command: String },

    /// Install or build exited nonzero, or a required build artifact is
    /// missing. Carries the sandbox id and a bounded log tail so the
    /// pipeline can attach it to the terminal error (spec §4.3, §7).
    #[error("build failed in sandbox {sandbox_id}:\n--- {phase} log (tail) ---\n{log_tail}")]
    BuildFailure {
        sandbox_id: String,
        phase: String,
        log_tail: String,
    },
}
