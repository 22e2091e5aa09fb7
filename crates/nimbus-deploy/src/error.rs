use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    /// Deploy command exited nonzero or no URL could be parsed from its
    /// output. Carries the credential-sanitized log for archival (spec
    /// §4.4).
    #[error("deploy failed:\n--- deploy log (tail) ---\n{log}")]
    Failed { log: String },

    /// The edge-worker delete API rejected the request (other than 404,
    /// which the caller treats as success; spec §4.7 step 1).
    #[error("edge-worker delete failed for {worker_name}: {reason}")]
    DeleteFailed { worker_name: String, reason: String },
}
