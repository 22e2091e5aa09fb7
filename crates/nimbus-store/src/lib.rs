//! Durable state for the build pipeline (spec §4.5): the job table
//! (C1) and the archived build/deploy logs (C2).

mod archive;
mod error;
mod job;
mod store;

pub use archive::{build_log_key, deploy_log_key, FsLogArchive, LogArchive};
pub use error::StoreError;
pub use job::{CompletionMetrics, Job, JobListItem, JobStatus, TerminalExtras};
pub use store::JobStore;
