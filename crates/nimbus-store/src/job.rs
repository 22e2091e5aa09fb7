//! The `Job` entity (spec §3) and its list-view projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Expired,
}

impl JobStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Expired => "expired",
        }
    }
}

/// The central job entity, `sqlx::FromRow` in snake_case; the HTTP
/// surface projects this to camelCase (SPEC_FULL §3 "Serialization
/// mapping").
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub prompt: String,
    pub model: String,
    pub status: JobStatus,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,

    pub preview_url: Option<String>,
    pub deployed_url: Option<String>,
    pub error_message: Option<String>,

    pub file_count: Option<i64>,
    pub lines_of_code: Option<i64>,

    pub prompt_tokens: Option<i64>,
    pub completion_tokens: Option<i64>,
    pub total_tokens: Option<i64>,
    pub cost: Option<f64>,
    pub llm_latency_ms: Option<i64>,
    pub install_duration_ms: Option<i64>,
    pub build_duration_ms: Option<i64>,
    pub deploy_duration_ms: Option<i64>,
    pub total_duration_ms: Option<i64>,

    pub build_log_key: Option<String>,
    pub deploy_log_key: Option<String>,
    pub worker_name: Option<String>,
}

const LIST_PROMPT_TRUNCATE_AT: usize = 100;

/// The `listJobs` projection (spec §4.5 "List projection"): truncated
/// prompt plus a handful of summary fields.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct JobListItem {
    pub id: String,
    pub prompt: String,
    pub model: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub deployed_url: Option<String>,
}

impl JobListItem {
    /// Truncate `prompt` at 100 characters, appending "…" when truncated.
    /// A prompt of length exactly 100 is returned untruncated (spec §8
    /// boundary behavior).
    pub(crate) fn truncate_prompt(prompt: &str) -> String {
        if prompt.chars().count() <= LIST_PROMPT_TRUNCATE_AT {
            return prompt.to_string();
        }
        let truncated: String = prompt.chars().take(LIST_PROMPT_TRUNCATE_AT).collect();
        format!("{truncated}…")
    }
}

/// Usage and timing metrics recorded on a successful completion (spec
/// §4.1 stage 7 "Finalize").
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionMetrics {
    pub file_count: i64,
    pub lines_of_code: i64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub cost: f64,
    pub llm_latency_ms: i64,
    pub install_duration_ms: i64,
    pub build_duration_ms: i64,
    pub deploy_duration_ms: i64,
    pub total_duration_ms: i64,
}

/// The options shared by `markCompleted` and `markFailed` (spec §4.5).
#[derive(Debug, Clone)]
pub struct TerminalExtras {
    pub expires_at: DateTime<Utc>,
    pub worker_name: Option<String>,
    pub build_log_key: Option<String>,
    pub deploy_log_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_of_exactly_100_chars_is_untruncated() {
        let prompt = "a".repeat(100);
        assert_eq!(JobListItem::truncate_prompt(&prompt), prompt);
    }

    #[test]
    fn prompt_of_101_chars_is_truncated_with_ellipsis() {
        let prompt = "a".repeat(101);
        let truncated = JobListItem::truncate_prompt(&prompt);
        assert_eq!(truncated.chars().count(), 101);
        assert!(truncated.ends_with('…'));
    }
}
