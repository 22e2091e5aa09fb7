//! HTTP-facing DTOs. The store's `Job`/`JobListItem` are snake_case
//! internally; everything crossing the wire is camelCase (spec §8
//! "round-trips... modulo camelCase↔snake_case mapping").

use chrono::{DateTime, Utc};
use nimbus_store::{Job, JobListItem, JobStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateJobBody {
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListItemDto {
    pub id: String,
    pub prompt: String,
    pub model: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub deployed_url: Option<String>,
}

impl From<JobListItem> for JobListItemDto {
    fn from(item: JobListItem) -> Self {
        Self {
            id: item.id,
            prompt: item.prompt,
            model: item.model,
            status: item.status,
            created_at: item.created_at,
            deployed_url: item.deployed_url,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDto {
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
    pub worker_name: Option<String>,
}

impl From<Job> for JobDto {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            prompt: job.prompt,
            model: job.model,
            status: job.status,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            expires_at: job.expires_at,
            preview_url: job.preview_url,
            deployed_url: job.deployed_url,
            error_message: job.error_message,
            file_count: job.file_count,
            lines_of_code: job.lines_of_code,
            prompt_tokens: job.prompt_tokens,
            completion_tokens: job.completion_tokens,
            total_tokens: job.total_tokens,
            cost: job.cost,
            llm_latency_ms: job.llm_latency_ms,
            install_duration_ms: job.install_duration_ms,
            build_duration_ms: job.build_duration_ms,
            deploy_duration_ms: job.deploy_duration_ms,
            total_duration_ms: job.total_duration_ms,
            worker_name: job.worker_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobsResponse {
    pub jobs: Vec<JobListItemDto>,
}
