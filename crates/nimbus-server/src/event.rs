//! The SSE event taxonomy (spec §7 "Dynamic shape of SSEEvent"): a
//! tagged variant keyed by `type`, serialized with the discriminator
//! inlined into the JSON object.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum SseEvent {
    JobCreated {
        job_id: String,
    },
    Generating,
    Generated {
        file_count: usize,
    },
    Scaffolding,
    Writing,
    Installing,
    Building,
    Log {
        phase: String,
        message: String,
    },
    Deploying,
    Deployed {
        deployed_url: String,
    },
    Complete {
        preview_url: String,
        deployed_url: String,
        metrics: CompletionMetricsView,
    },
    Error {
        message: String,
    },
}

/// The `metrics` payload of a `complete` event (spec §4.1 stage 7).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionMetricsView {
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
