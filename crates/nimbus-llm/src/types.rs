//! Shared types for the LLM client.

use std::time::Duration;
use thiserror::Error;

/// A single file emitted by the LLM (spec §3 `GeneratedFile`).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
}

/// A chat completion request, provider-agnostic.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// When present, the backend should request a structured (JSON-schema)
    /// response. `None` means "plain JSON, no schema descriptor" — the
    /// fallback mode spec §4.6 describes.
    pub json_schema: Option<serde_json::Value>,
}

/// A chat completion response, provider-agnostic.
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub content: String,
    pub response_id: Option<String>,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    /// Present only when the provider includes cost inline with the
    /// primary response (spec §4.6 "Cost").
    pub cost: Option<f64>,
}

/// Token usage and cost for a completed generation.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct Usage {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub cost: f64,
}

/// The parsed result of a full generate-and-parse cycle.
#[derive(Debug, Clone)]
pub struct GenerateResult {
    pub files: Vec<GeneratedFile>,
    pub usage: Usage,
    pub llm_latency_ms: i64,
}

/// Errors surfaced by the LLM client (spec §7 `LLMFailure`).
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM misconfiguration: {0}")]
    Misconfiguration(String),

    #[error("{0} authentication failed")]
    ProviderAuth(String),

    #[error("{0} rate limit exceeded")]
    ProviderQuota(String),

    #[error("{0} returned a server error")]
    ProviderOutage(String),

    #[error("request timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("could not parse LLM response as a file tree: {0}")]
    ParseFailure(String),
}
