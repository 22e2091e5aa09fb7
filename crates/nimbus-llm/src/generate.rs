//! Top-level generation: structured-output request with a graceful
//! fallback to schema-less JSON, file-tree parsing, and cost lookup
//! (spec §4.6).

use crate::types::{CompletionRequest, GenerateResult, GeneratedFile, LlmError, Usage};
use crate::LlmBackend;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, warn};

/// Matches provider error messages that indicate rejection of the
/// `response_format`/schema parameter rather than a genuine failure.
static SCHEMA_REJECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)response_format|structured output|json_schema|schema").unwrap()
});

const GENERATION_COST_DELAY: std::time::Duration = std::time::Duration::from_millis(500);

/// Fixed sampling parameters for generation requests (spec §4.6).
const GENERATION_TEMPERATURE: f32 = 0.7;
const GENERATION_MAX_TOKENS: u32 = 8192;

#[derive(Debug, Deserialize)]
struct FileTree {
    files: Vec<GeneratedFile>,
}

/// Generate a file tree from a prompt, with the following sequence:
///
/// 1. Request completion with a JSON-schema `response_format`.
/// 2. If the provider rejects the schema parameter specifically, retry
///    once without it.
/// 3. Parse the response content as a `{"files": [...]}` tree, stripping
///    a surrounding Markdown code fence if present.
/// 4. Resolve generation cost: prefer inline `usage.cost`; otherwise wait
///    briefly and query the provider's generation-details endpoint,
///    swallowing any error to a cost of `0.0`.
///
/// # Errors
/// Returns `LlmError::ParseFailure` if the response content cannot be
/// parsed as a file tree, or propagates provider-level `LlmError`s.
pub async fn generate(
    backend: &dyn LlmBackend,
    system: &str,
    user: &str,
    model: &str,
    json_schema: serde_json::Value,
) -> Result<GenerateResult, LlmError> {
    let started = Instant::now();

    let schema_request = CompletionRequest {
        system: system.to_string(),
        user: user.to_string(),
        model: model.to_string(),
        temperature: GENERATION_TEMPERATURE,
        max_tokens: GENERATION_MAX_TOKENS,
        json_schema: Some(json_schema),
    };

    let response = match backend.complete(&schema_request).await {
        Ok(response) => response,
        Err(e) if is_schema_rejection(&e) => {
            warn!(error = %e, "provider rejected structured output, retrying without schema");
            let fallback_request = CompletionRequest {
                json_schema: None,
                ..schema_request
            };
            backend.complete(&fallback_request).await?
        }
        Err(e) => return Err(e),
    };

    let llm_latency_ms = started.elapsed().as_millis() as i64;

    let files = parse_file_tree(&response.content)?;

    let cost = match response.cost {
        Some(cost) => cost,
        None => resolve_cost_with_delay(backend, response.response_id.as_deref()).await,
    };

    let usage = Usage {
        prompt_tokens: response.prompt_tokens.unwrap_or(0) as i64,
        completion_tokens: response.completion_tokens.unwrap_or(0) as i64,
        total_tokens: (response.prompt_tokens.unwrap_or(0) + response.completion_tokens.unwrap_or(0)) as i64,
        cost,
    };

    Ok(GenerateResult {
        files,
        usage,
        llm_latency_ms,
    })
}

fn is_schema_rejection(error: &LlmError) -> bool {
    matches!(error, LlmError::Transport(message) if SCHEMA_REJECTION.is_match(message))
}

async fn resolve_cost_with_delay(backend: &dyn LlmBackend, response_id: Option<&str>) -> f64 {
    let Some(response_id) = response_id else {
        return 0.0;
    };

    tokio::time::sleep(GENERATION_COST_DELAY).await;

    match backend.generation_cost(response_id).await {
        Ok(cost) => cost,
        Err(e) => {
            debug!(error = %e, "generation cost lookup failed, defaulting to 0.0");
            0.0
        }
    }
}

/// Parse an LLM response body as a file tree, stripping a surrounding
/// Markdown code fence (```` ``` ```` or ` ```json `) if present.
fn parse_file_tree(content: &str) -> Result<Vec<GeneratedFile>, LlmError> {
    let stripped = strip_code_fence(content);

    let tree: FileTree = serde_json::from_str(stripped).map_err(|_| {
        let diagnostic: String = stripped.chars().take(500).collect();
        LlmError::ParseFailure(diagnostic)
    })?;

    if tree.files.is_empty() {
        return Err(LlmError::ParseFailure(
            "response contained a \"files\" array with zero entries".to_string(),
        ));
    }

    Ok(tree.files)
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let after_open = after_open
        .strip_prefix("json")
        .unwrap_or(after_open)
        .trim_start_matches('\n');
    after_open.strip_suffix("```").map_or(after_open, str::trim_end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json_file_tree() {
        let content = r#"{"files":[{"path":"index.html","content":"<html></html>"}]}"#;
        let files = parse_file_tree(content).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "index.html");
    }

    #[test]
    fn strips_fenced_json_block() {
        let content = "```json\n{\"files\":[{\"path\":\"a.js\",\"content\":\"x\"}]}\n```";
        let files = parse_file_tree(content).unwrap();
        assert_eq!(files[0].path, "a.js");
    }

    #[test]
    fn strips_bare_fence_without_language_tag() {
        let content = "```\n{\"files\":[{\"path\":\"a.js\",\"content\":\"x\"}]}\n```";
        let files = parse_file_tree(content).unwrap();
        assert_eq!(files[0].path, "a.js");
    }

    #[test]
    fn rejects_empty_file_array() {
        let content = r#"{"files":[]}"#;
        assert!(matches!(parse_file_tree(content), Err(LlmError::ParseFailure(_))));
    }

    #[test]
    fn malformed_json_yields_parse_failure_with_diagnostic() {
        let content = "not json at all, just prose explaining why it refused";
        match parse_file_tree(content) {
            Err(LlmError::ParseFailure(diagnostic)) => {
                assert!(diagnostic.contains("not json"));
                assert!(diagnostic.len() <= 500);
            }
            other => panic!("expected ParseFailure, got {other:?}"),
        }
    }

    #[test]
    fn long_malformed_content_truncates_diagnostic_to_500_chars() {
        let content = "x".repeat(2000);
        match parse_file_tree(&content) {
            Err(LlmError::ParseFailure(diagnostic)) => assert_eq!(diagnostic.len(), 500),
            other => panic!("expected ParseFailure, got {other:?}"),
        }
    }

    #[test]
    fn schema_rejection_detected_from_transport_message() {
        let error = LlmError::Transport("openrouter returned client error: response_format not supported".to_string());
        assert!(is_schema_rejection(&error));
    }

    #[test]
    fn non_schema_transport_error_is_not_a_rejection() {
        let error = LlmError::Transport("openrouter request failed: connection reset".to_string());
        assert!(!is_schema_rejection(&error));
    }
}
