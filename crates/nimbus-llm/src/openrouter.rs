//! OpenRouter chat-completion backend.

use crate::http_client::HttpClient;
use crate::types::{CompletionRequest, CompletionResponse, LlmError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 8192;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Resolved HTTP-level parameters for a single completion call.
#[derive(Debug, Clone, Copy)]
pub struct HttpParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for HttpParams {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// OpenAI-compatible chat completion backend for OpenRouter.
pub struct OpenRouterBackend {
    http: HttpClient,
    api_key: String,
    default_model: String,
}

impl OpenRouterBackend {
    #[must_use]
    pub fn new(http: HttpClient, api_key: String, default_model: String) -> Self {
        Self {
            http,
            api_key,
            default_model,
        }
    }

    /// Build a backend from environment variables `OPENROUTER_API_KEY`
    /// and `DEFAULT_MODEL`.
    ///
    /// # Errors
    /// Returns `LlmError::Misconfiguration` if either variable is unset.
    pub fn new_from_config() -> Result<Self, LlmError> {
        let api_key = std::env::var("OPENROUTER_API_KEY").map_err(|_| {
            LlmError::Misconfiguration("OPENROUTER_API_KEY is not set".to_string())
        })?;
        let default_model = std::env::var("DEFAULT_MODEL").map_err(|_| {
            LlmError::Misconfiguration("DEFAULT_MODEL is not set".to_string())
        })?;
        let http = HttpClient::new()?;
        Ok(Self::new(http, api_key, default_model))
    }

    fn resolve_model(&self, request: &CompletionRequest) -> String {
        if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        }
    }

    fn resolve_params(&self, request: &CompletionRequest) -> HttpParams {
        let defaults = HttpParams::default();
        HttpParams {
            max_tokens: if request.max_tokens > 0 {
                request.max_tokens
            } else {
                defaults.max_tokens
            },
            temperature: if request.temperature > 0.0 {
                request.temperature
            } else {
                defaults.temperature
            },
        }
    }

    /// Run a single chat completion against OpenRouter, optionally
    /// constrained by a JSON schema via `response_format`.
    ///
    /// # Errors
    /// Propagates `LlmError` variants from the underlying HTTP client, or
    /// `LlmError::Transport` if the response body cannot be decoded.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        let model = self.resolve_model(request);
        let params = self.resolve_params(request);

        let mut body = ChatRequest {
            model: model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.user.clone(),
                },
            ],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            response_format: None,
        };

        if let Some(schema) = &request.json_schema {
            body.response_format = Some(ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: schema.clone(),
            });
        }

        debug!(model, schema = request.json_schema.is_some(), "calling openrouter chat completion");

        let builder = self
            .http_request_builder()
            .json(&body);

        let response = self
            .http
            .execute_with_retry(builder, DEFAULT_REQUEST_TIMEOUT, "openrouter")
            .await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(format!("failed to decode openrouter response: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Transport("openrouter response had no choices".to_string()))?;

        Ok(CompletionResponse {
            content: choice.message.content,
            response_id: Some(parsed.id),
            prompt_tokens: parsed.usage.as_ref().map(|u| u.prompt_tokens),
            completion_tokens: parsed.usage.as_ref().map(|u| u.completion_tokens),
            cost: parsed.usage.as_ref().and_then(|u| u.cost),
        })
    }

    /// Fetch the actual dollar cost of a previously completed generation
    /// via OpenRouter's generation-details endpoint. Used when the primary
    /// response omitted `usage.cost` (spec §4.6 "Cost").
    ///
    /// # Errors
    /// Propagates `LlmError` variants from the underlying HTTP client.
    pub async fn generation_cost(&self, generation_id: &str) -> Result<f64, LlmError> {
        let url = format!("{OPENROUTER_BASE_URL}/generation?id={generation_id}");
        let builder = self
            .http
            .execute_with_retry(
                reqwest::Client::new()
                    .get(&url)
                    .bearer_auth(&self.api_key)
                    .header("HTTP-Referer", "https://nimbus.dev")
                    .header("X-Title", "nimbus"),
                Duration::from_secs(10),
                "openrouter",
            )
            .await?;

        let parsed: GenerationDetailsResponse = builder
            .json()
            .await
            .map_err(|e| LlmError::Transport(format!("failed to decode generation details: {e}")))?;

        Ok(parsed.data.total_cost)
    }

    fn http_request_builder(&self) -> reqwest::RequestBuilder {
        reqwest::Client::new()
            .post(format!("{OPENROUTER_BASE_URL}/chat/completions"))
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", "https://nimbus.dev")
            .header("X-Title", "nimbus")
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    json_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    id: String,
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    #[serde(default)]
    cost: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct GenerationDetailsResponse {
    data: GenerationDetailsData,
}

#[derive(Debug, Deserialize)]
struct GenerationDetailsData {
    total_cost: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> CompletionRequest {
        CompletionRequest {
            system: "sys".to_string(),
            user: "user".to_string(),
            model: String::new(),
            temperature: 0.0,
            max_tokens: 0,
            json_schema: None,
        }
    }

    #[test]
    fn default_http_params_match_spec_defaults() {
        let params = HttpParams::default();
        assert_eq!(params.max_tokens, 8192);
        assert!((params.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn resolve_params_falls_back_to_defaults_when_unset() {
        let backend = OpenRouterBackend::new(
            HttpClient::new().unwrap(),
            "key".to_string(),
            "model".to_string(),
        );
        let params = backend.resolve_params(&sample_request());
        assert_eq!(params.max_tokens, 8192);
        assert!((params.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn resolve_params_honors_request_overrides() {
        let backend = OpenRouterBackend::new(
            HttpClient::new().unwrap(),
            "key".to_string(),
            "model".to_string(),
        );
        let mut request = sample_request();
        request.max_tokens = 1024;
        request.temperature = 0.2;
        let params = backend.resolve_params(&request);
        assert_eq!(params.max_tokens, 1024);
        assert!((params.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn resolve_model_falls_back_to_default() {
        let backend = OpenRouterBackend::new(
            HttpClient::new().unwrap(),
            "key".to_string(),
            "anthropic/claude".to_string(),
        );
        assert_eq!(backend.resolve_model(&sample_request()), "anthropic/claude");
    }

    #[test]
    fn resolve_model_honors_request_override() {
        let backend = OpenRouterBackend::new(
            HttpClient::new().unwrap(),
            "key".to_string(),
            "anthropic/claude".to_string(),
        );
        let mut request = sample_request();
        request.model = "openai/gpt-4".to_string();
        assert_eq!(backend.resolve_model(&request), "openai/gpt-4");
    }

    #[test]
    fn new_from_config_missing_api_key_errors() {
        std::env::remove_var("OPENROUTER_API_KEY");
        std::env::set_var("DEFAULT_MODEL", "anthropic/claude");
        let result = OpenRouterBackend::new_from_config();
        assert!(matches!(result, Err(LlmError::Misconfiguration(_))));
    }

    #[test]
    fn new_from_config_missing_model_errors() {
        std::env::set_var("OPENROUTER_API_KEY", "test-key");
        std::env::remove_var("DEFAULT_MODEL");
        let result = OpenRouterBackend::new_from_config();
        assert!(matches!(result, Err(LlmError::Misconfiguration(_))));
    }
}
