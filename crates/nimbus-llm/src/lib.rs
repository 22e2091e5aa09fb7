//! LLM client: structured-output generation against OpenRouter, with
//! fallback to schema-less JSON and generation cost lookup.

mod generate;
mod http_client;
mod openrouter;
mod types;

pub use generate::generate;
pub use http_client::HttpClient;
pub use openrouter::{HttpParams, OpenRouterBackend};
pub use types::{
    CompletionRequest, CompletionResponse, GenerateResult, GeneratedFile, LlmError, Usage,
};

use async_trait::async_trait;

/// A provider-agnostic LLM backend, implemented by `OpenRouterBackend`
/// and by test doubles. The job pipeline depends on this trait rather
/// than on `OpenRouterBackend` directly.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Run a single chat completion.
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Resolve the dollar cost of a previously completed generation.
    async fn generation_cost(&self, generation_id: &str) -> Result<f64, LlmError>;
}

#[async_trait]
impl LlmBackend for OpenRouterBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        OpenRouterBackend::complete(self, request).await
    }

    async fn generation_cost(&self, generation_id: &str) -> Result<f64, LlmError> {
        OpenRouterBackend::generation_cost(self, generation_id).await
    }
}
