//! Provider Contract (C2): a provider-agnostic async interface over LLM
//! backends. Rust traits with generic/async methods aren't dyn-compatible in
//! the general case, so — following the teacher's `Adapter` enum — this is a
//! closed enum over concrete backends rather than a `Box<dyn Provider>`.

pub mod anthropic;
pub mod ollama;
pub mod openai;
pub mod stub;

use async_trait::async_trait;
use maestro_core::{Message, ToolCall, ToolSpec};
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rate limited, retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },
    #[error("model refused the request: {0}")]
    ModelRefused(String),
    #[error("invalid response from provider: {0}")]
    InvalidResponse(String),
}

/// One turn's worth of model output: prose plus any native tool calls the
/// backend's API surfaced structurally (as opposed to text-embedded ones the
/// Tool Runtime's parser extracts from `content`).
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub native_tool_calls: Vec<ToolCall>,
}

#[async_trait]
pub trait ProviderBackend {
    async fn complete(
        &self,
        messages: &[Message],
        model: &str,
        tools: Option<&[ToolSpec]>,
    ) -> Result<CompletionResponse, ProviderError>;

    fn name(&self) -> &str;
}

/// Closed enum over every backend this build supports. Adding a backend
/// means adding a variant and a delegation arm, not changing every call site.
pub enum Provider {
    Anthropic(anthropic::AnthropicBackend),
    OpenAi(openai::OpenAiBackend),
    Ollama(ollama::OllamaBackend),
    Stub(stub::StubBackend),
}

impl Provider {
    pub async fn complete(
        &self,
        messages: &[Message],
        model: &str,
        tools: Option<&[ToolSpec]>,
    ) -> Result<CompletionResponse, ProviderError> {
        match self {
            Provider::Anthropic(backend) => backend.complete(messages, model, tools).await,
            Provider::OpenAi(backend) => backend.complete(messages, model, tools).await,
            Provider::Ollama(backend) => backend.complete(messages, model, tools).await,
            Provider::Stub(backend) => backend.complete(messages, model, tools).await,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Provider::Anthropic(backend) => backend.name(),
            Provider::OpenAi(backend) => backend.name(),
            Provider::Ollama(backend) => backend.name(),
            Provider::Stub(backend) => backend.name(),
        }
    }
}
