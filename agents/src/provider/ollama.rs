//! Ollama local-model backend. No API key, no rate limiting, no native
//! tool-call support — agents relying on a local model get tool calls only
//! through the text-embedded JSON parser in `maestro-tools`.

use async_trait::async_trait;
use maestro_core::{Message, Role, ToolSpec};
use serde_json::json;

use super::{CompletionResponse, ProviderBackend, ProviderError};

pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        OllamaBackend { client: reqwest::Client::new(), base_url: base_url.into() }
    }
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "user",
    }
}

#[async_trait]
impl ProviderBackend for OllamaBackend {
    async fn complete(
        &self,
        messages: &[Message],
        model: &str,
        _tools: Option<&[ToolSpec]>,
    ) -> Result<CompletionResponse, ProviderError> {
        let wire_messages: Vec<_> = messages
            .iter()
            .map(|m| json!({ "role": role_str(m.role), "content": m.content }))
            .collect();

        let body = json!({ "model": model, "messages": wire_messages, "stream": false });

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Transport(format!("HTTP {status}: {text}")));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let content = payload
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| ProviderError::InvalidResponse("missing message.content".to_string()))?
            .to_string();

        Ok(CompletionResponse { content, native_tool_calls: Vec::new() })
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
