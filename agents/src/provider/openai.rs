//! OpenAI-compatible chat completions backend.

use async_trait::async_trait;
use maestro_core::{Message, Role, ToolCall, ToolSpec};
use serde_json::json;

use super::{CompletionResponse, ProviderBackend, ProviderError};

pub struct OpenAiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiBackend {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        OpenAiBackend {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn wire_tools(tools: Option<&[ToolSpec]>) -> Option<serde_json::Value> {
    let tools = tools?;
    if tools.is_empty() {
        return None;
    }
    Some(json!(tools
        .iter()
        .map(|t| json!({
            "type": "function",
            "function": {
                "name": t.name,
                "description": t.description,
                "parameters": t.parameters,
            },
        }))
        .collect::<Vec<_>>()))
}

#[async_trait]
impl ProviderBackend for OpenAiBackend {
    async fn complete(
        &self,
        messages: &[Message],
        model: &str,
        tools: Option<&[ToolSpec]>,
    ) -> Result<CompletionResponse, ProviderError> {
        let wire_messages: Vec<_> = messages
            .iter()
            .map(|m| {
                let mut entry = json!({ "role": role_str(m.role), "content": m.content });
                if let Some(call_id) = &m.call_id {
                    entry["tool_call_id"] = json!(call_id);
                }
                entry
            })
            .collect();

        let mut body = json!({ "model": model, "messages": wire_messages });
        if let Some(wire_tools) = wire_tools(tools) {
            body["tools"] = wire_tools;
        }

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited { retry_after_secs: None });
        }
        if status == reqwest::StatusCode::FORBIDDEN {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::ModelRefused(text));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Transport(format!("HTTP {status}: {text}")));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let choice = payload
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .ok_or_else(|| ProviderError::InvalidResponse("missing choices[0]".to_string()))?;

        let message = choice
            .get("message")
            .ok_or_else(|| ProviderError::InvalidResponse("missing choices[0].message".to_string()))?;

        let content = message.get("content").and_then(|c| c.as_str()).unwrap_or("").to_string();

        let native_tool_calls: Vec<ToolCall> = message
            .get("tool_calls")
            .and_then(|c| c.as_array())
            .map(|calls| {
                calls
                    .iter()
                    .filter_map(|c| {
                        let function = c.get("function")?;
                        let arguments: serde_json::Value =
                            serde_json::from_str(function.get("arguments")?.as_str()?).ok()?;
                        Some(ToolCall {
                            id: c.get("id")?.as_str()?.to_string(),
                            name: function.get("name")?.as_str()?.to_string(),
                            arguments,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(CompletionResponse { content, native_tool_calls })
    }

    fn name(&self) -> &str {
        "openai"
    }
}
