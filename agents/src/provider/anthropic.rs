//! Anthropic Messages API backend.

use async_trait::async_trait;
use maestro_core::{Message, Role, ToolCall, ToolSpec};
use serde_json::json;

use super::{CompletionResponse, ProviderBackend, ProviderError};

pub struct AnthropicBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AnthropicBackend {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        AnthropicBackend {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

fn role_str(role: Role) -> Option<&'static str> {
    match role {
        Role::System => None, // carried separately in the Anthropic wire format
        Role::User => Some("user"),
        Role::Assistant => Some("assistant"),
        Role::Tool => Some("user"), // tool results ride back as a user-turn content block
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
            "name": t.name,
            "description": t.description,
            "input_schema": t.parameters,
        }))
        .collect::<Vec<_>>()))
}

#[async_trait]
impl ProviderBackend for AnthropicBackend {
    async fn complete(
        &self,
        messages: &[Message],
        model: &str,
        tools: Option<&[ToolSpec]>,
    ) -> Result<CompletionResponse, ProviderError> {
        let system: String = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let wire_messages: Vec<_> = messages
            .iter()
            .filter_map(|m| role_str(m.role).map(|role| json!({ "role": role, "content": m.content })))
            .collect();

        let mut body = json!({
            "model": model,
            "max_tokens": 4096,
            "system": system,
            "messages": wire_messages,
        });
        if let Some(wire_tools) = wire_tools(tools) {
            body["tools"] = wire_tools;
        }

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());
            return Err(ProviderError::RateLimited { retry_after_secs: retry_after });
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

        let content = payload
            .get("content")
            .and_then(|blocks| blocks.as_array())
            .map(|blocks| {
                blocks
                    .iter()
                    .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| ProviderError::InvalidResponse("missing content blocks".to_string()))?;

        let native_tool_calls: Vec<ToolCall> = payload
            .get("content")
            .and_then(|blocks| blocks.as_array())
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("tool_use"))
                    .filter_map(|b| {
                        Some(ToolCall {
                            id: b.get("id")?.as_str()?.to_string(),
                            name: b.get("name")?.as_str()?.to_string(),
                            arguments: b.get("input").cloned().unwrap_or(json!({})),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(CompletionResponse { content, native_tool_calls })
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}
