//! MessageHistory, ToolCall and ToolResult: the agent loop's conversational state.

use serde_json::Value;
use serde::{Deserialize, Serialize};

/// Fixed tool catalog (§4.1). Any other name is rejected by the Tool Runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    ReadFile,
    WriteFile,
    ApplyPatch,
    RunCommand,
    ProjectMap,
}

impl ToolName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::ReadFile => "read_file",
            ToolName::WriteFile => "write_file",
            ToolName::ApplyPatch => "apply_patch",
            ToolName::RunCommand => "run_command",
            ToolName::ProjectMap => "project_map",
        }
    }

    pub fn from_str(s: &str) -> Option<ToolName> {
        match s {
            "read_file" => Some(ToolName::ReadFile),
            "write_file" => Some(ToolName::WriteFile),
            "apply_patch" => Some(ToolName::ApplyPatch),
            "run_command" => Some(ToolName::RunCommand),
            "project_map" => Some(ToolName::ProjectMap),
            _ => None,
        }
    }

    /// Whether this tool can mutate the workspace (used by the read-only safety valve
    /// and by the Verifier's docs-only skip rule).
    pub fn is_mutating(&self) -> bool {
        matches!(self, ToolName::WriteFile | ToolName::ApplyPatch)
    }

    /// The wire-level schema for this tool (§4.1), used to populate a
    /// provider request's `tools` array so native tool-call support can
    /// actually engage instead of falling back to text-embedded parsing.
    pub fn spec(&self) -> ToolSpec {
        let (description, parameters) = match self {
            ToolName::ReadFile => (
                "Read the complete contents of a file in the workspace.",
                serde_json::json!({
                    "type": "object",
                    "properties": { "path": { "type": "string" } },
                    "required": ["path"],
                }),
            ),
            ToolName::WriteFile => (
                "Write the complete content of a file, creating parent directories as needed.",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "path": { "type": "string" },
                        "content": { "type": "string" },
                    },
                    "required": ["path", "content"],
                }),
            ),
            ToolName::ApplyPatch => (
                "Replace one exact, unique occurrence of `search` with `replace` in a file.",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "path": { "type": "string" },
                        "search": { "type": "string" },
                        "replace": { "type": "string" },
                    },
                    "required": ["path", "search", "replace"],
                }),
            ),
            ToolName::RunCommand => (
                "Run a single shell command line in the workspace and return its combined output.",
                serde_json::json!({
                    "type": "object",
                    "properties": { "command": { "type": "string" } },
                    "required": ["command"],
                }),
            ),
            ToolName::ProjectMap => (
                "Return a file-tree summary of the workspace, respecting common ignore patterns.",
                serde_json::json!({
                    "type": "object",
                    "properties": { "max_depth": { "type": "integer" } },
                    "required": [],
                }),
            ),
        };
        ToolSpec { name: self.as_str().to_string(), description: description.to_string(), parameters }
    }
}

/// A tool's wire-level schema as sent in a provider request's `tools` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// `(id, name, arguments)` emitted by an LLM response, native or text-embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// `(call_id, text, error?, modifiedFiles[])`, appended as a "tool" role message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub text: String,
    pub error: Option<String>,
    pub modified_files: Vec<String>,
}

impl ToolResult {
    pub fn ok(call_id: impl Into<String>, text: impl Into<String>) -> Self {
        ToolResult {
            call_id: call_id.into(),
            text: text.into(),
            error: None,
            modified_files: Vec::new(),
        }
    }

    pub fn ok_with_modified(call_id: impl Into<String>, text: impl Into<String>, modified: Vec<String>) -> Self {
        ToolResult {
            call_id: call_id.into(),
            text: text.into(),
            error: None,
            modified_files: modified,
        }
    }

    pub fn failed(call_id: impl Into<String>, error: impl Into<String>) -> Self {
        let error = error.into();
        ToolResult {
            call_id: call_id.into(),
            text: error.clone(),
            error: Some(error),
            modified_files: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Present on assistant messages that emitted tool calls.
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    /// Present on tool-role messages; must match an earlier assistant tool call id.
    #[serde(default)]
    pub call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message { role: Role::System, content: content.into(), tool_calls: Vec::new(), call_id: None }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message { role: Role::User, content: content.into(), tool_calls: Vec::new(), call_id: None }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message { role: Role::Assistant, content: content.into(), tool_calls: Vec::new(), call_id: None }
    }

    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Message { role: Role::Assistant, content: content.into(), tool_calls, call_id: None }
    }

    pub fn tool(result: &ToolResult) -> Self {
        Message {
            role: Role::Tool,
            content: result.text.clone(),
            tool_calls: Vec::new(),
            call_id: Some(result.call_id.clone()),
        }
    }
}

/// Ordered sequence of messages. Owned; passed by mutable reference to the
/// currently-running agent turn, never aliased across agents (Design Notes §9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageHistory {
    messages: Vec<Message>,
}

impl MessageHistory {
    pub fn new() -> Self {
        MessageHistory { messages: Vec::new() }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Invariant (§3, §8.3): every tool message's call_id matches a tool call
    /// in the immediately-preceding assistant message.
    pub fn check_pairing_invariant(&self) -> bool {
        for (idx, message) in self.messages.iter().enumerate() {
            if message.role != Role::Tool {
                continue;
            }
            let Some(call_id) = &message.call_id else {
                return false;
            };
            let Some(prev) = idx.checked_sub(1).map(|i| &self.messages[i]) else {
                return false;
            };
            if prev.role != Role::Assistant || !prev.tool_calls.iter().any(|tc| &tc.id == call_id) {
                return false;
            }
        }
        true
    }

    /// Truncate from the front while preserving the pairing invariant: an
    /// assistant tool-call message and its tool-result message are never split.
    pub fn truncate_front_preserving_pairs(&mut self, max_messages: usize) {
        if self.messages.len() <= max_messages {
            return;
        }
        let mut cut = self.messages.len() - max_messages;
        while cut < self.messages.len() && self.messages[cut].role == Role::Tool {
            cut += 1;
        }
        self.messages.drain(0..cut);
    }
}
