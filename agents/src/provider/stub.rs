//! Stub backend: deterministic fake responses, no network calls. Used by
//! integration tests and by `--dry-run` when no provider is configured.

use std::sync::Mutex;

use async_trait::async_trait;
use maestro_core::{Message, ToolSpec};

use super::{CompletionResponse, ProviderBackend, ProviderError};

/// Either a fixed response repeated on every call, or a scripted sequence
/// consumed one call at a time (the last entry repeats once exhausted) —
/// enough to drive a multi-turn agent loop deterministically in tests.
enum Script {
    Fixed(String),
    Sequence(Mutex<(Vec<String>, usize)>),
}

pub struct StubBackend {
    script: Script,
}

impl StubBackend {
    pub fn new() -> Self {
        StubBackend { script: Script::Fixed("acknowledged.".to_string()) }
    }

    pub fn with_response(response: impl Into<String>) -> Self {
        StubBackend { script: Script::Fixed(response.into()) }
    }

    pub fn with_sequence(responses: Vec<String>) -> Self {
        StubBackend { script: Script::Sequence(Mutex::new((responses, 0))) }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderBackend for StubBackend {
    async fn complete(
        &self,
        _messages: &[Message],
        _model: &str,
        _tools: Option<&[ToolSpec]>,
    ) -> Result<CompletionResponse, ProviderError> {
        let content = match &self.script {
            Script::Fixed(response) => response.clone(),
            Script::Sequence(state) => {
                let mut state = state.lock().expect("stub backend mutex poisoned");
                let (responses, index) = &mut *state;
                let response = responses.get(*index).or_else(|| responses.last()).cloned().unwrap_or_default();
                if *index + 1 < responses.len() {
                    *index += 1;
                }
                response
            }
        };
        Ok(CompletionResponse { content, native_tool_calls: Vec::new() })
    }

    fn name(&self) -> &str {
        "stub"
    }
}
