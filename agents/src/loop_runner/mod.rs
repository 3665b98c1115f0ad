//! Agent loop (C3): the generic shape shared by the Analyzer, Planner,
//! Editor, Reviewer and Classifier — a system prompt, a tool subset, an
//! iteration cap, and a safety valve for read-only turns.
//!
//! A turn that hasn't mutated anything yet and gets back a successful
//! read-only tool result has already gotten what a read-only turn needs: the
//! loop returns that result directly instead of paying for another provider
//! round-trip just so the model can restate it in prose. Once a mutation has
//! happened, or a read-only call fails, the ordinary loop continues; a
//! secondary valve still ends the turn if the exact same (tool, arguments)
//! pair repeats, since that's a stall no amount of extra iterations fixes.

use std::collections::HashSet;

use maestro_core::{MaestroErrorKind, Message, MessageHistory, ToolName};
use maestro_tools::ToolRuntime;
use tracing::{info, warn};

use crate::provider::{Provider, ProviderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    Analyzer,
    Planner,
    Editor,
    Reviewer,
    Classifier,
}

impl AgentRole {
    pub fn system_prompt(&self) -> &'static str {
        match self {
            AgentRole::Analyzer => {
                "You analyze a user's task description. Identify intent, estimate complexity \
                 on a 1-10 scale, and list the files likely required. Use read_file and \
                 project_map to inspect the workspace; never write or patch anything."
            }
            AgentRole::Planner => {
                "You write a plan document for one movement. The document must contain exactly \
                 these headings, in order: '## Files to modify', '## Changes', '## Success Criteria'. \
                 Use read_file and project_map to ground the plan in the real workspace; never \
                 write or patch anything yourself. When a success criterion checks a dependency \
                 version, write the bare version number ('mix.exs contains \"1.15.4\"') rather than \
                 the ecosystem's own operator prefix — the reviewer already knows each ecosystem's \
                 convention (Elixir's '~> 1.15.4', npm's '^1.15.4' or '~1.15.4', Go's bare 'v1.15.4' \
                 module line, a Gemfile's '~> 1.15.4') and accepts either form, so the bare version \
                 is the one phrasing that matches regardless of which file the Editor touches."
            }
            AgentRole::Editor => {
                "You implement the current plan document by editing files with write_file and \
                 apply_patch. Only touch files listed under the plan's '## Files to modify' \
                 heading. Use run_command to compile or test your changes as you go."
            }
            AgentRole::Reviewer => {
                "You check the Editor's output against the plan's success criteria. Use \
                 read_file and run_command to verify each criterion mechanically; explain any \
                 criterion that fails, but do not decide pass/fail by judgment alone."
            }
            AgentRole::Classifier => {
                "You classify a short piece of text into one label from the options given. \
                 Respond with the label and nothing else. You have no tools."
            }
        }
    }

    pub fn allowed_tools(&self) -> &'static [ToolName] {
        match self {
            AgentRole::Analyzer => &[ToolName::ReadFile, ToolName::ProjectMap],
            AgentRole::Planner => &[ToolName::ReadFile, ToolName::ProjectMap],
            AgentRole::Editor => &[ToolName::ReadFile, ToolName::WriteFile, ToolName::ApplyPatch, ToolName::RunCommand, ToolName::ProjectMap],
            AgentRole::Reviewer => &[ToolName::ReadFile, ToolName::RunCommand],
            AgentRole::Classifier => &[],
        }
    }

    /// Lowercase role name, as recorded on every `ExecutionRecord` the
    /// Executor appends for this role's invocations.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Analyzer => "analyzer",
            AgentRole::Planner => "planner",
            AgentRole::Editor => "editor",
            AgentRole::Reviewer => "reviewer",
            AgentRole::Classifier => "classifier",
        }
    }

    /// Role-specific iteration cap (§4.3).
    pub fn max_iterations(&self) -> u32 {
        match self {
            AgentRole::Analyzer => 4,
            AgentRole::Planner => 3,
            AgentRole::Editor => 10,
            AgentRole::Reviewer => 4,
            AgentRole::Classifier => 1,
        }
    }
}

pub struct TurnOutcome {
    pub final_text: String,
    pub iterations_used: u32,
    /// Every path registered as modified by a tool result during this turn,
    /// in the order the Editor's tool calls mutated them (§4.3 step 5).
    pub modified_files: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AgentLoopError {
    #[error("{0}")]
    Provider(#[from] ProviderError),
    #[error("agent turn exceeded its iteration cap of {0}")]
    MaxIterations(u32),
}

impl AgentLoopError {
    pub fn kind(&self) -> MaestroErrorKind {
        match self {
            AgentLoopError::Provider(ProviderError::RateLimited { .. }) => MaestroErrorKind::ProviderRateLimited,
            AgentLoopError::Provider(_) => MaestroErrorKind::ProviderTransport,
            AgentLoopError::MaxIterations(_) => MaestroErrorKind::MaxIterations,
        }
    }
}

/// Runs one agent turn to completion: repeatedly calls the provider, executes
/// any tool calls it emits, and feeds the results back, until the model
/// responds with no tool call, the iteration cap is hit, or the safety valve
/// trips on a repeated no-op read.
pub async fn run_turn(
    role: AgentRole,
    provider: &Provider,
    model: &str,
    history: &mut MessageHistory,
    tools: &ToolRuntime,
) -> Result<TurnOutcome, AgentLoopError> {
    let mut seen_read_only_signatures: HashSet<String> = HashSet::new();
    let mut modified_files: Vec<String> = Vec::new();
    let mut mutation_used = false;
    let max_iterations = role.max_iterations();

    let tool_specs: Vec<_> = role.allowed_tools().iter().map(|t| t.spec()).collect();
    let tool_specs = if tool_specs.is_empty() { None } else { Some(tool_specs.as_slice()) };

    for iteration in 1..=max_iterations {
        let response = provider.complete(history.as_slice(), model, tool_specs).await?;

        let tool_call = response
            .native_tool_calls
            .first()
            .cloned()
            .or_else(|| maestro_tools::extract_tool_call(&response.content).map(|(call, _)| call));

        let Some(tool_call) = tool_call else {
            history.push(Message::assistant(response.content.clone()));
            info!(role = ?role, iteration, "agent turn finished with a prose response");
            return Ok(TurnOutcome { final_text: response.content, iterations_used: iteration, modified_files });
        };

        let Some(tool) = ToolName::from_str(&tool_call.name) else {
            history.push(Message::assistant_with_tool_calls(response.content.clone(), vec![tool_call.clone()]));
            history.push(Message::tool(&maestro_core::ToolResult::failed(
                tool_call.id.clone(),
                format!("tool '{}' is not in this agent's allowed tool set", tool_call.name),
            )));
            continue;
        };

        if !role.allowed_tools().contains(&tool) {
            history.push(Message::assistant_with_tool_calls(response.content.clone(), vec![tool_call.clone()]));
            history.push(Message::tool(&maestro_core::ToolResult::failed(
                tool_call.id.clone(),
                format!("tool '{}' is not permitted for this role", tool_call.name),
            )));
            continue;
        }

        let result = tools.dispatch(&tool_call).await;
        for path in &result.modified_files {
            if !modified_files.contains(path) {
                modified_files.push(path.clone());
            }
        }
        history.push(Message::assistant_with_tool_calls(response.content.clone(), vec![tool_call.clone()]));
        history.push(Message::tool(&result));

        if tool.is_mutating() {
            mutation_used = true;
            continue;
        }

        if !mutation_used && result.is_ok() {
            info!(role = ?role, iteration, "read-only turn ended after its first successful result");
            return Ok(TurnOutcome { final_text: result.text, iterations_used: iteration, modified_files });
        }

        let signature = format!("{}:{}", tool_call.name, tool_call.arguments);
        if !seen_read_only_signatures.insert(signature) {
            warn!(role = ?role, iteration, "safety valve: identical read-only call repeated, ending turn");
            return Ok(TurnOutcome { final_text: response.content, iterations_used: iteration, modified_files });
        }
    }

    Err(AgentLoopError::MaxIterations(max_iterations))
}
