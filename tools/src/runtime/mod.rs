//! Tool Runtime (C1): dispatches a parsed `ToolCall` against the fixed
//! catalog, enforcing the AllowedFileSet on mutating calls before anything
//! touches disk, and truncating output before it's wrapped into a `ToolResult`.

pub mod apply_patch;
pub mod project_map;
pub mod read_file;
pub mod run_command;
pub mod tool_call_parser;
pub mod truncate;
pub mod write_file;

use std::path::PathBuf;
use std::time::Duration;

use maestro_core::{AllowedFileSet, ToolCall, ToolName, ToolResult};
use tracing::info;

pub use tool_call_parser::extract_tool_call;

pub struct ToolRuntime {
    workspace_root: PathBuf,
    allowed_files: AllowedFileSet,
    command_timeout: Duration,
}

impl ToolRuntime {
    pub fn new(workspace_root: impl Into<PathBuf>, allowed_files: AllowedFileSet, command_timeout: Duration) -> Self {
        ToolRuntime {
            workspace_root: workspace_root.into(),
            allowed_files,
            command_timeout,
        }
    }

    fn resolve(&self, relative: &str) -> PathBuf {
        self.workspace_root.join(relative)
    }

    /// Runs a tool call end to end, returning a `ToolResult` that is always
    /// appendable as a "tool" role message regardless of success or failure —
    /// callers never need to branch on whether the call itself errored.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let Some(tool) = ToolName::from_str(&call.name) else {
            return ToolResult::failed(call.id.clone(), format!("unknown tool: {}", call.name));
        };

        info!(tool = tool.as_str(), call_id = %call.id, "dispatching tool call");

        if tool.is_mutating() {
            if let Some(result) = self.check_allowed_write(call) {
                return result;
            }
        }

        match tool {
            ToolName::ReadFile => self.dispatch_read_file(call),
            ToolName::WriteFile => self.dispatch_write_file(call),
            ToolName::ApplyPatch => self.dispatch_apply_patch(call),
            ToolName::RunCommand => self.dispatch_run_command(call).await,
            ToolName::ProjectMap => self.dispatch_project_map(call),
        }
    }

    fn path_argument(&self, call: &ToolCall) -> Option<String> {
        call.arguments.get("path").and_then(|v| v.as_str()).map(str::to_string)
    }

    /// Returns `Some(forbidden-write result)` when the tool call's path
    /// argument is absent from the AllowedFileSet; `None` when it is
    /// permitted to proceed.
    fn check_allowed_write(&self, call: &ToolCall) -> Option<ToolResult> {
        let Some(path) = self.path_argument(call) else {
            return Some(ToolResult::failed(call.id.clone(), "missing required argument: path"));
        };
        if self.allowed_files.is_empty() || !self.allowed_files.contains(&path) {
            return Some(ToolResult::failed(
                call.id.clone(),
                format!("forbidden_write: {} is not in this movement's allowed file set", path),
            ));
        }
        None
    }

    fn dispatch_read_file(&self, call: &ToolCall) -> ToolResult {
        let Some(path) = self.path_argument(call) else {
            return ToolResult::failed(call.id.clone(), "missing required argument: path");
        };
        match read_file::read_file(&self.resolve(&path)) {
            Ok(content) => ToolResult::ok(call.id.clone(), truncate::truncate_output(&content)),
            Err(e) => ToolResult::failed(call.id.clone(), e.to_string()),
        }
    }

    fn dispatch_write_file(&self, call: &ToolCall) -> ToolResult {
        let Some(path) = self.path_argument(call) else {
            return ToolResult::failed(call.id.clone(), "missing required argument: path");
        };
        let Some(content) = call.arguments.get("content").and_then(|v| v.as_str()) else {
            return ToolResult::failed(call.id.clone(), "missing required argument: content");
        };
        match write_file::write_file(&self.resolve(&path), content) {
            Ok(()) => ToolResult::ok_with_modified(call.id.clone(), format!("wrote {}", path), vec![path]),
            Err(e) => ToolResult::failed(call.id.clone(), e.to_string()),
        }
    }

    fn dispatch_apply_patch(&self, call: &ToolCall) -> ToolResult {
        let Some(path) = self.path_argument(call) else {
            return ToolResult::failed(call.id.clone(), "missing required argument: path");
        };
        let (Some(search), Some(replace)) = (
            call.arguments.get("search").and_then(|v| v.as_str()),
            call.arguments.get("replace").and_then(|v| v.as_str()),
        ) else {
            return ToolResult::failed(call.id.clone(), "missing required argument: search or replace");
        };
        match apply_patch::apply_patch(&self.resolve(&path), search, replace) {
            Ok(result) => ToolResult::ok_with_modified(call.id.clone(), format!("patched {}", result.path), vec![path]),
            Err(e) => ToolResult::failed(call.id.clone(), e.to_string()),
        }
    }

    async fn dispatch_run_command(&self, call: &ToolCall) -> ToolResult {
        let Some(command_line) = call.arguments.get("command").and_then(|v| v.as_str()) else {
            return ToolResult::failed(call.id.clone(), "missing required argument: command");
        };
        if command_line.trim().is_empty() {
            return ToolResult::failed(call.id.clone(), "empty command");
        }

        match run_command::run_command("bash", &["-c".to_string(), command_line.to_string()], &self.workspace_root, self.command_timeout).await {
            Ok(output) if output.success => {
                ToolResult::ok(call.id.clone(), truncate::truncate_output(&output.stdout))
            }
            Ok(output) => ToolResult::failed(
                call.id.clone(),
                truncate::truncate_output(&format!("exit {:?}\nstdout:\n{}\nstderr:\n{}", output.exit_code, output.stdout, output.stderr)),
            ),
            Err(e) => ToolResult::failed(call.id.clone(), e.to_string()),
        }
    }

    fn dispatch_project_map(&self, call: &ToolCall) -> ToolResult {
        match project_map::project_map(&self.workspace_root) {
            Ok(files) => {
                let listing = files.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join("\n");
                ToolResult::ok(call.id.clone(), truncate::truncate_output(&listing))
            }
            Err(e) => ToolResult::failed(call.id.clone(), e.to_string()),
        }
    }
}
