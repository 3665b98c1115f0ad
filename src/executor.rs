//! Symphony Executor (C9): drives one symphony's movements to completion in
//! topological order, running the Analyzer → Planner → Editor → Verifier →
//! Reviewer cycle for each and checkpointing on success (§4.9).

use std::time::Duration;

use maestro_agents::loop_runner::{run_turn, AgentRole};
use maestro_agents::provider_for;
use maestro_core::{
    hash_task, AllowedFileSet, CheckpointStore, Config, ErrorKind, EventKind, EventSender, ExecutionOutcome,
    ExecutionRecord, ExecutorEvent, HistoryStore, MaestroErrorKind, Message, MessageHistory, Movement, MovementStatus,
    ModelSelector, PlanDocument, PlanError, Symphony, SymphonyOutcome, Task, UsageStore, VerificationKind,
    VerificationResult,
};
use maestro_tools::{detect_language, verify_many, Language, ToolRuntime};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::reviewer::review_movement;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("{0}")]
    Kind(#[from] MaestroErrorKind),
    #[error("no candidate model is configured for this role")]
    NoCandidate,
    #[error("planner produced an unusable plan document: {0}")]
    InvalidPlan(#[from] PlanError),
}

pub struct Executor<'a> {
    config: &'a Config,
    history: &'a HistoryStore,
    usage: &'a UsageStore,
    checkpoints: &'a CheckpointStore,
    events: EventSender,
}

impl<'a> Executor<'a> {
    pub fn new(config: &'a Config, history: &'a HistoryStore, usage: &'a UsageStore, checkpoints: &'a CheckpointStore, events: EventSender) -> Self {
        Executor { config, history, usage, checkpoints, events }
    }

    /// Runs every movement of `symphony` in dependency order, stopping at the
    /// first one that exhausts its attempts.
    pub async fn run(&self, symphony: &mut Symphony, cancel: &CancellationToken) -> Result<(), ExecutorError> {
        self.events.send(ExecutorEvent::new(EventKind::SymphonyStarted, "symphony started")).ok();

        let symphony_id = symphony.id.clone();
        let task = symphony.task.clone();
        let order = maestro_core::topological_order(&symphony.movements);
        for (step_index, id) in order.into_iter().enumerate() {
            if cancel.is_cancelled() {
                symphony.finish(SymphonyOutcome::Aborted);
                return Err(MaestroErrorKind::Cancelled.into());
            }

            let Some(movement) = symphony.movements.iter_mut().find(|m| m.id == id) else {
                continue;
            };

            match self.run_movement(&symphony_id, movement, &task, step_index, cancel).await {
                Ok(()) => {}
                Err(e) => {
                    symphony.finish(SymphonyOutcome::Failed);
                    self.events.send(ExecutorEvent::new(EventKind::SymphonyFinished, "symphony failed").for_movement(id)).ok();
                    return Err(e);
                }
            }
        }

        symphony.finish(SymphonyOutcome::Succeeded);
        self.events.send(ExecutorEvent::new(EventKind::SymphonyFinished, "symphony succeeded")).ok();
        Ok(())
    }

    /// Runs only the Analyzer and Planner for `movement` and returns the
    /// resulting `PlanDocument`, without touching the workspace. Shared by
    /// the `plan` command surface and `do --supervised`'s approval gate (§6).
    pub async fn preview_plan(&self, task: &Task, movement: &Movement) -> Result<PlanDocument, ExecutorError> {
        let workspace_root = self.config.workspace_root.clone();
        let command_timeout = Duration::from_secs(self.config.executor.command_timeout_seconds);
        let mut selector = ModelSelector::new(self.config, self.history).with_usage(self.usage);

        let analyzer_candidate = selector.select(&[]).ok_or(ExecutorError::NoCandidate)?;
        let analysis = self
            .run_read_only_turn(
                AgentRole::Analyzer,
                &analyzer_candidate,
                &workspace_root,
                command_timeout,
                &format!("Task: {}\nMovement goal: {}", task.description, movement.goal),
            )
            .await?;

        let planner_candidate = selector.select(&[]).ok_or(ExecutorError::NoCandidate)?;
        let plan_text = self
            .run_read_only_turn(
                AgentRole::Planner,
                &planner_candidate,
                &workspace_root,
                command_timeout,
                &format!("Task: {}\nMovement goal: {}\nAnalysis: {}", task.description, movement.goal, analysis),
            )
            .await?;

        Ok(PlanDocument::new(movement.id.clone(), plan_text)?)
    }

    async fn run_movement(&self, symphony_id: &str, movement: &mut Movement, task: &Task, step_index: usize, cancel: &CancellationToken) -> Result<(), ExecutorError> {
        let workspace_root = self.config.workspace_root.clone();
        let max_attempts = self.config.executor.max_attempts_per_movement;
        let command_timeout = Duration::from_secs(self.config.executor.command_timeout_seconds);

        movement.status = MovementStatus::Running;
        self.events.send(ExecutorEvent::new(EventKind::MovementStarted, movement.name.as_str()).for_movement(movement.id.as_str())).ok();

        let history_ctx = HistoryContext::new(&task.description, &workspace_root);
        let mut selector = ModelSelector::new(self.config, self.history).with_usage(self.usage);
        let mut reviewer_rejected_editor: Option<(String, String)> = None;
        let mut pending_feedback: Option<String> = None;
        let mut last_checkpoint: Option<String> = None;
        let mut last_kind = MaestroErrorKind::MaxIterations;

        for attempt in 0..max_attempts {
            if cancel.is_cancelled() {
                return Err(MaestroErrorKind::Cancelled.into());
            }
            movement.attempts = attempt + 1;
            self.events
                .send(ExecutorEvent::new(EventKind::MovementStarted, "attempt started").for_movement(movement.id.as_str()).at_attempt(movement.attempts))
                .ok();

            let analyzer_candidate = selector.select(&[]).ok_or(ExecutorError::NoCandidate)?;
            let analysis = match self
                .run_read_only_turn(AgentRole::Analyzer, &analyzer_candidate, &workspace_root, command_timeout, &format!(
                    "Task: {}\nMovement goal: {}{}",
                    task.description,
                    movement.goal,
                    feedback_suffix(&pending_feedback)
                ))
                .await
            {
                Ok(text) => text,
                Err(e) => {
                    last_kind = e;
                    selector.record_failure(&analyzer_candidate.backend, &analyzer_candidate.model);
                    self.append_history(symphony_id, &movement.id, &history_ctx, AgentRole::Analyzer, &analyzer_candidate.backend, &analyzer_candidate.model, ExecutionOutcome::Failure);
                    continue;
                }
            };
            self.append_history(symphony_id, &movement.id, &history_ctx, AgentRole::Analyzer, &analyzer_candidate.backend, &analyzer_candidate.model, ExecutionOutcome::Success);

            let planner_candidate = selector.select(&[]).ok_or(ExecutorError::NoCandidate)?;
            let plan_text = match self
                .run_read_only_turn(AgentRole::Planner, &planner_candidate, &workspace_root, command_timeout, &format!(
                    "Task: {}\nMovement goal: {}\nAnalysis: {}{}",
                    task.description,
                    movement.goal,
                    analysis,
                    feedback_suffix(&pending_feedback)
                ))
                .await
            {
                Ok(text) => text,
                Err(e) => {
                    last_kind = e;
                    selector.record_failure(&planner_candidate.backend, &planner_candidate.model);
                    self.append_history(symphony_id, &movement.id, &history_ctx, AgentRole::Planner, &planner_candidate.backend, &planner_candidate.model, ExecutionOutcome::Failure);
                    continue;
                }
            };

            let plan = match PlanDocument::new(movement.id.clone(), plan_text) {
                Ok(plan) => {
                    self.append_history(symphony_id, &movement.id, &history_ctx, AgentRole::Planner, &planner_candidate.backend, &planner_candidate.model, ExecutionOutcome::Success);
                    plan
                }
                Err(e) => {
                    warn!(movement = %movement.id, error = %e, "planner produced an unusable plan document");
                    self.append_history(symphony_id, &movement.id, &history_ctx, AgentRole::Planner, &planner_candidate.backend, &planner_candidate.model, ExecutionOutcome::Failure);
                    pending_feedback = Some(format!("the previous plan document was invalid: {e}"));
                    continue;
                }
            };
            let allowed = plan.allowed_files();

            let editor_candidate = match &reviewer_rejected_editor {
                Some((backend, model)) => match selector.rerank_for_retry_for_editor(backend, model).into_iter().next() {
                    Some(c) => c,
                    None => return Err(ExecutorError::NoCandidate),
                },
                None => match selector.select_for_editor(&[]) {
                    Some(c) => c,
                    None => return Err(ExecutorError::NoCandidate),
                },
            };
            let editor_provider = provider_for(self.config, &editor_candidate.backend).map_err(|_| ExecutorError::NoCandidate)?;
            let mut editor_history = MessageHistory::new();
            editor_history.push(Message::system(AgentRole::Editor.system_prompt()));
            editor_history.push(Message::user(format!("{}{}", plan.raw, feedback_suffix(&pending_feedback))));
            let editor_tools = ToolRuntime::new(workspace_root.clone(), allowed.clone(), command_timeout);

            let modified = match run_turn(AgentRole::Editor, &editor_provider, &editor_candidate.model, &mut editor_history, &editor_tools).await {
                Ok(outcome) => outcome.modified_files,
                Err(e) => {
                    last_kind = e.kind();
                    selector.record_failure(&editor_candidate.backend, &editor_candidate.model);
                    continue;
                }
            };

            let stages = applicable_stages(&workspace_root, movement, &modified, &self.config.verifier);
            let verify_timeout = Duration::from_secs(300);
            let results = verify_many(&workspace_root, &stages, verify_timeout).await;
            self.events.send(ExecutorEvent::new(EventKind::VerificationRan, "verification ran").for_movement(movement.id.as_str())).ok();
            self.append_verifier_history(symphony_id, &movement.id, &history_ctx, &results);

            if let Some(failure) = results.iter().find(|r| !r.passed) {
                selector.record_failure(&editor_candidate.backend, &editor_candidate.model);
                let kind = match failure.error_kind {
                    ErrorKind::Syntax | ErrorKind::Build => MaestroErrorKind::VerifierBuild,
                    _ => MaestroErrorKind::VerifierTest,
                };
                last_kind = kind.clone();
                if matches!(failure.error_kind, ErrorKind::Syntax | ErrorKind::Build) {
                    if let Some(checkpoint_id) = &last_checkpoint {
                        self.checkpoints.restore(checkpoint_id, &workspace_root).ok();
                    }
                }
                self.append_history(symphony_id, &movement.id, &history_ctx, AgentRole::Editor, &editor_candidate.backend, &editor_candidate.model, ExecutionOutcome::Failure);
                pending_feedback = Some(format!("verification ({:?}) failed: {}", failure.kind, failure.stderr));
                self.events
                    .send(ExecutorEvent::new(EventKind::MovementRetried, "verification failed").for_movement(movement.id.as_str()).at_attempt(movement.attempts))
                    .ok();
                continue;
            }
            selector.record_success(&editor_candidate.backend, &editor_candidate.model);

            let reviewer_candidate = selector.select(&[]).ok_or(ExecutorError::NoCandidate)?;
            let reviewer_provider = provider_for(self.config, &reviewer_candidate.backend).map_err(|_| ExecutorError::NoCandidate)?;
            let review = review_movement(&plan, &workspace_root, &reviewer_provider, &reviewer_candidate.model).await;

            if !review.success {
                selector.record_failure(&editor_candidate.backend, &editor_candidate.model);
                reviewer_rejected_editor = Some((editor_candidate.backend.clone(), editor_candidate.model.clone()));
                self.append_history(symphony_id, &movement.id, &history_ctx, AgentRole::Reviewer, &reviewer_candidate.backend, &reviewer_candidate.model, ExecutionOutcome::Failure);
                self.append_history(symphony_id, &movement.id, &history_ctx, AgentRole::Editor, &editor_candidate.backend, &editor_candidate.model, ExecutionOutcome::Failure);
                pending_feedback = Some(review.issues.join("; "));
                last_kind = MaestroErrorKind::ReviewerRejected;
                self.events
                    .send(ExecutorEvent::new(EventKind::ModelSwitched, "reviewer rejected, down-weighting editor model").for_movement(movement.id.as_str()))
                    .ok();
                continue;
            }
            self.append_history(symphony_id, &movement.id, &history_ctx, AgentRole::Reviewer, &reviewer_candidate.backend, &reviewer_candidate.model, ExecutionOutcome::Success);

            let paths: Vec<String> = allowed.iter().cloned().collect();
            if let Ok(manifest) = self.checkpoints.save(symphony_id, step_index, &workspace_root, &paths) {
                last_checkpoint = Some(manifest.id);
            }
            self.append_history(symphony_id, &movement.id, &history_ctx, AgentRole::Editor, &editor_candidate.backend, &editor_candidate.model, ExecutionOutcome::Success);
            movement.status = MovementStatus::Succeeded;
            self.events.send(ExecutorEvent::new(EventKind::MovementSucceeded, "movement succeeded").for_movement(movement.id.as_str())).ok();
            return Ok(());
        }

        movement.status = MovementStatus::Failed;
        self.events.send(ExecutorEvent::new(EventKind::MovementFailed, "movement exhausted its attempts").for_movement(movement.id.as_str())).ok();
        Err(last_kind.into())
    }

    /// Feeds an already-written `PlanDocument` straight into the Editor/Reviewer
    /// loop, skipping Analyzer and Planner entirely (the `implement` surface, §6).
    pub async fn implement_plan(&self, symphony_id: &str, plan: &PlanDocument, cancel: &CancellationToken) -> Result<(), ExecutorError> {
        let workspace_root = self.config.workspace_root.clone();
        let max_attempts = self.config.executor.max_attempts_per_movement;
        let command_timeout = Duration::from_secs(self.config.executor.command_timeout_seconds);
        let allowed = plan.allowed_files();

        let mut movement = Movement::new(plan.movement_id.clone(), plan.movement_id.clone(), "implement from a saved plan document");
        movement.produced_files = allowed.iter().cloned().collect();

        let history_ctx = HistoryContext::new(&plan.raw, &workspace_root);
        let mut selector = ModelSelector::new(self.config, self.history).with_usage(self.usage);
        let mut reviewer_rejected_editor: Option<(String, String)> = None;
        let mut pending_feedback: Option<String> = None;
        let mut last_checkpoint: Option<String> = None;
        let mut last_kind = MaestroErrorKind::MaxIterations;

        for attempt in 0..max_attempts {
            if cancel.is_cancelled() {
                return Err(MaestroErrorKind::Cancelled.into());
            }
            movement.attempts = attempt + 1;

            let editor_candidate = match &reviewer_rejected_editor {
                Some((backend, model)) => match selector.rerank_for_retry_for_editor(backend, model).into_iter().next() {
                    Some(c) => c,
                    None => return Err(ExecutorError::NoCandidate),
                },
                None => match selector.select_for_editor(&[]) {
                    Some(c) => c,
                    None => return Err(ExecutorError::NoCandidate),
                },
            };
            let editor_provider = provider_for(self.config, &editor_candidate.backend).map_err(|_| ExecutorError::NoCandidate)?;
            let mut editor_history = MessageHistory::new();
            editor_history.push(Message::system(AgentRole::Editor.system_prompt()));
            editor_history.push(Message::user(format!("{}{}", plan.raw, feedback_suffix(&pending_feedback))));
            let editor_tools = ToolRuntime::new(workspace_root.clone(), allowed.clone(), command_timeout);

            let modified = match run_turn(AgentRole::Editor, &editor_provider, &editor_candidate.model, &mut editor_history, &editor_tools).await {
                Ok(outcome) => outcome.modified_files,
                Err(e) => {
                    last_kind = e.kind();
                    selector.record_failure(&editor_candidate.backend, &editor_candidate.model);
                    continue;
                }
            };

            let stages = applicable_stages(&workspace_root, &movement, &modified, &self.config.verifier);
            let results = verify_many(&workspace_root, &stages, Duration::from_secs(300)).await;
            self.append_verifier_history(symphony_id, &movement.id, &history_ctx, &results);

            if let Some(failure) = results.iter().find(|r| !r.passed) {
                selector.record_failure(&editor_candidate.backend, &editor_candidate.model);
                let kind = match failure.error_kind {
                    ErrorKind::Syntax | ErrorKind::Build => MaestroErrorKind::VerifierBuild,
                    _ => MaestroErrorKind::VerifierTest,
                };
                last_kind = kind;
                if matches!(failure.error_kind, ErrorKind::Syntax | ErrorKind::Build) {
                    if let Some(checkpoint_id) = &last_checkpoint {
                        self.checkpoints.restore(checkpoint_id, &workspace_root).ok();
                    }
                }
                self.append_history(symphony_id, &movement.id, &history_ctx, AgentRole::Editor, &editor_candidate.backend, &editor_candidate.model, ExecutionOutcome::Failure);
                pending_feedback = Some(format!("verification ({:?}) failed: {}", failure.kind, failure.stderr));
                continue;
            }
            selector.record_success(&editor_candidate.backend, &editor_candidate.model);

            let reviewer_candidate = selector.select(&[]).ok_or(ExecutorError::NoCandidate)?;
            let reviewer_provider = provider_for(self.config, &reviewer_candidate.backend).map_err(|_| ExecutorError::NoCandidate)?;
            let review = review_movement(plan, &workspace_root, &reviewer_provider, &reviewer_candidate.model).await;

            if !review.success {
                selector.record_failure(&editor_candidate.backend, &editor_candidate.model);
                reviewer_rejected_editor = Some((editor_candidate.backend.clone(), editor_candidate.model.clone()));
                self.append_history(symphony_id, &movement.id, &history_ctx, AgentRole::Reviewer, &reviewer_candidate.backend, &reviewer_candidate.model, ExecutionOutcome::Failure);
                self.append_history(symphony_id, &movement.id, &history_ctx, AgentRole::Editor, &editor_candidate.backend, &editor_candidate.model, ExecutionOutcome::Failure);
                pending_feedback = Some(review.issues.join("; "));
                last_kind = MaestroErrorKind::ReviewerRejected;
                continue;
            }
            self.append_history(symphony_id, &movement.id, &history_ctx, AgentRole::Reviewer, &reviewer_candidate.backend, &reviewer_candidate.model, ExecutionOutcome::Success);

            let paths: Vec<String> = allowed.iter().cloned().collect();
            if let Ok(manifest) = self.checkpoints.save(symphony_id, 0, &workspace_root, &paths) {
                last_checkpoint = Some(manifest.id);
            }
            self.append_history(symphony_id, &movement.id, &history_ctx, AgentRole::Editor, &editor_candidate.backend, &editor_candidate.model, ExecutionOutcome::Success);
            return Ok(());
        }

        Err(last_kind.into())
    }

    /// Runs a read-only role (Analyzer/Planner) over a single seeded prompt
    /// and returns its final prose, mapping a loop failure to its `MaestroErrorKind`.
    async fn run_read_only_turn(
        &self,
        role: AgentRole,
        candidate: &maestro_core::Candidate,
        workspace_root: &std::path::Path,
        command_timeout: Duration,
        prompt: &str,
    ) -> Result<String, MaestroErrorKind> {
        let provider = provider_for(self.config, &candidate.backend).map_err(|_| MaestroErrorKind::ProviderTransport)?;
        let mut history = MessageHistory::new();
        history.push(Message::system(role.system_prompt()));
        history.push(Message::user(prompt.to_string()));
        let tools = ToolRuntime::new(workspace_root, AllowedFileSet::empty(), command_timeout);
        match run_turn(role, &provider, &candidate.model, &mut history, &tools).await {
            Ok(outcome) => Ok(outcome.final_text),
            Err(e) => Err(e.kind()),
        }
    }

    fn append_history(
        &self,
        symphony_id: &str,
        movement_id: &str,
        ctx: &HistoryContext,
        role: AgentRole,
        backend: &str,
        model: &str,
        outcome: ExecutionOutcome,
    ) {
        let record = ExecutionRecord {
            symphony_id: symphony_id.to_string(),
            movement_id: movement_id.to_string(),
            task_hash: ctx.task_hash.clone(),
            backend: backend.to_string(),
            model: model.to_string(),
            agent_role: role.as_str().to_string(),
            language: ctx.language.clone(),
            outcome,
            duration_ms: 0,
            timestamp: chrono::Utc::now(),
        };
        if let Err(e) = self.history.append(&record) {
            warn!(error = %e, "failed to append execution history record");
        }
    }

    /// Records one `ExecutionRecord` per verifier stage that ran, attributed
    /// to the `Verifier` role rather than any specific backend/model — the
    /// verifier is a mechanical probe, not an LLM call (§4.7).
    fn append_verifier_history(&self, symphony_id: &str, movement_id: &str, ctx: &HistoryContext, results: &[VerificationResult]) {
        for result in results {
            let record = ExecutionRecord {
                symphony_id: symphony_id.to_string(),
                movement_id: movement_id.to_string(),
                task_hash: ctx.task_hash.clone(),
                backend: "verifier".to_string(),
                model: format!("{:?}", result.kind).to_lowercase(),
                agent_role: "verifier".to_string(),
                language: ctx.language.clone(),
                outcome: if result.passed { ExecutionOutcome::Success } else { ExecutionOutcome::Failure },
                duration_ms: 0,
                timestamp: chrono::Utc::now(),
            };
            if let Err(e) = self.history.append(&record) {
                warn!(error = %e, "failed to append verifier history record");
            }
        }
    }
}

/// Precomputed, per-movement-attempt context shared by every `ExecutionRecord`
/// written while working on one movement: a stable hash of the task text and
/// the workspace's detected language.
struct HistoryContext {
    task_hash: String,
    language: Option<String>,
}

impl HistoryContext {
    fn new(task_text: &str, workspace_root: &std::path::Path) -> Self {
        HistoryContext {
            task_hash: hash_task(task_text),
            language: detect_language(workspace_root).map(|l| l.as_str().to_string()),
        }
    }
}

fn feedback_suffix(feedback: &Option<String>) -> String {
    match feedback {
        Some(text) => format!("\n\nFeedback from the previous attempt:\n{text}"),
        None => String::new(),
    }
}

/// The extensions recognized as source for a given detected language — the
/// other half of the intersection rule (§4.4): build/test only make sense
/// when what the Editor touched is actually a file that language's build
/// touches, not a README or a stray text note.
fn is_source_file(language: Option<Language>, path: &str) -> bool {
    let ext = std::path::Path::new(path).extension().and_then(|e| e.to_str()).unwrap_or("");
    match language {
        Some(Language::Rust) => matches!(ext, "rs" | "toml"),
        Some(Language::Node) => matches!(ext, "js" | "jsx" | "ts" | "tsx" | "json"),
        Some(Language::Python) => matches!(ext, "py" | "toml" | "cfg" | "ini"),
        Some(Language::Go) => matches!(ext, "go" | "mod" | "sum"),
        Some(Language::Elixir) => matches!(ext, "ex" | "exs"),
        Some(Language::Ruby) => matches!(ext, "rb" | "gemspec") || path == "Gemfile",
        None => false,
    }
}

/// The verifier stages applicable to this movement: build/test run only when
/// the Editor actually touched a file that's source for the workspace's
/// detected language; lint/coverage/security are gated by configuration
/// (§4.4's intersection rule — language-supported stages intersected with
/// what the movement actually touched).
fn applicable_stages(
    workspace_root: &std::path::Path,
    movement: &Movement,
    modified_files: &[String],
    config: &maestro_core::config::VerifierConfig,
) -> Vec<VerificationKind> {
    let mut stages = Vec::new();
    let language = detect_language(workspace_root);
    let touched: Vec<&String> = modified_files.iter().chain(movement.produced_files.iter()).collect();
    let touches_source = touched.iter().any(|path| is_source_file(language, path));
    if touches_source {
        stages.push(VerificationKind::Build);
        stages.push(VerificationKind::Test);
    }
    if config.lint_enabled {
        stages.push(VerificationKind::Lint);
    }
    if config.coverage_enabled {
        stages.push(VerificationKind::Coverage);
    }
    if config.security_enabled {
        stages.push(VerificationKind::Security);
    }
    stages
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_core::{ExecutionMode, Intent};

    fn movement(id: &str) -> Movement {
        Movement::new(id, id, "goal")
    }

    #[test]
    fn docs_only_movement_skips_build_and_test() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname=\"x\"").unwrap();
        let config = maestro_core::config::VerifierConfig::default();
        let stages = applicable_stages(dir.path(), &movement("m1"), &[], &config);
        assert!(!stages.contains(&VerificationKind::Build));
        assert!(!stages.contains(&VerificationKind::Test));
    }

    #[test]
    fn movement_with_modified_files_runs_build_and_test() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname=\"x\"").unwrap();
        let config = maestro_core::config::VerifierConfig::default();
        let stages = applicable_stages(dir.path(), &movement("m1"), &["src/lib.rs".to_string()], &config);
        assert!(stages.contains(&VerificationKind::Build));
        assert!(stages.contains(&VerificationKind::Test));
    }

    #[test]
    fn modifying_a_plain_text_file_does_not_run_build_and_test() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname=\"x\"").unwrap();
        let config = maestro_core::config::VerifierConfig::default();
        let stages = applicable_stages(dir.path(), &movement("m1"), &["hello.txt".to_string()], &config);
        assert!(!stages.contains(&VerificationKind::Build));
        assert!(!stages.contains(&VerificationKind::Test));
    }

    #[test]
    fn lint_only_runs_when_policy_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = maestro_core::config::VerifierConfig::default();
        config.lint_enabled = false;
        let stages = applicable_stages(dir.path(), &movement("m1"), &[], &config);
        assert!(!stages.contains(&VerificationKind::Lint));
    }

    #[test]
    fn task_mode_is_preserved_across_clone() {
        let task = Task {
            description: "x".to_string(),
            intent: Intent::Create,
            complexity: 3,
            required_files: vec![],
            output_files: vec![],
            mode: ExecutionMode::Direct,
        };
        let cloned = task.clone();
        assert_eq!(cloned.mode, task.mode);
    }
}
