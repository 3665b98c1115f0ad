//! Task Analyzer (C8): turns a free-text task description into a `Task` and,
//! when the task is complex enough, into a dependency-ordered list of
//! `Movement`s via a single decomposition call to the model.

use std::path::Path;

use maestro_agents::Provider;
use maestro_core::{detect_cycle, ExecutionMode, Intent, Message, Movement, Task};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum TaskAnalysisError {
    #[error("task refused: destructive scope cannot be bounded: {0}")]
    Refused(String),
    #[error("provider error during decomposition: {0}")]
    Provider(#[from] maestro_agents::ProviderError),
    #[error("decomposition produced an invalid plan: {0}")]
    InvalidDecomposition(String),
}

/// Phrases that mark a request's destructive scope as unbounded. Checked
/// before anything else runs, since no amount of planning makes these safe.
const UNBOUNDED_DESTRUCTIVE_PATTERNS: &[&str] = &[
    "delete everything",
    "delete all files",
    "wipe the repo",
    "wipe everything",
    "rm -rf",
    "remove everything",
    "format the drive",
];

fn refusal_reason(description: &str) -> Option<&'static str> {
    let lower = description.to_lowercase();
    UNBOUNDED_DESTRUCTIVE_PATTERNS
        .iter()
        .find(|pattern| lower.contains(*pattern))
        .copied()
}

/// Explicit paths mentioned in the description (backtick- or quote-wrapped),
/// plus glob patterns expanded against the workspace, then filtered to
/// existing files so a stray "all config files" doesn't pull in garbage.
fn extract_required_files(description: &str, workspace_root: &Path) -> Vec<String> {
    let mut files = Vec::new();

    for quoted in extract_quoted_or_backticked(description) {
        if quoted.contains('.') && !quoted.contains(' ') {
            files.push(quoted);
        }
    }

    for pattern in extract_glob_patterns(description) {
        if let Ok(matches) = glob::glob(&workspace_root.join(&pattern).to_string_lossy()) {
            for entry in matches.flatten() {
                if let Ok(relative) = entry.strip_prefix(workspace_root) {
                    files.push(relative.display().to_string());
                }
            }
        }
    }

    files.sort();
    files.dedup();
    files
}

fn extract_quoted_or_backticked(description: &str) -> Vec<String> {
    let mut out = Vec::new();
    for delimiter in ['`', '"'] {
        let mut chars = description.split(delimiter);
        // Every second segment (index 1, 3, 5...) is inside a delimiter pair.
        chars.next();
        for (idx, segment) in chars.enumerate() {
            if idx % 2 == 0 && !segment.is_empty() {
                out.push(segment.to_string());
            }
        }
    }
    out
}

/// Recognizes "all *.rs files" / "every test file" style phrasing and turns
/// it into a glob pattern. Deliberately narrow: only extension-qualified globs.
fn extract_glob_patterns(description: &str) -> Vec<String> {
    let mut out = Vec::new();
    for word in description.split_whitespace() {
        let trimmed = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '*' && c != '.');
        if trimmed.starts_with('*') && trimmed.contains('.') {
            out.push(format!("**/{trimmed}"));
        }
    }
    out
}

/// Complexity <5 runs as a single movement; >=7 (or a task touching more
/// than a handful of files) decomposes; nothing in this build ever picks
/// `Programmatic` — it exists as an enum value only (§9 Open Questions).
fn decide_mode(complexity: u8, required_files: &[String]) -> ExecutionMode {
    if complexity >= 7 || required_files.len() > 5 {
        ExecutionMode::MovementBased
    } else {
        ExecutionMode::Direct
    }
}

/// Asks the Classifier role for a 1-10 complexity score. Falls back to a
/// length-based heuristic if the model's response doesn't parse, since a
/// malformed classification must never abort the analysis outright.
async fn classify_complexity(provider: &Provider, model: &str, description: &str) -> u8 {
    let prompt = format!(
        "Rate the complexity of implementing this task on a 1-10 scale. \
         Respond with only the number.\n\nTask: {description}"
    );
    let history = [Message::system(
        "You classify a short piece of text into one label from the options given. \
         Respond with the label and nothing else. You have no tools.",
    ), Message::user(prompt)];

    match provider.complete(&history, model, None).await {
        Ok(response) => response
            .content
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse::<i32>()
            .map(Task::clamp_complexity)
            .unwrap_or_else(|_| heuristic_complexity(description)),
        Err(e) => {
            warn!(error = %e, "complexity classification failed, falling back to heuristic");
            heuristic_complexity(description)
        }
    }
}

fn heuristic_complexity(description: &str) -> u8 {
    let word_count = description.split_whitespace().count();
    Task::clamp_complexity((word_count / 4) as i32)
}

/// Produces an analyzed `Task` from a description, refusing destructive
/// requests whose scope isn't bounded.
pub async fn analyze(
    description: &str,
    workspace_root: &Path,
    provider: &Provider,
    classifier_model: &str,
) -> Result<Task, TaskAnalysisError> {
    if let Some(reason) = refusal_reason(description) {
        return Err(TaskAnalysisError::Refused(reason.to_string()));
    }

    let intent = Intent::from_description(description);
    let required_files = extract_required_files(description, workspace_root);
    let complexity = classify_complexity(provider, classifier_model, description).await;
    let mode = decide_mode(complexity, &required_files);

    info!(?intent, complexity, ?mode, "task analyzed");

    Ok(Task {
        description: description.to_string(),
        intent,
        complexity,
        required_files: required_files.clone(),
        output_files: required_files,
        mode,
    })
}

/// Response contract for decomposition: the model returns a JSON array of
/// movement objects matching `Movement`'s public fields minus status/attempts.
#[derive(Debug, serde::Deserialize)]
struct DecomposedMovement {
    id: String,
    name: String,
    goal: String,
    #[serde(default)]
    depends_on: Vec<String>,
    #[serde(default)]
    required_files: Vec<String>,
    #[serde(default)]
    produced_files: Vec<String>,
    #[serde(default)]
    success_criteria: Vec<String>,
}

const DECOMPOSITION_SYSTEM_PROMPT: &str = "You split a development task into an ordered list of movements. \
Respond with a JSON array only, no prose. Each element has the fields: \
id, name, goal, depends_on (array of ids), required_files, produced_files, success_criteria (array of strings). \
Dependencies must form a DAG: no movement may depend on itself or its own descendants.";

/// Runs the decomposition call and validates the result into movements.
/// Rejects cyclic dependency graphs outright — the caller falls back to
/// direct mode on `InvalidDecomposition`, matching `decomposition_invalid`'s
/// documented recovery (§7).
pub async fn decompose(task: &Task, provider: &Provider, model: &str) -> Result<Vec<Movement>, TaskAnalysisError> {
    if task.mode == ExecutionMode::Programmatic {
        return Err(TaskAnalysisError::InvalidDecomposition(
            "programmatic orchestration has no runtime behind it".to_string(),
        ));
    }

    let history = [
        Message::system(DECOMPOSITION_SYSTEM_PROMPT),
        Message::user(format!("Task: {}", task.description)),
    ];
    let response = provider.complete(&history, model, None).await?;

    let parsed: Vec<DecomposedMovement> = serde_json::from_str(response.content.trim())
        .map_err(|e| TaskAnalysisError::InvalidDecomposition(format!("malformed decomposition JSON: {e}")))?;

    if parsed.is_empty() {
        return Err(TaskAnalysisError::InvalidDecomposition("decomposition returned no movements".to_string()));
    }

    let movements: Vec<Movement> = parsed
        .into_iter()
        .map(|d| Movement {
            id: d.id,
            name: d.name,
            goal: d.goal,
            depends_on: d.depends_on,
            required_files: d.required_files,
            produced_files: d.produced_files,
            success_criteria: d.success_criteria,
            status: maestro_core::MovementStatus::Pending,
            attempts: 0,
        })
        .collect();

    if let Some(cycle) = detect_cycle(&movements) {
        return Err(TaskAnalysisError::InvalidDecomposition(format!("cyclic dependency: {}", cycle.join(" -> "))));
    }

    Ok(movements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_agents::provider::stub::StubBackend;
    use tempfile::tempdir;

    #[tokio::test]
    async fn unbounded_destructive_request_is_refused() {
        let dir = tempdir().unwrap();
        let provider = Provider::Stub(StubBackend::with_response("5"));
        let err = analyze("delete everything in the repo", dir.path(), &provider, "stub-model")
            .await
            .unwrap_err();
        assert!(matches!(err, TaskAnalysisError::Refused(_)));
    }

    #[tokio::test]
    async fn low_complexity_task_selects_direct_mode() {
        let dir = tempdir().unwrap();
        let provider = Provider::Stub(StubBackend::with_response("2"));
        let task = analyze("fix a typo in the readme", dir.path(), &provider, "stub-model").await.unwrap();
        assert_eq!(task.mode, ExecutionMode::Direct);
        assert_eq!(task.complexity, 2);
    }

    #[tokio::test]
    async fn high_complexity_task_selects_movement_based_mode() {
        let dir = tempdir().unwrap();
        let provider = Provider::Stub(StubBackend::with_response("9"));
        let task = analyze("rewrite the whole authentication subsystem", dir.path(), &provider, "stub-model")
            .await
            .unwrap();
        assert_eq!(task.mode, ExecutionMode::MovementBased);
    }

    #[tokio::test]
    async fn malformed_classifier_response_falls_back_to_heuristic() {
        let dir = tempdir().unwrap();
        let provider = Provider::Stub(StubBackend::with_response("not a number"));
        let task = analyze("do something", dir.path(), &provider, "stub-model").await.unwrap();
        assert!(task.complexity >= 1);
    }

    #[tokio::test]
    async fn decomposition_rejects_a_cyclic_plan() {
        let provider = Provider::Stub(StubBackend::with_response(
            r#"[{"id":"a","name":"a","goal":"g","depends_on":["b"]},{"id":"b","name":"b","goal":"g","depends_on":["a"]}]"#,
        ));
        let task = Task {
            description: "x".to_string(),
            intent: Intent::Update,
            complexity: 8,
            required_files: vec![],
            output_files: vec![],
            mode: ExecutionMode::MovementBased,
        };
        let err = decompose(&task, &provider, "stub-model").await.unwrap_err();
        assert!(matches!(err, TaskAnalysisError::InvalidDecomposition(_)));
    }

    #[tokio::test]
    async fn decomposition_parses_a_valid_movement_list() {
        let provider = Provider::Stub(StubBackend::with_response(
            r#"[{"id":"a","name":"Add struct","goal":"g","success_criteria":["compiles"]},{"id":"b","name":"Wire it up","goal":"g","depends_on":["a"]}]"#,
        ));
        let task = Task {
            description: "x".to_string(),
            intent: Intent::Create,
            complexity: 8,
            required_files: vec![],
            output_files: vec![],
            mode: ExecutionMode::MovementBased,
        };
        let movements = decompose(&task, &provider, "stub-model").await.unwrap();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[1].depends_on, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn programmatic_mode_is_rejected_before_any_provider_call() {
        let task = Task {
            description: "x".to_string(),
            intent: Intent::Create,
            complexity: 10,
            required_files: vec![],
            output_files: vec![],
            mode: ExecutionMode::Programmatic,
        };
        let provider = Provider::Stub(StubBackend::with_response("should never be read"));
        let err = decompose(&task, &provider, "stub-model").await.unwrap_err();
        assert!(matches!(err, TaskAnalysisError::InvalidDecomposition(_)));
    }
}
