//! End-to-end coverage for the pieces a CLI invocation actually drives:
//! `Executor::preview_plan`, `Executor::implement_plan`, and the
//! Verifier/Reviewer gate that decides whether a movement succeeds.
//!
//! The "stub" provider backend always answers with a fixed prose response
//! ("acknowledged."), so these tests are built around what that response
//! can and can't satisfy rather than around scripting the model: a
//! `PlanDocument` needs its three headings, so any path through the
//! Planner using the stub backend is necessarily a rejected-plan path; an
//! `implement_plan` run supplies its own pre-written `PlanDocument` and
//! exercises the Editor/Verifier/Reviewer loop instead.

use std::collections::HashMap;

use maestro::executor::{Executor, ExecutorError};
use maestro_core::config::ProviderConfig;
use maestro_core::{CheckpointStore, Config, HistoryStore, Movement, ModelProfile, PlanDocument, Task, UsageStore};
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

fn stub_only_config(workspace_root: std::path::PathBuf) -> Config {
    let mut config = Config::default();
    config.providers = HashMap::new();
    config.providers.insert(
        "stub".to_string(),
        ProviderConfig {
            base_url: None,
            api_key_env: None,
            timeout_seconds: 5,
            models: vec![ModelProfile {
                name: "stub-model".to_string(),
                context_window: 100_000,
                cost_per_1k_tokens: 0.0,
                throughput_tokens_per_sec: 50.0,
                daily_rate_limit: None,
                supports_tools: true,
                supports_file_operations: true,
            }],
        },
    );
    config.default_provider = Some("stub".to_string());
    config.workspace_root = workspace_root;
    config.verifier.lint_enabled = false;
    config
}

struct Stores {
    history: HistoryStore,
    usage: UsageStore,
    checkpoints: CheckpointStore,
}

fn open_stores(root: &std::path::Path) -> Stores {
    Stores {
        history: HistoryStore::new(root.join("history")),
        usage: UsageStore::new(root.join("usage.json")),
        checkpoints: CheckpointStore::new(root.join("checkpoints")),
    }
}

#[tokio::test]
async fn preview_plan_rejects_an_unusable_plan_document() {
    let workspace = tempdir().unwrap();
    let state = tempdir().unwrap();
    let config = stub_only_config(workspace.path().to_path_buf());
    let stores = open_stores(state.path());
    let (tx, _rx) = maestro_core::events::channel();
    let executor = Executor::new(&config, &stores.history, &stores.usage, &stores.checkpoints, tx);

    let task = Task {
        description: "add a greeting helper".to_string(),
        intent: maestro_core::Intent::Create,
        complexity: 3,
        required_files: vec![],
        output_files: vec![],
        mode: maestro_core::ExecutionMode::Direct,
    };
    let movement = Movement::new("m1", "direct execution", task.description.clone());

    let err = executor.preview_plan(&task, &movement).await.unwrap_err();
    assert!(matches!(err, ExecutorError::InvalidPlan(_)));
}

#[tokio::test]
async fn implement_plan_succeeds_when_the_editor_makes_no_changes_and_criteria_already_hold() {
    let workspace = tempdir().unwrap();
    std::fs::write(workspace.path().join("note.txt"), "status: done").unwrap();

    let state = tempdir().unwrap();
    let config = stub_only_config(workspace.path().to_path_buf());
    let stores = open_stores(state.path());
    let (tx, _rx) = maestro_core::events::channel();
    let executor = Executor::new(&config, &stores.history, &stores.usage, &stores.checkpoints, tx);

    let raw = "## Files to modify\nNone\n\n## Changes\nNo code changes; just confirm the workspace already satisfies the goal.\n\n## Success Criteria\n- note.txt contains \"done\"\n";
    let plan = PlanDocument::new("m1", raw).unwrap();

    let cancel = CancellationToken::new();
    executor.implement_plan("s1", &plan, &cancel).await.unwrap();
}

#[tokio::test]
async fn implement_plan_succeeds_with_no_registered_verifier_for_the_workspace() {
    let workspace = tempdir().unwrap();
    // No Cargo.toml (or any other sentinel) exists, so the Verifier can
    // never detect a language for this workspace. Per the "no registered
    // verifier" propagation rule, that's reported as success rather than as
    // a failure every attempt can never clear.
    std::fs::write(workspace.path().join("src_placeholder.txt"), "placeholder").unwrap();

    let state = tempdir().unwrap();
    let mut config = stub_only_config(workspace.path().to_path_buf());
    config.executor.max_attempts_per_movement = 2;
    config.executor.command_timeout_seconds = 5;
    // Lint is policy-gated independently of the source-touch check, so this
    // still asks the Verifier to run a stage against a workspace with no
    // detectable language — the path that must report success, not failure.
    config.verifier.lint_enabled = true;
    let stores = open_stores(state.path());
    let (tx, _rx) = maestro_core::events::channel();
    let executor = Executor::new(&config, &stores.history, &stores.usage, &stores.checkpoints, tx);

    let raw = "## Files to modify\n- src_placeholder.txt\n\n## Changes\nRewrite the placeholder.\n\n## Success Criteria\n- src_placeholder.txt contains \"placeholder\"\n";
    let plan = PlanDocument::new("m1", raw).unwrap();

    let cancel = CancellationToken::new();
    executor.implement_plan("s2", &plan, &cancel).await.unwrap();
}

#[tokio::test]
async fn implement_plan_exhausts_attempts_when_the_editor_never_satisfies_the_reviewer() {
    let workspace = tempdir().unwrap();
    std::fs::write(workspace.path().join("Cargo.toml"), "[package]\nname = \"x\"\nversion = \"0.1.0\"").unwrap();
    std::fs::write(workspace.path().join("note.txt"), "still pending").unwrap();

    let state = tempdir().unwrap();
    let mut config = stub_only_config(workspace.path().to_path_buf());
    config.executor.max_attempts_per_movement = 2;
    config.executor.command_timeout_seconds = 5;
    let stores = open_stores(state.path());
    let (tx, _rx) = maestro_core::events::channel();
    let executor = Executor::new(&config, &stores.history, &stores.usage, &stores.checkpoints, tx);

    // The stub Editor backend never actually writes "done", so this
    // criterion can never be satisfied and every attempt is rejected by the
    // mechanical Reviewer — a genuine exhaustion case, independent of the
    // verifier's language-detection behavior.
    let raw = "## Files to modify\nNone\n\n## Changes\nMark the note done.\n\n## Success Criteria\n- note.txt contains \"done\"\n";
    let plan = PlanDocument::new("m1", raw).unwrap();

    let cancel = CancellationToken::new();
    let err = executor.implement_plan("s2b", &plan, &cancel).await.unwrap_err();
    assert!(matches!(err, ExecutorError::Kind(_)));
}

#[tokio::test]
async fn implement_plan_honors_cancellation_before_the_first_attempt() {
    let workspace = tempdir().unwrap();
    let state = tempdir().unwrap();
    let config = stub_only_config(workspace.path().to_path_buf());
    let stores = open_stores(state.path());
    let (tx, _rx) = maestro_core::events::channel();
    let executor = Executor::new(&config, &stores.history, &stores.usage, &stores.checkpoints, tx);

    let raw = "## Files to modify\nNone\n\n## Changes\nNothing.\n\n## Success Criteria\n- note.txt exists\n";
    let plan = PlanDocument::new("m1", raw).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = executor.implement_plan("s3", &plan, &cancel).await.unwrap_err();
    assert!(matches!(err, ExecutorError::Kind(maestro_core::MaestroErrorKind::Cancelled)));
}

#[tokio::test]
async fn run_reports_failure_when_the_only_movement_exhausts_its_attempts() {
    let workspace = tempdir().unwrap();
    let state = tempdir().unwrap();
    let mut config = stub_only_config(workspace.path().to_path_buf());
    config.executor.max_attempts_per_movement = 1;
    config.executor.command_timeout_seconds = 5;
    let stores = open_stores(state.path());
    let (tx, _rx) = maestro_core::events::channel();
    let executor = Executor::new(&config, &stores.history, &stores.usage, &stores.checkpoints, tx);

    // The Planner role also only ever receives the fixed "acknowledged."
    // stub response, so the movement can never get past plan validation —
    // `run_movement`'s retry loop treats that as a recoverable failure and
    // the whole symphony should report `Failed`, not panic or hang.
    let task = Task {
        description: "add a greeting helper".to_string(),
        intent: maestro_core::Intent::Create,
        complexity: 3,
        required_files: vec![],
        output_files: vec![],
        mode: maestro_core::ExecutionMode::Direct,
    };
    let movement = Movement::new("m1", "direct execution", task.description.clone());
    let mut symphony = maestro_core::Symphony::new(task, vec![movement]);

    let cancel = CancellationToken::new();
    let result = executor.run(&mut symphony, &cancel).await;
    assert!(result.is_err());
    assert_eq!(symphony.outcome, maestro_core::SymphonyOutcome::Failed);
}

#[tokio::test]
async fn checkpoint_round_trip_survives_an_implement_plan_success() {
    let workspace = tempdir().unwrap();
    std::fs::write(workspace.path().join("note.txt"), "status: done").unwrap();

    let state = tempdir().unwrap();
    let config = stub_only_config(workspace.path().to_path_buf());
    let stores = open_stores(state.path());
    let (tx, _rx) = maestro_core::events::channel();
    let executor = Executor::new(&config, &stores.history, &stores.usage, &stores.checkpoints, tx);

    let raw = "## Files to modify\nNone\n\n## Changes\nNo code changes.\n\n## Success Criteria\n- note.txt contains \"done\"\n";
    let plan = PlanDocument::new("m1", raw).unwrap();
    let cancel = CancellationToken::new();
    executor.implement_plan("s4", &plan, &cancel).await.unwrap();

    // A successful implement_plan run appends exactly one success record.
    let stats = stores.history.statistics_for("stub", "stub-model").unwrap();
    assert_eq!(stats.successes, 1);
    assert_eq!(stats.failures, 0);
}
