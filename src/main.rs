//! Entry point: parses the command surface (§6), assembles the persisted
//! stores under the user's config root, and dispatches to the Executor.

use std::collections::HashMap;
use std::io::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use maestro::cli::{exit_code, Cli, Command, IssueCommand};
use maestro::executor::{Executor, ExecutorError};
use maestro::task_analyzer;
use maestro_agents::provider_for;
use maestro_core::{
    CheckpointStore, CliOverrides, Config, ExecutionMode, HistoryStore, MaestroErrorKind, Movement, Symphony,
    SymphonyOutcome, UsageStore,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn state_root() -> PathBuf {
    std::env::var("MAESTRO_CONFIG_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("maestro"))
}

fn pick_default_model(config: &Config) -> Result<(String, String)> {
    let backend = config
        .default_provider
        .clone()
        .or_else(|| config.providers.keys().next().cloned())
        .context("no provider is configured")?;
    let model = config
        .providers
        .get(&backend)
        .and_then(|p| p.models.first())
        .map(|m| m.name.clone())
        .context("the configured provider has no models")?;
    Ok((backend, model))
}

fn load_config(cli: &Cli, max_attempts: Option<u32>) -> Result<Config> {
    let env: HashMap<String, String> = std::env::vars().collect();
    let default_setup = state_root().join("setup.yaml");
    let setup_path = cli.config.clone().unwrap_or(default_setup);
    let overrides = CliOverrides {
        max_attempts,
        log_level: if cli.verbose { Some("debug".to_string()) } else { None },
        ..Default::default()
    };
    maestro_core::config::load(Some(setup_path.as_path()), &env, &overrides)
}

fn prompt_yes_no(question: &str) -> bool {
    print!("{question} [y/N] ");
    std::io::stdout().flush().ok();
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Maps an `ExecutorError` to the direct-execution exit code table (§6).
fn exit_code_for(err: &ExecutorError) -> i32 {
    match err {
        ExecutorError::Kind(MaestroErrorKind::Cancelled) => exit_code::ABORTED,
        ExecutorError::Kind(MaestroErrorKind::VerifierBuild) | ExecutorError::Kind(MaestroErrorKind::VerifierTest) => {
            exit_code::VERIFIER_EXHAUSTED
        }
        _ => exit_code::FATAL,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "maestro exited with a fatal error");
            exit_code::FATAL
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    match &cli.command {
        Command::Do { task, supervised, dry_run, max_attempts } => {
            run_do(&cli, task.clone(), *supervised, *dry_run, *max_attempts).await
        }
        Command::Plan { task } => run_plan(&cli, task.clone()).await,
        Command::Implement { plan_file } => run_implement(&cli, plan_file.clone()).await,
        Command::Issue(IssueCommand::Fix { number }) => {
            let task = format!("Fix the issue described in GitHub issue #{number}.");
            run_do(&cli, task, false, false, None).await
        }
        Command::Issue(IssueCommand::Commit { number }) => {
            let task = format!("Run the verification suite and fix any failures before committing for issue #{number}.");
            run_do(&cli, task, false, false, None).await
        }
        Command::Issue(IssueCommand::Push { number }) => {
            eprintln!("issue push {number}: not-implemented (shell-out to git/GitHub is out of scope for this crate)");
            Ok(exit_code::FATAL)
        }
    }
}

struct Stores {
    history: HistoryStore,
    usage: UsageStore,
    checkpoints: CheckpointStore,
}

fn open_stores() -> Stores {
    let root = state_root();
    Stores {
        history: HistoryStore::new(root.join("history")),
        usage: UsageStore::new(root.join("usage.json")),
        checkpoints: CheckpointStore::new(root.join("checkpoints")),
    }
}

/// Drains the Executor's progress channel, printing a line per event when
/// `--verbose` is set. Dropped otherwise; events are best-effort.
fn spawn_event_logger(mut rx: maestro_core::EventReceiver, verbose: bool) {
    if !verbose {
        return;
    }
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let movement = event.movement_id.as_deref().unwrap_or("-");
            let attempt = event.attempt.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string());
            eprintln!("[{:?}] movement={movement} attempt={attempt}: {}", event.kind, event.message);
        }
    });
}

fn install_ctrl_c_handler() -> CancellationToken {
    let cancel = CancellationToken::new();
    let child = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received interrupt, cancelling the current movement");
            child.cancel();
        }
    });
    cancel
}

/// The single movement a Direct-mode task runs as, or the fallback used when
/// decomposition fails (§7's documented recovery for `decomposition_invalid`).
fn direct_movement(task: &maestro_core::Task) -> Movement {
    let mut movement = Movement::new("m1", "direct execution", task.description.clone());
    movement.required_files = task.required_files.clone();
    movement.produced_files = task.output_files.clone();
    movement
}

async fn run_do(cli: &Cli, task_description: String, supervised: bool, dry_run: bool, max_attempts: Option<u32>) -> Result<i32> {
    let config = load_config(cli, max_attempts)?;
    let (backend, model) = pick_default_model(&config)?;
    let provider = provider_for(&config, &backend)?;

    let mut task = task_analyzer::analyze(&task_description, &config.workspace_root, &provider, &model).await?;
    let movements = match task.mode {
        ExecutionMode::MovementBased => match task_analyzer::decompose(&task, &provider, &model).await {
            Ok(movements) => movements,
            Err(e) => {
                tracing::warn!(error = %e, "decomposition failed, falling back to a single direct movement");
                task.mode = ExecutionMode::Direct;
                vec![direct_movement(&task)]
            }
        },
        _ => vec![direct_movement(&task)],
    };

    let stores = open_stores();
    let (events_tx, events_rx) = maestro_core::events::channel();
    spawn_event_logger(events_rx, cli.verbose);
    let executor = Executor::new(&config, &stores.history, &stores.usage, &stores.checkpoints, events_tx);

    if dry_run || supervised {
        for movement in &movements {
            let plan = executor.preview_plan(&task, movement).await?;
            println!("{}", plan.raw);
        }
        if dry_run {
            return Ok(exit_code::DRY_RUN_COMPLETED);
        }
        if !prompt_yes_no("Proceed with this plan?") {
            return Ok(exit_code::ABORTED);
        }
    }

    let mut symphony = Symphony::new(task, movements);
    let cancel = install_ctrl_c_handler();
    match executor.run(&mut symphony, &cancel).await {
        Ok(()) => Ok(exit_code::SUCCESS),
        Err(e) => {
            print_failure(&symphony, &e);
            Ok(exit_code_for(&e))
        }
    }
}

async fn run_plan(cli: &Cli, task_description: String) -> Result<i32> {
    let config = load_config(cli, None)?;
    let (backend, model) = pick_default_model(&config)?;
    let provider = provider_for(&config, &backend)?;

    let task = task_analyzer::analyze(&task_description, &config.workspace_root, &provider, &model).await?;
    let movement = direct_movement(&task);

    let stores = open_stores();
    let (events_tx, events_rx) = maestro_core::events::channel();
    spawn_event_logger(events_rx, cli.verbose);
    let executor = Executor::new(&config, &stores.history, &stores.usage, &stores.checkpoints, events_tx);
    let plan = executor.preview_plan(&task, &movement).await?;

    let plans_dir = state_root().join("plans");
    std::fs::create_dir_all(&plans_dir).with_context(|| format!("creating {}", plans_dir.display()))?;
    let plan_path = plans_dir.join(format!("{}.md", movement.id));
    std::fs::write(&plan_path, &plan.raw).with_context(|| format!("writing {}", plan_path.display()))?;

    println!("plan written to {}", plan_path.display());
    Ok(exit_code::SUCCESS)
}

async fn run_implement(cli: &Cli, plan_file: PathBuf) -> Result<i32> {
    let config = load_config(cli, None)?;
    let raw = std::fs::read_to_string(&plan_file).with_context(|| format!("reading {}", plan_file.display()))?;
    let movement_id = plan_file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "implement".to_string());
    let plan = maestro_core::PlanDocument::new(movement_id, raw)?;

    let stores = open_stores();
    let (events_tx, events_rx) = maestro_core::events::channel();
    spawn_event_logger(events_rx, cli.verbose);
    let executor = Executor::new(&config, &stores.history, &stores.usage, &stores.checkpoints, events_tx);
    let cancel = install_ctrl_c_handler();
    let symphony_id = uuid::Uuid::new_v4().to_string();

    match executor.implement_plan(&symphony_id, &plan, &cancel).await {
        Ok(()) => Ok(exit_code::SUCCESS),
        Err(e) => {
            eprintln!("implement failed: {e}");
            Ok(exit_code_for(&e))
        }
    }
}

fn print_failure(symphony: &Symphony, err: &ExecutorError) {
    if symphony.outcome != SymphonyOutcome::Failed {
        eprintln!("maestro: {err}");
        return;
    }
    let failed = symphony.movements.iter().find(|m| matches!(m.status, maestro_core::MovementStatus::Failed));
    if let Some(movement) = failed {
        eprintln!("movement '{}' failed: {err}", movement.name);
    } else {
        eprintln!("maestro: {err}");
    }
    eprintln!("next steps: retry with a different backend, run with --supervised, or use --dry-run to inspect the plan.");
}
