//! Command surface (§6): `do`, `plan`, `implement`, and the autonomous
//! GitHub issue loop. Parsed with `clap`'s derive API, following the
//! teacher's own `main.rs` CLI style rather than its hand-rolled parser.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "maestro", author, version, about = "Autonomous multi-agent coding assistant execution core", long_about = None)]
pub struct Cli {
    /// Path to setup.yaml; defaults to $MAESTRO_CONFIG_ROOT/setup.yaml or ~/.config/maestro/setup.yaml
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,

    /// Emits selector rationale and debug-level tracing
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Runs a task end to end as a single movement.
    Do {
        /// Free-text description of the task.
        task: String,

        /// Requires approval of the plan before the Editor runs.
        #[arg(long)]
        supervised: bool,

        /// Stops after the plan is produced; nothing is written to the workspace.
        #[arg(long)]
        dry_run: bool,

        /// Overrides the configured attempts-per-movement ceiling.
        #[arg(long)]
        max_attempts: Option<u32>,
    },

    /// Runs only the Analyzer and Planner, writing the plan to `plans/`.
    Plan {
        /// Free-text description of the task.
        task: String,
    },

    /// Feeds a saved plan document directly into the Editor/Reviewer loop.
    Implement {
        /// Path to a previously saved PlanDocument markdown file.
        plan_file: std::path::PathBuf,
    },

    /// Autonomous GitHub issue loop.
    #[command(subcommand)]
    Issue(IssueCommand),
}

#[derive(Subcommand, Debug)]
pub enum IssueCommand {
    /// Builds a task description from an issue body and runs it.
    Fix {
        /// GitHub issue number.
        number: u64,
    },
    /// Runs the Verifier suite against the current workspace with auto-fix retries.
    Commit {
        /// GitHub issue number the commit is associated with.
        number: u64,
    },
    /// Pushes the resulting branch. Out of scope for this crate (§1); always a stub.
    Push {
        /// GitHub issue number the push is associated with.
        number: u64,
    },
}

/// Exit codes for the direct-execution surface (§6).
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const FATAL: i32 = 1;
    pub const DRY_RUN_COMPLETED: i32 = 2;
    pub const VERIFIER_EXHAUSTED: i32 = 3;
    pub const ABORTED: i32 = 4;
}
