//! Verifier (C4): detects the project's language from sentinel files, then
//! runs the build/test/lint/coverage/security command appropriate to it and
//! classifies the result into a `VerificationResult`.
//!
//! Language detection follows the same "does a marker file exist at this
//! root" approach the teacher uses for precondition checks (Cargo.toml,
//! package.json, and so on), just generalized from "does the Cargo workspace
//! exist" to "which ecosystem are we in".

use std::path::Path;
use std::time::Duration;

use maestro_core::{ErrorKind, VerificationKind, VerificationResult};

use crate::runtime::run_command::run_command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Rust,
    Node,
    Python,
    Go,
    Elixir,
    Ruby,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Node => "node",
            Language::Python => "python",
            Language::Go => "go",
            Language::Elixir => "elixir",
            Language::Ruby => "ruby",
        }
    }
}

/// Detects the project's language from sentinel files at `root`. Checked in
/// a fixed order so a repo with more than one marker (e.g. a Rust crate with
/// a `package.json` for its docs site) still resolves deterministically.
pub fn detect_language(root: &Path) -> Option<Language> {
    if root.join("Cargo.toml").exists() {
        Some(Language::Rust)
    } else if root.join("go.mod").exists() {
        Some(Language::Go)
    } else if root.join("mix.exs").exists() {
        Some(Language::Elixir)
    } else if root.join("Gemfile").exists() {
        Some(Language::Ruby)
    } else if root.join("package.json").exists() {
        Some(Language::Node)
    } else if root.join("pyproject.toml").exists() || root.join("setup.py").exists() {
        Some(Language::Python)
    } else {
        None
    }
}

struct Command {
    program: &'static str,
    args: &'static [&'static str],
}

fn command_for(language: Language, kind: VerificationKind) -> Option<Command> {
    match (language, kind) {
        (Language::Rust, VerificationKind::Build) => Some(Command { program: "cargo", args: &["build"] }),
        (Language::Rust, VerificationKind::Test) => Some(Command { program: "cargo", args: &["test"] }),
        (Language::Rust, VerificationKind::Lint) => Some(Command { program: "cargo", args: &["clippy", "--", "-D", "warnings"] }),
        (Language::Rust, VerificationKind::Coverage) => Some(Command { program: "cargo", args: &["tarpaulin"] }),
        (Language::Rust, VerificationKind::Security) => Some(Command { program: "cargo", args: &["audit"] }),

        (Language::Node, VerificationKind::Build) => Some(Command { program: "npm", args: &["run", "build"] }),
        (Language::Node, VerificationKind::Test) => Some(Command { program: "npm", args: &["test"] }),
        (Language::Node, VerificationKind::Lint) => Some(Command { program: "npm", args: &["run", "lint"] }),
        (Language::Node, VerificationKind::Security) => Some(Command { program: "npm", args: &["audit"] }),
        (Language::Node, VerificationKind::Coverage) => None,

        (Language::Python, VerificationKind::Test) => Some(Command { program: "pytest", args: &[] }),
        (Language::Python, VerificationKind::Lint) => Some(Command { program: "ruff", args: &["check", "."] }),
        (Language::Python, VerificationKind::Build) => None,
        (Language::Python, VerificationKind::Coverage) => Some(Command { program: "pytest", args: &["--cov"] }),
        (Language::Python, VerificationKind::Security) => None,

        (Language::Go, VerificationKind::Build) => Some(Command { program: "go", args: &["build", "./..."] }),
        (Language::Go, VerificationKind::Test) => Some(Command { program: "go", args: &["test", "./..."] }),
        (Language::Go, VerificationKind::Lint) => Some(Command { program: "go", args: &["vet", "./..."] }),
        (Language::Go, VerificationKind::Coverage) => None,
        (Language::Go, VerificationKind::Security) => None,

        (Language::Elixir, VerificationKind::Build) => Some(Command { program: "mix", args: &["compile"] }),
        (Language::Elixir, VerificationKind::Test) => Some(Command { program: "mix", args: &["test"] }),
        (Language::Elixir, VerificationKind::Lint) => Some(Command { program: "mix", args: &["format", "--check-formatted"] }),
        (Language::Elixir, VerificationKind::Coverage) => None,
        (Language::Elixir, VerificationKind::Security) => None,

        (Language::Ruby, VerificationKind::Test) => Some(Command { program: "rspec", args: &[] }),
        (Language::Ruby, VerificationKind::Lint) => Some(Command { program: "rubocop", args: &[] }),
        (Language::Ruby, VerificationKind::Build) => None,
        (Language::Ruby, VerificationKind::Coverage) => None,
        (Language::Ruby, VerificationKind::Security) => None,
    }
}

/// Runs the given verification kind against `root`, classifying the outcome.
/// A kind with no applicable command for the detected language is reported
/// as a skip (vacuous pass), not a failure — a Python project has no build
/// step. A workspace with no registered verifier at all (no sentinel file
/// recognized) is reported the same way: there's nothing to run, so there's
/// nothing to fail.
pub async fn verify(root: &Path, kind: VerificationKind, timeout: Duration) -> VerificationResult {
    let Some(language) = detect_language(root) else {
        return VerificationResult::skipped(kind);
    };

    let Some(command) = command_for(language, kind) else {
        return VerificationResult::skipped(kind);
    };

    let args: Vec<String> = command.args.iter().map(|s| s.to_string()).collect();
    match run_command(command.program, &args, root, timeout).await {
        Ok(output) if output.success => VerificationResult::passed(kind, output.stdout),
        Ok(output) => {
            let error_kind = classify(kind, &output.stdout, &output.stderr);
            VerificationResult::failed(kind, error_kind, output.stdout, output.stderr, output.exit_code)
        }
        Err(e) => VerificationResult::failed(kind, ErrorKind::Runtime, "", e.to_string(), None),
    }
}

/// Runs several verification kinds concurrently against `root` and joins the
/// results. Each stage shells out to its own subprocess, so independent
/// stages (lint while tests run) don't need to wait on one another (§5).
pub async fn verify_many(root: &Path, kinds: &[VerificationKind], timeout: Duration) -> Vec<VerificationResult> {
    let futures = kinds.iter().map(|&kind| verify(root, kind, timeout));
    futures::future::join_all(futures).await
}

/// Classifies a failed run's combined output into an ErrorKind. Syntax
/// errors are a build subtype the Executor treats specially (near-zero
/// chance of success on immediate retry without an Editor turn).
fn classify(kind: VerificationKind, stdout: &str, stderr: &str) -> ErrorKind {
    let combined = format!("{stdout}\n{stderr}").to_lowercase();
    if matches!(kind, VerificationKind::Build) {
        if combined.contains("syntax error") || combined.contains("unexpected token") || combined.contains("expected one of") {
            return ErrorKind::Syntax;
        }
        return ErrorKind::Build;
    }
    match kind {
        VerificationKind::Test => ErrorKind::Test,
        VerificationKind::Lint => ErrorKind::Lint,
        VerificationKind::Coverage | VerificationKind::Security => ErrorKind::Unknown,
        VerificationKind::Build => unreachable!("handled above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn detects_rust_from_cargo_toml() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname=\"x\"").unwrap();
        assert_eq!(detect_language(dir.path()), Some(Language::Rust));
    }

    #[test]
    fn detects_nothing_for_an_empty_directory() {
        let dir = tempdir().unwrap();
        assert_eq!(detect_language(dir.path()), None);
    }

    #[test]
    fn detects_elixir_from_mix_exs() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("mix.exs"), "").unwrap();
        assert_eq!(detect_language(dir.path()), Some(Language::Elixir));
    }

    #[test]
    fn detects_ruby_from_gemfile() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("Gemfile"), "").unwrap();
        assert_eq!(detect_language(dir.path()), Some(Language::Ruby));
    }

    #[test]
    fn rust_takes_precedence_over_node_when_both_markers_exist() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname=\"x\"").unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        assert_eq!(detect_language(dir.path()), Some(Language::Rust));
    }

    #[test]
    fn classify_recognizes_syntax_errors_as_a_build_subtype() {
        let kind = classify(VerificationKind::Build, "", "error: expected one of `)`, found `fn`");
        assert_eq!(kind, ErrorKind::Syntax);
    }

    #[tokio::test]
    async fn no_registered_verifier_for_the_workspace_is_reported_as_a_success() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hello").unwrap();
        assert_eq!(detect_language(dir.path()), None);
        let result = verify(dir.path(), VerificationKind::Build, Duration::from_secs(5)).await;
        assert!(result.passed);
    }

    #[tokio::test]
    async fn unsupported_language_kind_pair_is_reported_as_skipped() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("go.mod"), "module x").unwrap();
        let result = verify(dir.path(), VerificationKind::Coverage, Duration::from_secs(5)).await;
        assert!(result.passed);
    }

    #[tokio::test]
    async fn verify_many_joins_every_requested_stage() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("go.mod"), "module x").unwrap();
        let results = verify_many(
            dir.path(),
            &[VerificationKind::Coverage, VerificationKind::Security],
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.passed));
    }
}
