//! Reviewer (C3 role, mechanical checker): evaluates a PlanDocument's
//! `## Success Criteria` against the workspace rather than asking a model to
//! adjudicate. The model is only consulted to explain a failing criterion.

use std::path::Path;

use maestro_agents::Provider;
use maestro_core::{Message, PlanDocument};
use maestro_tools::runtime::read_file::read_file;
use maestro_tools::runtime::run_command::run_command;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CriterionOutcome {
    pub criterion: String,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub success: bool,
    pub issues: Vec<String>,
}

/// Checks one criterion against the workspace. Recognizes a handful of
/// conventional phrasings the Planner is instructed to produce; anything
/// else is run as a shell command and judged by its exit status, since most
/// hand-written criteria ("cargo test passes") already read like one.
async fn check_criterion(workspace_root: &Path, criterion: &str) -> CriterionOutcome {
    if let Some((path, needle)) = parse_contains(criterion, true) {
        return match read_file(&workspace_root.join(&path)) {
            Ok(content) if content_contains(&content, &needle) => {
                CriterionOutcome { criterion: criterion.to_string(), passed: true, detail: format!("{path} contains {needle:?}") }
            }
            Ok(_) => CriterionOutcome { criterion: criterion.to_string(), passed: false, detail: format!("{path} does not contain {needle:?}") },
            Err(e) => CriterionOutcome { criterion: criterion.to_string(), passed: false, detail: e.to_string() },
        };
    }

    if let Some((path, needle)) = parse_contains(criterion, false) {
        return match read_file(&workspace_root.join(&path)) {
            Ok(content) if !content_contains(&content, &needle) => {
                CriterionOutcome { criterion: criterion.to_string(), passed: true, detail: format!("{path} does not contain {needle:?}") }
            }
            Ok(_) => CriterionOutcome { criterion: criterion.to_string(), passed: false, detail: format!("{path} still contains {needle:?}") },
            Err(e) => CriterionOutcome { criterion: criterion.to_string(), passed: false, detail: e.to_string() },
        };
    }

    if let Some(path) = parse_exists(criterion) {
        let exists = workspace_root.join(&path).exists();
        return CriterionOutcome {
            criterion: criterion.to_string(),
            passed: exists,
            detail: if exists { format!("{path} exists") } else { format!("{path} is missing") },
        };
    }

    if let Some(command_line) = parse_command(criterion) {
        if command_line.trim().is_empty() {
            return CriterionOutcome { criterion: criterion.to_string(), passed: false, detail: "empty command criterion".to_string() };
        }
        return match run_command("bash", &["-c".to_string(), command_line.clone()], workspace_root, Duration::from_secs(120)).await {
            Ok(output) => CriterionOutcome {
                criterion: criterion.to_string(),
                passed: output.success,
                detail: if output.success { "command succeeded".to_string() } else { output.stderr },
            },
            Err(e) => CriterionOutcome { criterion: criterion.to_string(), passed: false, detail: e.to_string() },
        };
    }

    // No recognized shape: cannot mechanically check it, so it cannot be
    // allowed to vacuously pass either. Surfaced as a failure with an
    // explanatory detail; the LLM call below explains it to the user.
    CriterionOutcome { criterion: criterion.to_string(), passed: false, detail: "criterion did not match a checkable pattern".to_string() }
}

/// `<path> contains "<text>"` (positive=true) or `<path> does not contain "<text>"`.
fn parse_contains(criterion: &str, positive: bool) -> Option<(String, String)> {
    let marker = if positive { " contains " } else { " does not contain " };
    let (path, rest) = criterion.split_once(marker)?;
    let needle = rest.trim().trim_matches(|c| c == '"' || c == '\'');
    Some((path.trim().to_string(), needle.to_string()))
}

/// A bare version literal like `1.15.4`, as opposed to a range, a git ref, or
/// prose — digits and dots only.
fn is_bare_version_literal(needle: &str) -> bool {
    !needle.is_empty()
        && needle.chars().next().is_some_and(|c| c.is_ascii_digit())
        && needle.chars().all(|c| c.is_ascii_digit() || c == '.')
}

/// Whether `content` satisfies a "contains `needle`" criterion. For a bare
/// version literal, also accepts the conventional prefixed forms each
/// ecosystem uses for a dependency pin, so a criterion written against the
/// bare version still matches `mix.exs`'s `~> 1.15.4`, `package.json`'s
/// `^1.15.4`, or Go's `v1.15.4` — the Planner is told to write criteria in
/// bare form and this is where that convention gets reconciled with whatever
/// the Editor actually wrote.
fn content_contains(content: &str, needle: &str) -> bool {
    if content.contains(needle) {
        return true;
    }
    if is_bare_version_literal(needle) {
        const ECOSYSTEM_PREFIXES: &[&str] = &["~> ", "^", "v", ">= ", "<= ", "= ", "~", "=="];
        return ECOSYSTEM_PREFIXES.iter().any(|prefix| content.contains(&format!("{prefix}{needle}")));
    }
    false
}

/// `<path> exists`.
fn parse_exists(criterion: &str) -> Option<String> {
    let path = criterion.trim().strip_suffix(" exists")?;
    Some(path.trim().to_string())
}

/// Criteria that read as a command invocation: "cargo test passes", "`npm run lint` succeeds".
fn parse_command(criterion: &str) -> Option<String> {
    let trimmed = criterion.trim();
    for suffix in [" passes", " succeeds", " exits zero", " runs successfully"] {
        if let Some(command) = trimmed.strip_suffix(suffix) {
            return Some(command.trim().trim_matches('`').to_string());
        }
    }
    None
}

/// Evaluates every criterion in `plan`, explains failures via one `Classifier`-style
/// provider call, and returns the Reviewer's verdict.
pub async fn review_movement(
    plan: &PlanDocument,
    workspace_root: &Path,
    provider: &Provider,
    model: &str,
) -> ReviewOutcome {
    let criteria = plan.success_criteria();
    let mut outcomes = Vec::with_capacity(criteria.len());
    for criterion in &criteria {
        outcomes.push(check_criterion(workspace_root, criterion).await);
    }

    let failed: Vec<&CriterionOutcome> = outcomes.iter().filter(|o| !o.passed).collect();
    if failed.is_empty() {
        return ReviewOutcome { success: true, issues: Vec::new() };
    }

    let mut issues = Vec::with_capacity(failed.len());
    for outcome in &failed {
        let explanation = explain_failure(provider, model, outcome).await;
        issues.push(format!("{}: {}", outcome.criterion, explanation));
    }

    ReviewOutcome { success: false, issues }
}

async fn explain_failure(provider: &Provider, model: &str, outcome: &CriterionOutcome) -> String {
    let prompt = format!(
        "A success criterion failed mechanical verification. Explain briefly why, for the editor to fix. \
         Criterion: {}\nVerification detail: {}",
        outcome.criterion, outcome.detail
    );
    let history = [
        Message::system(
            "You check the Editor's output against the plan's success criteria. Use \
             read_file and run_command to verify each criterion mechanically; explain any \
             criterion that fails, but do not decide pass/fail by judgment alone.",
        ),
        Message::user(prompt),
    ];
    match provider.complete(&history, model, None).await {
        Ok(response) => response.content,
        Err(_) => outcome.detail.clone(),
    }
}
