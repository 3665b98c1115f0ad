//! Task: the immutable, analyzed form of a user request.

use serde::{Deserialize, Serialize};

/// Intent derived from the task description by the Task Analyzer (C8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Create,
    Read,
    Update,
    Delete,
    Refactor,
    Unify,
    Reorganize,
    Query,
    Run,
}

impl Intent {
    /// Rule-based verb extraction, lowest-effort first match wins.
    pub fn from_description(description: &str) -> Intent {
        let lower = description.to_lowercase();
        let verbs: &[(&str, Intent)] = &[
            ("delete", Intent::Delete),
            ("remove", Intent::Delete),
            ("create", Intent::Create),
            ("add", Intent::Create),
            ("implement", Intent::Create),
            ("write", Intent::Create),
            ("refactor", Intent::Refactor),
            ("extract", Intent::Refactor),
            ("rename", Intent::Refactor),
            ("unify", Intent::Unify),
            ("merge", Intent::Unify),
            ("consolidate", Intent::Unify),
            ("reorganize", Intent::Reorganize),
            ("restructure", Intent::Reorganize),
            ("move", Intent::Reorganize),
            ("run", Intent::Run),
            ("execute", Intent::Run),
            ("build", Intent::Run),
            ("test", Intent::Run),
            ("show", Intent::Query),
            ("list", Intent::Query),
            ("find", Intent::Query),
            ("explain", Intent::Query),
            ("update", Intent::Update),
            ("fix", Intent::Update),
            ("bump", Intent::Update),
            ("change", Intent::Update),
        ];
        for (verb, intent) in verbs {
            if lower.contains(verb) {
                return *intent;
            }
        }
        Intent::Read
    }
}

/// How the Executor will drive the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// A single movement, no decomposition.
    Direct,
    /// A dependency-ordered DAG of movements.
    MovementBased,
    /// Enum value only — see SPEC_FULL.md §9 Open Question resolutions.
    /// Selecting this mode is rejected at decomposition time.
    Programmatic,
}

/// The user request, as analyzed by the Task Analyzer. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub description: String,
    pub intent: Intent,
    pub complexity: u8,
    pub required_files: Vec<String>,
    pub output_files: Vec<String>,
    pub mode: ExecutionMode,
}

impl Task {
    /// Complexity is always clamped into the documented 1..10 range.
    pub fn clamp_complexity(complexity: i32) -> u8 {
        complexity.clamp(1, 10) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verb_extraction_prefers_first_match() {
        assert_eq!(
            Intent::from_description("delete the old config and create a new one"),
            Intent::Delete
        );
        assert_eq!(Intent::from_description("show git status"), Intent::Query);
        assert_eq!(Intent::from_description("bump the version"), Intent::Update);
    }

    #[test]
    fn unmatched_description_defaults_to_read() {
        assert_eq!(Intent::from_description("hello there"), Intent::Read);
    }

    #[test]
    fn complexity_is_clamped() {
        assert_eq!(Task::clamp_complexity(-5), 1);
        assert_eq!(Task::clamp_complexity(15), 10);
        assert_eq!(Task::clamp_complexity(5), 5);
    }
}
