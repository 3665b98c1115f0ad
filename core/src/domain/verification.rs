//! Verifier output types: what a build/test/lint/coverage/security pass reported.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationKind {
    Build,
    Test,
    Lint,
    Coverage,
    Security,
}

/// Classification used by the Executor to decide whether a failure is
/// recoverable by the Editor or needs a model switch (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    None,
    Syntax,
    Build,
    Test,
    Lint,
    Runtime,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub kind: VerificationKind,
    pub passed: bool,
    pub error_kind: ErrorKind,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl VerificationResult {
    pub fn passed(kind: VerificationKind, stdout: impl Into<String>) -> Self {
        VerificationResult {
            kind,
            passed: true,
            error_kind: ErrorKind::None,
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    pub fn failed(
        kind: VerificationKind,
        error_kind: ErrorKind,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        VerificationResult {
            kind,
            passed: false,
            error_kind,
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// A skipped docs-only movement is reported as a vacuously-passed build/test pair.
    pub fn skipped(kind: VerificationKind) -> Self {
        VerificationResult::passed(kind, "skipped: no source files touched")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_result_is_reported_as_passing() {
        let result = VerificationResult::skipped(VerificationKind::Test);
        assert!(result.passed);
        assert_eq!(result.error_kind, ErrorKind::None);
    }

    #[test]
    fn failed_result_carries_exit_code_and_kind() {
        let result = VerificationResult::failed(VerificationKind::Build, ErrorKind::Syntax, "", "unexpected token", Some(1));
        assert!(!result.passed);
        assert_eq!(result.error_kind, ErrorKind::Syntax);
        assert_eq!(result.exit_code, Some(1));
    }
}
