//! apply_patch: exact search/replace against a file's current contents.
//!
//! Deliberately simpler than the teacher's line-number/pattern edit family —
//! the contract here is just `(path, search, replace)`: `search` must occur
//! in the file exactly once, or the call fails rather than guessing intent.

use std::fs;
use std::path::Path;

use thiserror::Error;

use super::write_file::{write_file, WriteFileError};

#[derive(Debug, Error)]
pub enum ApplyPatchError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("search text not found in {0}")]
    SearchNotFound(String),
    #[error("search text occurs {1} times in {0}, expected exactly 1")]
    AmbiguousMatch(String, usize),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("write error: {0}")]
    Write(#[from] WriteFileError),
}

pub struct PatchResult {
    pub path: String,
}

pub fn apply_patch(path: &Path, search: &str, replace: &str) -> Result<PatchResult, ApplyPatchError> {
    if !path.exists() {
        return Err(ApplyPatchError::NotFound(path.display().to_string()));
    }
    let content = fs::read_to_string(path)?;
    let occurrences = content.matches(search).count();
    if occurrences == 0 {
        return Err(ApplyPatchError::SearchNotFound(path.display().to_string()));
    }
    if occurrences > 1 {
        return Err(ApplyPatchError::AmbiguousMatch(path.display().to_string(), occurrences));
    }
    let updated = content.replacen(search, replace, 1);
    write_file(path, &updated)?;
    Ok(PatchResult { path: path.display().to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn replaces_a_single_exact_match() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lib.rs");
        fs::write(&path, "fn old() {}\nfn other() {}\n").unwrap();
        apply_patch(&path, "fn old() {}", "fn renamed() {}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "fn renamed() {}\nfn other() {}\n");
    }

    #[test]
    fn rejects_when_search_text_is_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lib.rs");
        fs::write(&path, "fn real() {}\n").unwrap();
        assert!(matches!(apply_patch(&path, "fn missing() {}", "x"), Err(ApplyPatchError::SearchNotFound(_))));
    }

    #[test]
    fn rejects_when_search_text_is_ambiguous() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lib.rs");
        fs::write(&path, "let x = 1;\nlet x = 1;\n").unwrap();
        assert!(matches!(apply_patch(&path, "let x = 1;", "let x = 2;"), Err(ApplyPatchError::AmbiguousMatch(_, 2))));
    }
}
