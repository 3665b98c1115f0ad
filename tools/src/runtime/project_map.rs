//! project_map: a sorted, ignore-pattern-aware file tree summary, handed to
//! agents in place of an unbounded directory listing.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectMapError {
    #[error("root does not exist: {0}")]
    RootMissing(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

const DEFAULT_IGNORES: &[&str] = &[".git", "target", "node_modules", ".venv", "__pycache__"];

/// Recursively lists files under `root`, skipping `DEFAULT_IGNORES` directory
/// names at any depth, sorted for deterministic output across calls.
pub fn project_map(root: &Path) -> Result<Vec<PathBuf>, ProjectMapError> {
    if !root.exists() {
        return Err(ProjectMapError::RootMissing(root.display().to_string()));
    }
    let mut files = Vec::new();
    walk(root, root, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), ProjectMapError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if DEFAULT_IGNORES.contains(&name.as_ref()) {
            continue;
        }

        if path.is_dir() {
            walk(root, &path, out)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            out.push(relative.to_path_buf());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lists_files_sorted_and_skips_ignored_dirs() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/b.rs"), "").unwrap();
        std::fs::write(dir.path().join("src/a.rs"), "").unwrap();
        std::fs::create_dir_all(dir.path().join("target/debug")).unwrap();
        std::fs::write(dir.path().join("target/debug/stale.bin"), "").unwrap();

        let files = project_map(dir.path()).unwrap();
        assert_eq!(files, vec![PathBuf::from("src/a.rs"), PathBuf::from("src/b.rs")]);
    }

    #[test]
    fn missing_root_is_an_error() {
        assert!(matches!(project_map(Path::new("/no/such/dir")), Err(ProjectMapError::RootMissing(_))));
    }
}
