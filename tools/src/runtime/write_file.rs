//! write_file: atomically overwrite (or create) a UTF-8 text file.
//!
//! Write+rename pattern: write to a sibling `.tmp` file, fsync, then rename
//! over the target. A crash mid-write never leaves a half-written file at
//! the real path. Parent directories are created as needed, since the Editor
//! routinely writes new modules under paths that don't exist yet.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriteFileError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn write_file(path: &Path, content: &str) -> Result<(), WriteFileError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = path.with_extension("tmp");

    let mut file = File::create(&temp_path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_new_file_and_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("src/generated/module.rs");
        write_file(&path, "fn generated() {}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "fn generated() {}");
    }

    #[test]
    fn overwrites_existing_file_atomically() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("existing.rs");
        fs::write(&path, "old").unwrap();
        write_file(&path, "new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn no_leftover_tmp_file_after_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.rs");
        write_file(&path, "content").unwrap();
        let tmp_exists = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .any(|e| e.path().extension().and_then(|e| e.to_str()) == Some("tmp"));
        assert!(!tmp_exists);
    }
}
