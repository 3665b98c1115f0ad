//! read_file: read an entire UTF-8 text file from the workspace.

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReadFileError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("file is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

pub fn read_file(path: &Path) -> Result<String, ReadFileError> {
    if !path.exists() {
        return Err(ReadFileError::NotFound(path.display().to_string()));
    }
    Ok(std::fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reads_existing_file_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello").unwrap();
        assert_eq!(read_file(&path).unwrap(), "hello");
    }

    #[test]
    fn missing_file_is_reported_as_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.txt");
        assert!(matches!(read_file(&path), Err(ReadFileError::NotFound(_))));
    }
}
