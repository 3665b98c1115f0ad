//! Checkpoint Store (C5): content-addressed backup of files before a movement
//! touches them, so a failed movement can be rolled back without re-reading
//! the working tree's prior state from the LLM's memory.
//!
//! Blobs are keyed by their sha256 hash and stored once regardless of how
//! many checkpoints reference them. A manifest per checkpoint id records
//! which path mapped to which hash at that point in time.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("io error on {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("checkpoint not found: {0}")]
    NotFound(String),
    #[error("manifest corrupt: {0}")]
    CorruptManifest(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointManifest {
    pub id: String,
    pub symphony_id: String,
    pub step_index: usize,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Path relative to the workspace root, to the blob hash holding its content.
    pub files: HashMap<String, String>,
}

pub struct CheckpointStore {
    root: PathBuf,
}

impl CheckpointStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CheckpointStore { root: root.into() }
    }

    fn blobs_dir(&self) -> PathBuf {
        self.root.join("blobs")
    }

    fn manifests_dir(&self) -> PathBuf {
        self.root.join("manifests")
    }

    /// Snapshots the given files (paths relative to `workspace_root`) into a
    /// new checkpoint and returns its manifest.
    pub fn save(
        &self,
        symphony_id: &str,
        step_index: usize,
        workspace_root: &Path,
        paths: &[String],
    ) -> Result<CheckpointManifest, CheckpointError> {
        fs::create_dir_all(self.blobs_dir()).map_err(|source| CheckpointError::Io { path: self.blobs_dir(), source })?;
        fs::create_dir_all(self.manifests_dir()).map_err(|source| CheckpointError::Io { path: self.manifests_dir(), source })?;

        let mut files = HashMap::new();
        for relative_path in paths {
            let absolute = workspace_root.join(relative_path);
            if !absolute.exists() {
                // File did not exist before the movement ran: rollback means delete.
                files.insert(relative_path.clone(), String::new());
                continue;
            }
            let content = fs::read(&absolute).map_err(|source| CheckpointError::Io { path: absolute.clone(), source })?;
            let hash = hash_bytes(&content);
            self.write_blob_if_absent(&hash, &content)?;
            files.insert(relative_path.clone(), hash);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let manifest = CheckpointManifest {
            id: id.clone(),
            symphony_id: symphony_id.to_string(),
            step_index,
            timestamp: chrono::Utc::now(),
            files,
        };
        self.write_manifest(&manifest)?;
        Ok(manifest)
    }

    /// Restores every file recorded in the checkpoint's manifest back onto
    /// `workspace_root`. An empty-string hash means the file did not exist
    /// pre-checkpoint and is removed.
    pub fn restore(&self, id: &str, workspace_root: &Path) -> Result<(), CheckpointError> {
        let manifest = self.load_manifest(id)?;
        for (relative_path, hash) in &manifest.files {
            let absolute = workspace_root.join(relative_path);
            if hash.is_empty() {
                if absolute.exists() {
                    fs::remove_file(&absolute).map_err(|source| CheckpointError::Io { path: absolute.clone(), source })?;
                }
                continue;
            }
            let content = self.read_blob(hash)?;
            if let Some(parent) = absolute.parent() {
                fs::create_dir_all(parent).map_err(|source| CheckpointError::Io { path: parent.to_path_buf(), source })?;
            }
            atomic_write(&absolute, &content)?;
        }
        Ok(())
    }

    fn write_blob_if_absent(&self, hash: &str, content: &[u8]) -> Result<(), CheckpointError> {
        let path = self.blobs_dir().join(hash);
        if path.exists() {
            return Ok(());
        }
        atomic_write(&path, content)
    }

    fn read_blob(&self, hash: &str) -> Result<Vec<u8>, CheckpointError> {
        let path = self.blobs_dir().join(hash);
        fs::read(&path).map_err(|source| CheckpointError::Io { path, source })
    }

    fn write_manifest(&self, manifest: &CheckpointManifest) -> Result<(), CheckpointError> {
        let path = self.manifests_dir().join(format!("{}.json", manifest.id));
        let content = serde_json::to_vec_pretty(manifest)
            .map_err(|e| CheckpointError::CorruptManifest(e.to_string()))?;
        atomic_write(&path, &content)
    }

    fn load_manifest(&self, id: &str) -> Result<CheckpointManifest, CheckpointError> {
        let path = self.manifests_dir().join(format!("{}.json", id));
        if !path.exists() {
            return Err(CheckpointError::NotFound(id.to_string()));
        }
        let content = fs::read(&path).map_err(|source| CheckpointError::Io { path, source })?;
        serde_json::from_slice(&content).map_err(|e| CheckpointError::CorruptManifest(e.to_string()))
    }
}

fn hash_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Write-to-temp, fsync, rename-over-target. Never leaves a half-written file
/// visible at `path`.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), CheckpointError> {
    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path).map_err(|source| CheckpointError::Io { path: temp_path.clone(), source })?;
    file.write_all(content).map_err(|source| CheckpointError::Io { path: temp_path.clone(), source })?;
    file.sync_all().map_err(|source| CheckpointError::Io { path: temp_path.clone(), source })?;
    fs::rename(&temp_path, path).map_err(|source| CheckpointError::Io { path: path.to_path_buf(), source })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_restore_roundtrips_file_contents() {
        let store_dir = tempdir().unwrap();
        let workspace = tempdir().unwrap();
        let store = CheckpointStore::new(store_dir.path());

        let target = workspace.path().join("src/lib.rs");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, "fn original() {}").unwrap();

        let manifest = store.save("sym-1", 0, workspace.path(), &["src/lib.rs".to_string()]).unwrap();
        fs::write(&target, "fn mutated() {}").unwrap();

        store.restore(&manifest.id, workspace.path()).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "fn original() {}");
    }

    #[test]
    fn restoring_a_file_that_did_not_exist_removes_it() {
        let store_dir = tempdir().unwrap();
        let workspace = tempdir().unwrap();
        let store = CheckpointStore::new(store_dir.path());

        let manifest = store.save("sym-1", 0, workspace.path(), &["new_file.rs".to_string()]).unwrap();
        fs::write(workspace.path().join("new_file.rs"), "fn added() {}").unwrap();

        store.restore(&manifest.id, workspace.path()).unwrap();
        assert!(!workspace.path().join("new_file.rs").exists());
    }

    #[test]
    fn identical_content_reuses_the_same_blob() {
        let store_dir = tempdir().unwrap();
        let workspace = tempdir().unwrap();
        let store = CheckpointStore::new(store_dir.path());

        fs::write(workspace.path().join("a.rs"), "shared").unwrap();
        fs::write(workspace.path().join("b.rs"), "shared").unwrap();

        let manifest = store
            .save("sym-1", 0, workspace.path(), &["a.rs".to_string(), "b.rs".to_string()])
            .unwrap();
        assert_eq!(manifest.files["a.rs"], manifest.files["b.rs"]);

        let blob_count = fs::read_dir(store_dir.path().join("blobs")).unwrap().count();
        assert_eq!(blob_count, 1);
    }

    #[test]
    fn restoring_unknown_checkpoint_id_fails() {
        let store_dir = tempdir().unwrap();
        let workspace = tempdir().unwrap();
        let store = CheckpointStore::new(store_dir.path());
        assert!(matches!(store.restore("does-not-exist", workspace.path()), Err(CheckpointError::NotFound(_))));
    }
}
