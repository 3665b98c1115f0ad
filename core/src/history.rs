//! History / Feedback Store (C7): an append-only journal of movement
//! executions, partitioned by date, used by the Model Selector to compute
//! per-(backend, model) success rates. Adapted from the teacher's in-memory
//! execution-outcome tracker into a flat-file JSONL journal per the
//! persisted-state contract — no database, one line per record, one file per day.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("io error on {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("corrupt record in {path}: {source}")]
    Corrupt { path: PathBuf, #[source] source: serde_json::Error },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Success,
    Failure,
    Timeout,
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub symphony_id: String,
    pub movement_id: String,
    pub task_hash: String,
    pub backend: String,
    pub model: String,
    pub agent_role: String,
    pub language: Option<String>,
    pub outcome: ExecutionOutcome,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// Hashes a task description into the `task_hash` carried by every
/// `ExecutionRecord` produced while working on it, so records from the same
/// task can be correlated across movements and retries.
pub fn hash_task(description: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(description.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ModelStatistics {
    pub total: u32,
    pub successes: u32,
    pub failures: u32,
}

impl ModelStatistics {
    /// Success rate as a bonus-eligible ratio, `None` below the minimum sample gate.
    pub fn success_rate(&self, min_samples: u32) -> Option<f64> {
        if self.total < min_samples {
            return None;
        }
        Some(self.successes as f64 / self.total as f64)
    }
}

pub struct HistoryStore {
    root: PathBuf,
}

impl HistoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        HistoryStore { root: root.into() }
    }

    fn path_for_date(&self, date: NaiveDate) -> PathBuf {
        self.root.join(format!("{}.jsonl", date.format("%Y-%m-%d")))
    }

    /// Appends one record to the day-partitioned journal. Never rewrites
    /// existing lines; a partial write leaves prior records intact.
    pub fn append(&self, record: &ExecutionRecord) -> Result<(), HistoryError> {
        fs::create_dir_all(&self.root).map_err(|source| HistoryError::Io { path: self.root.clone(), source })?;
        let path = self.path_for_date(record.timestamp.date_naive());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| HistoryError::Io { path: path.clone(), source })?;
        let line = serde_json::to_string(record).expect("ExecutionRecord always serializes");
        writeln!(file, "{}", line).map_err(|source| HistoryError::Io { path: path.clone(), source })?;
        Ok(())
    }

    /// Reads every record across all journal files. Used by the selector at
    /// startup; callers may cache the resulting statistics in-process.
    pub fn read_all(&self) -> Result<Vec<ExecutionRecord>, HistoryError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        let mut entries: Vec<PathBuf> = fs::read_dir(&self.root)
            .map_err(|source| HistoryError::Io { path: self.root.clone(), source })?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map(|ext| ext == "jsonl").unwrap_or(false))
            .collect();
        entries.sort();
        for path in entries {
            records.extend(read_jsonl(&path)?);
        }
        Ok(records)
    }

    /// Aggregates success/failure counts per (backend, model), restricted to
    /// the given key. Returns zeroed statistics if no records match.
    pub fn statistics_for(&self, backend: &str, model: &str) -> Result<ModelStatistics, HistoryError> {
        let mut stats = ModelStatistics::default();
        for record in self.read_all()? {
            if record.backend != backend || record.model != model {
                continue;
            }
            stats.total += 1;
            if record.outcome.is_success() {
                stats.successes += 1;
            } else {
                stats.failures += 1;
            }
        }
        Ok(stats)
    }
}

fn read_jsonl(path: &Path) -> Result<Vec<ExecutionRecord>, HistoryError> {
    let file = File::open(path).map_err(|source| HistoryError::Io { path: path.to_path_buf(), source })?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|source| HistoryError::Io { path: path.to_path_buf(), source })?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ExecutionRecord = serde_json::from_str(&line)
            .map_err(|source| HistoryError::Corrupt { path: path.to_path_buf(), source })?;
        records.push(record);
    }
    Ok(records)
}
