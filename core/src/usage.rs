//! Usage counters (`usage.json`): per-date, per-(backend, model) request and
//! token tallies, used by the Model Selector to compute the "≥90% of daily
//! limit" availability penalty (§4.6). Unlike the History Store this is a
//! single JSON document, not a day-partitioned journal — the source treats
//! it as a small persisted map the selector and CLI both read wholesale.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("io error on {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("corrupt usage file {path}: {source}")]
    Corrupt { path: PathBuf, #[source] source: serde_json::Error },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageCounter {
    pub requests: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cached_tokens: u64,
    pub last_error: Option<String>,
}

impl UsageCounter {
    /// Fraction of `daily_rate_limit` consumed so far, `None` when the
    /// catalog entry carries no limit (unlimited local backends).
    pub fn usage_fraction(&self, daily_rate_limit: Option<u32>) -> Option<f64> {
        let limit = daily_rate_limit?;
        if limit == 0 {
            return Some(1.0);
        }
        Some(self.requests as f64 / limit as f64)
    }
}

/// Key is `"{date}|{backend}|{model}"`; flat so the whole store round-trips
/// through a single `serde_json` map without nested date indices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageDocument {
    #[serde(flatten)]
    entries: HashMap<String, UsageCounter>,
}

pub struct UsageStore {
    path: PathBuf,
}

fn key(date: NaiveDate, backend: &str, model: &str) -> String {
    format!("{}|{}|{}", date.format("%Y-%m-%d"), backend, model)
}

impl UsageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        UsageStore { path: path.into() }
    }

    fn load(&self) -> Result<UsageDocument, UsageError> {
        if !self.path.exists() {
            return Ok(UsageDocument::default());
        }
        let content = fs::read_to_string(&self.path).map_err(|source| UsageError::Io { path: self.path.clone(), source })?;
        if content.trim().is_empty() {
            return Ok(UsageDocument::default());
        }
        serde_json::from_str(&content).map_err(|source| UsageError::Corrupt { path: self.path.clone(), source })
    }

    fn save(&self, doc: &UsageDocument) -> Result<(), UsageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| UsageError::Io { path: parent.to_path_buf(), source })?;
        }
        let content = serde_json::to_string_pretty(doc).expect("UsageDocument always serializes");
        fs::write(&self.path, content).map_err(|source| UsageError::Io { path: self.path.clone(), source })
    }

    pub fn get(&self, date: NaiveDate, backend: &str, model: &str) -> Result<UsageCounter, UsageError> {
        let doc = self.load()?;
        Ok(doc.entries.get(&key(date, backend, model)).cloned().unwrap_or_default())
    }

    /// Records one request's token accounting, incrementing in place.
    /// Token counts are optional per the Provider Contract (§4.2); omitted
    /// values simply don't advance their counter.
    pub fn record_request(
        &self,
        date: NaiveDate,
        backend: &str,
        model: &str,
        input_tokens: Option<u64>,
        output_tokens: Option<u64>,
        cached_tokens: Option<u64>,
        error: Option<&str>,
    ) -> Result<(), UsageError> {
        let mut doc = self.load()?;
        let entry = doc.entries.entry(key(date, backend, model)).or_default();
        entry.requests += 1;
        entry.input_tokens += input_tokens.unwrap_or(0);
        entry.output_tokens += output_tokens.unwrap_or(0);
        entry.cached_tokens += cached_tokens.unwrap_or(0);
        entry.last_error = error.map(str::to_string);
        self.save(&doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn recording_requests_accumulates_token_counts() {
        let dir = tempdir().unwrap();
        let store = UsageStore::new(dir.path().join("usage.json"));
        let date = NaiveDate::from_ymd_opt(2026, 7, 30).unwrap();
        store.record_request(date, "anthropic", "claude-sonnet", Some(100), Some(50), None, None).unwrap();
        store.record_request(date, "anthropic", "claude-sonnet", Some(200), Some(80), None, None).unwrap();

        let counter = store.get(date, "anthropic", "claude-sonnet").unwrap();
        assert_eq!(counter.requests, 2);
        assert_eq!(counter.input_tokens, 300);
        assert_eq!(counter.output_tokens, 130);
    }

    #[test]
    fn missing_entry_yields_zeroed_counter() {
        let dir = tempdir().unwrap();
        let store = UsageStore::new(dir.path().join("usage.json"));
        let date = NaiveDate::from_ymd_opt(2026, 7, 30).unwrap();
        let counter = store.get(date, "ollama", "llama3").unwrap();
        assert_eq!(counter.requests, 0);
    }

    #[test]
    fn usage_fraction_respects_daily_limit() {
        let counter = UsageCounter { requests: 90, ..Default::default() };
        assert_eq!(counter.usage_fraction(Some(100)), Some(0.9));
        assert_eq!(counter.usage_fraction(None), None);
    }

    #[test]
    fn last_error_is_overwritten_by_the_most_recent_request() {
        let dir = tempdir().unwrap();
        let store = UsageStore::new(dir.path().join("usage.json"));
        let date = NaiveDate::from_ymd_opt(2026, 7, 30).unwrap();
        store.record_request(date, "anthropic", "claude-sonnet", None, None, None, Some("timeout")).unwrap();
        let counter = store.get(date, "anthropic", "claude-sonnet").unwrap();
        assert_eq!(counter.last_error.as_deref(), Some("timeout"));
    }
}
