//! Model Selector (C6): scores every configured (backend, model) pair and
//! picks the best candidate for a movement attempt. Per-model availability
//! state is tracked the way the teacher's circuit breaker tracks per-tool
//! state — a small HashMap of lightweight counters, no external store.
//!
//! Scoring follows §4.6 directly: a base score of 100, minus an availability
//! penalty scaled by how close the model is to its daily rate limit, minus a
//! flat penalty if the model's last call errored, minus a cost penalty,
//! plus bonuses for context window and throughput, plus a historical bonus
//! from the History Store gated by a minimum sample count.

use std::collections::HashMap;

use chrono::Utc;

use crate::config::{Config, ModelProfile};
use crate::history::{hash_task, HistoryStore};
use crate::usage::UsageStore;

#[derive(Debug, Clone)]
pub struct Candidate {
    pub backend: String,
    pub model: String,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Availability {
    consecutive_failures: u32,
    last_call_errored: bool,
}

/// Tracks transient availability state across attempts within a single
/// symphony run. Historical success/failure bonus comes from the
/// HistoryStore instead, since that persists across runs; daily-usage
/// penalty comes from the UsageStore, which also persists across runs.
pub struct ModelSelector<'a> {
    config: &'a Config,
    history: &'a HistoryStore,
    usage: Option<&'a UsageStore>,
    /// Requires `supports_file_operations` in addition to `supports_tools`
    /// (Editor-role calls); other roles only need `supports_tools`.
    requires_file_operations: bool,
    availability: HashMap<(String, String), Availability>,
}

impl<'a> ModelSelector<'a> {
    pub fn new(config: &'a Config, history: &'a HistoryStore) -> Self {
        ModelSelector {
            config,
            history,
            usage: None,
            requires_file_operations: false,
            availability: HashMap::new(),
        }
    }

    pub fn with_usage(mut self, usage: &'a UsageStore) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Scopes candidates to those whose capability flags satisfy an
    /// Editor-role call (`supports_tools && supports_file_operations`).
    pub fn requiring_file_operations(mut self) -> Self {
        self.requires_file_operations = true;
        self
    }

    pub fn record_failure(&mut self, backend: &str, model: &str) {
        let entry = self.availability.entry((backend.to_string(), model.to_string())).or_default();
        entry.consecutive_failures += 1;
        entry.last_call_errored = true;
    }

    pub fn record_success(&mut self, backend: &str, model: &str) {
        self.availability.insert((backend.to_string(), model.to_string()), Availability::default());
    }

    /// Ranks all capability-eligible models, highest score first.
    pub fn rank(&self) -> Vec<Candidate> {
        self.rank_requiring(self.requires_file_operations)
    }

    fn rank_requiring(&self, requires_file_operations: bool) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = self
            .config
            .providers
            .iter()
            .flat_map(|(backend, provider)| provider.models.iter().map(move |model| (backend, model)))
            .filter(|(_, model)| model.supports_role(requires_file_operations))
            .map(|(backend, model)| Candidate {
                backend: backend.clone(),
                model: model.name.clone(),
                score: self.score(backend, model, 1.0),
            })
            .collect();
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        candidates
    }

    /// Picks the top-ranked candidate, excluding any name present in `exclude`
    /// (models already tried and failed for this movement attempt).
    pub fn select(&self, exclude: &[(String, String)]) -> Option<Candidate> {
        self.rank()
            .into_iter()
            .find(|candidate| !exclude.iter().any(|(b, m)| b == &candidate.backend && m == &candidate.model))
    }

    /// Picks the top-ranked candidate that supports file operations,
    /// regardless of this selector's own `requiring_file_operations` setting
    /// — lets the Executor keep one selector instance (and its shared
    /// availability state) across an Editor pick and every other role's pick.
    pub fn select_for_editor(&self, exclude: &[(String, String)]) -> Option<Candidate> {
        self.rank_requiring(true)
            .into_iter()
            .find(|candidate| !exclude.iter().any(|(b, m)| b == &candidate.backend && m == &candidate.model))
    }

    /// Re-ranks for a retry after a Reviewer rejection: down-weights the
    /// model/backend just used by a multiplicative ≈0.95 and returns the
    /// full ranked list so the Executor can pick the new top candidate (§4.6).
    pub fn rerank_for_retry(&self, just_used_backend: &str, just_used_model: &str) -> Vec<Candidate> {
        self.rerank_for_retry_requiring(just_used_backend, just_used_model, self.requires_file_operations)
    }

    /// Same as `rerank_for_retry`, but forces the file-ops capability filter
    /// regardless of this selector's own setting — the Editor-role counterpart
    /// to `select_for_editor`.
    pub fn rerank_for_retry_for_editor(&self, just_used_backend: &str, just_used_model: &str) -> Vec<Candidate> {
        self.rerank_for_retry_requiring(just_used_backend, just_used_model, true)
    }

    fn rerank_for_retry_requiring(
        &self,
        just_used_backend: &str,
        just_used_model: &str,
        requires_file_operations: bool,
    ) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = self
            .config
            .providers
            .iter()
            .flat_map(|(backend, provider)| provider.models.iter().map(move |model| (backend, model)))
            .filter(|(_, model)| model.supports_role(requires_file_operations))
            .map(|(backend, model)| {
                let weight = if backend.as_str() == just_used_backend && model.name == just_used_model {
                    0.95
                } else {
                    1.0
                };
                Candidate {
                    backend: backend.clone(),
                    model: model.name.clone(),
                    score: self.score(backend, model, weight),
                }
            })
            .collect();
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        candidates
    }

    fn score(&self, backend: &str, model: &ModelProfile, weight: f64) -> f64 {
        let mut score = 100.0;

        // Availability penalty: linear up to -50 as daily usage approaches
        // or exceeds the advertised limit.
        if let Some(usage) = self.usage {
            if let Ok(counter) = usage.get(Utc::now().date_naive(), backend, &model.name) {
                if let Some(fraction) = counter.usage_fraction(model.daily_rate_limit) {
                    score -= (fraction / 0.9).min(1.0) * 50.0;
                }
                if counter.last_error.is_some() {
                    score -= 30.0;
                }
            }
        }

        // Same-run consecutive-failure penalty, distinct from the persisted
        // daily-usage signal above: catches a model that's failing *right now*.
        if let Some(availability) = self.availability.get(&(backend.to_string(), model.name.clone())) {
            score -= 15.0 * availability.consecutive_failures as f64;
            if availability.last_call_errored {
                score -= 30.0;
            }
        }

        // Cost penalty, scaled by $ per million tokens (cost_per_1k_tokens * 1000).
        score -= (model.cost_per_1k_tokens * 1000.0) * 0.01;

        // Context window and throughput bonuses, scaled per §4.6.
        score += (model.context_window as f64 / 100_000.0) * 5.0;
        score += (model.throughput_tokens_per_sec / 100.0) * 5.0;

        // Historical success/failure bonus, gated by a minimum sample count.
        if let Ok(stats) = self.history.statistics_for(backend, &model.name) {
            if let Some(rate) = stats.success_rate(self.config.selector.min_samples) {
                let bonus = if rate >= 0.5 {
                    self.config.selector.success_bonus * rate
                } else {
                    self.config.selector.failure_penalty * (1.0 - rate)
                };
                score += bonus;
            }
        }

        score * weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{ExecutionOutcome, ExecutionRecord};
    use chrono::Utc;
    use tempfile::tempdir;

    fn test_config() -> Config {
        Config::default()
    }

    #[test]
    fn ranks_cheaper_model_higher_when_otherwise_equal() {
        let dir = tempdir().unwrap();
        let history = HistoryStore::new(dir.path());
        let config = test_config();
        let selector = ModelSelector::new(&config, &history);
        let ranked = selector.rank();
        assert!(!ranked.is_empty());
    }

    #[test]
    fn repeated_failures_drop_a_candidate_down_the_ranking() {
        let dir = tempdir().unwrap();
        let history = HistoryStore::new(dir.path());
        let config = test_config();
        let mut selector = ModelSelector::new(&config, &history);

        let top_before = selector.rank()[0].clone();
        selector.record_failure(&top_before.backend, &top_before.model);
        selector.record_failure(&top_before.backend, &top_before.model);
        selector.record_failure(&top_before.backend, &top_before.model);

        let ranked_after = selector.rank();
        let position = ranked_after.iter().position(|c| c.backend == top_before.backend && c.model == top_before.model);
        assert!(position.unwrap_or(0) > 0 || ranked_after.len() == 1);
    }

    #[test]
    fn select_excludes_already_tried_candidates() {
        let dir = tempdir().unwrap();
        let history = HistoryStore::new(dir.path());
        let config = test_config();
        let selector = ModelSelector::new(&config, &history);
        let top = selector.rank()[0].clone();
        let excluded = vec![(top.backend.clone(), top.model.clone())];
        let next = selector.select(&excluded);
        assert!(next.map(|c| c.model) != Some(top.model) || selector.rank().len() == 1);
    }

    #[test]
    fn min_sample_gate_prevents_a_single_failure_from_tanking_the_score() {
        let dir = tempdir().unwrap();
        let history = HistoryStore::new(dir.path());
        history
            .append(&ExecutionRecord {
                symphony_id: "s".into(),
                movement_id: "m".into(),
                task_hash: hash_task("test task"),
                backend: "anthropic".into(),
                model: "claude-sonnet".into(),
                agent_role: "editor".into(),
                language: None,
                outcome: ExecutionOutcome::Failure,
                duration_ms: 100,
                timestamp: Utc::now(),
            })
            .unwrap();
        let config = test_config();
        let selector = ModelSelector::new(&config, &history);
        let candidate = selector.rank().into_iter().find(|c| c.model == "claude-sonnet").unwrap();
        assert!(candidate.score > 60.0);
    }

    #[test]
    fn monotonic_in_success_history_raising_success_never_lowers_score() {
        // Testable property #6: flipping a record's success from false to
        // true cannot decrease the (backend, model)'s score.
        let dir_fail = tempdir().unwrap();
        let history_fail = HistoryStore::new(dir_fail.path());
        for _ in 0..5 {
            history_fail
                .append(&ExecutionRecord {
                    symphony_id: "s".into(),
                    movement_id: "m".into(),
                    task_hash: hash_task("test task"),
                    backend: "anthropic".into(),
                    model: "claude-sonnet".into(),
                    agent_role: "editor".into(),
                    language: None,
                    outcome: ExecutionOutcome::Failure,
                    duration_ms: 100,
                    timestamp: Utc::now(),
                })
                .unwrap();
        }
        let dir_success = tempdir().unwrap();
        let history_success = HistoryStore::new(dir_success.path());
        for _ in 0..5 {
            history_success
                .append(&ExecutionRecord {
                    symphony_id: "s".into(),
                    movement_id: "m".into(),
                    task_hash: hash_task("test task"),
                    backend: "anthropic".into(),
                    model: "claude-sonnet".into(),
                    agent_role: "editor".into(),
                    language: None,
                    outcome: ExecutionOutcome::Success,
                    duration_ms: 100,
                    timestamp: Utc::now(),
                })
                .unwrap();
        }

        let config = test_config();
        let selector_fail = ModelSelector::new(&config, &history_fail);
        let selector_success = ModelSelector::new(&config, &history_success);
        let score_fail = selector_fail.rank().into_iter().find(|c| c.model == "claude-sonnet").unwrap().score;
        let score_success = selector_success.rank().into_iter().find(|c| c.model == "claude-sonnet").unwrap().score;
        assert!(score_success >= score_fail);
    }

    #[test]
    fn retry_rerank_downweights_the_just_used_model() {
        let dir = tempdir().unwrap();
        let history = HistoryStore::new(dir.path());
        let config = test_config();
        let selector = ModelSelector::new(&config, &history);
        let top = selector.rank()[0].clone();
        let reranked = selector.rerank_for_retry(&top.backend, &top.model);
        let same = reranked.iter().find(|c| c.backend == top.backend && c.model == top.model).unwrap();
        assert!(same.score < top.score);
    }

    #[test]
    fn select_for_editor_ignores_non_file_op_models_even_on_a_general_selector() {
        let dir = tempdir().unwrap();
        let history = HistoryStore::new(dir.path());
        let mut config = test_config();
        config.providers.get_mut("ollama").unwrap().models[0].supports_file_operations = false;
        let selector = ModelSelector::new(&config, &history);
        let picked = selector.select_for_editor(&[]).unwrap();
        assert_ne!(picked.model, "llama3");
    }

    #[test]
    fn editor_role_excludes_models_without_file_operation_support() {
        let dir = tempdir().unwrap();
        let history = HistoryStore::new(dir.path());
        let mut config = test_config();
        config.providers.get_mut("ollama").unwrap().models[0].supports_file_operations = false;
        let selector = ModelSelector::new(&config, &history).requiring_file_operations();
        assert!(selector.rank().iter().all(|c| c.model != "llama3"));
    }
}
