//! Symphony: the run of a task — task plus ordered movements plus execution metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::movement::Movement;
use super::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymphonyOutcome {
    Running,
    Succeeded,
    Failed,
    Aborted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symphony {
    pub id: String,
    pub task: Task,
    pub movements: Vec<Movement>,
    pub current_index: usize,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub outcome: SymphonyOutcome,
}

impl Symphony {
    pub fn new(task: Task, movements: Vec<Movement>) -> Self {
        Symphony {
            id: Uuid::new_v4().to_string(),
            task,
            movements,
            current_index: 0,
            started_at: Utc::now(),
            ended_at: None,
            outcome: SymphonyOutcome::Running,
        }
    }

    pub fn succeeded_ids(&self) -> Vec<String> {
        self.movements
            .iter()
            .filter(|m| m.status == super::movement::MovementStatus::Succeeded)
            .map(|m| m.id.clone())
            .collect()
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.outcome, SymphonyOutcome::Running)
    }

    pub fn finish(&mut self, outcome: SymphonyOutcome) {
        self.outcome = outcome;
        self.ended_at = Some(Utc::now());
    }
}
