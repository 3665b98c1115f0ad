//! Movement: one atomic phase of a symphony.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    pub id: String,
    pub name: String,
    pub goal: String,
    pub depends_on: Vec<String>,
    pub required_files: Vec<String>,
    pub produced_files: Vec<String>,
    pub success_criteria: Vec<String>,
    pub status: MovementStatus,
    pub attempts: u32,
}

impl Movement {
    pub fn new(id: impl Into<String>, name: impl Into<String>, goal: impl Into<String>) -> Self {
        Movement {
            id: id.into(),
            name: name.into(),
            goal: goal.into(),
            depends_on: Vec::new(),
            required_files: Vec::new(),
            produced_files: Vec::new(),
            success_criteria: Vec::new(),
            status: MovementStatus::Pending,
            attempts: 0,
        }
    }

    /// A movement may start once every dependency id has succeeded.
    pub fn is_ready(&self, succeeded: &[String]) -> bool {
        self.depends_on.iter().all(|dep| succeeded.contains(dep))
    }
}

/// Rejects cyclic dependency graphs at decomposition time (DAG check).
///
/// Returns the ids involved in the first cycle found, if any.
pub fn detect_cycle(movements: &[Movement]) -> Option<Vec<String>> {
    use std::collections::HashMap;

    let index: HashMap<&str, &Movement> = movements.iter().map(|m| (m.id.as_str(), m)).collect();

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    let mut marks: HashMap<&str, Mark> = movements.iter().map(|m| (m.id.as_str(), Mark::Unvisited)).collect();
    let mut stack: Vec<String> = Vec::new();

    fn visit<'a>(
        id: &'a str,
        index: &HashMap<&'a str, &'a Movement>,
        marks: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        match marks.get(id) {
            Some(Mark::Done) => return None,
            Some(Mark::InProgress) => {
                stack.push(id.to_string());
                return Some(stack.clone());
            }
            _ => {}
        }
        marks.insert(id, Mark::InProgress);
        stack.push(id.to_string());
        if let Some(movement) = index.get(id) {
            for dep in &movement.depends_on {
                if let Some(cycle) = visit(dep.as_str(), index, marks, stack) {
                    return Some(cycle);
                }
            }
        }
        stack.pop();
        marks.insert(id, Mark::Done);
        None
    }

    for m in movements {
        if let Some(cycle) = visit(m.id.as_str(), &index, &mut marks, &mut stack) {
            return Some(cycle);
        }
    }
    None
}

/// Topologically orders movements, assuming `detect_cycle` already returned `None`.
pub fn topological_order(movements: &[Movement]) -> Vec<String> {
    let mut order = Vec::with_capacity(movements.len());
    let mut done: Vec<String> = Vec::new();
    let mut remaining: Vec<&Movement> = movements.iter().collect();

    while !remaining.is_empty() {
        let ready_idx = remaining
            .iter()
            .position(|m| m.depends_on.iter().all(|d| done.contains(d)));
        match ready_idx {
            Some(idx) => {
                let m = remaining.remove(idx);
                done.push(m.id.clone());
                order.push(m.id.clone());
            }
            None => break, // cycle: caller should have rejected this already
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(id: &str, deps: &[&str]) -> Movement {
        let mut mv = Movement::new(id, id, "goal");
        mv.depends_on = deps.iter().map(|s| s.to_string()).collect();
        mv
    }

    #[test]
    fn acyclic_graph_detects_no_cycle() {
        let movements = vec![m("a", &[]), m("b", &["a"]), m("c", &["a", "b"])];
        assert!(detect_cycle(&movements).is_none());
        assert_eq!(topological_order(&movements), vec!["a", "b", "c"]);
    }

    #[test]
    fn cyclic_graph_is_detected() {
        let movements = vec![m("a", &["b"]), m("b", &["a"])];
        assert!(detect_cycle(&movements).is_some());
    }

    #[test]
    fn movement_ready_only_when_deps_succeeded() {
        let mv = m("c", &["a", "b"]);
        assert!(!mv.is_ready(&["a".to_string()]));
        assert!(mv.is_ready(&["a".to_string(), "b".to_string()]));
    }
}
