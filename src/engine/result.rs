// ABOUTME: Task run-state and serializable run summaries
// ABOUTME: Defines the state machine states and the per-tree summary snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::error::TaskFailure;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Idle,
    Progress,
    Success,
    Error,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Success | TaskState::Error)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Idle => write!(f, "idle"),
            TaskState::Progress => write!(f, "progress"),
            TaskState::Success => write!(f, "success"),
            TaskState::Error => write!(f, "error"),
        }
    }
}

/// Snapshot of a task node and its descendants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_type: String,
    pub state: TaskState,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub error: Option<TaskFailure>,
    pub children: Vec<TaskSummary>,
}

impl TaskSummary {
    pub fn total_tasks(&self) -> usize {
        1 + self.children.iter().map(TaskSummary::total_tasks).sum::<usize>()
    }

    /// Number of tasks in each state across the whole tree.
    pub fn count_by_state(&self) -> HashMap<TaskState, usize> {
        let mut counts = HashMap::new();
        self.visit(&mut |summary: &TaskSummary| {
            *counts.entry(summary.state).or_insert(0) += 1;
        });
        counts
    }

    /// Task types of every node that ended in error, depth-first.
    pub fn failed_tasks(&self) -> Vec<&str> {
        let mut failed = Vec::new();
        self.collect_failed(&mut failed);
        failed
    }

    pub fn is_successful(&self) -> bool {
        self.state == TaskState::Success
    }

    fn visit<F: FnMut(&TaskSummary)>(&self, f: &mut F) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }

    fn collect_failed<'a>(&'a self, failed: &mut Vec<&'a str>) {
        if self.state == TaskState::Error {
            failed.push(self.task_type.as_str());
        }
        for child in &self.children {
            child.collect_failed(failed);
        }
    }
}
