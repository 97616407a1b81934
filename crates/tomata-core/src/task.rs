//! Task tracking.
//!
//! Tasks are lightweight to-do entries; the one selected for the session
//! is credited a pomodoro each time a focus phase completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Focus sessions completed while this task was selected.
    #[serde(default)]
    pub pomodoros: u32,
}

impl Task {
    /// Create a task with a fresh id. The title is trimmed; an empty title
    /// is rejected.
    pub fn new(title: &str) -> Result<Self, ValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "title".into(),
                message: "task title cannot be empty".into(),
            });
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            completed: false,
            created_at: Utc::now(),
            completed_at: None,
            pomodoros: 0,
        })
    }

    /// Mark complete or reopen, stamping or clearing `completed_at`.
    pub fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
        self.completed_at = completed.then(Utc::now);
    }
}

/// Aggregate task statistics for the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TaskStats {
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub total_pomodoros: u64,
    /// Percentage of tasks completed, 0.0 when there are none.
    pub completion_rate: f64,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let total_tasks = tasks.len() as u64;
        let completed_tasks = tasks.iter().filter(|t| t.completed).count() as u64;
        let total_pomodoros = tasks.iter().map(|t| u64::from(t.pomodoros)).sum();
        let completion_rate = if total_tasks == 0 {
            0.0
        } else {
            completed_tasks as f64 / total_tasks as f64 * 100.0
        };
        Self {
            total_tasks,
            completed_tasks,
            total_pomodoros,
            completion_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_trims_title() {
        let task = Task::new("  write report  ").unwrap();
        assert_eq!(task.title, "write report");
        assert!(!task.completed);
        assert_eq!(task.pomodoros, 0);
    }

    #[test]
    fn empty_title_is_rejected() {
        assert!(Task::new("   ").is_err());
        assert!(Task::new("").is_err());
    }

    #[test]
    fn completing_stamps_and_reopening_clears() {
        let mut task = Task::new("t").unwrap();
        task.set_completed(true);
        assert!(task.completed);
        assert!(task.completed_at.is_some());
        task.set_completed(false);
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn stats_aggregate_counts_and_rate() {
        let mut a = Task::new("a").unwrap();
        a.pomodoros = 3;
        a.set_completed(true);
        let mut b = Task::new("b").unwrap();
        b.pomodoros = 1;
        let stats = TaskStats::from_tasks(&[a, b]);
        assert_eq!(stats.total_tasks, 2);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.total_pomodoros, 4);
        assert!((stats.completion_rate - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn stats_on_empty_list_are_zero() {
        let stats = TaskStats::from_tasks(&[]);
        assert_eq!(stats.total_tasks, 0);
        assert_eq!(stats.completion_rate, 0.0);
    }
}
