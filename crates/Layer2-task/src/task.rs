//! Task definition and types

use crate::log::LogEntry;
use crate::state::TaskStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier for a task
///
/// UUIDv7, so ids sort roughly by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generate a new time-ordered TaskId
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A background task record
///
/// Values of this type handed out by the store are snapshots; mutating one
/// never affects the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task identifier
    pub id: TaskId,

    /// Tool name that created this task
    pub tool_name: String,

    /// Arguments the tool body was invoked with
    pub args: Value,

    /// Current status
    pub status: TaskStatus,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task body started executing
    pub started_at: Option<DateTime<Utc>>,

    /// When the task reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,

    /// Tool result (completed only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error message (failed or cancelled only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Append-only log
    pub logs: Vec<LogEntry>,
}

impl Task {
    /// Create a new pending task
    pub fn new(tool_name: impl Into<String>, args: Value) -> Self {
        Self {
            id: TaskId::new(),
            tool_name: tool_name.into(),
            args,
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
            logs: Vec::new(),
        }
    }

    /// Check if task is still active (pending or running)
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Get execution duration if task has started
    pub fn duration(&self) -> Option<Duration> {
        let start = self.started_at?;
        let end = self.completed_at.unwrap_or_else(Utc::now);
        Some((end - start).to_std().unwrap_or_default())
    }

    /// Lightweight view without logs, result, or error
    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            id: self.id,
            tool_name: self.tool_name.clone(),
            status: self.status,
            started_at: self.started_at,
            completed_at: self.completed_at,
            duration_ms: self.duration().map(|d| d.as_millis() as u64),
            log_count: self.logs.len(),
        }
    }
}

/// Task overview used by listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub id: TaskId,
    pub tool_name: String,
    pub status: TaskStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub log_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_id_roundtrip() {
        let id = TaskId::new();
        let parsed: TaskId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-task".parse::<TaskId>().is_err());
    }

    #[test]
    fn test_new_task_is_pending() {
        let task = Task::new("sleep", json!({"ms": 10}));
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.is_active());
        assert!(task.duration().is_none());
        assert!(task.logs.is_empty());
    }

    #[test]
    fn test_summary_omits_heavy_fields() {
        let mut task = Task::new("sleep", json!({}));
        task.result = Some(json!({"big": "payload"}));
        let summary = serde_json::to_value(task.summary()).unwrap();
        assert_eq!(summary["toolName"], "sleep");
        assert_eq!(summary["logCount"], 0);
        assert!(summary.get("result").is_none());
        assert!(summary.get("logs").is_none());
    }
}
