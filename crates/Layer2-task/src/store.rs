//! Task Store - in-memory registry of background tasks
//!
//! Features:
//! - Task creation with a per-task cancellation token
//! - Forward-only status transitions (atomic under the map lock)
//! - Append-only logs with pagination and live subscription
//! - Cancellation of pending/running tasks
//! - Age-based eviction of finished tasks (on demand or via a janitor)
//! - Optional bound on concurrently running background bodies
//!
//! The store is an explicitly constructed handle. Clones share the same map,
//! so a host can pass it wherever tasks are created or inspected, and tests
//! can build isolated stores.

use crate::log::{LogEntry, LogPage};
use crate::state::TaskStatus;
use crate::task::{Task, TaskId};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tether_foundation::{CancellationToken, EngineConfig, LogKind, TaskLogger};
use tokio::sync::{broadcast, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Broadcast channel capacity per task
const BROADCAST_CAPACITY: usize = 1000;

/// Error recorded on a task cancelled through the store
pub const CANCELLED_MESSAGE: &str = "Task was cancelled";

/// A status transition applied through [`TaskStore::update`]
#[derive(Debug, Clone, PartialEq)]
pub enum TaskUpdate {
    /// Body started executing
    Running,
    /// Body finished with a result
    Completed(Value),
    /// Body failed (tool error or timeout)
    Failed(String),
    /// Body was interrupted by its cancellation signal
    Cancelled(String),
}

impl TaskUpdate {
    pub fn status(&self) -> TaskStatus {
        match self {
            TaskUpdate::Running => TaskStatus::Running,
            TaskUpdate::Completed(_) => TaskStatus::Completed,
            TaskUpdate::Failed(_) => TaskStatus::Failed,
            TaskUpdate::Cancelled(_) => TaskStatus::Cancelled,
        }
    }
}

/// Outcome of [`TaskStore::cancel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOutcome {
    /// Whether this call moved the task to `cancelled`
    pub cancelled: bool,
    /// Status before the call; `None` if the task does not exist
    pub previous_status: Option<TaskStatus>,
}

impl CancelOutcome {
    pub fn not_found() -> Self {
        Self {
            cancelled: false,
            previous_status: None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.previous_status.is_none()
    }
}

/// Store-owned record; never handed out directly
struct TaskRecord {
    task: Task,
    cancel: CancellationToken,
    tx: broadcast::Sender<LogEntry>,
}

impl TaskRecord {
    fn push_log(&mut self, entry: LogEntry) {
        // Send to live subscribers, if any
        let _ = self.tx.send(entry.clone());
        self.task.logs.push(entry);
    }
}

/// In-memory task registry
#[derive(Clone)]
pub struct TaskStore {
    /// All tasks by ID
    tasks: Arc<RwLock<HashMap<TaskId, TaskRecord>>>,

    /// Parent of every task token; cancelled on shutdown
    root: CancellationToken,

    /// Running-body limiter (None = unbounded)
    limiter: Option<Arc<Semaphore>>,
}

impl TaskStore {
    /// Create an empty, unbounded store
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
            root: CancellationToken::new(),
            limiter: None,
        }
    }

    /// Create a store honoring the engine configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        match config.max_concurrent_background {
            Some(limit) => Self::new().with_concurrency_limit(limit),
            None => Self::new(),
        }
    }

    /// Bound the number of background bodies running at once
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.limiter = Some(Arc::new(Semaphore::new(limit.max(1))));
        self
    }

    /// Whether background bodies must acquire a slot before running
    pub fn is_bounded(&self) -> bool {
        self.limiter.is_some()
    }

    /// Wait for a running slot. Returns `None` when the store is unbounded.
    pub async fn acquire_slot(&self) -> Option<OwnedSemaphorePermit> {
        match &self.limiter {
            Some(limiter) => Arc::clone(limiter).acquire_owned().await.ok(),
            None => None,
        }
    }

    // ========== Creation & Reads ==========

    /// Register a new pending task
    pub fn create(&self, tool_name: impl Into<String>, args: Value) -> Task {
        let task = Task::new(tool_name, args);
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let record = TaskRecord {
            task: task.clone(),
            cancel: self.root.child_token(),
            tx,
        };

        self.tasks.write().insert(task.id, record);
        info!(task_id = %task.id, tool = %task.tool_name, "task created");
        task
    }

    /// Get a snapshot of a task
    pub fn get(&self, id: &TaskId) -> Option<Task> {
        self.tasks.read().get(id).map(|r| r.task.clone())
    }

    /// Snapshots of all tasks, oldest first
    pub fn get_all(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tasks.read().values().map(|r| r.task.clone()).collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        tasks
    }

    /// Snapshots filtered by status (`None` = all)
    pub fn list(&self, status: Option<TaskStatus>) -> Vec<Task> {
        let mut tasks = self.get_all();
        if let Some(status) = status {
            tasks.retain(|t| t.status == status);
        }
        tasks
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.tasks.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }

    // ========== Transitions ==========

    /// Apply a forward status transition.
    ///
    /// Returns `false` (and changes nothing) for unknown tasks and for any
    /// transition out of a terminal state. `completed_at` is set on the one
    /// transition that enters a terminal state.
    pub fn update(&self, id: &TaskId, update: TaskUpdate) -> bool {
        let mut tasks = self.tasks.write();
        let Some(record) = tasks.get_mut(id) else {
            return false;
        };

        let task = &mut record.task;
        let next = update.status();
        if !task.status.can_transition_to(next) {
            debug!(task_id = %id, from = %task.status, to = %next, "ignoring transition");
            return false;
        }

        let now = Utc::now();
        task.status = next;
        match update {
            TaskUpdate::Running => task.started_at = Some(now),
            TaskUpdate::Completed(result) => {
                task.result = Some(result);
                task.completed_at = Some(now);
            }
            TaskUpdate::Failed(error) | TaskUpdate::Cancelled(error) => {
                task.error = Some(error);
                task.completed_at = Some(now);
            }
        }

        info!(task_id = %id, status = %next, "task status changed");
        true
    }

    /// Cancel a pending or running task.
    ///
    /// Signals the task's token and records `cancelled`. Terminal tasks are
    /// left untouched and report `cancelled = false`.
    pub fn cancel(&self, id: &TaskId) -> CancelOutcome {
        let mut tasks = self.tasks.write();
        let Some(record) = tasks.get_mut(id) else {
            return CancelOutcome::not_found();
        };

        let previous = record.task.status;
        if !previous.is_active() {
            return CancelOutcome {
                cancelled: false,
                previous_status: Some(previous),
            };
        }

        record.cancel.cancel();
        record.task.status = TaskStatus::Cancelled;
        record.task.error = Some(CANCELLED_MESSAGE.to_string());
        record.task.completed_at = Some(Utc::now());
        record.push_log(LogEntry::info(format!("Cancelled while {}", previous)));

        info!(task_id = %id, previous = %previous, "task cancelled");
        CancelOutcome {
            cancelled: true,
            previous_status: Some(previous),
        }
    }

    /// A token that fires when the task is cancelled (or the store shuts down).
    ///
    /// Cancelling the returned token does not cancel the task.
    pub fn cancellation_token(&self, id: &TaskId) -> Option<CancellationToken> {
        self.tasks.read().get(id).map(|r| r.cancel.child_token())
    }

    // ========== Logs ==========

    /// Append a log entry; no-op if the task no longer exists
    pub fn add_log(&self, id: &TaskId, kind: LogKind, message: impl Into<String>) {
        if let Some(record) = self.tasks.write().get_mut(id) {
            record.push_log(LogEntry::new(kind, message));
        }
    }

    /// Read `limit` entries starting at `offset`
    pub fn get_logs(&self, id: &TaskId, offset: usize, limit: usize) -> Option<LogPage> {
        self.tasks
            .read()
            .get(id)
            .map(|r| LogPage::slice(&r.task.logs, offset, limit))
    }

    /// Subscribe to log entries appended from now on
    pub fn subscribe(&self, id: &TaskId) -> Option<broadcast::Receiver<LogEntry>> {
        self.tasks.read().get(id).map(|r| r.tx.subscribe())
    }

    /// Log callback bound to one task, for injection into a tool body
    pub fn logger(&self, id: TaskId) -> Arc<dyn TaskLogger> {
        Arc::new(TaskLogSink {
            store: self.clone(),
            id,
        })
    }

    // ========== Eviction ==========

    /// Remove finished tasks whose `completed_at` is older than `max_age`
    pub fn cleanup(&self, max_age: Duration) -> usize {
        let cutoff = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age));
        match cutoff {
            Some(cutoff) => self.cleanup_before(cutoff),
            None => 0,
        }
    }

    /// Remove finished tasks completed strictly before `cutoff`.
    /// Pending and running tasks are never removed.
    pub fn cleanup_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut tasks = self.tasks.write();
        let before = tasks.len();
        tasks.retain(|_, r| {
            !(r.task.status.is_terminal() && r.task.completed_at.is_some_and(|at| at < cutoff))
        });
        let removed = before - tasks.len();
        if removed > 0 {
            debug!(removed, remaining = tasks.len(), "evicted finished tasks");
        }
        removed
    }

    /// Run `cleanup(max_age)` every `interval` until `shutdown()`
    pub fn spawn_janitor(&self, interval: Duration, max_age: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = store.root.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = store.cleanup(max_age);
                        if removed > 0 {
                            info!(removed, "task janitor sweep");
                        }
                    }
                }
            }
            debug!("task janitor stopped");
        })
    }

    /// Cancel every task token and stop the janitor
    pub fn shutdown(&self) {
        self.root.cancel();
        let mut tasks = self.tasks.write();
        let now = Utc::now();
        let mut cancelled = 0;
        for (id, record) in tasks.iter_mut().filter(|(_, r)| r.task.status.is_active()) {
            let previous = record.task.status;
            record.task.status = TaskStatus::Cancelled;
            record.task.error = Some(CANCELLED_MESSAGE.to_string());
            record.task.completed_at = Some(now);
            record.push_log(LogEntry::info(format!("Cancelled on shutdown while {}", previous)));
            debug!(task_id = %id, previous = %previous, "cancelled on shutdown");
            cancelled += 1;
        }
        info!(cancelled, "task store shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.root.is_cancelled()
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

/// `TaskLogger` writing into one task's log
struct TaskLogSink {
    store: TaskStore,
    id: TaskId,
}

impl TaskLogger for TaskLogSink {
    fn log(&self, kind: LogKind, message: &str) {
        self.store.add_log(&self.id, kind, message);
    }
}
