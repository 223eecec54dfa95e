//! Task Tools - Agent가 background task를 조회/대기/취소하는 도구들
//!
//! ## 제공 도구
//!
//! - `get_task_logs` - Task 상태와 로그 페이지 조회
//! - `wait_for_task` - Task 종료까지 polling 대기 (관찰 전용)
//! - `cancel_task` - Task 취소
//! - `list_tasks` - Task 요약 목록
//!
//! 모든 도구는 같은 `TaskStore`를 공유합니다. 알 수 없는 task id는
//! 에러 대신 `{ "error": "..." }` 값으로 반환합니다.
//!
//! ## 사용 예시
//!
//! ```ignore
//! // background 시작
//! let started = sleep_tool.execute(json!({ "ms": 5000, "background": true }), &ctx).await?;
//! let id = started["backgroundTaskId"].clone();
//!
//! // 종료 대기
//! wait_for_task.execute(json!({ "taskId": id, "timeoutMs": 10000 }), &ctx).await?;
//!
//! // 로그 확인
//! get_task_logs.execute(json!({ "taskId": id, "offset": 0, "limit": 50 }), &ctx).await?;
//! ```

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tether_foundation::{EngineConfig, Error, ExecutionContext, Result, Tool, ToolMeta};
use tether_task::{LogPage, Task, TaskId, TaskStatus, TaskStore};
use tokio::time::{sleep, Instant};
use tracing::debug;

/// 도구 이름
pub const GET_TASK_LOGS: &str = "get_task_logs";
pub const WAIT_FOR_TASK: &str = "wait_for_task";
pub const CANCEL_TASK: &str = "cancel_task";
pub const LIST_TASKS: &str = "list_tasks";

/// 네 관리 도구 이름
pub const TASK_TOOL_NAMES: [&str; 4] = [GET_TASK_LOGS, WAIT_FOR_TASK, CANCEL_TASK, LIST_TASKS];

/// 관리 도구 4종 생성
pub fn task_tools(store: &TaskStore, config: &EngineConfig) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(GetTaskLogsTool::new(store.clone()).with_default_limit(config.log_page_limit))
            as Arc<dyn Tool>,
        Arc::new(
            WaitForTaskTool::new(store.clone())
                .with_defaults(config.wait_poll_interval(), config.wait_timeout()),
        ),
        Arc::new(CancelTaskTool::new(store.clone())),
        Arc::new(ListTasksTool::new(store.clone())),
    ]
}

// ============================================================================
// 공통 헬퍼
// ============================================================================

/// 필수 `taskId` 인자
fn task_id_arg(input: &Value) -> Result<&str> {
    input
        .get("taskId")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidInput("taskId is required".to_string()))
}

fn not_found(raw: &str) -> Value {
    json!({ "error": Error::TaskNotFound(raw.to_string()).to_string() })
}

/// taskId 파싱 + 조회. 실패 시 `{error}` 값
fn lookup(store: &TaskStore, raw: &str) -> std::result::Result<Task, Value> {
    raw.parse::<TaskId>()
        .ok()
        .and_then(|id| store.get(&id))
        .ok_or_else(|| not_found(raw))
}

fn u64_arg(input: &Value, key: &str) -> Option<u64> {
    input.get(key).and_then(Value::as_u64)
}

/// 종료된 task의 result/error 필드 추가
fn attach_outcome(out: &mut Value, task: &Task) {
    match task.status {
        TaskStatus::Completed => {
            out["result"] = task.result.clone().unwrap_or(Value::Null);
        }
        TaskStatus::Failed | TaskStatus::Cancelled => {
            if let Some(error) = &task.error {
                out["error"] = json!(error);
            }
        }
        TaskStatus::Pending | TaskStatus::Running => {}
    }
}

// ============================================================================
// GetTaskLogsTool - 로그 조회
// ============================================================================

/// Task 로그 조회 도구
pub struct GetTaskLogsTool {
    store: TaskStore,
    default_limit: usize,
}

impl GetTaskLogsTool {
    pub fn new(store: TaskStore) -> Self {
        Self {
            store,
            default_limit: tether_foundation::config::DEFAULT_LOG_PAGE_LIMIT,
        }
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }
}

#[async_trait]
impl Tool for GetTaskLogsTool {
    fn name(&self) -> &str {
        GET_TASK_LOGS
    }

    fn meta(&self) -> ToolMeta {
        ToolMeta::new(GET_TASK_LOGS)
            .display_name("Get Task Logs")
            .description(
                "Get status and logs of a background task. Use offset/limit to page through \
                 long logs. Includes result (completed) or error (failed/cancelled).",
            )
            .category("task")
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "taskId": {
                    "type": "string",
                    "description": "backgroundTaskId returned when the task started"
                },
                "offset": {
                    "type": "integer",
                    "description": "Index of the first log entry (default: 0)",
                    "default": 0
                },
                "limit": {
                    "type": "integer",
                    "description": format!("Maximum number of log entries (default: {})", self.default_limit),
                    "default": self.default_limit
                }
            },
            "required": ["taskId"]
        })
    }

    async fn execute(&self, input: Value, _ctx: &ExecutionContext) -> Result<Value> {
        let raw = task_id_arg(&input)?;
        let task = match lookup(&self.store, raw) {
            Ok(task) => task,
            Err(value) => return Ok(value),
        };

        let offset = u64_arg(&input, "offset").unwrap_or(0) as usize;
        let limit = u64_arg(&input, "limit")
            .map(|l| l as usize)
            .unwrap_or(self.default_limit);
        let page = LogPage::slice(&task.logs, offset, limit);

        let mut out = json!({
            "taskId": task.id,
            "toolName": task.tool_name,
            "status": task.status,
            "startedAt": task.started_at,
            "completedAt": task.completed_at,
            "logs": page.logs,
            "totalLogs": page.total,
            "hasMore": page.has_more,
        });
        attach_outcome(&mut out, &task);
        Ok(out)
    }
}

// ============================================================================
// WaitForTaskTool - 종료 대기
// ============================================================================

/// Task 종료 대기 도구
///
/// Store를 주기적으로 확인합니다. 대기가 끝나도 task 자체는 건드리지 않습니다.
pub struct WaitForTaskTool {
    store: TaskStore,
    poll_interval: Duration,
    timeout: Duration,
}

impl WaitForTaskTool {
    pub fn new(store: TaskStore) -> Self {
        Self {
            store,
            poll_interval: Duration::from_millis(
                tether_foundation::config::DEFAULT_WAIT_POLL_INTERVAL_MS,
            ),
            timeout: Duration::from_millis(tether_foundation::config::DEFAULT_WAIT_TIMEOUT_MS),
        }
    }

    pub fn with_defaults(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.timeout = timeout;
        self
    }

    /// 종료 시점 스냅샷 (로그 본문 제외)
    fn snapshot(task: &Task) -> Value {
        let mut out = json!({
            "taskId": task.id,
            "toolName": task.tool_name,
            "status": task.status,
            "startedAt": task.started_at,
            "completedAt": task.completed_at,
            "durationMs": task.duration().map(|d| d.as_millis() as u64),
            "totalLogs": task.logs.len(),
        });
        attach_outcome(&mut out, task);
        out
    }
}

#[async_trait]
impl Tool for WaitForTaskTool {
    fn name(&self) -> &str {
        WAIT_FOR_TASK
    }

    fn meta(&self) -> ToolMeta {
        ToolMeta::new(WAIT_FOR_TASK)
            .display_name("Wait For Task")
            .description(
                "Wait until a background task finishes (completed, failed or cancelled). \
                 Returns status 'wait_timeout' if it is still running when the wait budget \
                 runs out. Waiting never cancels the task.",
            )
            .category("task")
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "taskId": {
                    "type": "string",
                    "description": "backgroundTaskId returned when the task started"
                },
                "pollIntervalMs": {
                    "type": "integer",
                    "description": format!("Polling interval in ms (default: {})", self.poll_interval.as_millis()),
                    "default": self.poll_interval.as_millis() as u64
                },
                "timeoutMs": {
                    "type": "integer",
                    "description": format!("Maximum wait in ms (default: {})", self.timeout.as_millis()),
                    "default": self.timeout.as_millis() as u64
                }
            },
            "required": ["taskId"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value> {
        let raw = task_id_arg(&input)?;
        let id = match lookup(&self.store, raw) {
            Ok(task) => task.id,
            Err(value) => return Ok(value),
        };

        let poll = u64_arg(&input, "pollIntervalMs")
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(self.poll_interval);
        let budget = u64_arg(&input, "timeoutMs")
            .map(Duration::from_millis)
            .unwrap_or(self.timeout);
        let deadline = Instant::now() + budget;

        debug!(task_id = %id, poll_ms = poll.as_millis() as u64, timeout_ms = budget.as_millis() as u64, "waiting for task");

        loop {
            if ctx.is_cancelled() {
                return Ok(json!({
                    "taskId": id,
                    "status": "wait_aborted",
                    "message": "Wait was aborted; the task keeps running",
                }));
            }

            // Evicted while waiting
            let Some(task) = self.store.get(&id) else {
                return Ok(not_found(raw));
            };

            if task.status.is_terminal() {
                return Ok(Self::snapshot(&task));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(json!({
                    "taskId": id,
                    "status": "wait_timeout",
                    "taskStatus": task.status,
                    "message": format!(
                        "Task still {} after waiting {}ms",
                        task.status,
                        budget.as_millis()
                    ),
                }));
            }

            tokio::select! {
                _ = ctx.cancellation().cancelled() => {}
                _ = sleep(poll.min(deadline - now)) => {}
            }
        }
    }
}

// ============================================================================
// CancelTaskTool - 취소
// ============================================================================

/// Task 취소 도구
pub struct CancelTaskTool {
    store: TaskStore,
}

impl CancelTaskTool {
    pub fn new(store: TaskStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CancelTaskTool {
    fn name(&self) -> &str {
        CANCEL_TASK
    }

    fn meta(&self) -> ToolMeta {
        ToolMeta::new(CANCEL_TASK)
            .display_name("Cancel Task")
            .description(
                "Cancel a pending or running background task. \
                 Finished tasks are left as they are (cancelled: false).",
            )
            .category("task")
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "taskId": {
                    "type": "string",
                    "description": "backgroundTaskId returned when the task started"
                }
            },
            "required": ["taskId"]
        })
    }

    async fn execute(&self, input: Value, _ctx: &ExecutionContext) -> Result<Value> {
        let raw = task_id_arg(&input)?;
        let Ok(id) = raw.parse::<TaskId>() else {
            return Ok(not_found(raw));
        };

        let outcome = self.store.cancel(&id);
        let Some(previous) = outcome.previous_status else {
            return Ok(not_found(raw));
        };

        let message = if outcome.cancelled {
            format!("Task {} cancelled (was {})", id, previous)
        } else {
            format!("Task {} already {}; nothing to cancel", id, previous)
        };

        Ok(json!({
            "taskId": id,
            "cancelled": outcome.cancelled,
            "previousStatus": previous,
            "message": message,
        }))
    }
}

// ============================================================================
// ListTasksTool - 목록
// ============================================================================

/// Task 목록 도구
pub struct ListTasksTool {
    store: TaskStore,
}

impl ListTasksTool {
    pub fn new(store: TaskStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListTasksTool {
    fn name(&self) -> &str {
        LIST_TASKS
    }

    fn meta(&self) -> ToolMeta {
        ToolMeta::new(LIST_TASKS)
            .display_name("List Tasks")
            .description("List background tasks with status, timing and log count (no log bodies).")
            .category("task")
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "status": {
                    "type": "string",
                    "enum": ["all", "pending", "running", "completed", "failed", "cancelled"],
                    "description": "Only list tasks in this status (default: all)",
                    "default": "all"
                }
            }
        })
    }

    async fn execute(&self, input: Value, _ctx: &ExecutionContext) -> Result<Value> {
        let filter = match input.get("status").and_then(Value::as_str) {
            None | Some("all") => None,
            Some(s) => Some(s.parse::<TaskStatus>().map_err(Error::InvalidInput)?),
        };

        let summaries: Vec<_> = self
            .store
            .list(filter)
            .iter()
            .map(Task::summary)
            .collect();

        Ok(json!({
            "total": summaries.len(),
            "tasks": summaries,
        }))
    }
}
