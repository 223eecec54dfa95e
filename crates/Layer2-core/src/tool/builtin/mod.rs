//! Builtin Tools - 내장 도구들
//!
//! ## 도구 목록
//!
//! ### Task 관리 (Task)
//! - `get_task_logs` - Task 상태/로그 조회
//! - `wait_for_task` - Task 종료 대기
//! - `cancel_task` - Task 취소
//! - `list_tasks` - Task 목록

pub mod task;

// Re-exports
pub use task::{
    task_tools, CancelTaskTool, GetTaskLogsTool, ListTasksTool, WaitForTaskTool, CANCEL_TASK,
    GET_TASK_LOGS, LIST_TASKS, TASK_TOOL_NAMES, WAIT_FOR_TASK,
};
