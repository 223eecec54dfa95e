//! Tool System - 실행 제어가 적용된 도구 시스템
//!
//! Layer1의 Tool trait을 감싸서 타임아웃, background 실행, 실패 승격을 제공합니다.
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ToolRegistry                                                │
//! │  ├── register_wrapped(tool, config) - 감싸서 등록            │
//! │  ├── get(name) / execute(name, input, ctx)                   │
//! │  └── schemas() - 스키마 목록                                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  WrappedTool (Tool 구현)                                     │
//! │  ├── augment_schema() - timeout / background 인자            │
//! │  ├── foreground: with_timeout + PromotionHook                │
//! │  └── background: TaskStore task + spawn                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Builtin Task Tools (Tool 구현)                              │
//! │  ├── get_task_logs / wait_for_task                           │
//! │  └── cancel_task / list_tasks                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod builtin;
pub mod promotion;
mod registry;
pub mod schema;
mod wrapper;

// Re-exports: Tool trait from Layer1
pub use tether_foundation::{ExecutionContext, Tool, ToolCallConfig, ToolMeta};

// Re-exports: Tools
pub use builtin::{
    task_tools, CancelTaskTool, GetTaskLogsTool, ListTasksTool, WaitForTaskTool, TASK_TOOL_NAMES,
};

// Re-exports: Wrapper
pub use promotion::{ForegroundFailure, PromotionHook, Relaunch, TimeoutPromotion};
pub use schema::{augment_schema, split_controls, CallControls};
pub use wrapper::{BackgroundStart, WrappedTool};

// Re-exports: Registry
pub use registry::ToolRegistry;
