//! tether-core: Tool execution engine
//!
//! Layer2 - 도구 실행 제어 레이어
//!
//! # 주요 모듈
//!
//! - `tool`: WrappedTool (타임아웃 / background / 실패 승격), Task 관리 도구, ToolRegistry
//!
//! # 사용 예시
//!
//! ```ignore
//! use tether_core::{ToolRegistry, ToolCallConfig};
//! use tether_task::TaskStore;
//!
//! let config = EngineConfig::load()?;
//! let store = TaskStore::from_config(&config);
//! let janitor = store.spawn_janitor(config.cleanup_interval(), config.task_max_age());
//!
//! let mut registry = ToolRegistry::new(store.clone(), config);
//! registry.register_wrapped(
//!     Arc::new(MyTool),
//!     ToolCallConfig::default().allow_background(true),
//! );
//!
//! // background 실행
//! let started = registry
//!     .execute("my_tool", json!({ "background": true }), &ExecutionContext::new())
//!     .await?;
//! ```

pub mod tool;

// Re-exports: Tool
pub use tool::{
    augment_schema, task_tools, BackgroundStart, CallControls, CancelTaskTool, ForegroundFailure,
    GetTaskLogsTool, ListTasksTool, PromotionHook, Relaunch, TimeoutPromotion, ToolRegistry,
    WaitForTaskTool, WrappedTool, TASK_TOOL_NAMES,
};

// Re-exports: Layer1
pub use tether_foundation::{
    EngineConfig, Error, ExecutionContext, LogKind, Result, Tool, ToolCallConfig, ToolMeta,
};
