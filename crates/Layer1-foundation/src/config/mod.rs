//! Config - 통합 설정 관리
//!
//! - `engine.rs` - EngineConfig 엔진 설정 (JSON 파일 병합)
//! - `tool_call.rs` - ToolCallConfig 도구별 타임아웃/background 제어

mod engine;
mod tool_call;

pub use engine::{
    EngineConfig, DEFAULT_CLEANUP_INTERVAL_MS, DEFAULT_LOG_PAGE_LIMIT,
    DEFAULT_MAX_AGENT_TIMEOUT_MS, DEFAULT_TASK_MAX_AGE_MS, DEFAULT_TIMEOUT_MS,
    DEFAULT_WAIT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS, ENGINE_CONFIG_FILE,
};
pub use tool_call::ToolCallConfig;
