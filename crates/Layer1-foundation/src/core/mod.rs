//! Core Module - 핵심 인터페이스 및 타입
//!
//! ## 타입 계층
//!
//! - `types.rs`: 데이터 타입 (LogKind, CapturedOutput)
//! - `traits.rs`: 인터페이스 (Tool, TaskLogger, ExecutionContext)

pub mod traits;
pub mod types;

// Types
pub use types::{CapturedOutput, LogKind};

// Traits
pub use traits::{ExecutionContext, TaskLogger, Tool, ToolMeta};
