//! # tether-foundation
//!
//! Foundation layer for Tether:
//! - Core: 핵심 Trait 정의 (Tool, TaskLogger, ExecutionContext)
//! - Config: 엔진 설정 (EngineConfig), 도구별 실행 제어 (ToolCallConfig)
//! - Storage: JsonStore (설정 파일)
//! - Error: 공통 에러 타입

pub mod config;
pub mod core;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Core (핵심 Trait 및 타입)
// ============================================================================
pub use core::{CapturedOutput, ExecutionContext, LogKind, TaskLogger, Tool, ToolMeta};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{EngineConfig, ToolCallConfig, ENGINE_CONFIG_FILE};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{JsonStore, StoreScope};

// Re-export so downstream crates share one token type
pub use tokio_util::sync::CancellationToken;
