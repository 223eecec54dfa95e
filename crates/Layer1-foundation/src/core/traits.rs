//! Core Traits - 핵심 인터페이스 정의
//!
//! Layer2 이상에서 구현해야 하는 핵심 trait들을 정의합니다.
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Layer4-CLI                                                 │
//! │  └── 설정 로드, tracing 초기화, 데모 실행                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Layer2-Core / Task                                         │
//! │  ├── WrappedTool (timeout / background / promotion)         │
//! │  ├── Task 관리 도구 (logs, wait, cancel, list)              │
//! │  └── TaskStore + with_timeout                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Layer1-Foundation (이 레이어)                              │
//! │  ├── Tool trait, ToolMeta                                   │
//! │  ├── ExecutionContext (취소 토큰 + 로그 콜백)                 │
//! │  └── Error, Config                                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::core::types::LogKind;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Tool Trait - 도구 인터페이스
// ============================================================================

/// 도구 메타데이터
#[derive(Debug, Clone)]
pub struct ToolMeta {
    /// 도구 이름 (고유 식별자)
    pub name: String,
    /// 표시 이름
    pub display_name: String,
    /// 설명
    pub description: String,
    /// 카테고리 (task, execute, network 등)
    pub category: String,
}

impl ToolMeta {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            description: String::new(),
            category: "general".to_string(),
        }
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn category(mut self, cat: impl Into<String>) -> Self {
        self.category = cat.into();
        self
    }
}

/// 도구 인터페이스
///
/// 도구 본문은 엔진 입장에서 불투명한 async 함수입니다.
/// 입력은 JSON 인자, 결과는 JSON 값입니다.
#[async_trait]
pub trait Tool: Send + Sync {
    /// 도구 이름 (고유 식별자)
    fn name(&self) -> &str;

    /// 도구 메타데이터 반환
    fn meta(&self) -> ToolMeta;

    /// JSON 스키마 반환 (MCP 호환)
    fn schema(&self) -> Value;

    /// 도구 실행
    ///
    /// # Arguments
    /// * `input` - JSON 형식의 입력 파라미터
    /// * `ctx` - 실행 컨텍스트 (취소 토큰, 로그 콜백)
    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value>;
}

// ============================================================================
// Execution Context - 도구 본문에 주입되는 값
// ============================================================================

/// 실행 중인 도구가 로그를 남기는 콜백
pub trait TaskLogger: Send + Sync {
    fn log(&self, kind: LogKind, message: &str);
}

/// 도구 실행 컨텍스트
///
/// 도구 본문이 받는 특권 값은 취소 토큰과 (background 실행 시) 로그 콜백뿐입니다.
#[derive(Clone)]
pub struct ExecutionContext {
    cancel: CancellationToken,
    logger: Option<Arc<dyn TaskLogger>>,
}

impl ExecutionContext {
    /// 새 취소 토큰으로 컨텍스트 생성
    pub fn new() -> Self {
        Self::with_cancellation(CancellationToken::new())
    }

    /// 외부 취소 토큰을 사용하는 컨텍스트
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            logger: None,
        }
    }

    /// 로그 콜백 설정
    pub fn with_logger(mut self, logger: Arc<dyn TaskLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn has_logger(&self) -> bool {
        self.logger.is_some()
    }

    /// 로그 한 줄 추가 (콜백이 없으면 무시)
    pub fn log(&self, kind: LogKind, message: impl AsRef<str>) {
        if let Some(logger) = &self.logger {
            logger.log(kind, message.as_ref());
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("has_logger", &self.logger.is_some())
            .finish()
    }
}
