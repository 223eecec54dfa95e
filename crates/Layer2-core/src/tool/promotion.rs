//! Failure promotion - foreground 실패 시 호출되는 확장 지점
//!
//! Foreground 실행이 실패하면 `WrappedTool`이 등록된 `PromotionHook`을 호출합니다.
//! Hook은 대체 결과를 반환해 실패를 숨기거나, `None`으로 실패를 그대로 전달합니다.
//!
//! 기본 정책 `TimeoutPromotion`은 타임아웃만 background task로 승격합니다.
//! 취소나 도구 자체 에러는 재시도 안전성을 알 수 없으므로 승격하지 않습니다.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tether_foundation::Error;
use tracing::info;

use super::wrapper::BackgroundStart;

/// Foreground 실패 정보
#[derive(Debug)]
pub struct ForegroundFailure {
    /// 원래 에러
    pub error: Error,
    /// 도구 이름
    pub tool_name: String,
    /// 제어 인자를 제거한 원래 인자
    pub args: Value,
    /// 승격된 실행이 사용할 수 있는 최대 시간
    pub max_duration: Duration,
}

/// 같은 도구/인자로 실행을 다시 만드는 팩토리
///
/// 첫 시도의 리소스는 이미 정리되었을 수 있으므로 새 task로 시작합니다.
pub trait Relaunch: Send + Sync {
    /// `seed_log`를 첫 info 로그로 남기고 `budget` 타임아웃으로 background 시작
    fn start_background(&self, seed_log: String, budget: Duration) -> BackgroundStart;
}

/// Foreground 실패 hook
#[async_trait]
pub trait PromotionHook: Send + Sync {
    /// 대체 결과를 반환하면 실패 대신 그 값이 caller에게 전달됨
    async fn on_foreground_failure(
        &self,
        failure: &ForegroundFailure,
        relaunch: &dyn Relaunch,
    ) -> Option<Value>;
}

/// 타임아웃을 background task로 승격하는 기본 정책
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeoutPromotion;

impl TimeoutPromotion {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PromotionHook for TimeoutPromotion {
    async fn on_foreground_failure(
        &self,
        failure: &ForegroundFailure,
        relaunch: &dyn Relaunch,
    ) -> Option<Value> {
        let Error::Timeout { after_ms } = failure.error else {
            return None;
        };

        let budget_ms = failure.max_duration.as_millis();
        let seed = format!(
            "Foreground execution timed out after {}ms; continuing in background with a {}ms budget",
            after_ms, budget_ms
        );
        let started = relaunch.start_background(seed, failure.max_duration);

        info!(
            tool = %failure.tool_name,
            task_id = %started.background_task_id,
            timeout_ms = after_ms,
            budget_ms = budget_ms as u64,
            "promoted timed-out call to background"
        );
        Some(started.into_value())
    }
}
