//! Tool Call Config - 도구별 실행 제어 설정
//!
//! 도구 등록 시점에 결정되며, 호출마다 바뀌지 않습니다.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::engine::{DEFAULT_MAX_AGENT_TIMEOUT_MS, DEFAULT_TIMEOUT_MS};

/// 도구 실행 제어 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallConfig {
    /// 기본 foreground 타임아웃
    pub duration: Duration,

    /// Agent가 `timeout` 인자로 다른 타임아웃을 요청할 수 있는지
    pub allow_agent_set_duration: bool,

    /// Agent 요청 타임아웃 상한 (None이면 `max_agent_duration()` 규칙 적용)
    pub max_allowed_agent_duration: Option<Duration>,

    /// Agent가 `background` 인자로 분리 실행을 요청할 수 있는지
    pub allow_background: bool,

    /// caller 타임아웃이 꺼져 있을 때의 상한
    fallback_max_duration: Duration,
}

impl Default for ToolCallConfig {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }
}

impl ToolCallConfig {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            allow_agent_set_duration: false,
            max_allowed_agent_duration: None,
            allow_background: false,
            fallback_max_duration: Duration::from_millis(DEFAULT_MAX_AGENT_TIMEOUT_MS),
        }
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn allow_agent_set_duration(mut self, allow: bool) -> Self {
        self.allow_agent_set_duration = allow;
        self
    }

    pub fn with_max_allowed_agent_duration(mut self, max: Duration) -> Self {
        self.max_allowed_agent_duration = Some(max);
        self
    }

    pub fn allow_background(mut self, allow: bool) -> Self {
        self.allow_background = allow;
        self
    }

    pub(crate) fn with_fallback_max_duration(mut self, max: Duration) -> Self {
        self.fallback_max_duration = max;
        self
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Caller가 타임아웃을 지정할 수 있는지 (background 허용 시 자동 허용)
    pub fn caller_timeout_allowed(&self) -> bool {
        self.allow_agent_set_duration || self.allow_background
    }

    /// Agent 요청 타임아웃 상한이자 승격된 background 실행의 예산
    pub fn max_agent_duration(&self) -> Duration {
        match self.max_allowed_agent_duration {
            Some(max) => max,
            None if self.caller_timeout_allowed() => self.duration,
            None => self.fallback_max_duration,
        }
    }

    /// 실제로 적용되는 타임아웃
    pub fn effective_timeout(&self, requested: Option<Duration>) -> Duration {
        match requested {
            Some(requested) if self.caller_timeout_allowed() => {
                requested.min(self.max_agent_duration())
            }
            _ => self.duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: Duration = Duration::from_secs(1);

    #[test]
    fn test_defaults() {
        let config = ToolCallConfig::default();
        assert_eq!(config.duration, Duration::from_secs(60));
        assert!(!config.caller_timeout_allowed());
        assert_eq!(config.max_agent_duration(), Duration::from_secs(1800));
    }

    #[test]
    fn test_requested_timeout_ignored_when_not_allowed() {
        let config = ToolCallConfig::new(10 * SEC);
        assert_eq!(config.effective_timeout(Some(3 * SEC)), 10 * SEC);
        assert_eq!(config.effective_timeout(None), 10 * SEC);
    }

    #[test]
    fn test_requested_timeout_capped_by_max() {
        let config = ToolCallConfig::new(10 * SEC)
            .allow_agent_set_duration(true)
            .with_max_allowed_agent_duration(30 * SEC);
        assert_eq!(config.effective_timeout(Some(3 * SEC)), 3 * SEC);
        assert_eq!(config.effective_timeout(Some(300 * SEC)), 30 * SEC);
        assert_eq!(config.effective_timeout(None), 10 * SEC);
    }

    #[test]
    fn test_max_defaults_to_duration_when_caller_may_set() {
        let config = ToolCallConfig::new(10 * SEC).allow_agent_set_duration(true);
        assert_eq!(config.max_agent_duration(), 10 * SEC);
        assert_eq!(config.effective_timeout(Some(60 * SEC)), 10 * SEC);
    }

    #[test]
    fn test_background_implies_caller_timeout() {
        let config = ToolCallConfig::new(10 * SEC)
            .allow_background(true)
            .with_max_allowed_agent_duration(120 * SEC);
        assert!(config.caller_timeout_allowed());
        assert_eq!(config.effective_timeout(Some(90 * SEC)), 90 * SEC);
    }
}
