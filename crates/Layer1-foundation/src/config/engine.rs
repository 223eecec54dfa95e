//! Engine Config - 실행 엔진 통합 설정
//!
//! 글로벌(`<config_dir>/tether/engine.json`)과 프로젝트(`.tether/engine.json`)
//! 설정을 병합해서 사용합니다. 프로젝트 설정이 우선합니다.

use crate::storage::JsonStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::ToolCallConfig;

/// 설정 파일명
pub const ENGINE_CONFIG_FILE: &str = "engine.json";

pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_MAX_AGENT_TIMEOUT_MS: u64 = 1_800_000;
pub const DEFAULT_TASK_MAX_AGE_MS: u64 = 3_600_000;
pub const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 600_000;
pub const DEFAULT_WAIT_POLL_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 300_000;
pub const DEFAULT_LOG_PAGE_LIMIT: usize = 100;

/// 실행 엔진 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Foreground 기본 타임아웃
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Agent가 요청할 수 있는 타임아웃 상한 (caller 타임아웃이 꺼진 경우의 기본값)
    #[serde(default = "default_max_agent_timeout_ms")]
    pub max_agent_timeout_ms: u64,

    /// 완료된 task 보존 기간
    #[serde(default = "default_task_max_age_ms")]
    pub task_max_age_ms: u64,

    /// Eviction sweep 주기
    #[serde(default = "default_cleanup_interval_ms")]
    pub cleanup_interval_ms: u64,

    /// wait 도구의 기본 polling 주기
    #[serde(default = "default_wait_poll_interval_ms")]
    pub wait_poll_interval_ms: u64,

    /// wait 도구의 기본 대기 한도
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,

    /// get-logs 도구의 기본 페이지 크기
    #[serde(default = "default_log_page_limit")]
    pub log_page_limit: usize,

    /// 동시에 실행되는 background task 상한 (None이면 무제한)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_background: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            max_agent_timeout_ms: DEFAULT_MAX_AGENT_TIMEOUT_MS,
            task_max_age_ms: DEFAULT_TASK_MAX_AGE_MS,
            cleanup_interval_ms: DEFAULT_CLEANUP_INTERVAL_MS,
            wait_poll_interval_ms: DEFAULT_WAIT_POLL_INTERVAL_MS,
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            log_page_limit: DEFAULT_LOG_PAGE_LIMIT,
            max_concurrent_background: None,
        }
    }
}

/// 파일에서 읽은 부분 설정 (지정된 필드만 덮어쓰기)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialEngineConfig {
    default_timeout_ms: Option<u64>,
    max_agent_timeout_ms: Option<u64>,
    task_max_age_ms: Option<u64>,
    cleanup_interval_ms: Option<u64>,
    wait_poll_interval_ms: Option<u64>,
    wait_timeout_ms: Option<u64>,
    log_page_limit: Option<usize>,
    max_concurrent_background: Option<usize>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 + 프로젝트 병합 로드
    pub fn load() -> Result<Self> {
        let mut config = Self::new();

        // 1. 글로벌 설정
        if let Ok(global) = JsonStore::global() {
            config.merge_from(&global)?;
        }

        // 2. 프로젝트 설정
        if let Ok(project) = JsonStore::current_project() {
            config.merge_from(&project)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// 특정 저장소에서만 로드 (기본값 위에 병합)
    pub fn load_from(store: &JsonStore) -> Result<Self> {
        let mut config = Self::new();
        config.merge_from(store)?;
        config.validate()?;
        Ok(config)
    }

    /// 저장소에 저장
    pub fn save_to(&self, store: &JsonStore) -> Result<()> {
        store.save(ENGINE_CONFIG_FILE, self)
    }

    fn merge_from(&mut self, store: &JsonStore) -> Result<()> {
        if let Some(partial) = store.load_optional::<PartialEngineConfig>(ENGINE_CONFIG_FILE)? {
            tracing::debug!(path = %store.file_path(ENGINE_CONFIG_FILE).display(), scope = store.scope().as_str(), "merging engine config");
            self.merge(partial);
        }
        Ok(())
    }

    // ========================================================================
    // Merge
    // ========================================================================

    fn merge(&mut self, other: PartialEngineConfig) {
        if let Some(v) = other.default_timeout_ms {
            self.default_timeout_ms = v;
        }
        if let Some(v) = other.max_agent_timeout_ms {
            self.max_agent_timeout_ms = v;
        }
        if let Some(v) = other.task_max_age_ms {
            self.task_max_age_ms = v;
        }
        if let Some(v) = other.cleanup_interval_ms {
            self.cleanup_interval_ms = v;
        }
        if let Some(v) = other.wait_poll_interval_ms {
            self.wait_poll_interval_ms = v;
        }
        if let Some(v) = other.wait_timeout_ms {
            self.wait_timeout_ms = v;
        }
        if let Some(v) = other.log_page_limit {
            self.log_page_limit = v;
        }
        if other.max_concurrent_background.is_some() {
            self.max_concurrent_background = other.max_concurrent_background;
        }
    }

    /// 값 검증
    pub fn validate(&self) -> Result<()> {
        if self.default_timeout_ms == 0 {
            return Err(crate::Error::Config(
                "defaultTimeoutMs must be greater than zero".to_string(),
            ));
        }
        if self.cleanup_interval_ms == 0 {
            return Err(crate::Error::Config(
                "cleanupIntervalMs must be greater than zero".to_string(),
            ));
        }
        if self.wait_poll_interval_ms == 0 {
            return Err(crate::Error::Config(
                "waitPollIntervalMs must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrent_background == Some(0) {
            return Err(crate::Error::Config(
                "maxConcurrentBackground must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    // ========================================================================
    // Durations
    // ========================================================================

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn max_agent_timeout(&self) -> Duration {
        Duration::from_millis(self.max_agent_timeout_ms)
    }

    pub fn task_max_age(&self) -> Duration {
        Duration::from_millis(self.task_max_age_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    pub fn wait_poll_interval(&self) -> Duration {
        Duration::from_millis(self.wait_poll_interval_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    /// 이 설정의 기본값을 쓰는 ToolCallConfig
    pub fn tool_call_config(&self) -> ToolCallConfig {
        ToolCallConfig::new(self.default_timeout())
            .with_fallback_max_duration(self.max_agent_timeout())
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_max_agent_timeout_ms() -> u64 {
    DEFAULT_MAX_AGENT_TIMEOUT_MS
}

fn default_task_max_age_ms() -> u64 {
    DEFAULT_TASK_MAX_AGE_MS
}

fn default_cleanup_interval_ms() -> u64 {
    DEFAULT_CLEANUP_INTERVAL_MS
}

fn default_wait_poll_interval_ms() -> u64 {
    DEFAULT_WAIT_POLL_INTERVAL_MS
}

fn default_wait_timeout_ms() -> u64 {
    DEFAULT_WAIT_TIMEOUT_MS
}

fn default_log_page_limit() -> usize {
    DEFAULT_LOG_PAGE_LIMIT
}
