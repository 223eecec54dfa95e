//! Tool Registry - 도구 등록 및 관리
//!
//! Agent에게 노출되는 모든 도구를 관리합니다.
//!
//! ## 기능
//! - 도구 등록/조회/제거
//! - `ToolCallConfig`로 감싼 도구 등록 (`register_wrapped`)
//! - background를 허용하는 도구나 승격 hook이 걸린 도구가 등록되면 task 관리 도구 4종 자동 등록
//!
//! ```ignore
//! let store = TaskStore::from_config(&config);
//! let mut registry = ToolRegistry::new(store, config);
//!
//! registry.register_wrapped(Arc::new(SleepTool), ToolCallConfig::default().allow_background(true));
//! assert!(registry.contains("wait_for_task"));
//! ```

use super::builtin::task::{task_tools, TASK_TOOL_NAMES};
use super::promotion::{PromotionHook, TimeoutPromotion};
use super::wrapper::WrappedTool;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tether_foundation::{EngineConfig, Error, ExecutionContext, Result, Tool, ToolCallConfig};
use tether_task::TaskStore;
use tracing::{debug, info};

/// 도구 레지스트리
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    store: TaskStore,
    config: EngineConfig,
    promotion: Option<Arc<dyn PromotionHook>>,
}

impl ToolRegistry {
    /// 빈 레지스트리 생성 (기본 승격 정책: `TimeoutPromotion`)
    pub fn new(store: TaskStore, config: EngineConfig) -> Self {
        Self {
            tools: HashMap::new(),
            store,
            config,
            promotion: Some(Arc::new(TimeoutPromotion)),
        }
    }

    /// 이후 감싸는 도구에 적용할 승격 hook 교체 (None이면 승격 안 함)
    pub fn with_promotion(mut self, hook: Option<Arc<dyn PromotionHook>>) -> Self {
        self.promotion = hook;
        self
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 도구 그대로 등록
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            debug!("Replaced tool '{}'", name);
        }
    }

    /// 도구를 `WrappedTool`로 감싸서 등록
    pub fn register_wrapped(&mut self, tool: Arc<dyn Tool>, config: ToolCallConfig) {
        let mut wrapped = WrappedTool::new(tool, config, self.store.clone());
        if let Some(hook) = &self.promotion {
            wrapped = wrapped.with_promotion(Arc::clone(hook));
        }

        // 승격된 task도 관리 도구로 조회할 수 있어야 함
        let spawns_tasks = wrapped.allows_background() || self.promotion.is_some();
        self.register(Arc::new(wrapped));
        if spawns_tasks {
            self.ensure_task_tools();
        }
    }

    /// 엔진 기본 `ToolCallConfig`로 감싸서 등록
    pub fn register_with_defaults(&mut self, tool: Arc<dyn Tool>) {
        let config = self.config.tool_call_config();
        self.register_wrapped(tool, config);
    }

    /// Task 관리 도구 4종 등록 (이미 있으면 무시)
    pub fn ensure_task_tools(&mut self) {
        if TASK_TOOL_NAMES.iter().all(|name| self.contains(name)) {
            return;
        }
        for tool in task_tools(&self.store, &self.config) {
            self.register(tool);
        }
        info!("Registered task management tools");
    }

    /// 도구 조회
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// 도구 존재 여부
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// 도구 제거
    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.remove(name)
    }

    /// 모든 도구 이름 (정렬)
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// JSON Schema 형식으로 모든 도구 정보 반환 (이름순)
    pub fn schemas(&self) -> Vec<Value> {
        self.names()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| {
                let meta = tool.meta();
                serde_json::json!({
                    "name": meta.name,
                    "description": meta.description,
                    "input_schema": tool.schema()
                })
            })
            .collect()
    }

    /// 이름으로 도구 실행
    pub async fn execute(&self, name: &str, input: Value, ctx: &ExecutionContext) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::ToolNotFound(name.to_string()))?;
        tool.execute(input, ctx).await
    }
}
