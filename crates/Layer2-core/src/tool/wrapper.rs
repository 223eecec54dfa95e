//! Execution Wrapper - 타임아웃 / background 실행 / 실패 승격
//!
//! `WrappedTool`은 임의의 `Tool`을 감싸서:
//! - 스키마에 `timeout` / `background` 인자를 추가하고 (등록 시 한 번 계산)
//! - 매 호출을 `with_timeout`으로 제한하며
//! - `background: true` 요청 시 `TaskStore`에 task를 만들고 즉시 반환하고
//! - foreground 실패 시 `PromotionHook`을 호출합니다.
//!
//! 감싼 결과도 `Tool`이므로 일반 도구와 똑같이 호출할 수 있습니다.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tether_foundation::{
    CapturedOutput, Error, ExecutionContext, LogKind, Result, Tool, ToolCallConfig, ToolMeta,
};
use tether_task::{output_lines, with_timeout, TaskId, TaskStore, TaskUpdate};
use tracing::{debug, info, warn};

use super::promotion::{ForegroundFailure, PromotionHook, Relaunch};
use super::schema::{augment_schema, split_controls};

// ============================================================================
// BackgroundStart - background 시작 응답
// ============================================================================

/// Background 시작 시 caller에게 돌려주는 고정 응답
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundStart {
    pub background_task_id: TaskId,
    pub status: String,
    pub tool_name: String,
    pub message: String,
}

impl BackgroundStart {
    pub fn new(id: TaskId, tool_name: impl Into<String>) -> Self {
        let tool_name = tool_name.into();
        Self {
            background_task_id: id,
            status: "started".to_string(),
            message: format!(
                "{} is running in background as task {}. \
                 Use get_task_logs or wait_for_task to follow it, cancel_task to stop it.",
                tool_name, id
            ),
            tool_name,
        }
    }

    pub fn into_value(self) -> Value {
        json!({
            "backgroundTaskId": self.background_task_id.to_string(),
            "status": self.status,
            "toolName": self.tool_name,
            "message": self.message,
        })
    }
}

// ============================================================================
// WrappedTool
// ============================================================================

/// 실행 제어가 적용된 도구
pub struct WrappedTool {
    inner: Arc<dyn Tool>,
    config: ToolCallConfig,
    store: TaskStore,
    hook: Option<Arc<dyn PromotionHook>>,
    schema: Value,
}

impl WrappedTool {
    pub fn new(inner: Arc<dyn Tool>, config: ToolCallConfig, store: TaskStore) -> Self {
        let schema = augment_schema(&inner.schema(), &config);
        Self {
            inner,
            config,
            store,
            hook: None,
            schema,
        }
    }

    /// Foreground 실패 hook 등록
    pub fn with_promotion(mut self, hook: Arc<dyn PromotionHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn config(&self) -> &ToolCallConfig {
        &self.config
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn allows_background(&self) -> bool {
        self.config.allow_background
    }

    /// Background task 생성 후 본문을 spawn하고 바로 반환
    pub fn start_background(
        &self,
        args: Value,
        timeout: Duration,
        seed_log: Option<String>,
    ) -> BackgroundStart {
        launch(
            Arc::clone(&self.inner),
            self.store.clone(),
            args,
            timeout,
            seed_log,
        )
    }

    async fn on_failure(&self, error: Error, args: Value) -> Result<Value> {
        if let Error::Timeout { after_ms } = error {
            warn!(tool = %self.inner.name(), timeout_ms = after_ms, "foreground execution timed out");
        }

        let Some(hook) = &self.hook else {
            return Err(error);
        };

        let failure = ForegroundFailure {
            error,
            tool_name: self.inner.name().to_string(),
            args,
            max_duration: self.config.max_agent_duration(),
        };
        let relaunch = Relauncher {
            tool: self,
            args: &failure.args,
        };

        match hook.on_foreground_failure(&failure, &relaunch).await {
            Some(substitute) => Ok(substitute),
            None => Err(failure.error),
        }
    }
}

#[async_trait]
impl Tool for WrappedTool {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn meta(&self) -> ToolMeta {
        self.inner.meta()
    }

    fn schema(&self) -> Value {
        self.schema.clone()
    }

    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value> {
        let (args, controls) = split_controls(input);
        let timeout = self.config.effective_timeout(controls.timeout);

        if controls.background {
            if self.config.allow_background {
                return Ok(self.start_background(args, timeout, None).into_value());
            }
            debug!(tool = %self.inner.name(), "background not allowed, running in foreground");
        }

        let result = with_timeout(
            || self.inner.execute(args.clone(), ctx),
            timeout,
            Some(ctx.cancellation()),
        )
        .await;

        match result {
            Ok(value) => Ok(value),
            Err(error) => self.on_failure(error, args).await,
        }
    }
}

/// `Relaunch` bound to one failed call's arguments
struct Relauncher<'a> {
    tool: &'a WrappedTool,
    args: &'a Value,
}

impl Relaunch for Relauncher<'_> {
    fn start_background(&self, seed_log: String, budget: Duration) -> BackgroundStart {
        self.tool
            .start_background(self.args.clone(), budget, Some(seed_log))
    }
}

// ============================================================================
// Background execution
// ============================================================================

fn launch(
    tool: Arc<dyn Tool>,
    store: TaskStore,
    args: Value,
    timeout: Duration,
    seed_log: Option<String>,
) -> BackgroundStart {
    let tool_name = tool.name().to_string();
    let task = store.create(&tool_name, args.clone());
    let id = task.id;
    let cancel = store.cancellation_token(&id).unwrap_or_default();

    if let Some(seed) = seed_log {
        store.add_log(&id, LogKind::Info, seed);
    }

    // Bounded stores leave the task pending until a slot is free
    let bounded = store.is_bounded();
    if !bounded {
        store.update(&id, TaskUpdate::Running);
    }
    store.add_log(
        &id,
        LogKind::Info,
        format!("Started in background (timeout {}ms)", timeout.as_millis()),
    );
    info!(task_id = %id, tool = %tool_name, timeout_ms = timeout.as_millis() as u64, "background task started");

    tokio::spawn(async move {
        let _slot = if bounded {
            let slot = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                slot = store.acquire_slot() => slot,
            };
            if !store.update(&id, TaskUpdate::Running) {
                return;
            }
            slot
        } else {
            None
        };

        let ctx = ExecutionContext::with_cancellation(cancel.clone()).with_logger(store.logger(id));
        let result = with_timeout(|| tool.execute(args, &ctx), timeout, Some(&cancel)).await;
        settle(&store, &id, result);
    });

    BackgroundStart::new(id, tool_name)
}

/// Background 본문 결과를 task에 기록
fn settle(store: &TaskStore, id: &TaskId, result: Result<Value>) {
    match result {
        Ok(value) => {
            capture_output(store, id, &value);
            if store.update(id, TaskUpdate::Completed(value)) {
                store.add_log(id, LogKind::Info, "Completed");
            }
        }
        Err(Error::Aborted) => {
            let message = Error::Aborted.to_string();
            if store.update(id, TaskUpdate::Cancelled(message.clone())) {
                store.add_log(id, LogKind::Info, message);
            }
        }
        Err(error) => {
            let message = error.to_string();
            if store.update(id, TaskUpdate::Failed(message.clone())) {
                store.add_log(id, LogKind::Error, message);
            }
        }
    }
}

/// 결과의 stdout/stderr를 줄 단위 로그로 옮김
fn capture_output(store: &TaskStore, id: &TaskId, value: &impl CapturedOutput) {
    if let Some(stdout) = value.captured_stdout() {
        for line in output_lines(stdout) {
            store.add_log(id, LogKind::Stdout, line);
        }
    }
    if let Some(stderr) = value.captured_stderr() {
        for line in output_lines(stderr) {
            store.add_log(id, LogKind::Stderr, line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::promotion::TimeoutPromotion;
    use tether_task::TaskStatus;
    use tokio::time::sleep;

    /// Sleeps `ms` and reports it, or fails when `fail` is set
    struct Nap;

    #[async_trait]
    impl Tool for Nap {
        fn name(&self) -> &str {
            "nap"
        }

        fn meta(&self) -> ToolMeta {
            ToolMeta::new("nap").description("Sleep for a while")
        }

        fn schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {
                    "ms": { "type": "integer" },
                    "fail": { "type": "boolean" }
                },
                "required": ["ms"]
            })
        }

        async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value> {
            assert!(input.get("timeout").is_none() && input.get("background").is_none());
            let ms = input["ms"].as_u64().unwrap_or(0);
            ctx.log(LogKind::Info, format!("napping {}ms", ms));
            sleep(Duration::from_millis(ms)).await;
            if input["fail"].as_bool().unwrap_or(false) {
                return Err(Error::Tool("nap failed".into()));
            }
            Ok(json!({ "slept": ms, "stdout": "one\ntwo\n", "stderr": "warn\n" }))
        }
    }

    fn background_config() -> ToolCallConfig {
        ToolCallConfig::new(Duration::from_millis(100))
            .allow_background(true)
            .with_max_allowed_agent_duration(Duration::from_secs(10))
    }

    fn wrap(config: ToolCallConfig) -> (WrappedTool, TaskStore) {
        let store = TaskStore::new();
        (WrappedTool::new(Arc::new(Nap), config, store.clone()), store)
    }

    async fn wait_terminal(store: &TaskStore, id: &TaskId) -> tether_task::Task {
        loop {
            let task = store.get(id).unwrap();
            if task.status.is_terminal() {
                return task;
            }
            sleep(Duration::from_millis(5)).await;
        }
    }

    fn task_id(value: &Value) -> TaskId {
        value["backgroundTaskId"].as_str().unwrap().parse().unwrap()
    }

    #[test]
    fn test_schema_is_augmented_once() {
        let (tool, _) = wrap(background_config());
        let schema = tool.schema();
        assert!(schema["properties"].get("timeout").is_some());
        assert!(schema["properties"].get("background").is_some());
        assert_eq!(tool.name(), "nap");
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreground_returns_result() {
        let (tool, store) = wrap(background_config());
        let value = tool
            .execute(json!({"ms": 10}), &ExecutionContext::new())
            .await
            .unwrap();
        assert_eq!(value["slept"], 10);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreground_timeout_without_hook() {
        let (tool, store) = wrap(background_config());
        let err = tool
            .execute(json!({"ms": 500}), &ExecutionContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { after_ms: 100 }));
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_timeout_is_capped() {
        let config = ToolCallConfig::new(Duration::from_millis(100))
            .allow_agent_set_duration(true)
            .with_max_allowed_agent_duration(Duration::from_millis(200));
        let (tool, _) = wrap(config);

        let err = tool
            .execute(json!({"ms": 1000, "timeout": 5000}), &ExecutionContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { after_ms: 200 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_timeout_ignored_when_not_allowed() {
        let (tool, _) = wrap(ToolCallConfig::new(Duration::from_millis(100)));
        let err = tool
            .execute(json!({"ms": 150, "timeout": 5000}), &ExecutionContext::new())
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_abort_propagates() {
        let (tool, _) = wrap(background_config());
        let ctx = ExecutionContext::new();
        ctx.cancellation().cancel();
        let err = tool.execute(json!({"ms": 10}), &ctx).await.unwrap_err();
        assert!(err.is_abort());
    }

    #[tokio::test]
    async fn test_background_returns_immediately() {
        let (tool, store) = wrap(background_config());
        let value = tool
            .execute(json!({"ms": 50, "background": true}), &ExecutionContext::new())
            .await
            .unwrap();

        assert_eq!(value["status"], "started");
        assert_eq!(value["toolName"], "nap");
        let id = task_id(&value);
        let task = store.get(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Running);
        assert_eq!(task.args, json!({"ms": 50}));

        let task = wait_terminal(&store, &id).await;
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.result.unwrap()["slept"], 50);
    }

    #[tokio::test]
    async fn test_background_captures_output_lines() {
        let (tool, store) = wrap(background_config());
        let value = tool
            .execute(json!({"ms": 1, "background": true}), &ExecutionContext::new())
            .await
            .unwrap();
        let task = wait_terminal(&store, &task_id(&value)).await;

        let lines: Vec<(LogKind, &str)> = task
            .logs
            .iter()
            .map(|l| (l.kind, l.message.as_str()))
            .collect();
        assert!(lines.contains(&(LogKind::Info, "napping 1ms")));
        assert!(lines.contains(&(LogKind::Stdout, "one")));
        assert!(lines.contains(&(LogKind::Stdout, "two")));
        assert!(lines.contains(&(LogKind::Stderr, "warn")));
    }

    #[tokio::test]
    async fn test_background_failure_is_recorded() {
        let (tool, store) = wrap(background_config());
        let value = tool
            .execute(
                json!({"ms": 1, "fail": true, "background": true}),
                &ExecutionContext::new(),
            )
            .await
            .unwrap();
        let task = wait_terminal(&store, &task_id(&value)).await;
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.error.unwrap().contains("nap failed"));
        assert!(task.result.is_none());
    }

    #[tokio::test]
    async fn test_background_timeout_fails_task() {
        let (tool, store) = wrap(background_config());
        let value = tool
            .execute(
                json!({"ms": 5000, "timeout": 20, "background": true}),
                &ExecutionContext::new(),
            )
            .await
            .unwrap();
        let task = wait_terminal(&store, &task_id(&value)).await;
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_cancelled_background_stays_cancelled() {
        let (tool, store) = wrap(background_config());
        let value = tool
            .execute(
                json!({"ms": 5000, "timeout": 10000, "background": true}),
                &ExecutionContext::new(),
            )
            .await
            .unwrap();
        let id = task_id(&value);

        assert!(store.cancel(&id).cancelled);
        sleep(Duration::from_millis(20)).await;

        let task = store.get(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Cancelled);
        assert_eq!(task.error.as_deref(), Some(tether_task::CANCELLED_MESSAGE));
    }

    #[tokio::test]
    async fn test_background_ignored_when_not_allowed() {
        let config = ToolCallConfig::new(Duration::from_secs(1));
        let (tool, store) = wrap(config);
        let value = tool
            .execute(json!({"ms": 1, "background": true}), &ExecutionContext::new())
            .await
            .unwrap();
        assert_eq!(value["slept"], 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_bounded_store_runs_one_at_a_time() {
        let store = TaskStore::new().with_concurrency_limit(1);
        let tool = WrappedTool::new(Arc::new(Nap), background_config(), store.clone());
        let ctx = ExecutionContext::new();

        let first = tool
            .execute(json!({"ms": 80, "timeout": 5000, "background": true}), &ctx)
            .await
            .unwrap();
        let second = tool
            .execute(json!({"ms": 1, "timeout": 5000, "background": true}), &ctx)
            .await
            .unwrap();

        sleep(Duration::from_millis(20)).await;
        assert_eq!(store.get(&task_id(&first)).unwrap().status, TaskStatus::Running);
        assert_eq!(store.get(&task_id(&second)).unwrap().status, TaskStatus::Pending);

        let second = wait_terminal(&store, &task_id(&second)).await;
        assert_eq!(second.status, TaskStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_promotion() {
        let (tool, store) = wrap(background_config());
        let tool = tool.with_promotion(Arc::new(TimeoutPromotion));

        let value = tool
            .execute(json!({"ms": 150}), &ExecutionContext::new())
            .await
            .unwrap();
        assert_eq!(value["status"], "started");

        let task = store.get(&task_id(&value)).unwrap();
        assert_eq!(task.args, json!({"ms": 150}));
        assert_eq!(task.logs[0].kind, LogKind::Info);
        assert!(task.logs[0].message.contains("timed out after 100ms"));

        let task = wait_terminal(&store, &task.id).await;
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_timeout_failure_not_promoted() {
        let (tool, store) = wrap(background_config());
        let tool = tool.with_promotion(Arc::new(TimeoutPromotion));

        let err = tool
            .execute(json!({"ms": 1, "fail": true}), &ExecutionContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Tool(ref m) if m == "nap failed"));
        assert!(store.is_empty());
    }
}
