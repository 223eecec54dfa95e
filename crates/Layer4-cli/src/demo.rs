//! Scripted demo of the execution engine
//!
//! Registers a `sleep` tool and drives it the way an agent would, printing
//! every agent-facing response.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tether_core::{ToolCallConfig, ToolRegistry};
use tether_foundation::{EngineConfig, Error, ExecutionContext, LogKind, Result, Tool, ToolMeta};
use tether_task::TaskStore;
use tokio::time::sleep;

/// Sleeps for `ms` milliseconds, logging a line every 100ms
pub struct SleepTool;

#[async_trait]
impl Tool for SleepTool {
    fn name(&self) -> &str {
        "sleep"
    }

    fn meta(&self) -> ToolMeta {
        ToolMeta::new("sleep")
            .display_name("Sleep")
            .description("Sleep for the given number of milliseconds")
            .category("demo")
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ms": {
                    "type": "integer",
                    "description": "How long to sleep in milliseconds"
                }
            },
            "required": ["ms"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value> {
        let ms = input["ms"]
            .as_u64()
            .ok_or_else(|| Error::InvalidInput("ms is required".to_string()))?;

        let step = Duration::from_millis(100);
        let total = Duration::from_millis(ms);
        let mut slept = Duration::ZERO;
        while slept < total {
            let nap = step.min(total - slept);
            tokio::select! {
                _ = ctx.cancellation().cancelled() => return Err(Error::Aborted),
                _ = sleep(nap) => {}
            }
            slept += nap;
            ctx.log(LogKind::Info, format!("{}ms / {}ms", slept.as_millis(), ms));
        }

        Ok(json!({
            "sleptMs": ms,
            "stdout": format!("slept {}ms\n", ms),
        }))
    }
}

fn show(step: &str, value: &Value) -> anyhow::Result<()> {
    println!("── {} ──", step);
    println!("{}\n", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run the scripted scenario
pub async fn run(config: EngineConfig, ms: u64, timeout_ms: u64) -> anyhow::Result<()> {
    let store = TaskStore::from_config(&config);
    let janitor = store.spawn_janitor(config.cleanup_interval(), config.task_max_age());

    let mut registry = ToolRegistry::new(store.clone(), config.clone());
    registry.register_wrapped(
        Arc::new(SleepTool),
        ToolCallConfig::new(Duration::from_millis(timeout_ms))
            .allow_background(true)
            .with_max_allowed_agent_duration(config.max_agent_timeout()),
    );
    println!("Tools: {}\n", registry.names().join(", "));

    let ctx = ExecutionContext::new();

    // 1. Foreground, well inside the timeout
    let out = registry
        .execute("sleep", json!({ "ms": timeout_ms / 2 }), &ctx)
        .await?;
    show("foreground", &out)?;

    // 2. Background
    let started = registry
        .execute("sleep", json!({ "ms": ms, "background": true }), &ctx)
        .await?;
    show("background start", &started)?;
    let background_id = started["backgroundTaskId"].clone();

    // 3. Foreground timeout, promoted to background
    let promoted = registry
        .execute("sleep", json!({ "ms": ms * 10 }), &ctx)
        .await?;
    show("foreground timeout (promoted)", &promoted)?;
    let promoted_id = promoted["backgroundTaskId"].clone();

    // 4. Wait for the background run
    let waited = registry
        .execute(
            "wait_for_task",
            json!({ "taskId": background_id, "pollIntervalMs": 50 }),
            &ctx,
        )
        .await?;
    show("wait_for_task", &waited)?;

    // 5. Overview
    let listed = registry.execute("list_tasks", json!({}), &ctx).await?;
    show("list_tasks", &listed)?;

    // 6. Cancel the promoted run, then read its log
    let cancelled = registry
        .execute("cancel_task", json!({ "taskId": promoted_id }), &ctx)
        .await?;
    show("cancel_task", &cancelled)?;

    let logs = registry
        .execute("get_task_logs", json!({ "taskId": promoted_id }), &ctx)
        .await?;
    show("get_task_logs", &logs)?;

    store.shutdown();
    janitor.await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sleep_tool_logs_progress() {
        let store = TaskStore::new();
        let task = store.create("sleep", json!({}));
        let ctx = ExecutionContext::new().with_logger(store.logger(task.id));

        let out = SleepTool.execute(json!({ "ms": 250 }), &ctx).await.unwrap();
        assert_eq!(out["sleptMs"], 250);

        let page = store.get_logs(&task.id, 0, 10).unwrap();
        let messages: Vec<&str> = page.logs.iter().map(|l| l.message.as_str()).collect();
        assert_eq!(messages, vec!["100ms / 250ms", "200ms / 250ms", "250ms / 250ms"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_tool_honors_cancellation() {
        let ctx = ExecutionContext::new();
        let trigger = ctx.cancellation().clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(150)).await;
            trigger.cancel();
        });

        let err = SleepTool.execute(json!({ "ms": 10_000 }), &ctx).await.unwrap_err();
        assert!(err.is_abort());
    }

    #[tokio::test]
    async fn test_sleep_tool_requires_ms() {
        let err = SleepTool
            .execute(json!({}), &ExecutionContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
