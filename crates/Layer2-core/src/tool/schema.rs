//! Schema augmentation - 호출 제어 인자 (`timeout`, `background`)
//!
//! `ToolCallConfig`에 따라 도구 스키마에 선택 인자를 추가하고,
//! 호출 시에는 같은 인자를 분리해 도구 본문에 넘기지 않습니다.

use serde_json::{json, Map, Value};
use std::time::Duration;
use tether_foundation::ToolCallConfig;

/// Caller-requested timeout argument (milliseconds)
pub const TIMEOUT_ARG: &str = "timeout";

/// Caller-requested background argument
pub const BACKGROUND_ARG: &str = "background";

/// 설정에 맞게 스키마에 `timeout` / `background` 속성 추가
///
/// 순수 함수: 입력 스키마를 바꾸지 않고 새 값을 반환합니다.
/// 두 인자 모두 `required`에 들어가지 않습니다.
pub fn augment_schema(schema: &Value, config: &ToolCallConfig) -> Value {
    let mut schema = schema.clone();
    if !config.caller_timeout_allowed() {
        return schema;
    }

    let Some(object) = schema.as_object_mut() else {
        return schema;
    };
    object
        .entry("type")
        .or_insert_with(|| Value::String("object".into()));
    let properties = object
        .entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    let Some(properties) = properties.as_object_mut() else {
        return schema;
    };

    properties.insert(
        TIMEOUT_ARG.to_string(),
        json!({
            "type": "number",
            "description": format!(
                "Timeout in milliseconds (default: {}, max: {})",
                config.duration.as_millis(),
                config.max_agent_duration().as_millis()
            )
        }),
    );

    if config.allow_background {
        properties.insert(
            BACKGROUND_ARG.to_string(),
            json!({
                "type": "boolean",
                "description": "Run in background and return a backgroundTaskId immediately. \
                                Use get_task_logs / wait_for_task / cancel_task to follow it."
            }),
        );
    }

    schema
}

/// 호출 인자에서 분리한 제어 값
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallControls {
    /// 요청된 타임아웃 (0 이하 또는 숫자가 아니면 None)
    pub timeout: Option<Duration>,
    /// Background 실행 요청 여부
    pub background: bool,
}

/// 인자에서 `timeout` / `background`를 제거하고 나머지와 함께 반환
pub fn split_controls(input: Value) -> (Value, CallControls) {
    let Value::Object(mut args) = input else {
        return (input, CallControls::default());
    };

    let timeout = args
        .remove(TIMEOUT_ARG)
        .and_then(|v| v.as_f64())
        .filter(|ms| ms.is_finite() && *ms > 0.0)
        .map(|ms| Duration::from_millis(ms.round() as u64));
    let background = args
        .remove(BACKGROUND_ARG)
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    (
        Value::Object(args),
        CallControls {
            timeout,
            background,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_schema() -> Value {
        json!({
            "type": "object",
            "properties": { "ms": { "type": "integer" } },
            "required": ["ms"]
        })
    }

    #[test]
    fn test_plain_config_leaves_schema_alone() {
        let config = ToolCallConfig::default();
        assert_eq!(augment_schema(&base_schema(), &config), base_schema());
    }

    #[test]
    fn test_agent_duration_adds_timeout_only() {
        let config = ToolCallConfig::default().allow_agent_set_duration(true);
        let schema = augment_schema(&base_schema(), &config);
        let props = &schema["properties"];
        assert_eq!(props[TIMEOUT_ARG]["type"], "number");
        assert!(props.get(BACKGROUND_ARG).is_none());
        assert_eq!(schema["required"], json!(["ms"]));
    }

    #[test]
    fn test_background_implies_timeout() {
        let config = ToolCallConfig::default().allow_background(true);
        let schema = augment_schema(&base_schema(), &config);
        let props = &schema["properties"];
        assert_eq!(props[TIMEOUT_ARG]["type"], "number");
        assert_eq!(props[BACKGROUND_ARG]["type"], "boolean");
    }

    #[test]
    fn test_schema_without_properties() {
        let config = ToolCallConfig::default().allow_background(true);
        let schema = augment_schema(&json!({}), &config);
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"].get(BACKGROUND_ARG).is_some());
    }

    #[test]
    fn test_split_controls() {
        let (args, controls) =
            split_controls(json!({"ms": 5, "timeout": 2500, "background": true}));
        assert_eq!(args, json!({"ms": 5}));
        assert_eq!(controls.timeout, Some(Duration::from_millis(2500)));
        assert!(controls.background);
    }

    #[test]
    fn test_split_controls_ignores_bad_values() {
        let (_, controls) = split_controls(json!({"timeout": 0, "background": "yes"}));
        assert_eq!(controls, CallControls::default());

        let (_, controls) = split_controls(json!({"timeout": -10}));
        assert!(controls.timeout.is_none());

        let (args, controls) = split_controls(json!("raw"));
        assert_eq!(args, json!("raw"));
        assert_eq!(controls, CallControls::default());
    }
}
