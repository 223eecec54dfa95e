//! Core Types - 공용 타입 정의
//!
//! 모든 레이어에서 공통으로 사용하는 타입들

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Log Kind - 로그 종류
// ============================================================================

/// Task 로그 항목의 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
    /// Informational messages (start, promotion, etc.)
    Info,
    /// Error information
    Error,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Stdout => "stdout",
            LogKind::Stderr => "stderr",
            LogKind::Info => "info",
            LogKind::Error => "error",
        }
    }
}

impl std::fmt::Display for LogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Captured Output - 결과에 포함된 프로세스 출력
// ============================================================================

/// 도구 결과가 프로세스 출력(stdout/stderr)을 담고 있을 때 구현하는 capability
///
/// Background 실행이 끝나면 이 값들이 task 로그로 옮겨집니다.
pub trait CapturedOutput {
    fn captured_stdout(&self) -> Option<&str>;
    fn captured_stderr(&self) -> Option<&str>;
}

/// JSON 결과: 최상위 객체의 문자열 `stdout`/`stderr` 필드만 인정
impl CapturedOutput for Value {
    fn captured_stdout(&self) -> Option<&str> {
        self.as_object()?.get("stdout")?.as_str()
    }

    fn captured_stderr(&self) -> Option<&str> {
        self.as_object()?.get("stderr")?.as_str()
    }
}
