//! Task Log System - structured log entries and paginated reads
//!
//! Provides:
//! - Timestamped entries typed as stdout / stderr / info / error
//! - Offset/limit pagination over a task's log
//! - Line splitting for captured process output

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tether_foundation::LogKind;

/// A single log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp
    pub timestamp: DateTime<Utc>,

    /// Log kind
    #[serde(rename = "type")]
    pub kind: LogKind,

    /// Log content
    pub message: String,
}

impl LogEntry {
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            message: message.into(),
        }
    }

    pub fn stderr(message: impl Into<String>) -> Self {
        Self::new(LogKind::Stderr, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogKind::Info, message)
    }
}

/// One page of a task's log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPage {
    pub logs: Vec<LogEntry>,
    pub total: usize,
    pub has_more: bool,
}

impl LogPage {
    /// Slice `entries` starting at `offset`, at most `limit` entries
    pub fn slice(entries: &[LogEntry], offset: usize, limit: usize) -> Self {
        let total = entries.len();
        let start = offset.min(total);
        let end = start.saturating_add(limit).min(total);
        Self {
            logs: entries[start..end].to_vec(),
            total,
            has_more: offset.saturating_add(limit) < total,
        }
    }
}

/// Split captured process output into log lines, dropping a trailing newline
pub fn output_lines(output: &str) -> impl Iterator<Item = &str> {
    output
        .strip_suffix('\n')
        .unwrap_or(output)
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|_| !output.is_empty())
}
