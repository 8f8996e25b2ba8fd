use chrono::{DateTime, Local};
use serde::Serialize;

use super::classify_types::{ClassificationResult, InvertFlag, LogRecord};

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SelectionInfo {
    pub filename: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub preview: String,
    pub meets_required_size: bool,
}

#[derive(Debug, Serialize, Clone)]
pub struct WorkflowSnapshot {
    pub status: WorkflowStatus,
    pub message: Option<String>,
    pub invert: InvertFlag,
    pub selection: Option<SelectionInfo>,
    pub result: Option<ClassificationResult>,
    pub can_submit: bool,
}

/// A history record plus its timestamp rendered for display.
#[derive(Debug, Serialize, Clone)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: LogRecord,
    pub local_time: String,
}

impl HistoryEntry {
    pub fn from_record(record: LogRecord) -> Self {
        let local_time = DateTime::parse_from_rfc3339(record.timestamp())
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|_| record.timestamp().to_string());
        Self { record, local_time }
    }
}
