use log::warn;

use crate::error::AppError;
use crate::models::classify_types::LogRecord;
use crate::services::kv_store::KvStore;

/// Ordered, newest-first log of finished submissions.
pub trait HistoryLog: Send + Sync {
    /// Never fails: missing or unreadable data reads as an empty log.
    fn load(&self) -> Vec<LogRecord>;
    fn append(&self, record: LogRecord) -> Result<(), AppError>;
    fn clear(&self) -> Result<(), AppError>;
}

/// History kept as one JSON array under a fixed key.
#[derive(Clone)]
pub struct HistoryStore {
    kv: KvStore,
    key: String,
}

impl HistoryStore {
    pub fn new(kv: KvStore, key: impl Into<String>) -> Self {
        Self { kv, key: key.into() }
    }

    fn parse(&self, raw: Option<String>) -> Vec<LogRecord> {
        let Some(raw) = raw else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                warn!("Discarding unreadable history under '{}': {}", self.key, e);
                Vec::new()
            }
        }
    }
}

impl HistoryLog for HistoryStore {
    fn load(&self) -> Vec<LogRecord> {
        match self.kv.get(&self.key) {
            Ok(raw) => self.parse(raw),
            Err(e) => {
                warn!("Failed to read history: {}", e);
                Vec::new()
            }
        }
    }

    fn append(&self, record: LogRecord) -> Result<(), AppError> {
        self.kv.update(&self.key, |raw| {
            let mut records = self.parse(raw);
            records.insert(0, record);
            Ok(serde_json::to_string(&records)?)
        })
    }

    fn clear(&self) -> Result<(), AppError> {
        self.kv.set(&self.key, "[]")
    }
}
