use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Whether the digit is drawn light-on-dark. Travels as the literal
/// strings `"true"` / `"false"`, both on the wire and in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InvertFlag {
    #[serde(rename = "true")]
    True,
    #[default]
    #[serde(rename = "false")]
    False,
}

impl InvertFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvertFlag::True => "true",
            InvertFlag::False => "false",
        }
    }

}

impl From<bool> for InvertFlag {
    fn from(value: bool) -> Self {
        if value {
            InvertFlag::True
        } else {
            InvertFlag::False
        }
    }
}

impl fmt::Display for InvertFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRequest {
    pub invert: InvertFlag,
    pub filename: String,
}

/// Body of a successful response. `accuracy` and `process_time` are kept
/// exactly as the service reported them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub prediction: u8,
    pub accuracy: f64,
    pub process_time: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Result(ClassificationResult),
    Error(String),
}

/// One finished submission. Built only through [`LogRecord::succeeded`] or
/// [`LogRecord::failed`], so exactly one outcome is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LogRecordRepr", into = "LogRecordRepr")]
pub struct LogRecord {
    id: String,
    timestamp: String,
    request: ClassificationRequest,
    outcome: Outcome,
}

impl LogRecord {
    pub fn succeeded(
        request: ClassificationRequest,
        started_at: DateTime<Utc>,
        result: ClassificationResult,
    ) -> Self {
        Self::new(request, started_at, Outcome::Result(result))
    }

    pub fn failed(request: ClassificationRequest, started_at: DateTime<Utc>, error: String) -> Self {
        Self::new(request, started_at, Outcome::Error(error))
    }

    fn new(request: ClassificationRequest, started_at: DateTime<Utc>, outcome: Outcome) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: started_at.to_rfc3339(),
            request,
            outcome,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn request(&self) -> &ClassificationRequest {
        &self.request
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn result(&self) -> Option<&ClassificationResult> {
        match &self.outcome {
            Outcome::Result(r) => Some(r),
            Outcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Result(_) => None,
            Outcome::Error(e) => Some(e),
        }
    }
}

/// Persisted shape. Older logs call the success payload `response`.
#[derive(Serialize, Deserialize)]
struct LogRecordRepr {
    id: String,
    timestamp: String,
    request: ClassificationRequest,
    #[serde(default, alias = "response", skip_serializing_if = "Option::is_none")]
    result: Option<ClassificationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl TryFrom<LogRecordRepr> for LogRecord {
    type Error = String;

    fn try_from(repr: LogRecordRepr) -> Result<Self, Self::Error> {
        let outcome = match (repr.result, repr.error) {
            (Some(result), None) => Outcome::Result(result),
            (None, Some(error)) => Outcome::Error(error),
            (Some(_), Some(_)) => {
                return Err(format!("log record {} has both a result and an error", repr.id))
            }
            (None, None) => return Err(format!("log record {} has no outcome", repr.id)),
        };

        Ok(LogRecord {
            id: repr.id,
            timestamp: repr.timestamp,
            request: repr.request,
            outcome,
        })
    }
}

impl From<LogRecord> for LogRecordRepr {
    fn from(record: LogRecord) -> Self {
        let (result, error) = match record.outcome {
            Outcome::Result(r) => (Some(r), None),
            Outcome::Error(e) => (None, Some(e)),
        };
        LogRecordRepr {
            id: record.id,
            timestamp: record.timestamp,
            request: record.request,
            result,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> ClassificationRequest {
        ClassificationRequest {
            invert: InvertFlag::False,
            filename: "seven.png".into(),
        }
    }

    #[test]
    fn invert_flag_serializes_as_string_literal() {
        assert_eq!(serde_json::to_value(InvertFlag::True).unwrap(), json!("true"));
        assert_eq!(serde_json::to_value(InvertFlag::from(false)).unwrap(), json!("false"));
        let parsed: InvertFlag = serde_json::from_value(json!("true")).unwrap();
        assert_eq!(parsed, InvertFlag::True);
    }

    #[test]
    fn succeeded_record_serializes_result_only() {
        let record = LogRecord::succeeded(
            request(),
            Utc::now(),
            ClassificationResult {
                prediction: 7,
                accuracy: 0.98,
                process_time: "12ms".into(),
            },
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["result"]["prediction"], json!(7));
        assert!(value.get("error").is_none());
        assert_eq!(value["request"]["invert"], json!("false"));
        assert_eq!(value["request"]["filename"], json!("seven.png"));
    }

    #[test]
    fn failed_record_serializes_error_only() {
        let record = LogRecord::failed(request(), Utc::now(), "Error: request failed: HTTP 500".into());
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("result").is_none());
        assert_eq!(value["error"], json!("Error: request failed: HTTP 500"));
        assert!(record.result().is_none());
    }

    #[test]
    fn legacy_response_field_is_read_as_result() {
        let raw = json!({
            "id": "a",
            "timestamp": "2025-01-01T00:00:00.000Z",
            "request": { "invert": "true", "filename": "x.png" },
            "response": { "prediction": 3, "accuracy": 91.5, "process_time": "0.02s" }
        });
        let record: LogRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(record.result().map(|r| r.prediction), Some(3));
        assert_eq!(record.request().invert, InvertFlag::True);
    }

    #[test]
    fn record_without_exactly_one_outcome_is_rejected() {
        let neither = json!({
            "id": "a",
            "timestamp": "2025-01-01T00:00:00Z",
            "request": { "invert": "false", "filename": "x.png" }
        });
        assert!(serde_json::from_value::<LogRecord>(neither).is_err());

        let both = json!({
            "id": "b",
            "timestamp": "2025-01-01T00:00:00Z",
            "request": { "invert": "false", "filename": "x.png" },
            "result": { "prediction": 1, "accuracy": 0.5, "process_time": "1ms" },
            "error": "boom"
        });
        assert!(serde_json::from_value::<LogRecord>(both).is_err());
    }

    #[test]
    fn records_get_distinct_ids() {
        let a = LogRecord::failed(request(), Utc::now(), "x".into());
        let b = LogRecord::failed(request(), Utc::now(), "x".into());
        assert_ne!(a.id(), b.id());
    }
}
