use serde::Serialize;
use std::fmt;

#[derive(Debug, Serialize)]
pub struct AppError {
    pub message: String,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError {
            message: err.to_string(),
        }
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError {
            message: err.to_string(),
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError {
            message: format!("Storage error: {}", err),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError {
            message: err.to_string(),
        }
    }
}

impl From<SubmitError> for AppError {
    fn from(err: SubmitError) -> Self {
        AppError {
            message: err.user_message(),
        }
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError { message: msg }
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError {
            message: msg.to_string(),
        }
    }
}

/// Everything that can go wrong with a single submission.
///
/// `Validation` never leaves the workflow: it is shown inline and nothing is
/// sent or recorded. The other variants are folded into the history record's
/// `error` field.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitError {
    Validation(String),
    Transport(String),
    Service { status: u16 },
    MalformedResponse(String),
}

impl SubmitError {
    pub fn is_validation(&self) -> bool {
        matches!(self, SubmitError::Validation(_))
    }

    /// The string shown to the user and stored in the history log.
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::Validation(msg) => msg.clone(),
            other => format!("Error: {}", other),
        }
    }
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Validation(msg) => write!(f, "{}", msg),
            SubmitError::Transport(cause) => write!(f, "request failed: {}", cause),
            SubmitError::Service { status } => write!(f, "request failed: HTTP {}", status),
            SubmitError::MalformedResponse(cause) => {
                write!(f, "request failed: malformed response: {}", cause)
            }
        }
    }
}

impl std::error::Error for SubmitError {}
