use std::fmt;

use serde::Serialize;
use ts_rs::TS;

/// Error returned by validation, compilation, and the file helpers.
///
/// Serializes as `{"code": "...", "detail": {...}}` so callers can match on
/// the code without parsing messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(tag = "code", content = "detail", rename_all = "lowercase")]
#[ts(export)]
pub enum CheckError {
    /// The check configuration was rejected before compilation.
    Invalid { message: String },
    /// The query fragment failed to parse. One line per syntax error.
    Syntax { message: String },
    /// A builder invariant was violated.
    Internal { message: String },
    Io { message: String },
    Json { message: String },
}

impl CheckError {
    pub fn invalid(message: impl Into<String>) -> Self {
        CheckError::Invalid {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CheckError::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable code, matching the serialized `code` tag.
    pub fn code(&self) -> &'static str {
        match self {
            CheckError::Invalid { .. } => "invalid",
            CheckError::Syntax { .. } => "syntax",
            CheckError::Internal { .. } => "internal",
            CheckError::Io { .. } => "io",
            CheckError::Json { .. } => "json",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CheckError::Invalid { message }
            | CheckError::Syntax { message }
            | CheckError::Internal { message }
            | CheckError::Io { message }
            | CheckError::Json { message } => message,
        }
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Syntax messages are already prefixed per line ("error @1:1-...").
            CheckError::Invalid { message } | CheckError::Syntax { message } => {
                write!(f, "{message}")
            }
            CheckError::Internal { message } => write!(f, "internal error: {message}"),
            CheckError::Io { message } => write!(f, "I/O error: {message}"),
            CheckError::Json { message } => write!(f, "JSON error: {message}"),
        }
    }
}

impl std::error::Error for CheckError {}

impl From<std::io::Error> for CheckError {
    fn from(e: std::io::Error) -> Self {
        CheckError::Io {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for CheckError {
    fn from(e: serde_json::Error) -> Self {
        CheckError::Json {
            message: e.to_string(),
        }
    }
}
