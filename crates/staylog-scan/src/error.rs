use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanErrorKind {
    /// Rejected before any network call.
    Validation,
    UploadFailed,
    SubmitFailed,
    PollFailed,
    Timeout,
}

impl ScanErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanErrorKind::Validation => "validation",
            ScanErrorKind::UploadFailed => "upload_failed",
            ScanErrorKind::SubmitFailed => "submit_failed",
            ScanErrorKind::PollFailed => "poll_failed",
            ScanErrorKind::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ScanErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ScanError {
    pub kind: ScanErrorKind,
    pub message: String,
}

impl ScanError {
    pub fn new(kind: ScanErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ScanErrorKind::Validation, message)
    }

    /// Use `message` unless it is blank, in which case fall back.
    pub(crate) fn with_fallback(kind: ScanErrorKind, message: &str, fallback: &str) -> Self {
        if message.trim().is_empty() {
            Self::new(kind, fallback)
        } else {
            Self::new(kind, message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind() {
        let err = ScanError::new(ScanErrorKind::PollFailed, "connection reset");
        assert_eq!(err.to_string(), "poll_failed: connection reset");
    }

    #[test]
    fn blank_message_uses_fallback() {
        let err = ScanError::with_fallback(ScanErrorKind::SubmitFailed, "  ", "could not start");
        assert_eq!(err.message, "could not start");
        let err = ScanError::with_fallback(ScanErrorKind::SubmitFailed, "quota", "could not start");
        assert_eq!(err.message, "quota");
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ScanErrorKind::UploadFailed).unwrap();
        assert_eq!(json, "\"upload_failed\"");
    }
}
