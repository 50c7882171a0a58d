use std::fmt;

use serde_json::Value;
use staylog_core::attachment::AttachmentRef;
use staylog_core::scan::{ScanReport, ScanStatus};

use crate::error::{ScanError, ScanErrorKind};

const UPLOAD_FAILED: &str = "upload failed";
const SUBMIT_FAILED: &str = "failed to start document scan";
const POLL_FAILED: &str = "failed to check scan status";
const SCAN_FAILED: &str = "document scan failed";

/// Coarse state of a flow, for display and matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Uploading,
    Scanning,
    Complete,
    Error,
}

impl ScanPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanPhase::Idle => "idle",
            ScanPhase::Uploading => "uploading",
            ScanPhase::Scanning => "scanning",
            ScanPhase::Complete => "complete",
            ScanPhase::Error => "error",
        }
    }
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanState {
    Idle,
    Uploading {
        file_name: String,
    },
    /// Upload done. `task_id` is `None` until the backend accepts the scan.
    Scanning {
        attachment: AttachmentRef,
        task_id: Option<String>,
        attempts: u32,
    },
    Complete {
        attachment: AttachmentRef,
        task_id: String,
        output: Value,
    },
    Error(ScanError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    Submitted { file_name: String },
    Uploaded(AttachmentRef),
    UploadFailed,
    ScanStarted { task_id: String },
    SubmitFailed(String),
    Polled(ScanReport),
    PollFailed(String),
    DeadlineExceeded,
    Reset,
}

impl ScanState {
    pub fn phase(&self) -> ScanPhase {
        match self {
            ScanState::Idle => ScanPhase::Idle,
            ScanState::Uploading { .. } => ScanPhase::Uploading,
            ScanState::Scanning { .. } => ScanPhase::Scanning,
            ScanState::Complete { .. } => ScanPhase::Complete,
            ScanState::Error(_) => ScanPhase::Error,
        }
    }

    /// `Complete` and `Error` only leave through a reset.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanState::Complete { .. } | ScanState::Error(_))
    }

    /// Network work is in flight or scheduled.
    pub fn is_busy(&self) -> bool {
        matches!(self, ScanState::Uploading { .. } | ScanState::Scanning { .. })
    }

    pub fn error(&self) -> Option<&ScanError> {
        match self {
            ScanState::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Extracted output; `None` in every state but `Complete`.
    pub fn output(&self) -> Option<&Value> {
        match self {
            ScanState::Complete { output, .. } => Some(output),
            _ => None,
        }
    }

    pub fn attachment(&self) -> Option<&AttachmentRef> {
        match self {
            ScanState::Scanning { attachment, .. } | ScanState::Complete { attachment, .. } => {
                Some(attachment)
            }
            _ => None,
        }
    }

    /// Apply one event. Events that make no sense in the current state
    /// leave it unchanged.
    pub fn apply(self, event: ScanEvent, max_attempts: u32) -> ScanState {
        match (self, event) {
            (_, ScanEvent::Reset) => ScanState::Idle,

            (ScanState::Idle, ScanEvent::Submitted { file_name }) => {
                ScanState::Uploading { file_name }
            }

            (ScanState::Uploading { .. }, ScanEvent::Uploaded(attachment)) => ScanState::Scanning {
                attachment,
                task_id: None,
                attempts: 0,
            },
            (ScanState::Uploading { .. }, ScanEvent::UploadFailed) => {
                ScanState::Error(ScanError::new(ScanErrorKind::UploadFailed, UPLOAD_FAILED))
            }

            (
                ScanState::Scanning {
                    attachment,
                    task_id: None,
                    attempts,
                },
                ScanEvent::ScanStarted { task_id },
            ) => ScanState::Scanning {
                attachment,
                task_id: Some(task_id),
                attempts,
            },
            (ScanState::Scanning { task_id: None, .. }, ScanEvent::SubmitFailed(msg)) => {
                ScanState::Error(ScanError::with_fallback(
                    ScanErrorKind::SubmitFailed,
                    &msg,
                    SUBMIT_FAILED,
                ))
            }

            (
                ScanState::Scanning {
                    attachment,
                    task_id: Some(task_id),
                    attempts,
                },
                ScanEvent::Polled(report),
            ) => match report.status {
                ScanStatus::Completed => ScanState::Complete {
                    attachment,
                    task_id,
                    output: report.output.unwrap_or(Value::Null),
                },
                ScanStatus::Failed => ScanState::Error(ScanError::with_fallback(
                    ScanErrorKind::PollFailed,
                    report.error.as_deref().unwrap_or_default(),
                    SCAN_FAILED,
                )),
                ScanStatus::Scanning => {
                    let attempts = attempts + 1;
                    if attempts >= max_attempts.max(1) {
                        ScanState::Error(ScanError::new(
                            ScanErrorKind::Timeout,
                            format!("scan did not finish after {attempts} status checks"),
                        ))
                    } else {
                        ScanState::Scanning {
                            attachment,
                            task_id: Some(task_id),
                            attempts,
                        }
                    }
                }
            },
            (ScanState::Scanning { task_id: Some(_), .. }, ScanEvent::PollFailed(msg)) => {
                ScanState::Error(ScanError::with_fallback(
                    ScanErrorKind::PollFailed,
                    &msg,
                    POLL_FAILED,
                ))
            }
            (ScanState::Scanning { task_id: Some(_), attempts, .. }, ScanEvent::DeadlineExceeded) => {
                ScanState::Error(ScanError::new(
                    ScanErrorKind::Timeout,
                    format!("scan did not finish before the deadline ({attempts} status checks)"),
                ))
            }

            (state, _) => state,
        }
    }
}
