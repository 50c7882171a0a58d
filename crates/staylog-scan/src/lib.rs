//! Upload → scan → poll lifecycle for one document at a time.
//!
//! [`ScanState::apply`] is the transition table; [`ScanPoller`] drives it
//! against an [`AttachmentStore`](staylog_service::AttachmentStore) and a
//! [`ScanBackend`](staylog_service::ScanBackend) on the tokio runtime.

pub mod config;
pub mod error;
pub mod machine;
pub mod poller;

pub use config::PollConfig;
pub use error::{ScanError, ScanErrorKind};
pub use machine::{ScanEvent, ScanPhase, ScanState};
pub use poller::{ScanPoller, ScanRequest, ScanReview};
