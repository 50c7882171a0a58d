use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use serde_json::Value;
use staylog_core::attachment::{AttachmentRef, UploadFile};
use staylog_core::scan::{ScanModule, StartScan};
use staylog_service::{AttachmentStore, ScanBackend};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::config::PollConfig;
use crate::error::ScanError;
use crate::machine::{ScanEvent, ScanState};

/// One document to scan.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Property the uploaded attachment is bound to.
    pub property_id: String,
    pub module: ScanModule,
    pub file: UploadFile,
}

/// What the caller takes away from a completed flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReview {
    pub output: Value,
    pub attachment: AttachmentRef,
}

/// Runs one upload → scan → poll flow at a time.
///
/// State is published through a `watch` channel; callers observe it with
/// [`subscribe`](Self::subscribe) and act through `submit`, `retry` and
/// `review`. Dropping the poller stops any running flow.
pub struct ScanPoller {
    attachments: Arc<dyn AttachmentStore>,
    scans: Arc<dyn ScanBackend>,
    config: PollConfig,
    state: Arc<watch::Sender<ScanState>>,
    /// Bumped under the state lock on every submit and reset. A flow only
    /// publishes while its generation is current.
    generation: Arc<AtomicU64>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ScanPoller {
    pub fn new(
        attachments: Arc<dyn AttachmentStore>,
        scans: Arc<dyn ScanBackend>,
        config: PollConfig,
    ) -> Self {
        let (tx, _rx) = watch::channel(ScanState::Idle);
        Self {
            attachments,
            scans,
            config,
            state: Arc::new(tx),
            generation: Arc::new(AtomicU64::new(0)),
            worker: Mutex::new(None),
        }
    }

    /// Poller over a single backend that serves both attachments and scans.
    pub fn with_backend<B>(backend: Arc<B>, config: PollConfig) -> Self
    where
        B: AttachmentStore + ScanBackend + 'static,
    {
        Self::new(backend.clone(), backend, config)
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    pub fn current_state(&self) -> ScanState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanState> {
        self.state.subscribe()
    }

    /// Whether a flow task is still alive.
    pub fn is_polling(&self) -> bool {
        self.worker()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Start a flow for `request`. Must be called inside a tokio runtime.
    ///
    /// Oversized files and calls made while the poller is not idle are
    /// rejected with a `validation` error and leave the state untouched.
    pub fn submit(&self, request: ScanRequest) -> Result<(), ScanError> {
        let size = request.file.size_bytes();
        if size > self.config.max_file_size_bytes {
            return Err(ScanError::validation(format!(
                "{} is {}; files must be {} or smaller",
                request.file.file_name,
                human_size(size),
                human_size(self.config.max_file_size_bytes),
            )));
        }

        // Held until the new handle is stored so a concurrent retry always
        // finds the flow it has to abort.
        let mut worker = self.worker();
        let mut accepted = None;
        self.state.send_if_modified(|state| {
            if !matches!(state, ScanState::Idle) {
                return false;
            }
            let id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let submitted = ScanEvent::Submitted {
                file_name: request.file.file_name.clone(),
            };
            *state = ScanState::Idle.apply(submitted, self.config.max_attempts);
            accepted = Some(id);
            true
        });
        let Some(id) = accepted else {
            return Err(ScanError::validation(
                "a document is already being processed; retry or wait for it to finish",
            ));
        };

        debug!(
            property_id = %request.property_id,
            module = %request.module,
            file = %request.file.file_name,
            "scan submitted"
        );

        let flow = Flow {
            attachments: self.attachments.clone(),
            scans: self.scans.clone(),
            config: self.config.clone(),
            state: self.state.clone(),
            generation: self.generation.clone(),
            id,
        };
        let handle = tokio::spawn(flow.run(request));
        if let Some(previous) = worker.replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    /// Return to `Idle` from any state, stopping any running flow.
    pub fn retry(&self) {
        let mut worker = self.worker();
        self.state.send_modify(|state| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            *state = std::mem::replace(state, ScanState::Idle)
                .apply(ScanEvent::Reset, self.config.max_attempts);
        });
        if let Some(handle) = worker.take() {
            handle.abort();
        }
    }

    /// Output and attachment of a completed flow; `None` in any other state.
    pub fn review(&self) -> Option<ScanReview> {
        match &*self.state.borrow() {
            ScanState::Complete {
                attachment, output, ..
            } => Some(ScanReview {
                output: output.clone(),
                attachment: attachment.clone(),
            }),
            _ => None,
        }
    }

    /// Wait until the flow is terminal or back to `Idle`, and return that state.
    pub async fn wait_settled(&self) -> ScanState {
        let mut rx = self.subscribe();
        let settled = rx
            .wait_for(|s| s.is_terminal() || matches!(s, ScanState::Idle))
            .await
            .map(|s| (*s).clone());
        settled.unwrap_or_else(|_| self.current_state())
    }

    fn worker(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.worker.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for ScanPoller {
    fn drop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.worker().take() {
            handle.abort();
        }
    }
}

/// The task side of one submission.
struct Flow {
    attachments: Arc<dyn AttachmentStore>,
    scans: Arc<dyn ScanBackend>,
    config: PollConfig,
    state: Arc<watch::Sender<ScanState>>,
    generation: Arc<AtomicU64>,
    id: u64,
}

impl Flow {
    fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.id
    }

    /// Apply `event` if this flow is still current. Returns the new state,
    /// or `None` once the flow has been superseded by a reset or resubmit.
    fn publish(&self, event: ScanEvent) -> Option<ScanState> {
        let mut published = None;
        self.state.send_if_modified(|state| {
            if !self.is_current() {
                return false;
            }
            let before = state.phase();
            let next = state.clone().apply(event, self.config.max_attempts);
            if next.phase() != before {
                debug!(flow = self.id, from = %before, to = %next.phase(), "scan state changed");
            }
            if let ScanState::Error(e) = &next {
                warn!(flow = self.id, kind = %e.kind, "scan failed: {}", e.message);
            }
            let changed = next != *state;
            *state = next.clone();
            published = Some(next);
            changed
        });
        published
    }

    async fn run(self, request: ScanRequest) {
        let ScanRequest {
            property_id,
            module,
            file,
        } = request;

        if !self.is_current() {
            return;
        }
        let attachment = match self.attachments.upload_attachment(&property_id, &file).await {
            Ok(attachment) => attachment,
            Err(e) => {
                debug!(flow = self.id, "upload error: {e}");
                self.publish(ScanEvent::UploadFailed);
                return;
            }
        };
        let attachment_id = attachment.id.clone();
        if self.publish(ScanEvent::Uploaded(attachment)).is_none() {
            return;
        }

        if !self.config.submit_delay.is_zero() {
            sleep(self.config.submit_delay).await;
        }

        let start = StartScan {
            attachment_id,
            module,
        };
        let task_id = match self.scans.start_scan(&start).await {
            Ok(ticket) => ticket.task_id,
            Err(e) => {
                self.publish(ScanEvent::SubmitFailed(e.to_string()));
                return;
            }
        };
        if self
            .publish(ScanEvent::ScanStarted {
                task_id: task_id.clone(),
            })
            .is_none()
        {
            return;
        }

        // A deadline too far out to represent is no deadline at all.
        let deadline = self
            .config
            .deadline
            .and_then(|d| Instant::now().checked_add(d));
        loop {
            sleep(self.config.poll_interval).await;

            let event = match self.scans.get_scan_status(&task_id).await {
                Ok(report) => ScanEvent::Polled(report),
                Err(e) => ScanEvent::PollFailed(e.to_string()),
            };
            match self.publish(event) {
                Some(state) if !state.is_terminal() => {}
                _ => return,
            }

            if deadline.is_some_and(|d| Instant::now() >= d) {
                self.publish(ScanEvent::DeadlineExceeded);
                return;
            }
        }
    }
}

fn human_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_size_units() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KiB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MiB");
        assert_eq!(human_size(6 * 1024 * 1024 + 512 * 1024), "6.5 MiB");
    }
}
