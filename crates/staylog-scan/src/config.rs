use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);
/// 60 checks at the default interval gives a three minute ceiling.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Tunables for one [`ScanPoller`](crate::ScanPoller).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between status checks. The first check happens one interval
    /// after the scan is started.
    pub poll_interval: Duration,
    /// Status checks allowed before the flow times out. Values below 1 are
    /// treated as 1.
    pub max_attempts: u32,
    pub max_file_size_bytes: u64,
    /// Pause between a finished upload and starting the scan.
    pub submit_delay: Duration,
    /// Optional wall-clock bound, measured from scan start. Either this or
    /// `max_attempts` running out ends the flow with a timeout.
    pub deadline: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE,
            submit_delay: Duration::ZERO,
            deadline: None,
        }
    }
}

impl PollConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size_bytes = bytes;
        self
    }

    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub(crate) fn attempt_limit(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Longest a flow can spend polling before the attempt bound trips.
    pub fn max_wait(&self) -> Duration {
        let by_attempts = self.poll_interval * self.attempt_limit();
        match self.deadline {
            Some(deadline) => by_attempts.min(deadline),
            None => by_attempts,
        }
    }
}
