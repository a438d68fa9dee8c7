//! Fixed-interval status polling.
//!
//! The [`Poller`] drives a remote job from its submission status to a
//! terminal status. It is generic over the resource kind: the caller supplies
//! the status query as a closure.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cancellation::CancellationToken;
use crate::core::{JobStatus, ResourceKind};
use crate::errors::UxflowError;

/// Polling discipline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Wait between status queries in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Maximum number of status queries. `None` polls until terminal.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: Option<usize>,
}

fn default_interval_ms() -> u64 {
    2000
}

#[allow(clippy::unnecessary_wraps)]
fn default_max_iterations() -> Option<usize> {
    Some(1800)
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_iterations: default_max_iterations(),
        }
    }
}

impl PollConfig {
    /// Creates a poll configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the iteration cap.
    #[must_use]
    pub fn with_max_iterations(mut self, max: Option<usize>) -> Self {
        self.max_iterations = max;
        self
    }

    /// Interval as a Duration.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Rejects a zero iteration cap.
    pub fn validate(&self) -> Result<(), UxflowError> {
        if self.max_iterations == Some(0) {
            return Err(UxflowError::Config("poll.max_iterations must be at least 1".into()));
        }
        Ok(())
    }
}

/// How a poll ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    /// The terminal status reached.
    pub status: JobStatus,
    /// Number of status queries issued.
    pub iterations: usize,
    /// Number of queries that failed and were absorbed.
    pub transient_faults: usize,
}

/// Polls a job until it reaches a terminal status.
#[derive(Debug, Clone, Copy)]
pub struct Poller<'a> {
    config: &'a PollConfig,
    cancel: &'a CancellationToken,
}

impl<'a> Poller<'a> {
    /// Creates a poller.
    #[must_use]
    pub fn new(config: &'a PollConfig, cancel: &'a CancellationToken) -> Self {
        Self { config, cancel }
    }

    /// Polls until terminal.
    ///
    /// * `initial` - status returned by the submission; if already terminal
    ///   the poller returns without querying.
    /// * `status_of` - one status query.
    /// * `on_status` - called with every status obtained and the iteration count.
    ///
    /// A transient query failure keeps the previous status. Any other query
    /// error aborts the poll.
    pub async fn run<F, Fut, U>(
        &self,
        kind: ResourceKind,
        id: &str,
        initial: JobStatus,
        mut status_of: F,
        mut on_status: U,
    ) -> Result<PollOutcome, UxflowError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<JobStatus, UxflowError>> + Send,
        U: FnMut(JobStatus, usize) + Send,
    {
        let mut status = initial;
        let mut iterations = 0;
        let mut transient_faults = 0;

        while !status.is_terminal() {
            if let Some(max) = self.config.max_iterations {
                if iterations >= max {
                    warn!(%kind, id, iterations, last_status = %status, "Polling gave up");
                    return Err(UxflowError::PollTimeout {
                        kind,
                        iterations,
                        last_status: status,
                    });
                }
            }

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    return Err(UxflowError::Cancelled(
                        self.cancel.reason().unwrap_or_default(),
                    ));
                }
                () = tokio::time::sleep(self.config.interval()) => {}
            }

            iterations += 1;
            match status_of().await {
                Ok(next) => {
                    if next != status {
                        debug!(%kind, id, from = %status, to = %next, iterations, "Status changed");
                    }
                    status = next;
                    on_status(status, iterations);
                }
                Err(e) if e.is_transient() => {
                    transient_faults += 1;
                    warn!(%kind, id, iterations, error = %e, "Status query failed, keeping {status}");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(PollOutcome {
            status,
            iterations,
            transient_faults,
        })
    }
}
