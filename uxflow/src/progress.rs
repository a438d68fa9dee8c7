//! Observable progress of a single run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::core::{JobStatus, PipelineStage, RunPhase};

/// Snapshot of a run, published after every stage transition and poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunProgress {
    /// Run identifier.
    pub run_id: Uuid,
    /// Coarse lifecycle.
    pub phase: RunPhase,
    /// Stage currently executing, or the last one executed.
    pub stage: Option<PipelineStage>,
    /// Last status reported for the job of the current stage.
    pub status: Option<JobStatus>,
    /// Build id once accepted.
    pub build_id: Option<String>,
    /// Task id once accepted.
    pub task_id: Option<String>,
    /// Status queries issued in the current stage.
    pub poll_iterations: usize,
    /// Plot URL once available.
    pub plot_url: Option<String>,
    /// Diagnostic faults that did not fail the run.
    pub diagnostics: Vec<String>,
    /// Time of the last update.
    pub updated_at: DateTime<Utc>,
}

impl RunProgress {
    /// Creates the initial snapshot.
    #[must_use]
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            phase: RunPhase::Pending,
            stage: None,
            status: None,
            build_id: None,
            task_id: None,
            poll_iterations: 0,
            plot_url: None,
            diagnostics: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

/// Publishing half of a run's progress channel.
#[derive(Debug)]
pub struct ProgressReporter {
    tx: watch::Sender<RunProgress>,
}

impl ProgressReporter {
    /// Creates a reporter for a run.
    #[must_use]
    pub fn new(run_id: Uuid) -> Self {
        let (tx, _rx) = watch::channel(RunProgress::new(run_id));
        Self { tx }
    }

    /// Returns a receiver that observes every future update.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RunProgress> {
        self.tx.subscribe()
    }

    /// Returns a copy of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> RunProgress {
        self.tx.borrow().clone()
    }

    /// Applies an update and stamps the snapshot.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut RunProgress),
    {
        self.tx.send_modify(|progress| {
            f(progress);
            progress.updated_at = Utc::now();
        });
    }

    /// Marks a stage as started.
    pub fn enter_stage(&self, stage: PipelineStage) {
        self.update(|p| {
            p.phase = RunPhase::Running;
            p.stage = Some(stage);
            p.status = None;
            p.poll_iterations = 0;
        });
    }

    /// Records a job status.
    pub fn record_status(&self, status: JobStatus, iterations: usize) {
        self.update(|p| {
            p.status = Some(status);
            p.poll_iterations = iterations;
        });
    }

    /// Records a diagnostic fault.
    pub fn record_diagnostic(&self, message: impl Into<String>) {
        let message = message.into();
        self.update(|p| p.diagnostics.push(message));
    }

    /// Marks the run as finished.
    pub fn finish(&self, phase: RunPhase) {
        self.update(|p| p.phase = phase);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_snapshot() {
        let id = Uuid::new_v4();
        let reporter = ProgressReporter::new(id);
        let snapshot = reporter.snapshot();

        assert_eq!(snapshot.run_id, id);
        assert_eq!(snapshot.phase, RunPhase::Pending);
        assert!(snapshot.stage.is_none());
    }

    #[test]
    fn test_updates_are_observable() {
        let reporter = ProgressReporter::new(Uuid::new_v4());
        let mut rx = reporter.subscribe();

        reporter.enter_stage(PipelineStage::Build);
        reporter.record_status(JobStatus::Building, 2);
        assert!(rx.has_changed().unwrap());

        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen.phase, RunPhase::Running);
        assert_eq!(seen.stage, Some(PipelineStage::Build));
        assert_eq!(seen.status, Some(JobStatus::Building));
        assert_eq!(seen.poll_iterations, 2);

        reporter.enter_stage(PipelineStage::Task);
        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen.status, None);
        assert_eq!(seen.poll_iterations, 0);
    }

    #[test]
    fn test_diagnostics_accumulate() {
        let reporter = ProgressReporter::new(Uuid::new_v4());
        reporter.record_diagnostic("build log unavailable");
        reporter.record_diagnostic("stderr unavailable");
        reporter.finish(RunPhase::Completed);

        let snapshot = reporter.snapshot();
        assert_eq!(snapshot.diagnostics.len(), 2);
        assert!(snapshot.phase.is_finished());
    }

    #[test]
    fn test_update_without_subscribers() {
        let reporter = ProgressReporter::new(Uuid::new_v4());
        reporter.update(|p| p.plot_url = Some("https://example.com/p.png".into()));
        assert_eq!(reporter.snapshot().plot_url.as_deref(), Some("https://example.com/p.png"));
    }
}
