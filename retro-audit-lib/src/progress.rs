//! Audit progress reporting and cancellation.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

use crate::error::{AuditError, AuditWarning};

/// Number of rows processed between progress reports and cancellation checks.
pub const PROGRESS_BATCH: usize = 500;

/// Pipeline phase an audit is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditPhase {
    Parsing,
    Matching,
    Classifying,
    Grouping,
}

impl AuditPhase {
    /// Share of the overall run covered by this phase, as `(start, end)` percent.
    fn span(&self) -> (u8, u8) {
        match self {
            AuditPhase::Parsing => (0, 20),
            AuditPhase::Matching => (20, 40),
            AuditPhase::Classifying => (40, 70),
            AuditPhase::Grouping => (70, 100),
        }
    }

    /// Overall percent complete after `done` of `total` rows of this phase.
    pub fn percent(&self, done: usize, total: usize) -> u8 {
        let (start, end) = self.span();
        if total == 0 {
            return end;
        }
        let within = (done.min(total) * usize::from(end - start)) / total;
        start + within as u8
    }
}

impl fmt::Display for AuditPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuditPhase::Parsing => "Parsing catalog",
            AuditPhase::Matching => "Matching files",
            AuditPhase::Classifying => "Classifying",
            AuditPhase::Grouping => "Grouping parents and clones",
        };
        f.write_str(name)
    }
}

/// How an audit operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditOutcome {
    Committed,
    Cancelled,
    Failed(String),
}

impl AuditOutcome {
    pub fn from_result<T>(result: &Result<T, AuditError>) -> Self {
        match result {
            Ok(_) => AuditOutcome::Committed,
            Err(AuditError::Cancelled) => AuditOutcome::Cancelled,
            Err(e) => AuditOutcome::Failed(e.to_string()),
        }
    }
}

/// Event sent through a [`ChannelProgress`].
#[derive(Debug, Clone, PartialEq)]
pub enum AuditEvent {
    Progress { phase: AuditPhase, percent: u8 },
    Warning(AuditWarning),
    Finished(AuditOutcome),
}

/// Trait for receiving audit progress updates.
pub trait AuditProgress {
    /// Called at batch granularity with the overall percent complete.
    fn on_progress(&self, phase: AuditPhase, percent: u8);

    /// Called for every non-fatal problem, after it has been logged.
    fn on_warning(&self, warning: &AuditWarning);

    /// Called once when the operation ends.
    fn on_finish(&self, outcome: &AuditOutcome);
}

/// A no-op progress reporter that discards all updates.
pub struct SilentProgress;

impl AuditProgress for SilentProgress {
    fn on_progress(&self, _phase: AuditPhase, _percent: u8) {}
    fn on_warning(&self, _warning: &AuditWarning) {}
    fn on_finish(&self, _outcome: &AuditOutcome) {}
}

/// A progress reporter that logs to the `log` crate.
pub struct LogProgress;

impl AuditProgress for LogProgress {
    fn on_progress(&self, phase: AuditPhase, percent: u8) {
        log::debug!("  [{:>3}%] {}", percent, phase);
    }

    // AuditJob::warn has already logged it.
    fn on_warning(&self, _warning: &AuditWarning) {}

    fn on_finish(&self, outcome: &AuditOutcome) {
        match outcome {
            AuditOutcome::Committed => log::info!("Audit committed"),
            AuditOutcome::Cancelled => log::info!("Audit cancelled"),
            AuditOutcome::Failed(e) => log::error!("Audit failed: {}", e),
        }
    }
}

/// Forwards updates as [`AuditEvent`]s over an MPSC channel, for frontends
/// that drive a progress display from another thread.
pub struct ChannelProgress {
    tx: Sender<AuditEvent>,
}

impl ChannelProgress {
    pub fn new(tx: Sender<AuditEvent>) -> Self {
        Self { tx }
    }
}

impl AuditProgress for ChannelProgress {
    fn on_progress(&self, phase: AuditPhase, percent: u8) {
        // A dropped receiver only means nobody is watching.
        let _ = self.tx.send(AuditEvent::Progress { phase, percent });
    }

    fn on_warning(&self, warning: &AuditWarning) {
        let _ = self.tx.send(AuditEvent::Warning(warning.clone()));
    }

    fn on_finish(&self, outcome: &AuditOutcome) {
        let _ = self.tx.send(AuditEvent::Finished(outcome.clone()));
    }
}

/// Shared flag used to cancel a running audit from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

static SILENT: SilentProgress = SilentProgress;

/// Progress sink and cancellation flag for one audit operation.
pub struct AuditJob<'a> {
    pub progress: &'a dyn AuditProgress,
    pub cancel: CancelToken,
}

impl<'a> AuditJob<'a> {
    pub fn new(progress: &'a dyn AuditProgress, cancel: CancelToken) -> Self {
        Self { progress, cancel }
    }

    /// Return `Err(Cancelled)` if cancellation was requested.
    pub fn check_cancelled(&self) -> Result<(), AuditError> {
        if self.cancel.is_cancelled() {
            Err(AuditError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Log a warning and pass it to the progress sink.
    pub fn warn(&self, warning: &AuditWarning) {
        log::warn!("{warning}");
        self.progress.on_warning(warning);
    }

    /// Start tracking a phase of `total` rows.
    pub(crate) fn phase(&self, phase: AuditPhase, total: usize) -> PhaseTicker<'_, 'a> {
        self.progress.on_progress(phase, phase.percent(0, total));
        PhaseTicker {
            job: self,
            phase,
            total,
        }
    }
}

impl AuditJob<'static> {
    /// A job that reports nothing and is never cancelled.
    pub fn silent() -> Self {
        Self::new(&SILENT, CancelToken::new())
    }
}

/// Reports progress and checks for cancellation every [`PROGRESS_BATCH`] rows.
pub(crate) struct PhaseTicker<'j, 'a> {
    job: &'j AuditJob<'a>,
    phase: AuditPhase,
    total: usize,
}

impl PhaseTicker<'_, '_> {
    pub(crate) fn tick(&self, done: usize) -> Result<(), AuditError> {
        if done > 0 && done % PROGRESS_BATCH == 0 {
            self.job.check_cancelled()?;
            self.job
                .progress
                .on_progress(self.phase, self.phase.percent(done, self.total));
        }
        Ok(())
    }

    pub(crate) fn finish(&self) -> Result<(), AuditError> {
        self.job.check_cancelled()?;
        self.job
            .progress
            .on_progress(self.phase, self.phase.percent(self.total, self.total));
        Ok(())
    }
}
