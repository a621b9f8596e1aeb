//! Status reporting for helper runs.
//!
//! [`HelperSession`] sits between a running helper and a [`StatusReporter`]:
//! it classifies each output line, keeps the current status label, and turns
//! events into reporter calls. A fatal event ends the session.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::helper::{self, HelperCommand, HelperError, HelperEvent, HelperRunner, ProgressStage};

/// Receives user-visible progress from a lifecycle operation
pub trait StatusReporter {
    /// Announce a new phase
    fn status(&mut self, message: &str);

    /// Mark the current phase as done
    fn success(&mut self);

    /// Record a non-fatal issue
    fn warning(&mut self, message: &str);

    /// Report the error that is aborting the operation
    fn error(&mut self, message: &str);

    /// Informational output, shown in verbose runs
    fn message(&mut self, message: &str);
}

// =============================================================================
// Recording reporter
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Status,
    Success,
    Warning,
    Error,
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub at: DateTime<Utc>,
    pub kind: StatusKind,
    pub text: Option<String>,
}

/// Reporter that keeps every call in memory
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusLog {
    entries: Vec<StatusEntry>,
}

impl StatusLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[StatusEntry] {
        &self.entries
    }

    /// Entries of one kind, as text
    pub fn texts(&self, kind: StatusKind) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.kind == kind)
            .filter_map(|e| e.text.as_deref())
            .collect()
    }

    pub fn count(&self, kind: StatusKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    fn push(&mut self, kind: StatusKind, text: Option<&str>) {
        self.entries.push(StatusEntry {
            at: Utc::now(),
            kind,
            text: text.map(str::to_string),
        });
    }
}

impl StatusReporter for StatusLog {
    fn status(&mut self, message: &str) {
        self.push(StatusKind::Status, Some(message));
    }

    fn success(&mut self) {
        self.push(StatusKind::Success, None);
    }

    fn warning(&mut self, message: &str) {
        self.push(StatusKind::Warning, Some(message));
    }

    fn error(&mut self, message: &str) {
        self.push(StatusKind::Error, Some(message));
    }

    fn message(&mut self, message: &str) {
        self.push(StatusKind::Message, Some(message));
    }
}

// =============================================================================
// Helper session
// =============================================================================

/// What a finished session saw
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub lines: usize,
    pub successes: usize,
    pub warnings: Vec<String>,
    pub last_status: Option<String>,
}

/// Drives a reporter from helper output
pub struct HelperSession<'a, R: StatusReporter + ?Sized> {
    reporter: &'a mut R,
    product: String,
    debug: bool,
    summary: SessionSummary,
}

impl<'a, R: StatusReporter + ?Sized> HelperSession<'a, R> {
    pub fn new(reporter: &'a mut R, product: impl Into<String>, debug: bool) -> Self {
        Self {
            reporter,
            product: product.into(),
            debug,
            summary: SessionSummary::default(),
        }
    }

    /// The status label most recently shown
    pub fn current_status(&self) -> Option<&str> {
        self.summary.last_status.as_deref()
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    /// Classify one helper line and report it.
    ///
    /// Returns the event, or [`HelperError::Fatal`] when the line reports an
    /// unrecoverable condition.
    pub fn handle_line(&mut self, line: &str) -> Result<HelperEvent, HelperError> {
        self.summary.lines += 1;
        let event = helper::classify(line, self.debug);
        tracing::debug!(event = event.kind(), "{}", line.trim());
        self.apply(&event)?;
        Ok(event)
    }

    /// Report an already-classified event.
    pub fn apply(&mut self, event: &HelperEvent) -> Result<(), HelperError> {
        match event {
            HelperEvent::Progress { label, stage } => {
                let status = match stage {
                    ProgressStage::Database => {
                        format!("Setting up {} database ({})", self.product, label)
                    }
                    ProgressStage::Step => label.clone(),
                };
                self.reporter.status(&status);
                self.summary.last_status = Some(status);
            }
            HelperEvent::Success => {
                self.summary.successes += 1;
                self.reporter.success();
            }
            HelperEvent::Warning(text) => {
                self.reporter.warning(text);
                self.summary.warnings.push(text.clone());
            }
            HelperEvent::FatalError(text) => {
                self.reporter.error(text);
                return Err(HelperError::Fatal(text.clone()));
            }
            HelperEvent::Debug(line) => {
                self.summary.successes += 1;
                self.reporter.success();
                self.reporter.message(&format!("Debug: {}", line));
            }
            HelperEvent::Unclassified(_) => {}
        }
        Ok(())
    }

    /// Run a helper to completion, reporting as its output arrives.
    pub fn run(
        mut self,
        runner: &HelperRunner,
        command: &HelperCommand,
    ) -> Result<SessionSummary, HelperError> {
        let result = runner.run(command, |line| self.handle_line(line).map(|_| ()));
        if let Err(err @ HelperError::Failed { .. }) = &result {
            self.reporter.error(&err.to_string());
        }
        result.map(|_| self.summary)
    }
}
