//! External helper processes and their output protocol.
//!
//! Installer/upgrader helpers report progress only through free-form stdout
//! text. This module turns each line into a [`HelperEvent`]:
//!
//! - `--> Name` - database phase progress
//! - `++ Success ++` / `... done!` - a step finished
//! - `Plugin X is defective` - non-fatal plugin failure
//! - `Cannot downgrade X from A to B.` - fatal version mismatch
//! - `>>> Label` - generic progress
//!
//! Anything else is `Debug` in debug mode and `Unclassified` otherwise.

mod classifier;
mod runner;

use serde::Serialize;

pub use classifier::classify;
pub use runner::{HelperCommand, HelperError, HelperRunner};

/// Where a progress label came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    /// A `-->` line naming a database setup phase
    Database,
    /// A `>>>` line naming a generic step
    Step,
}

/// One classified line of helper output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "text", rename_all = "snake_case")]
pub enum HelperEvent {
    Progress { label: String, stage: ProgressStage },
    Success,
    Warning(String),
    FatalError(String),
    /// Debug mode only. Implies success of the current step.
    Debug(String),
    Unclassified(String),
}

impl HelperEvent {
    /// Whether this event advances the progress indicator.
    pub fn signals_success(&self) -> bool {
        matches!(self, Self::Success | Self::Debug(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalError(_))
    }

    /// Short name used in logs and machine-readable output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "progress",
            Self::Success => "success",
            Self::Warning(_) => "warning",
            Self::FatalError(_) => "fatal_error",
            Self::Debug(_) => "debug",
            Self::Unclassified(_) => "unclassified",
        }
    }

    /// The human-readable payload, if the event carries one
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Progress { label, .. } => Some(label),
            Self::Success => None,
            Self::Warning(text)
            | Self::FatalError(text)
            | Self::Debug(text)
            | Self::Unclassified(text) => Some(text),
        }
    }
}
