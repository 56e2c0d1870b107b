//! Error taxonomy shared by every subsystem
//!
//! Each subsystem owns its error type. Every error maps onto one of four
//! categories, which decide whether a run aborts or continues.

use std::fmt;

use serde::Serialize;

/// How an error affects the run that raised it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Misconfiguration (unknown policy, missing thresholds). Aborts the run.
    Configuration,
    /// A policy could not resolve its required roles. Aborts that policy's path.
    Resolution,
    /// A single aggregate query failed. Recorded as a warning, run continues.
    Execution,
    /// An output record failed validation. Never emitted partially valid.
    MalformedOutput,
}

impl ErrorCategory {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Resolution => "resolution",
            ErrorCategory::Execution => "execution",
            ErrorCategory::MalformedOutput => "malformed_output",
        }
    }

    /// Returns true if an error of this category aborts the whole run
    pub fn aborts_run(&self) -> bool {
        !matches!(self, ErrorCategory::Execution)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
