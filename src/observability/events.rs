//! Observable events
//!
//! Every line the engine logs names one of these events.

use std::fmt;

/// Observable events during an analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Config file loaded and validated
    ConfigLoaded,

    // Run lifecycle
    /// Analysis run begins
    RunBegin,
    /// Analysis run complete
    RunComplete,
    /// Run aborted on a configuration or resolution error
    RunAborted,

    // Policy
    /// Policy chosen (explicitly or by auto-selection)
    PolicySelected,
    /// Query-list policy could not resolve its required roles
    PolicyResolutionFailed,
    /// Grouping plan built by a grouping-plan policy
    PlanBuilt,

    // Queries
    /// Aggregate query executed
    QueryExecuted,
    /// Aggregate query failed and was skipped
    QueryFailed,

    // Interpretation
    /// Interpreter finished
    InterpretComplete,
    /// A normalized anomaly was emitted
    AnomalyEmitted,

    // Profiling
    /// Store-backed profile computed
    ProfileComplete,

    // Artifacts
    /// Run artifacts written to the output directory
    ArtifactsWritten,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::RunBegin => "RUN_BEGIN",
            Event::RunComplete => "RUN_COMPLETE",
            Event::RunAborted => "RUN_ABORTED",

            Event::PolicySelected => "POLICY_SELECTED",
            Event::PolicyResolutionFailed => "POLICY_RESOLUTION_FAILED",
            Event::PlanBuilt => "PLAN_BUILT",

            Event::QueryExecuted => "QUERY_EXECUTED",
            Event::QueryFailed => "QUERY_FAILED",

            Event::InterpretComplete => "INTERPRET_COMPLETE",
            Event::AnomalyEmitted => "ANOMALY_EMITTED",

            Event::ProfileComplete => "PROFILE_COMPLETE",

            Event::ArtifactsWritten => "ARTIFACTS_WRITTEN",
        }
    }

    /// Returns true if this event ends the run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::RunAborted)
    }

    /// Returns true if this event reports a recoverable problem
    pub fn is_warning(&self) -> bool {
        matches!(self, Event::QueryFailed | Event::PolicyResolutionFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
