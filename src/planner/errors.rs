//! Planner error types
//!
//! Error codes:
//! - TABSIGHT_PLAN_INVALID (REJECT)
//! - TABSIGHT_PLAN_NO_MEASURES (REJECT)
//! - TABSIGHT_PLAN_LIMIT_REQUIRED (REJECT)

use std::fmt;

use crate::errors::ErrorCategory;

/// Severity levels for planner errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Plan rejected before execution
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// Planner-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerErrorCode {
    /// Malformed group-by spec
    TabsightPlanInvalid,
    /// Group-by spec without measures
    TabsightPlanNoMeasures,
    /// Zero limit
    TabsightPlanLimitRequired,
}

impl PlannerErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            PlannerErrorCode::TabsightPlanInvalid => "TABSIGHT_PLAN_INVALID",
            PlannerErrorCode::TabsightPlanNoMeasures => "TABSIGHT_PLAN_NO_MEASURES",
            PlannerErrorCode::TabsightPlanLimitRequired => "TABSIGHT_PLAN_LIMIT_REQUIRED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for PlannerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Planner error type with full context
#[derive(Debug, Clone)]
pub struct PlannerError {
    code: PlannerErrorCode,
    message: String,
    /// Section of the rejected group-by, if known
    section: Option<String>,
}

impl PlannerError {
    /// Create a plan invalid error
    pub fn plan_invalid(reason: impl Into<String>) -> Self {
        Self {
            code: PlannerErrorCode::TabsightPlanInvalid,
            message: reason.into(),
            section: None,
        }
    }

    /// Create a no-measures error
    pub fn no_measures(section: impl Into<String>) -> Self {
        let s = section.into();
        Self {
            code: PlannerErrorCode::TabsightPlanNoMeasures,
            message: format!("Group-by '{}' declares no measures", s),
            section: Some(s),
        }
    }

    /// Create a limit required error
    pub fn limit_required(section: impl Into<String>) -> Self {
        let s = section.into();
        Self {
            code: PlannerErrorCode::TabsightPlanLimitRequired,
            message: format!("Group-by '{}' must use a positive limit", s),
            section: Some(s),
        }
    }

    /// Attaches the section name
    pub fn in_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// Returns the error code
    pub fn code(&self) -> PlannerErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the section name if applicable
    pub fn section(&self) -> Option<&str> {
        self.section.as_deref()
    }

    /// A rejected plan only skips its own query
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Execution
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(section) = &self.section {
            write!(f, " (section '{}')", section)?;
        }
        Ok(())
    }
}

impl std::error::Error for PlannerError {}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;
