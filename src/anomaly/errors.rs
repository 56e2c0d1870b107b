//! Anomaly error types
//!
//! Error codes:
//! - TABSIGHT_ANOMALY_INVALID_SEVERITY (REJECT)
//! - TABSIGHT_ANOMALY_INVALID_DIRECTION (REJECT)
//! - TABSIGHT_ANOMALY_INVALID_THRESHOLD (REJECT)
//! - TABSIGHT_ANOMALY_INVALID_VALUE (REJECT)
//! - TABSIGHT_ANOMALY_MISSING_EVIDENCE (REJECT)
//! - TABSIGHT_ANOMALY_INVALID_FIELD (REJECT)

use std::fmt;

use crate::errors::ErrorCategory;

/// Severity levels for anomaly errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Record rejected, nothing emitted
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// Anomaly-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyErrorCode {
    /// Severity outside `info` / `warning` / `critical`
    TabsightAnomalyInvalidSeverity,
    /// Direction outside `high` / `low`
    TabsightAnomalyInvalidDirection,
    /// Threshold missing `warning` or `critical`, or not finite
    TabsightAnomalyInvalidThreshold,
    /// Value is NaN or infinite
    TabsightAnomalyInvalidValue,
    /// No evidence keys, or an empty one
    TabsightAnomalyMissingEvidence,
    /// Empty id, policy or metric
    TabsightAnomalyInvalidField,
}

impl AnomalyErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            AnomalyErrorCode::TabsightAnomalyInvalidSeverity => "TABSIGHT_ANOMALY_INVALID_SEVERITY",
            AnomalyErrorCode::TabsightAnomalyInvalidDirection => {
                "TABSIGHT_ANOMALY_INVALID_DIRECTION"
            }
            AnomalyErrorCode::TabsightAnomalyInvalidThreshold => {
                "TABSIGHT_ANOMALY_INVALID_THRESHOLD"
            }
            AnomalyErrorCode::TabsightAnomalyInvalidValue => "TABSIGHT_ANOMALY_INVALID_VALUE",
            AnomalyErrorCode::TabsightAnomalyMissingEvidence => "TABSIGHT_ANOMALY_MISSING_EVIDENCE",
            AnomalyErrorCode::TabsightAnomalyInvalidField => "TABSIGHT_ANOMALY_INVALID_FIELD",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for AnomalyErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Anomaly construction error
#[derive(Debug, Clone)]
pub struct AnomalyError {
    code: AnomalyErrorCode,
    message: String,
    /// Offending field
    field: &'static str,
    /// Anomaly id, when known
    anomaly_id: Option<String>,
}

impl AnomalyError {
    fn new(code: AnomalyErrorCode, field: &'static str, message: String) -> Self {
        Self {
            code,
            message,
            field,
            anomaly_id: None,
        }
    }

    pub fn invalid_severity(actual: &str) -> Self {
        Self::new(
            AnomalyErrorCode::TabsightAnomalyInvalidSeverity,
            "severity",
            format!("Invalid severity: {}", actual),
        )
    }

    pub fn invalid_direction(actual: &str) -> Self {
        Self::new(
            AnomalyErrorCode::TabsightAnomalyInvalidDirection,
            "direction",
            format!("Invalid direction: {}", actual),
        )
    }

    pub fn invalid_threshold(reason: impl Into<String>) -> Self {
        Self::new(
            AnomalyErrorCode::TabsightAnomalyInvalidThreshold,
            "threshold",
            reason.into(),
        )
    }

    pub fn invalid_value(value: f64) -> Self {
        Self::new(
            AnomalyErrorCode::TabsightAnomalyInvalidValue,
            "value",
            format!("Value must be finite, got {}", value),
        )
    }

    pub fn missing_evidence(reason: impl Into<String>) -> Self {
        Self::new(
            AnomalyErrorCode::TabsightAnomalyMissingEvidence,
            "evidence_keys",
            reason.into(),
        )
    }

    pub fn invalid_field(field: &'static str) -> Self {
        Self::new(
            AnomalyErrorCode::TabsightAnomalyInvalidField,
            field,
            format!("Field '{}' must not be empty", field),
        )
    }

    /// Attaches the id of the anomaly being built
    pub fn for_anomaly(mut self, id: impl Into<String>) -> Self {
        self.anomaly_id = Some(id.into());
        self
    }

    pub fn code(&self) -> AnomalyErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn field(&self) -> &str {
        self.field
    }

    pub fn anomaly_id(&self) -> Option<&str> {
        self.anomaly_id.as_deref()
    }

    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::MalformedOutput
    }
}

impl fmt::Display for AnomalyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code, self.message)?;
        if let Some(id) = &self.anomaly_id {
            write!(f, " (anomaly '{}')", id)?;
        }
        Ok(())
    }
}

impl std::error::Error for AnomalyError {}

/// Result type for anomaly construction
pub type AnomalyResult<T> = Result<T, AnomalyError>;
