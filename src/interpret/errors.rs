//! # Interpretation Errors
//!
//! Missing thresholds are misconfiguration and abort the run. An anomaly
//! that fails validation is malformed output and is never emitted.

use thiserror::Error;

use crate::anomaly::AnomalyError;
use crate::errors::ErrorCategory;

/// Result type for interpretation
pub type InterpretResult<T> = Result<T, InterpretError>;

/// Interpretation errors
#[derive(Debug, Error)]
pub enum InterpretError {
    // ==================
    // Configuration Errors
    // ==================
    /// The policy emits anomalies but the log carries no thresholds
    #[error("Policy '{policy}' emits anomalies but declares no severity thresholds")]
    MissingThresholds { policy: String },

    /// A rule fired for an anomaly with no configured threshold
    #[error("Missing severity thresholds for anomaly '{anomaly_id}' in policy '{policy}'")]
    MissingThreshold { policy: String, anomaly_id: String },

    // ==================
    // Malformed Output
    // ==================
    #[error(transparent)]
    Anomaly(#[from] AnomalyError),
}

impl InterpretError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            InterpretError::MissingThresholds { .. } | InterpretError::MissingThreshold { .. } => {
                ErrorCategory::Configuration
            }
            InterpretError::Anomaly(_) => ErrorCategory::MalformedOutput,
        }
    }
}
