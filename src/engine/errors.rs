//! # Engine Errors
//!
//! Errors that abort an analysis run. Per-query failures never surface here;
//! they are recorded as warnings and the run continues.

use thiserror::Error;

use crate::errors::ErrorCategory;
use crate::policy::PolicyError;
use crate::roles::ResolvedRoles;
use crate::store::StoreError;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Schema inspection or the row count failed
    #[error("Store unusable: {0}")]
    Store(#[from] StoreError),

    /// Policy selection or lookup failed
    #[error(transparent)]
    Policy(PolicyError),

    /// The selected policy could not resolve its required roles
    #[error("{source}")]
    Resolution {
        policy: String,
        source: PolicyError,
        /// Roles resolved before the failure
        resolved_roles: ResolvedRoles,
    },
}

impl EngineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EngineError::Store(_) => ErrorCategory::Configuration,
            EngineError::Policy(e) => e.category(),
            EngineError::Resolution { .. } => ErrorCategory::Resolution,
        }
    }

    /// Partial roles of a failed resolution
    pub fn resolved_roles(&self) -> Option<&ResolvedRoles> {
        match self {
            EngineError::Resolution { resolved_roles, .. } => Some(resolved_roles),
            _ => None,
        }
    }
}

impl From<PolicyError> for EngineError {
    fn from(e: PolicyError) -> Self {
        match e {
            PolicyError::Store(s) => EngineError::Store(s),
            other => EngineError::Policy(other),
        }
    }
}
