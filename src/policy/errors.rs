//! # Policy Errors
//!
//! Error types for policy selection, registration and query building.

use thiserror::Error;

use crate::errors::ErrorCategory;
use crate::roles::Role;
use crate::store::StoreError;

/// Result type for policy operations
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Policy errors
#[derive(Debug, Error)]
pub enum PolicyError {
    // ==================
    // Configuration Errors
    // ==================
    /// No policy registered under this name
    #[error("Unknown policy '{name}'. Available policies: {}", .available.join(", "))]
    UnknownPolicy { name: String, available: Vec<String> },

    /// Registration with an empty name
    #[error("Policy name must not be empty")]
    EmptyName,

    /// Registration under a name already taken
    #[error("Policy '{0}' is already registered")]
    DuplicatePolicy(String),

    // ==================
    // Resolution Errors
    // ==================
    /// Required roles did not resolve against the table
    #[error(
        "{policy} missing required roles: {}. Available columns: {}",
        join_roles(.missing),
        .available.join(", ")
    )]
    MissingRequiredRoles {
        policy: String,
        missing: Vec<Role>,
        available: Vec<String>,
    },

    // ==================
    // Store Errors
    // ==================
    /// Schema inspection failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn join_roles(roles: &[Role]) -> String {
    roles
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl PolicyError {
    /// Maps the error onto the run-level taxonomy
    pub fn category(&self) -> ErrorCategory {
        match self {
            PolicyError::UnknownPolicy { .. }
            | PolicyError::EmptyName
            | PolicyError::DuplicatePolicy(_) => ErrorCategory::Configuration,
            PolicyError::MissingRequiredRoles { .. } => ErrorCategory::Resolution,
            PolicyError::Store(e) => e.category(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_roles_message_lists_columns() {
        let err = PolicyError::MissingRequiredRoles {
            policy: "orders_v1".into(),
            missing: vec![Role::Customer, Role::Product],
            available: vec!["amount".into(), "region".into()],
        };
        assert_eq!(
            err.to_string(),
            "orders_v1 missing required roles: customer, product. Available columns: amount, region"
        );
        assert_eq!(err.category(), ErrorCategory::Resolution);
    }

    #[test]
    fn test_unknown_policy_is_configuration() {
        let err = PolicyError::UnknownPolicy {
            name: "nope".into(),
            available: vec!["generic_tabular".into(), "orders_v1".into()],
        };
        assert!(err.to_string().contains("generic_tabular, orders_v1"));
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }
}
