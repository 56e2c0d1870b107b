//! Policy contract types
//!
//! A `PolicyDescriptor` is the stable, self-describing contract of a policy.
//! Every registered policy produces one and the contract tests check them all.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::roles::Role;

/// Warning and critical bounds of one anomaly rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub warning: f64,
    pub critical: f64,
}

impl Threshold {
    pub const fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }
}

/// Severity thresholds keyed by anomaly id
pub type SeverityThresholds = BTreeMap<String, Threshold>;

/// Roles and features a policy declares
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub requires: Vec<Role>,
    pub optional: Vec<Role>,
    pub supports: Vec<String>,
}

impl Capabilities {
    pub fn new(requires: &[Role], optional: &[Role], supports: &[&str]) -> Self {
        Self {
            requires: requires.to_vec(),
            optional: optional.to_vec(),
            supports: supports.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Required roles followed by optional roles
    pub fn all_roles(&self) -> Vec<Role> {
        self.requires
            .iter()
            .chain(self.optional.iter())
            .copied()
            .collect()
    }
}

/// Static policy contract
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyDescriptor {
    pub name: String,
    pub version: String,
    pub description: String,
    pub required_roles: Vec<Role>,
    pub optional_roles: Vec<Role>,
    pub supports: Vec<String>,
    pub expected_metrics: Vec<String>,
    pub coverage_behavior: String,
    pub anomalies_emitted: Vec<String>,
    pub severity_thresholds: SeverityThresholds,
    pub emits_anomalies: bool,
    pub emits_anomalies_normalized: bool,
}

/// Builds a threshold map from `(anomaly id, warning, critical)` triples
pub fn thresholds(entries: &[(&str, f64, f64)]) -> SeverityThresholds {
    entries
        .iter()
        .map(|(id, w, c)| (id.to_string(), Threshold::new(*w, *c)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_roles_order() {
        let caps = Capabilities::new(&[Role::Product, Role::Amount], &[Role::Date], &["top_n"]);
        assert_eq!(caps.all_roles(), vec![Role::Product, Role::Amount, Role::Date]);
    }

    #[test]
    fn test_threshold_serde() {
        let t = thresholds(&[("aov_low", 20.0, 10.0)]);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "{\"aov_low\":{\"warning\":20.0,\"critical\":10.0}}");
    }
}
