//! Analysis log
//!
//! The audit record of one run: which policy ran and why, the exact queries
//! executed and every non-fatal warning. Interpreters read policy thresholds
//! and the optional data profile from here.

use serde::Serialize;

use crate::policy::{PolicyDescriptor, SelectionTrace, SeverityThresholds};
use crate::profile::DataProfile;
use crate::roles::ResolvedRoles;

/// Policy block of the analysis log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyBlock {
    pub name: String,
    pub version: String,
    /// `grouping_plan` or `query_list`
    pub shape: String,
    pub resolved_roles: ResolvedRoles,
    pub severity_thresholds: SeverityThresholds,
    pub emits_anomalies: bool,
}

impl PolicyBlock {
    pub fn from_descriptor(descriptor: &PolicyDescriptor, shape: &str) -> Self {
        Self {
            name: descriptor.name.clone(),
            version: descriptor.version.clone(),
            shape: shape.to_string(),
            resolved_roles: ResolvedRoles::new(),
            severity_thresholds: descriptor.severity_thresholds.clone(),
            emits_anomalies: descriptor.emits_anomalies,
        }
    }
}

/// Audit record of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisLog {
    pub policy: PolicyBlock,
    pub selection: SelectionTrace,
    pub queries_executed: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_profile: Option<DataProfile>,
}

impl AnalysisLog {
    pub fn new(policy: PolicyBlock, selection: SelectionTrace) -> Self {
        Self {
            policy,
            selection,
            queries_executed: Vec::new(),
            warnings: Vec::new(),
            data_profile: None,
        }
    }

    /// Attaches a profiling summary for interpreters that use one
    pub fn with_profile(mut self, profile: Option<DataProfile>) -> Self {
        self.data_profile = profile;
        self
    }
}
