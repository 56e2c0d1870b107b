//! Normalized anomaly record and its validating factory
//!
//! A `NormalizedAnomaly` can only be obtained from `make_normalized_anomaly`
//! (or by deserializing, which runs the same checks). Fields are private so
//! a record can never be altered into an invalid shape after construction.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::{AnomalyError, AnomalyResult};
use crate::policy::Threshold;

/// Anomaly severity. Ordered `Info < Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySeverity {
    Info,
    Warning,
    Critical,
}

impl AnomalySeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalySeverity::Info => "info",
            AnomalySeverity::Warning => "warning",
            AnomalySeverity::Critical => "critical",
        }
    }
}

impl fmt::Display for AnomalySeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AnomalySeverity {
    type Err = AnomalyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(AnomalySeverity::Info),
            "warning" => Ok(AnomalySeverity::Warning),
            "critical" => Ok(AnomalySeverity::Critical),
            other => Err(AnomalyError::invalid_severity(other)),
        }
    }
}

/// Which side of the threshold is bad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    High,
    Low,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::High => "high",
            Direction::Low => "low",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Direction {
    type Err = AnomalyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Direction::High),
            "low" => Ok(Direction::Low),
            other => Err(AnomalyError::invalid_direction(other)),
        }
    }
}

/// Unvalidated anomaly fields, as a rule or a JSON document supplies them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyDraft {
    pub id: String,
    pub policy: String,
    pub metric: String,
    pub severity: String,
    pub direction: String,
    pub value: f64,
    pub threshold: BTreeMap<String, f64>,
    pub unit: String,
    pub evidence_keys: Vec<String>,
    pub summary: String,
}

impl AnomalyDraft {
    pub fn new(id: impl Into<String>, policy: impl Into<String>, metric: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            policy: policy.into(),
            metric: metric.into(),
            ..Self::default()
        }
    }

    pub fn severity(mut self, severity: impl ToString) -> Self {
        self.severity = severity.to_string();
        self
    }

    pub fn direction(mut self, direction: impl ToString) -> Self {
        self.direction = direction.to_string();
        self
    }

    pub fn value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    pub fn threshold(mut self, threshold: Threshold) -> Self {
        self.threshold = BTreeMap::from([
            ("warning".to_string(), threshold.warning),
            ("critical".to_string(), threshold.critical),
        ]);
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn evidence(mut self, keys: Vec<String>) -> Self {
        self.evidence_keys = keys;
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }
}

/// Validated anomaly record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AnomalyDraft")]
pub struct NormalizedAnomaly {
    id: String,
    policy: String,
    metric: String,
    severity: AnomalySeverity,
    direction: Direction,
    value: f64,
    threshold: Threshold,
    unit: String,
    evidence_keys: Vec<String>,
    summary: String,
}

impl NormalizedAnomaly {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn policy(&self) -> &str {
        &self.policy
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn severity(&self) -> AnomalySeverity {
        self.severity
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn evidence_keys(&self) -> &[String] {
        &self.evidence_keys
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Output order: severity descending, then metric, then id
    pub fn output_order(&self, other: &Self) -> Ordering {
        other
            .severity
            .cmp(&self.severity)
            .then_with(|| self.metric.cmp(&other.metric))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl TryFrom<AnomalyDraft> for NormalizedAnomaly {
    type Error = AnomalyError;

    fn try_from(draft: AnomalyDraft) -> Result<Self, Self::Error> {
        make_normalized_anomaly(draft)
    }
}

fn threshold_bound(threshold: &BTreeMap<String, f64>, key: &str) -> AnomalyResult<f64> {
    let v = threshold
        .get(key)
        .copied()
        .ok_or_else(|| AnomalyError::invalid_threshold(format!("threshold must contain '{}'", key)))?;
    if !v.is_finite() {
        return Err(AnomalyError::invalid_threshold(format!(
            "threshold '{}' must be finite",
            key
        )));
    }
    Ok(v)
}

/// Validates a draft into a `NormalizedAnomaly`.
///
/// Fails on the first violation: empty id/policy/metric, unknown severity or
/// direction, non-finite value, threshold without finite `warning` and
/// `critical`, or an empty evidence list. Extra threshold keys are dropped.
pub fn make_normalized_anomaly(draft: AnomalyDraft) -> AnomalyResult<NormalizedAnomaly> {
    let id = draft.id.clone();
    let attach = |e: AnomalyError| {
        if id.is_empty() {
            e
        } else {
            e.for_anomaly(id.clone())
        }
    };

    for (field, v) in [("id", &draft.id), ("policy", &draft.policy), ("metric", &draft.metric)] {
        if v.trim().is_empty() {
            return Err(attach(AnomalyError::invalid_field(field)));
        }
    }

    let severity: AnomalySeverity = draft.severity.parse().map_err(attach)?;
    let direction: Direction = draft.direction.parse().map_err(attach)?;

    if !draft.value.is_finite() {
        return Err(attach(AnomalyError::invalid_value(draft.value)));
    }

    let warning = threshold_bound(&draft.threshold, "warning").map_err(attach)?;
    let critical = threshold_bound(&draft.threshold, "critical").map_err(attach)?;

    if draft.evidence_keys.is_empty() {
        return Err(attach(AnomalyError::missing_evidence(
            "evidence_keys must list at least one metric key",
        )));
    }
    if draft.evidence_keys.iter().any(|k| k.trim().is_empty()) {
        return Err(attach(AnomalyError::missing_evidence(
            "evidence_keys must not contain empty keys",
        )));
    }

    Ok(NormalizedAnomaly {
        id: draft.id,
        policy: draft.policy,
        metric: draft.metric,
        severity,
        direction,
        value: draft.value,
        threshold: Threshold::new(warning, critical),
        unit: draft.unit,
        evidence_keys: draft.evidence_keys,
        summary: draft.summary,
    })
}
