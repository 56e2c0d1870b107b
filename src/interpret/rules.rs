//! Rule primitives shared by the interpreters
//!
//! Severity is a pure function of a signal and a `{warning, critical}`
//! threshold:
//!
//! ```text
//! high is bad: value >= critical -> critical, value >= warning -> warning, else info
//! low is bad:  value <= critical -> critical, value <= warning -> warning, else info
//! ```
//!
//! Only `warning` and `critical` results emit an anomaly.

use serde::Serialize;

use crate::anomaly::AnomalySeverity;
use crate::policy::{SeverityThresholds, Threshold};

use super::errors::{InterpretError, InterpretResult};
use super::table::MetricTable;

/// Severity of a "high is bad" signal
pub fn classify_high(value: f64, threshold: Threshold) -> AnomalySeverity {
    if value >= threshold.critical {
        AnomalySeverity::Critical
    } else if value >= threshold.warning {
        AnomalySeverity::Warning
    } else {
        AnomalySeverity::Info
    }
}

/// Severity of a "low is bad" signal
pub fn classify_low(value: f64, threshold: Threshold) -> AnomalySeverity {
    if value <= threshold.critical {
        AnomalySeverity::Critical
    } else if value <= threshold.warning {
        AnomalySeverity::Warning
    } else {
        AnomalySeverity::Info
    }
}

/// Minimum coverage before a domain policy evaluates anomalies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageGate {
    /// Present / expected at or above this passes
    pub min_ratio: f64,
    /// Small outputs pass with at least this many sections present...
    pub min_present: usize,
    /// ...when no more than this many are expected
    pub small_expected_max: usize,
}

impl CoverageGate {
    pub const DEFAULT: CoverageGate = CoverageGate {
        min_ratio: 0.7,
        min_present: 3,
        small_expected_max: 4,
    };

    pub fn admits(&self, coverage: &Coverage) -> bool {
        coverage.raw_ratio() >= self.min_ratio
            || (coverage.present >= self.min_present && coverage.expected <= self.small_expected_max)
    }
}

impl Default for CoverageGate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Expected sections present in a run's output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coverage {
    pub expected: usize,
    pub present: usize,
    pub missing: Vec<String>,
    /// present / expected, two decimals
    pub ratio: f64,
}

impl Coverage {
    /// Measures `expected` section names against the table
    pub fn measure(expected: &[String], table: &MetricTable) -> Self {
        let missing: Vec<String> = expected
            .iter()
            .filter(|s| !table.contains(s))
            .cloned()
            .collect();
        let present = expected.len() - missing.len();
        let ratio = if expected.is_empty() {
            0.0
        } else {
            (present as f64 / expected.len() as f64 * 100.0).round() / 100.0
        };
        Self {
            expected: expected.len(),
            present,
            missing,
            ratio,
        }
    }

    fn raw_ratio(&self) -> f64 {
        if self.expected == 0 {
            0.0
        } else {
            self.present as f64 / self.expected as f64
        }
    }

    /// `high` with most expected sections present, `medium` with at least
    /// two, else `low`
    pub fn aggregate_confidence(&self) -> &'static str {
        let floor = ((0.6 * self.expected as f64) as usize).max(3);
        if self.present >= floor {
            "high"
        } else if self.present >= 2 {
            "medium"
        } else {
            "low"
        }
    }
}

/// Confidence labels attached to an interpretation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confidence {
    pub aggregate: String,
    pub trend: String,
}

impl Confidence {
    /// Trend confidence is `none` without a monthly series, `high` with at
    /// least two periods and `medium` otherwise
    pub fn new(coverage: &Coverage, table: &MetricTable, monthly_section: &str) -> Self {
        let trend = if !table.contains(monthly_section) {
            "none"
        } else if table.section(monthly_section).len() >= 2 {
            "high"
        } else {
            "medium"
        };
        Self {
            aggregate: coverage.aggregate_confidence().to_string(),
            trend: trend.to_string(),
        }
    }
}

/// Leverage-ratio cutoffs for consolidated findings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeverageCutoffs {
    pub high: f64,
    pub medium_high: f64,
}

impl LeverageCutoffs {
    pub const DEFAULT: LeverageCutoffs = LeverageCutoffs {
        high: 50.0,
        medium_high: 20.0,
    };

    /// `high` needs the skew flag too
    pub fn confidence(&self, skew_flag: bool, leverage: Option<f64>) -> &'static str {
        match leverage {
            Some(l) if skew_flag && l >= self.high => "high",
            Some(l) if l >= self.medium_high => "medium-high",
            _ => "medium",
        }
    }
}

impl Default for LeverageCutoffs {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Policy-owned thresholds, looked up by anomaly id
#[derive(Debug, Clone, Copy)]
pub struct ThresholdLookup<'a> {
    policy: &'a str,
    thresholds: &'a SeverityThresholds,
}

impl<'a> ThresholdLookup<'a> {
    /// Fails if the policy emits anomalies but declares no thresholds
    pub fn new(
        policy: &'a str,
        thresholds: &'a SeverityThresholds,
        emits_anomalies: bool,
    ) -> InterpretResult<Self> {
        if emits_anomalies && thresholds.is_empty() {
            return Err(InterpretError::MissingThresholds {
                policy: policy.to_string(),
            });
        }
        Ok(Self { policy, thresholds })
    }

    pub fn get(&self, anomaly_id: &str) -> InterpretResult<Threshold> {
        self.thresholds
            .get(anomaly_id)
            .copied()
            .ok_or_else(|| InterpretError::MissingThreshold {
                policy: self.policy.to_string(),
                anomaly_id: anomaly_id.to_string(),
            })
    }

    pub fn get_or(&self, anomaly_id: &str, default: Threshold) -> Threshold {
        self.thresholds.get(anomaly_id).copied().unwrap_or(default)
    }
}

/// `0.4512` -> `45.1%`
pub fn percent(share: f64) -> String {
    format!("{:.1}%", share * 100.0)
}
