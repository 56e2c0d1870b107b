//! Interpreter for `generic_tabular`
//!
//! Domain-agnostic and conservative. Reports the row count and flags time
//! periods whose value is far above the median period for a few watched
//! measures:
//!
//! ```text
//! ratio = max(series) / median(series)    (>= 3 periods, median = upper middle)
//! ```
//!
//! Anomalies of one base column in one period (e.g. `sum_units` and
//! `avg_units` in 2023) are consolidated into a single mechanism-level
//! finding, using the data profile's leverage ratio when available.

use std::collections::BTreeMap;

use crate::anomaly::{make_normalized_anomaly, AnomalyDraft, AnomalySeverity, Direction, NormalizedAnomaly};
use crate::engine::{AnalysisLog, MetricKey, MetricRow};
use crate::policy::{Threshold, GENERIC_POLICY_NAME};

use super::errors::InterpretResult;
use super::interpretation::{Finding, Interpretation, InterpretationMetadata, Mechanism};
use super::rules::{classify_high, LeverageCutoffs, ThresholdLookup};
use super::Interpreter;

/// Measures checked for period outliers
pub const WATCHED_METRICS: [&str; 4] = ["sum_units", "avg_units", "sum_sales", "sum_profit"];

/// Fewer periods than this are never checked
pub const MIN_PERIODS: usize = 3;

/// Used when the policy declares no `median_ratio` threshold
pub const DEFAULT_MEDIAN_RATIO: Threshold = Threshold::new(3.0, 10.0);

/// Period row counts at or below this multiple of the median are not elevated
const ROW_COUNT_ELEVATION: f64 = 1.25;

const TIME_SUMMARY: &str = "time_summary";
const METRIC_PREFIXES: [&str; 5] = ["sum_", "avg_", "min_", "max_", "rate_"];

/// Interprets `generic_tabular` metric rows
#[derive(Debug, Clone, Default)]
pub struct GenericInterpreter {
    cutoffs: LeverageCutoffs,
}

impl GenericInterpreter {
    pub fn new() -> Self {
        Self::default()
    }
}

/// `time_summary` values keyed by measure, then period
#[derive(Debug, Default)]
struct TimeSummary {
    label: Option<String>,
    series: BTreeMap<String, BTreeMap<String, f64>>,
}

impl TimeSummary {
    fn from_rows(rows: &[MetricRow]) -> Self {
        let mut out = TimeSummary::default();
        for row in rows.iter().filter(|r| r.section == TIME_SUMMARY) {
            let MetricKey::Grouped { groups, measure } = row.metric_key() else {
                continue;
            };
            let [(label, period)] = groups.as_slice() else {
                continue;
            };
            let Some(value) = row.numeric() else {
                continue;
            };
            out.label.get_or_insert_with(|| label.clone());
            out.series
                .entry(measure)
                .or_default()
                .insert(period.clone(), value);
        }
        out
    }

    fn series(&self, measure: &str) -> Option<&BTreeMap<String, f64>> {
        self.series.get(measure)
    }

    fn evidence_key(&self, period: &str, measure: &str) -> String {
        format!(
            "{}.{}={}:{}",
            TIME_SUMMARY,
            self.label.as_deref().unwrap_or("year"),
            period,
            measure
        )
    }
}

/// Upper middle of the sorted values
fn upper_median(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sorted: Vec<f64> = values.collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(sorted[sorted.len() / 2])
}

/// Period with the highest value; the earliest period wins ties
fn peak(series: &BTreeMap<String, f64>) -> Option<(&str, f64)> {
    let mut best: Option<(&str, f64)> = None;
    for (period, value) in series {
        if best.map_or(true, |(_, b)| *value > b) {
            best = Some((period.as_str(), *value));
        }
    }
    best
}

fn base_column(metric: &str) -> &str {
    METRIC_PREFIXES
        .iter()
        .find_map(|p| metric.strip_prefix(p))
        .unwrap_or(metric)
}

/// One flagged period of one measure
struct Outlier {
    metric: String,
    period: String,
    anomaly: NormalizedAnomaly,
    finding: Finding,
}

impl GenericInterpreter {
    fn ratio_outlier(
        &self,
        policy: &str,
        summary: &TimeSummary,
        metric: &str,
        threshold: Threshold,
    ) -> InterpretResult<Option<Outlier>> {
        let Some(series) = summary.series(metric) else {
            return Ok(None);
        };
        if series.len() < MIN_PERIODS {
            return Ok(None);
        }
        let (Some(median), Some((period, max))) = (upper_median(series.values().copied()), peak(series)) else {
            return Ok(None);
        };
        if median == 0.0 {
            return Ok(None);
        }

        let ratio = max / median;
        let severity = classify_high(ratio, threshold);
        if severity == AnomalySeverity::Info {
            return Ok(None);
        }

        let evidence = summary.evidence_key(period, metric);
        let anomaly = make_normalized_anomaly(
            AnomalyDraft::new(format!("{}:{}:{}:high_ratio", policy, metric, period), policy, metric)
                .severity(severity)
                .direction(Direction::High)
                .value(ratio)
                .threshold(threshold)
                .unit("ratio")
                .evidence(vec![evidence.clone()])
                .summary(format!(
                    "{} for {} is {:.1}x the median across periods.",
                    metric, period, ratio
                )),
        )?;
        let finding = Finding::info(
            format!("Potential outlier in {}", metric),
            format!(
                "{} is unusually high for {} ({}), about {:.1}x the median across periods. \
                 Consider validating whether this reflects a data issue or a structural change.",
                metric, period, max, ratio
            ),
            vec![evidence],
        )
        .with_severity(severity);

        Ok(Some(Outlier {
            metric: metric.to_string(),
            period: period.to_string(),
            anomaly,
            finding,
        }))
    }

    /// Consolidates outliers sharing a base column and period. Returns the
    /// consolidated findings and the indices of the outliers they replace.
    fn consolidate(
        &self,
        outliers: &[Outlier],
        summary: &TimeSummary,
        log: &AnalysisLog,
        metadata: &mut InterpretationMetadata,
    ) -> (Vec<Finding>, Vec<usize>) {
        let mut groups: BTreeMap<(&str, &str), Vec<usize>> = BTreeMap::new();
        for (i, o) in outliers.iter().enumerate() {
            groups
                .entry((base_column(&o.metric), o.period.as_str()))
                .or_default()
                .push(i);
        }

        let mut findings = Vec::new();
        let mut replaced = Vec::new();
        for ((base, period), members) in groups {
            if members.len() < 2 {
                continue;
            }

            let stats = log
                .data_profile
                .as_ref()
                .and_then(|p| p.column_ignore_case(base))
                .and_then(|(_, c)| c.stats);
            let leverage = stats.and_then(|s| s.leverage_ratio());
            let skew_flag = stats.map_or(false, |s| s.skew_flag);
            if let Some(s) = stats {
                metadata.supporting_evidence.push(format!(
                    "{} distribution: p50={} p95={} max={} (skew={}, skew_flag={}).",
                    base, s.p50, s.p95, s.max, s.skew, s.skew_flag
                ));
            }

            if let Some(rows) = summary.series("n") {
                let n = rows.get(period).copied();
                let median = upper_median(rows.values().copied());
                if let (Some(n), Some(median)) = (n, median) {
                    if median > 0.0 && n <= ROW_COUNT_ELEVATION * median {
                        metadata.negative_evidence.push(format!(
                            "Row count for {} is not unusually high (n={} vs median {}), \
                             reducing support for a broad-based volume shift.",
                            period, n as i64, median as i64
                        ));
                    }
                }
            }

            let confidence = self.cutoffs.confidence(skew_flag, leverage);
            let mut metrics: Vec<String> = members.iter().map(|i| outliers[*i].metric.clone()).collect();
            metrics.sort();
            metrics.dedup();
            let mut evidence_keys: Vec<String> = members
                .iter()
                .flat_map(|i| outliers[*i].anomaly.evidence_keys().iter().cloned())
                .collect();
            evidence_keys.sort();
            evidence_keys.dedup();
            let severity = members
                .iter()
                .map(|i| outliers[*i].anomaly.severity())
                .max()
                .unwrap_or(AnomalySeverity::Info);

            let shape = if skew_flag { " (highly skewed)" } else { "" };
            findings.push(
                Finding::info(
                    format!("Mechanism-level consolidation for {} in {}", base, period),
                    format!(
                        "Multiple time-level anomalies for {} in {} ({}) likely reflect a shared mechanism. \
                         Given the distribution shape{}, this pattern is often driven by a small number of \
                         extreme records rather than a broad shift. Confidence: {}.",
                        base,
                        period,
                        metrics.join(", "),
                        shape,
                        confidence
                    ),
                    evidence_keys.clone(),
                )
                .with_severity(severity),
            );
            metadata.mechanisms.push(Mechanism {
                base: base.to_string(),
                period: period.to_string(),
                metrics,
                leverage_ratio: leverage,
                confidence: confidence.to_string(),
                evidence_keys,
            });
            replaced.extend(members);
        }

        (findings, replaced)
    }
}

impl Interpreter for GenericInterpreter {
    fn policy(&self) -> &str {
        GENERIC_POLICY_NAME
    }

    fn interpret(&self, rows: &[MetricRow], log: &AnalysisLog) -> InterpretResult<Interpretation> {
        let policy = log.policy.name.as_str();
        let thresholds = ThresholdLookup::new(policy, &log.policy.severity_thresholds, log.policy.emits_anomalies)?;
        let threshold = thresholds.get_or("median_ratio", DEFAULT_MEDIAN_RATIO);

        let mut findings = Vec::new();
        if let Some(row) = rows.iter().find(|r| r.section == "overall" && r.key == "row_count") {
            findings.push(Finding::info(
                "Row count",
                format!("Row count: {}", row.value),
                vec![row.evidence_key()],
            ));
        }

        let summary = TimeSummary::from_rows(rows);
        let mut outliers = Vec::new();
        for metric in WATCHED_METRICS {
            outliers.extend(self.ratio_outlier(policy, &summary, metric, threshold)?);
        }

        let mut metadata = InterpretationMetadata::from_anomalies(outliers.iter().map(|o| o.anomaly.clone()).collect());
        let (consolidated, replaced) = self.consolidate(&outliers, &summary, log, &mut metadata);

        findings.extend(
            outliers
                .into_iter()
                .enumerate()
                .filter(|(i, _)| !replaced.contains(i))
                .map(|(_, o)| o.finding),
        );
        findings.extend(consolidated);

        Ok(Interpretation::new(
            findings,
            log.warnings.clone(),
            metadata,
            Finding::info(
                "No findings",
                "No findings available under conservative, policy-bound checks.",
                Vec::new(),
            ),
        ))
    }
}
