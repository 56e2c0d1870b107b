//! Interpreter for `sales_v1`
//!
//! Anomaly ids are the threshold keys of the policy descriptor. Every rule
//! evaluated needs its threshold; a missing one is a configuration error.

use crate::anomaly::{make_normalized_anomaly, AnomalyDraft, AnomalySeverity, Direction, NormalizedAnomaly};
use crate::engine::{AnalysisLog, MetricRow};
use crate::policy::{Threshold, SALES_POLICY_NAME};
use crate::roles::Role;

use super::errors::InterpretResult;
use super::interpretation::{Finding, Interpretation, InterpretationMetadata};
use super::rules::{classify_high, classify_low, percent, Confidence, Coverage, CoverageGate, ThresholdLookup};
use super::table::{row_evidence, MetricTable};
use super::Interpreter;

const TOTAL_SALES: &str = "sales.total_sales";
const TOTAL_PROFIT: &str = "sales.total_profit";
const TOTAL_UNITS: &str = "sales.total_units";
const AVG_UNIT_REVENUE: &str = "sales.avg_unit_revenue";
const TOP_BY_SALES: &str = "sales.top_products_by_sales_top10";
const TOP_BY_UNITS: &str = "sales.top_products_by_units_top10";
const SALES_BY_MONTH: &str = "sales.sales_by_month";
const SALES_BY_REGION: &str = "sales.sales_by_region";

/// Interprets `sales_v1` metric rows
#[derive(Debug, Clone, Default)]
pub struct SalesInterpreter {
    gate: CoverageGate,
}

impl SalesInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sections the resolved roles should have produced
    fn expected_sections(log: &AnalysisLog) -> Vec<String> {
        let roles = &log.policy.resolved_roles;
        let mut expected = vec![TOTAL_SALES, TOP_BY_SALES];
        if roles.contains(Role::Profit) {
            expected.push(TOTAL_PROFIT);
        }
        if roles.contains(Role::Units) {
            expected.extend([TOTAL_UNITS, AVG_UNIT_REVENUE, TOP_BY_UNITS]);
        }
        if roles.contains(Role::Date) {
            expected.push(SALES_BY_MONTH);
        }
        if roles.contains(Role::Region) {
            expected.push(SALES_BY_REGION);
        }
        expected.into_iter().map(str::to_string).collect()
    }
}

fn nonzero(v: Option<f64>) -> Option<f64> {
    v.filter(|v| *v != 0.0)
}

impl Interpreter for SalesInterpreter {
    fn policy(&self) -> &str {
        SALES_POLICY_NAME
    }

    fn interpret(&self, rows: &[MetricRow], log: &AnalysisLog) -> InterpretResult<Interpretation> {
        let policy = log.policy.name.as_str();
        let thresholds = ThresholdLookup::new(policy, &log.policy.severity_thresholds, log.policy.emits_anomalies)?;
        let table = MetricTable::from_rows(rows);

        let total_sales = table.scalar(TOTAL_SALES, "total_sales");
        let total_profit = table.scalar(TOTAL_PROFIT, "total_profit");
        let total_units = table.scalar(TOTAL_UNITS, "total_units");
        let avg_unit_revenue = table.scalar(AVG_UNIT_REVENUE, "avg_unit_revenue");

        let sales_key = row_evidence(TOTAL_SALES, 0, "total_sales");
        let profit_key = row_evidence(TOTAL_PROFIT, 0, "total_profit");
        let units_key = row_evidence(TOTAL_UNITS, 0, "total_units");

        let mut findings = Vec::new();
        if let Some(sales) = total_sales {
            findings.push(Finding::info(
                "Total sales",
                format!("Total sales: {:.2}", sales),
                vec![sales_key.clone()],
            ));
        }
        if let Some(profit) = total_profit {
            findings.push(Finding::info(
                "Total profit",
                format!("Total profit: {:.2}", profit),
                vec![profit_key.clone()],
            ));
        }
        let margin = match (total_profit, nonzero(total_sales)) {
            (Some(profit), Some(sales)) => Some(profit / sales),
            _ => None,
        };
        if let Some(margin) = margin {
            findings.push(Finding::info(
                "Profit margin",
                format!("Profit margin: {}", percent(margin)),
                vec![profit_key.clone(), sales_key.clone()],
            ));
        }
        if let Some(units) = total_units {
            findings.push(Finding::info(
                "Total units",
                format!("Total units: {}", units as i64),
                vec![units_key.clone()],
            ));
        }

        let top_product = table.value(TOP_BY_SALES, 0, "product");
        let top_product_share = table
            .number(TOP_BY_SALES, 0, "sales")
            .zip(nonzero(total_sales))
            .map(|(s, total)| s / total);
        if let Some(product) = top_product {
            findings.push(match top_product_share {
                Some(share) => Finding::info(
                    "Top product concentration",
                    format!("Top product {} contributes {} of sales.", product, percent(share)),
                    vec![row_evidence(TOP_BY_SALES, 0, "sales"), sales_key.clone()],
                ),
                None => Finding::info(
                    "Top product",
                    format!("Top product: {}.", product),
                    vec![row_evidence(TOP_BY_SALES, 0, "product")],
                ),
            });
        }

        if let Some(region) = table.value(SALES_BY_REGION, 0, "region") {
            let share = table
                .number(SALES_BY_REGION, 0, "sales")
                .zip(nonzero(total_sales))
                .map(|(s, total)| s / total);
            findings.push(match share {
                Some(share) => Finding::info(
                    "Top region concentration",
                    format!("Top region {} contributes {} of sales.", region, percent(share)),
                    vec![row_evidence(SALES_BY_REGION, 0, "sales"), sales_key.clone()],
                ),
                None => Finding::info(
                    "Top region",
                    format!("Top region: {}.", region),
                    vec![row_evidence(SALES_BY_REGION, 0, "region")],
                ),
            });
        }

        let months = table.section(SALES_BY_MONTH).len();
        let trend = if months >= 2 {
            let first = nonzero(table.number(SALES_BY_MONTH, 0, "sales"));
            let last = table.number(SALES_BY_MONTH, months - 1, "sales");
            first.zip(last).map(|(first, last)| (last - first) / first)
        } else {
            None
        };
        let trend_keys = vec![
            row_evidence(SALES_BY_MONTH, 0, "sales"),
            row_evidence(SALES_BY_MONTH, months.saturating_sub(1), "sales"),
        ];
        if let Some(change) = trend {
            findings.push(Finding::info(
                "Sales trend",
                format!("Sales change from first to last month: {}.", percent(change)),
                trend_keys.clone(),
            ));
        }

        let coverage = Coverage::measure(&Self::expected_sections(log), &table);
        let confidence = Confidence::new(&coverage, &table, SALES_BY_MONTH);

        let mut anomalies = Vec::new();
        if log.policy.emits_anomalies && self.gate.admits(&coverage) {
            let rules = SalesRules { policy, thresholds };

            if let (Some(product), Some(share)) = (top_product, top_product_share) {
                anomalies.extend(rules.evaluate(Rule {
                    id: "revenue_concentration_share",
                    metric: TOP_BY_SALES,
                    direction: Direction::High,
                    value: share,
                    unit: "share",
                    evidence: vec![row_evidence(TOP_BY_SALES, 0, "sales"), sales_key.clone()],
                    summary: format!("Top product {} contributes {} of sales.", product, percent(share)),
                })?);
            }

            if let Some(margin) = margin {
                anomalies.extend(rules.evaluate(Rule {
                    id: "profit_margin",
                    metric: TOTAL_PROFIT,
                    direction: Direction::Low,
                    value: margin,
                    unit: "ratio",
                    evidence: vec![profit_key.clone(), sales_key.clone()],
                    summary: format!("Profit margin is {}.", percent(margin)),
                })?);
            }

            if let Some(change) = trend {
                anomalies.extend(rules.evaluate(Rule {
                    id: "sales_trend_change",
                    metric: SALES_BY_MONTH,
                    direction: Direction::Low,
                    value: change,
                    unit: "pct_change",
                    evidence: trend_keys.clone(),
                    summary: format!("Sales changed {} from first to last month.", percent(change)),
                })?);
            }

            if let Some(aur) = avg_unit_revenue {
                let evidence = vec![
                    row_evidence(AVG_UNIT_REVENUE, 0, "avg_unit_revenue"),
                    sales_key.clone(),
                    units_key.clone(),
                ];
                for (id, direction) in [("unit_revenue_low", Direction::Low), ("unit_revenue_high", Direction::High)] {
                    anomalies.extend(rules.evaluate(Rule {
                        id,
                        metric: AVG_UNIT_REVENUE,
                        direction,
                        value: aur,
                        unit: "currency",
                        evidence: evidence.clone(),
                        summary: format!("Average unit revenue is {:.2}.", aur),
                    })?);
                }
            }

            let top_units = table.number(TOP_BY_UNITS, 0, "units");
            let units_product = table.value(TOP_BY_UNITS, 0, "product");
            if let (Some(top), Some(total), Some(product)) = (top_units, nonzero(total_units), units_product) {
                let share = top / total;
                anomalies.extend(rules.evaluate(Rule {
                    id: "unit_concentration_share",
                    metric: TOP_BY_UNITS,
                    direction: Direction::High,
                    value: share,
                    unit: "share",
                    evidence: vec![row_evidence(TOP_BY_UNITS, 0, "units"), units_key.clone()],
                    summary: format!("Top product {} holds {} of units.", product, percent(share)),
                })?);
            }
        }

        let mut metadata = InterpretationMetadata::from_anomalies(anomalies);
        metadata.coverage = Some(coverage);
        metadata.confidence = Some(confidence);

        Ok(Interpretation::new(
            findings,
            log.warnings.clone(),
            metadata,
            Finding::info("No specific findings", "No specific findings.", Vec::new()),
        ))
    }
}

/// One evaluated signal
struct Rule {
    id: &'static str,
    metric: &'static str,
    direction: Direction,
    value: f64,
    unit: &'static str,
    evidence: Vec<String>,
    summary: String,
}

struct SalesRules<'a> {
    policy: &'a str,
    thresholds: ThresholdLookup<'a>,
}

impl SalesRules<'_> {
    fn evaluate(&self, rule: Rule) -> InterpretResult<Option<NormalizedAnomaly>> {
        let threshold: Threshold = self.thresholds.get(rule.id)?;
        let severity = match rule.direction {
            Direction::High => classify_high(rule.value, threshold),
            Direction::Low => classify_low(rule.value, threshold),
        };
        if severity == AnomalySeverity::Info {
            return Ok(None);
        }
        let anomaly = make_normalized_anomaly(
            AnomalyDraft::new(rule.id, self.policy, rule.metric)
                .severity(severity)
                .direction(rule.direction)
                .value(rule.value)
                .threshold(threshold)
                .unit(rule.unit)
                .evidence(rule.evidence)
                .summary(rule.summary),
        )?;
        Ok(Some(anomaly))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PolicyBlock;
    use crate::interpret::InterpretError;
    use crate::policy::{PolicyDefinition, SalesDefinition, SelectionTrace};

    fn log(roles: &[(Role, &str)]) -> AnalysisLog {
        let mut block = PolicyBlock::from_descriptor(&SalesDefinition.describe(), "query_list");
        block.resolved_roles.insert(Role::Product, "product");
        block.resolved_roles.insert(Role::Amount, "sales");
        for (role, col) in roles {
            block.resolved_roles.insert(*role, *col);
        }
        AnalysisLog::new(block, SelectionTrace::explicit("sales_v1"))
    }

    fn rows(total: &str, profit: &str, top: &str) -> Vec<MetricRow> {
        vec![
            MetricRow::new(TOTAL_SALES, "row0:total_sales", total),
            MetricRow::new(TOTAL_PROFIT, "row0:total_profit", profit),
            MetricRow::new(TOP_BY_SALES, "row0:product", "Chairs"),
            MetricRow::new(TOP_BY_SALES, "row0:sales", top),
        ]
    }

    fn ids(out: &Interpretation) -> Vec<&str> {
        out.metadata.anomalies_normalized.iter().map(|a| a.id()).collect()
    }

    #[test]
    fn test_low_margin_and_concentration() {
        let out = SalesInterpreter::new()
            .interpret(&rows("1000.0", "40.0", "600.0"), &log(&[(Role::Profit, "profit")]))
            .unwrap();
        assert_eq!(ids(&out), vec!["revenue_concentration_share", "profit_margin"]);
        assert!(out.metadata.anomalies_normalized.iter().all(|a| a.severity() == AnomalySeverity::Critical));
        let margin = &out.metadata.anomalies_normalized[1];
        assert_eq!(margin.direction(), Direction::Low);
        assert_eq!(margin.metric(), "sales.total_profit");
    }

    #[test]
    fn test_healthy_sales_emit_nothing() {
        let out = SalesInterpreter::new()
            .interpret(&rows("1000.0", "300.0", "200.0"), &log(&[(Role::Profit, "profit")]))
            .unwrap();
        assert!(out.metadata.anomalies_normalized.is_empty());
        let coverage = out.metadata.coverage.as_ref().unwrap();
        assert_eq!((coverage.expected, coverage.present), (3, 3));
        assert_eq!(coverage.ratio, 1.0);
        assert_eq!(out.metadata.confidence.as_ref().unwrap().trend, "none");
    }

    #[test]
    fn test_role_aware_coverage_blocks_anomalies() {
        let roles = [
            (Role::Profit, "profit"),
            (Role::Units, "units"),
            (Role::Date, "order_date"),
            (Role::Region, "region"),
        ];
        let out = SalesInterpreter::new()
            .interpret(&rows("1000.0", "10.0", "900.0"), &log(&roles))
            .unwrap();
        let coverage = out.metadata.coverage.as_ref().unwrap();
        assert_eq!(coverage.expected, 8);
        assert_eq!(coverage.present, 3);
        assert!(out.metadata.anomalies_normalized.is_empty());
    }

    #[test]
    fn test_sales_trend_drop() {
        let mut r = rows("1000.0", "300.0", "200.0");
        r.extend([
            MetricRow::new(SALES_BY_MONTH, "row0:month", "2024-01"),
            MetricRow::new(SALES_BY_MONTH, "row0:sales", "600.0"),
            MetricRow::new(SALES_BY_MONTH, "row1:month", "2024-02"),
            MetricRow::new(SALES_BY_MONTH, "row1:sales", "400.0"),
        ]);
        let out = SalesInterpreter::new()
            .interpret(&r, &log(&[(Role::Profit, "profit"), (Role::Date, "order_date")]))
            .unwrap();
        let trend = &out.metadata.anomalies_normalized[0];
        assert_eq!(trend.id(), "sales_trend_change");
        assert_eq!(trend.severity(), AnomalySeverity::Critical);
        assert_eq!(trend.evidence_keys()[1], "sales.sales_by_month.row1:sales");
    }

    #[test]
    fn test_missing_threshold_for_fired_rule() {
        let mut log = log(&[(Role::Profit, "profit")]);
        log.policy.severity_thresholds.remove("profit_margin");
        let err = SalesInterpreter::new()
            .interpret(&rows("1000.0", "300.0", "200.0"), &log)
            .unwrap_err();
        assert!(matches!(
            err,
            InterpretError::MissingThreshold { ref anomaly_id, .. } if anomaly_id == "profit_margin"
        ));
    }
}
