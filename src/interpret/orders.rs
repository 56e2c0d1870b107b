//! Interpreter for `orders_v1`
//!
//! Findings: totals, top customer and product share, first-to-last month
//! revenue change. Anomalies (coverage gate plus a minimum order count):
//!
//! | anomaly id                                  | signal                       | direction |
//! |---------------------------------------------|------------------------------|-----------|
//! | `orders.customer_revenue_concentration_top1`| top customer revenue share   | high      |
//! | `orders.aov_outlier`                        | average order value          | high/low  |
//! | `orders.order_count_drop_recent`            | last-month order count drop  | high      |

use crate::anomaly::{make_normalized_anomaly, AnomalyDraft, AnomalySeverity, Direction, NormalizedAnomaly};
use crate::engine::{AnalysisLog, MetricRow};
use crate::policy::ORDERS_POLICY_NAME;
use crate::roles::Role;

use super::errors::InterpretResult;
use super::interpretation::{Finding, Interpretation, InterpretationMetadata};
use super::rules::{classify_high, classify_low, percent, Confidence, Coverage, CoverageGate, ThresholdLookup};
use super::table::{row_evidence, MetricTable};
use super::Interpreter;

/// Anomalies need at least this many orders
pub const MIN_ORDERS_FOR_ANOMALIES: f64 = 5.0;

const TOTAL_ORDERS: &str = "orders.total_orders";
const TOTAL_REVENUE: &str = "orders.total_revenue";
const AVG_ORDER_VALUE: &str = "orders.avg_order_value";
const TOP_CUSTOMERS: &str = "orders.top_customers_by_revenue_top10";
const TOP_PRODUCTS: &str = "orders.top_products_by_revenue_top10";
const REVENUE_BY_MONTH: &str = "orders.revenue_by_month";
const ORDERS_BY_MONTH: &str = "orders.orders_by_month";

/// Interprets `orders_v1` metric rows
#[derive(Debug, Clone, Default)]
pub struct OrdersInterpreter {
    gate: CoverageGate,
}

impl OrdersInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    fn expected_sections(log: &AnalysisLog) -> Vec<String> {
        let mut expected = vec![TOTAL_ORDERS, TOTAL_REVENUE, AVG_ORDER_VALUE, TOP_CUSTOMERS, TOP_PRODUCTS];
        if log.policy.resolved_roles.contains(Role::Date) {
            expected.extend([REVENUE_BY_MONTH, ORDERS_BY_MONTH]);
        }
        expected.into_iter().map(str::to_string).collect()
    }
}

/// Scalars read once per run
struct Totals {
    orders: Option<f64>,
    revenue: Option<f64>,
    aov: Option<f64>,
}

impl Totals {
    fn read(table: &MetricTable) -> Self {
        Self {
            orders: table.scalar(TOTAL_ORDERS, "total_orders"),
            revenue: table.scalar(TOTAL_REVENUE, "total_revenue"),
            aov: table.scalar(AVG_ORDER_VALUE, "avg_order_value"),
        }
    }

    /// `part / revenue`, when revenue is non-zero
    fn revenue_share(&self, part: f64) -> Option<f64> {
        self.revenue.filter(|r| *r != 0.0).map(|r| part / r)
    }
}

impl Interpreter for OrdersInterpreter {
    fn policy(&self) -> &str {
        ORDERS_POLICY_NAME
    }

    fn interpret(&self, rows: &[MetricRow], log: &AnalysisLog) -> InterpretResult<Interpretation> {
        let policy = log.policy.name.as_str();
        let thresholds = ThresholdLookup::new(policy, &log.policy.severity_thresholds, log.policy.emits_anomalies)?;
        let table = MetricTable::from_rows(rows);
        let totals = Totals::read(&table);

        let mut findings = Vec::new();
        if let Some(n) = totals.orders {
            findings.push(Finding::info(
                "Total orders",
                format!("Total orders: {}", n as i64),
                vec![row_evidence(TOTAL_ORDERS, 0, "total_orders")],
            ));
        }
        if let Some(revenue) = totals.revenue {
            findings.push(Finding::info(
                "Total revenue",
                format!("Total revenue: {:.2}", revenue),
                vec![row_evidence(TOTAL_REVENUE, 0, "total_revenue")],
            ));
        }
        if let Some(aov) = totals.aov {
            findings.push(Finding::info(
                "Average order value",
                format!("Average order value: {:.2}", aov),
                vec![row_evidence(AVG_ORDER_VALUE, 0, "avg_order_value")],
            ));
        }

        let top_customer = table.value(TOP_CUSTOMERS, 0, "customer");
        let top_customer_share = table
            .number(TOP_CUSTOMERS, 0, "revenue")
            .and_then(|rev| totals.revenue_share(rev));
        findings.extend(top_entity_finding("customer", TOP_CUSTOMERS, top_customer, top_customer_share));

        let top_product = table.value(TOP_PRODUCTS, 0, "product");
        let top_product_share = table
            .number(TOP_PRODUCTS, 0, "revenue")
            .and_then(|rev| totals.revenue_share(rev));
        findings.extend(top_entity_finding("product", TOP_PRODUCTS, top_product, top_product_share));

        let months = table.section(REVENUE_BY_MONTH).len();
        if months >= 2 {
            let first = table.number(REVENUE_BY_MONTH, 0, "revenue");
            let last = table.number(REVENUE_BY_MONTH, months - 1, "revenue");
            if let (Some(first), Some(last)) = (first, last) {
                if first != 0.0 {
                    findings.push(Finding::info(
                        "Revenue trend",
                        format!(
                            "Revenue change from first to last month: {}.",
                            percent((last - first) / first)
                        ),
                        vec![
                            row_evidence(REVENUE_BY_MONTH, 0, "revenue"),
                            row_evidence(REVENUE_BY_MONTH, months - 1, "revenue"),
                        ],
                    ));
                }
            }
        }

        let coverage = Coverage::measure(&Self::expected_sections(log), &table);
        let confidence = Confidence::new(&coverage, &table, REVENUE_BY_MONTH);
        let enough_orders = totals.orders.map_or(false, |n| n >= MIN_ORDERS_FOR_ANOMALIES);

        let mut anomalies = Vec::new();
        if log.policy.emits_anomalies && self.gate.admits(&coverage) && enough_orders {
            let rules = OrdersRules {
                policy,
                thresholds,
                table: &table,
                totals: &totals,
            };
            if let (Some(customer), Some(share)) = (top_customer, top_customer_share) {
                anomalies.extend(rules.customer_concentration(customer, share)?);
            }
            anomalies.extend(rules.aov_outlier()?);
            anomalies.extend(rules.order_count_drop()?);
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

fn top_entity_finding(
    entity: &str,
    section: &str,
    name: Option<&str>,
    share: Option<f64>,
) -> Option<Finding> {
    let name = name?;
    Some(match share {
        Some(share) => Finding::info(
            format!("Top {} concentration", entity),
            format!("Top {} {} accounts for {} of revenue.", entity, name, percent(share)),
            vec![
                row_evidence(section, 0, "revenue"),
                row_evidence(TOTAL_REVENUE, 0, "total_revenue"),
            ],
        ),
        None => Finding::info(
            format!("Top {}", entity),
            format!("Top {}: {}.", entity, name),
            vec![row_evidence(section, 0, entity)],
        ),
    })
}

struct OrdersRules<'a> {
    policy: &'a str,
    thresholds: ThresholdLookup<'a>,
    table: &'a MetricTable,
    totals: &'a Totals,
}

impl OrdersRules<'_> {
    fn customer_concentration(&self, customer: &str, share: f64) -> InterpretResult<Option<NormalizedAnomaly>> {
        let threshold = self.thresholds.get("customer_revenue_share_top1")?;
        let severity = classify_high(share, threshold);
        if severity == AnomalySeverity::Info {
            return Ok(None);
        }
        let anomaly = make_normalized_anomaly(
            AnomalyDraft::new(
                "orders.customer_revenue_concentration_top1",
                self.policy,
                "top_customer_revenue_share",
            )
            .severity(severity)
            .direction(Direction::High)
            .value(share)
            .threshold(threshold)
            .unit("share")
            .evidence(vec![
                row_evidence(TOP_CUSTOMERS, 0, "revenue"),
                row_evidence(TOTAL_REVENUE, 0, "total_revenue"),
            ])
            .summary(format!(
                "Top customer {} accounts for {} of revenue.",
                customer,
                percent(share)
            )),
        )?;
        Ok(Some(anomaly))
    }

    fn aov_outlier(&self) -> InterpretResult<Option<NormalizedAnomaly>> {
        let Some(aov) = self.totals.aov else {
            return Ok(None);
        };
        let high = self.thresholds.get("aov_high")?;
        let low = self.thresholds.get("aov_low")?;
        let high_severity = classify_high(aov, high);
        let low_severity = classify_low(aov, low);

        let (severity, direction, threshold) = if high_severity >= low_severity {
            (high_severity, Direction::High, high)
        } else {
            (low_severity, Direction::Low, low)
        };
        if severity == AnomalySeverity::Info {
            return Ok(None);
        }

        let anomaly = make_normalized_anomaly(
            AnomalyDraft::new("orders.aov_outlier", self.policy, "avg_order_value")
                .severity(severity)
                .direction(direction)
                .value(aov)
                .threshold(threshold)
                .unit("currency")
                .evidence(vec![
                    row_evidence(AVG_ORDER_VALUE, 0, "avg_order_value"),
                    row_evidence(TOTAL_ORDERS, 0, "total_orders"),
                    row_evidence(TOTAL_REVENUE, 0, "total_revenue"),
                ])
                .summary(format!("AOV is {:.2} ({} outlier).", aov, direction)),
        )?;
        Ok(Some(anomaly))
    }

    fn order_count_drop(&self) -> InterpretResult<Option<NormalizedAnomaly>> {
        let n = self.table.section(ORDERS_BY_MONTH).len();
        if n < 2 {
            return Ok(None);
        }
        let (prev_i, recent_i) = (n - 2, n - 1);
        let prev = self.table.number(ORDERS_BY_MONTH, prev_i, "orders");
        let recent = self.table.number(ORDERS_BY_MONTH, recent_i, "orders");
        let (Some(prev), Some(recent)) = (prev, recent) else {
            return Ok(None);
        };
        if prev <= 0.0 {
            return Ok(None);
        }

        let drop = (prev - recent) / prev;
        let threshold = self.thresholds.get("order_count_drop_recent")?;
        let severity = classify_high(drop, threshold);
        if severity == AnomalySeverity::Info {
            return Ok(None);
        }

        let prev_month = self.table.value(ORDERS_BY_MONTH, prev_i, "month").unwrap_or("?");
        let recent_month = self.table.value(ORDERS_BY_MONTH, recent_i, "month").unwrap_or("?");
        let anomaly = make_normalized_anomaly(
            AnomalyDraft::new("orders.order_count_drop_recent", self.policy, "orders_drop_pct")
                .severity(severity)
                .direction(Direction::High)
                .value(drop)
                .threshold(threshold)
                .unit("pct_change")
                .evidence(vec![
                    row_evidence(ORDERS_BY_MONTH, prev_i, "orders"),
                    row_evidence(ORDERS_BY_MONTH, recent_i, "orders"),
                ])
                .summary(format!(
                    "Orders dropped {} from {} to {}.",
                    percent(drop),
                    prev_month,
                    recent_month
                )),
        )?;
        Ok(Some(anomaly))
    }
}
