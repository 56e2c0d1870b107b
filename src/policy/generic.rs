//! Generic tabular policy
//!
//! Domain-agnostic fallback. Classifies columns by well-known names and plans
//! a time summary, windowed time x category / time x region tables and a
//! negative-profit table, or a single categorical breakdown when the data has
//! no time dimension.

use serde::{Deserialize, Serialize};

use crate::planner::{Expr, GroupBySpec, Measure, OrderTerm, WindowedTopN};
use crate::roles::{ColumnIndex, RoleHints};

use super::descriptor::{thresholds, Capabilities, PolicyDescriptor};
use super::traits::{ColumnRoles, GroupingPlanPolicy, Policy, PolicyDefinition, TimeDimension};

/// Registered name of the generic fallback
pub const GENERIC_POLICY_NAME: &str = "generic_tabular";

const CATEGORICAL_NAMES: [&str; 7] = [
    "category",
    "region",
    "segment",
    "sub_category",
    "city",
    "state",
    "country",
];
const NUMERIC_NAMES: [&str; 9] = [
    "sales", "revenue", "amount", "cost", "profit", "units", "qty", "quantity", "discount",
];
const BOOLEAN_NAMES: [&str; 4] = ["returned", "is_returned", "flag", "is_active"];
const IDENTIFIER_NAMES: [&str; 4] = ["order_id", "customer_id", "user_id", "id"];

/// Averages are computed for at most this many numerics
const MAX_AVERAGED_NUMERICS: usize = 3;

/// Row limit of the negative-profit table
const NEGATIVE_PROFIT_LIMIT: u64 = 20;

/// Which time x dimension tables get windowed top-N
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopNScope {
    #[serde(rename = "cat_only")]
    CatOnly,
    #[serde(rename = "cat+region")]
    CatRegion,
}

impl TopNScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopNScope::CatOnly => "cat_only",
            TopNScope::CatRegion => "cat+region",
        }
    }
}

fn default_top_n_per_time() -> u64 {
    10
}

fn default_max_rows_per_groupby() -> u64 {
    250
}

fn default_true() -> bool {
    true
}

fn default_apply_topn_to() -> TopNScope {
    TopNScope::CatRegion
}

/// Generic policy knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericOptions {
    #[serde(default = "default_top_n_per_time")]
    pub top_n_per_time: u64,
    #[serde(default = "default_max_rows_per_groupby")]
    pub max_rows_per_groupby: u64,
    #[serde(default = "default_true")]
    pub prefer_time: bool,
    #[serde(default = "default_true")]
    pub allow_ratios: bool,
    #[serde(default = "default_apply_topn_to")]
    pub apply_topn_to: TopNScope,
}

impl Default for GenericOptions {
    fn default() -> Self {
        Self {
            top_n_per_time: default_top_n_per_time(),
            max_rows_per_groupby: default_max_rows_per_groupby(),
            prefer_time: true,
            allow_ratios: true,
            apply_topn_to: default_apply_topn_to(),
        }
    }
}

/// Registry entry for the generic policy
#[derive(Debug, Clone, Default)]
pub struct GenericDefinition {
    options: GenericOptions,
}

impl GenericDefinition {
    pub fn new(options: GenericOptions) -> Self {
        Self { options }
    }
}

impl PolicyDefinition for GenericDefinition {
    fn name(&self) -> &str {
        GENERIC_POLICY_NAME
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::new(&[], &[], &["groupby", "top_n"])
    }

    fn describe(&self) -> PolicyDescriptor {
        let caps = self.capabilities();
        PolicyDescriptor {
            name: GENERIC_POLICY_NAME.to_string(),
            version: self.version().to_string(),
            description: "Domain-agnostic fallback: heuristic column roles, time and categorical summaries."
                .to_string(),
            required_roles: caps.requires,
            optional_roles: caps.optional,
            supports: caps.supports,
            expected_metrics: vec![
                "overall.row_count".to_string(),
                "grouped aggregates (categorical/time summaries)".to_string(),
            ],
            coverage_behavior:
                "Heuristic column-role inference; executes available groupbys only.".to_string(),
            anomalies_emitted: vec![
                "<metric>:<period>:high_ratio when a time-summary value is at least the median_ratio warning multiple of the median".to_string(),
            ],
            severity_thresholds: thresholds(&[("median_ratio", 3.0, 10.0)]),
            emits_anomalies: false,
            emits_anomalies_normalized: false,
        }
    }

    fn instantiate(&self, _hints: &RoleHints) -> Policy {
        Policy::GroupingPlan(Box::new(GenericTabularPolicy::new(self.options.clone())))
    }
}

/// Single-run generic policy
#[derive(Debug, Clone)]
pub struct GenericTabularPolicy {
    options: GenericOptions,
}

impl GenericTabularPolicy {
    pub fn new(options: GenericOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &GenericOptions {
        &self.options
    }

    fn base_measures(&self, roles: &ColumnRoles) -> Vec<Measure> {
        let mut out = vec![Measure::count()];

        for c in &roles.numeric {
            out.push(Measure::new(
                format!("sum_{}", c.to_lowercase()),
                real_sum(c),
            ));
        }
        for c in roles.numeric.iter().take(MAX_AVERAGED_NUMERICS) {
            out.push(Measure::new(
                format!("avg_{}", c.to_lowercase()),
                real_avg(c),
            ));
        }
        for b in &roles.boolean {
            out.push(Measure::new(
                format!("rate_{}", b.to_lowercase()),
                real_avg(b),
            ));
        }

        if let Some(margin) = self.profit_margin(roles) {
            out.push(margin);
        }

        out
    }

    fn negative_profit_measures(&self, roles: &ColumnRoles) -> Vec<Measure> {
        let mut out = vec![Measure::count()];
        if let Some(profit) = find_exact(&roles.numeric, "profit") {
            out.push(Measure::new("sum_profit", real_sum(profit)));
        }
        if let Some(sales) = sales_operand(roles) {
            out.push(Measure::new("sum_sales", real_sum(sales)));
        }
        if let Some(margin) = self.profit_margin(roles) {
            out.push(margin);
        }
        out
    }

    fn profit_margin(&self, roles: &ColumnRoles) -> Option<Measure> {
        if !self.options.allow_ratios {
            return None;
        }
        let profit = find_exact(&roles.numeric, "profit")?;
        let sales = sales_operand(roles)?;
        Some(Measure::new(
            "profit_margin",
            Expr::ratio(
                real_sum(profit),
                real_sum(sales),
            ),
        ))
    }

    /// Default rank measure for top-N tables:
    /// `sum_sales` / `sum_revenue` / `sum_amount`, else `sum_profit`, else `n`
    pub fn rank_measure(measures: &[Measure]) -> String {
        let names: Vec<&str> = measures.iter().map(|m| m.name.as_str()).collect();
        ["sum_sales", "sum_revenue", "sum_amount", "sum_profit", "n"]
            .iter()
            .find(|want| names.contains(want))
            .map(|s| s.to_string())
            .or_else(|| names.first().map(|s| s.to_string()))
            .unwrap_or_else(|| "n".to_string())
    }
}

/// `SUM(CAST(col AS REAL))`: renders the same whatever the column's storage class
fn real_sum(column: &str) -> Expr {
    Expr::sum(Expr::cast_real(Expr::column(column)))
}

/// `AVG(CAST(col AS REAL))`
fn real_avg(column: &str) -> Expr {
    Expr::avg(Expr::cast_real(Expr::column(column)))
}

fn find_exact<'a>(columns: &'a [String], wanted: &str) -> Option<&'a str> {
    columns
        .iter()
        .find(|c| c.eq_ignore_ascii_case(wanted))
        .map(String::as_str)
}

fn sales_operand(roles: &ColumnRoles) -> Option<&str> {
    find_exact(&roles.numeric, "sales")
        .or_else(|| find_exact(&roles.numeric, "revenue"))
        .or_else(|| find_exact(&roles.numeric, "amount"))
}

fn present(index: &ColumnIndex, names: &[&str]) -> Vec<String> {
    names
        .iter()
        .filter_map(|n| index.get(n))
        .map(str::to_string)
        .collect()
}

impl GroupingPlanPolicy for GenericTabularPolicy {
    fn name(&self) -> &str {
        GENERIC_POLICY_NAME
    }

    fn infer_roles(&self, columns: &[String]) -> (ColumnRoles, Vec<String>) {
        let index = ColumnIndex::new(columns);
        let mut warnings = Vec::new();

        let time_expr = match index.get("year") {
            Some(year) => Some(Expr::column(year)),
            None => index
                .find_first(["order_date", "date"])
                .map(|d| Expr::year_bucket(Expr::column(d))),
        };
        let time = time_expr.map(|expr| TimeDimension {
            label: "year".to_string(),
            expr,
        });

        let roles = ColumnRoles {
            time,
            categorical: present(&index, &CATEGORICAL_NAMES),
            numeric: present(&index, &NUMERIC_NAMES),
            boolean: present(&index, &BOOLEAN_NAMES),
            identifier: present(&index, &IDENTIFIER_NAMES),
        };

        if roles.time.is_none() {
            warnings.push(
                "No time-like column detected by GenericTabularPolicy (year/order_date/date)."
                    .to_string(),
            );
        }
        if roles.categorical.is_empty() {
            warnings.push("No known categorical columns found (name heuristics).".to_string());
        }
        if roles.numeric.is_empty() {
            warnings.push("No known numeric columns found (name heuristics).".to_string());
        }

        (roles, warnings)
    }

    fn plan_groupbys(&self, roles: &ColumnRoles) -> (Vec<GroupBySpec>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut groupbys = Vec::new();
        let measures = self.base_measures(roles);
        let rank = Self::rank_measure(&measures);
        let max_rows = self.options.max_rows_per_groupby;

        let time = match (&roles.time, self.options.prefer_time) {
            (Some(t), true) => t,
            _ => {
                let Some(first) = roles.categorical.first() else {
                    warnings.push(
                        "No time dimension and no categoricals; only row_count should be produced."
                            .to_string(),
                    );
                    return (groupbys, warnings);
                };
                groupbys.push(
                    GroupBySpec::new("categorical")
                        .group("group", Expr::column(first))
                        .measures(measures)
                        .order_by(OrderTerm::desc(Expr::alias(rank)))
                        .limit(max_rows),
                );
                return (groupbys, warnings);
            }
        };

        let windowed = || WindowedTopN {
            top_n: self.options.top_n_per_time,
            time_bucket: time.expr.clone(),
            rank_measure: rank.clone(),
        };

        groupbys.push(
            GroupBySpec::new("time")
                .group(time.label.clone(), time.expr.clone())
                .measures(measures.clone())
                .order_by(OrderTerm::asc(time.expr.clone()))
                .limit(max_rows),
        );

        let category = find_exact(&roles.categorical, "category");
        if let Some(cat) = category {
            groupbys.push(
                GroupBySpec::new("time_x_category")
                    .group(time.label.clone(), time.expr.clone())
                    .group("category", Expr::column(cat))
                    .measures(measures.clone())
                    .limit(max_rows)
                    .windowed(windowed()),
            );
        }

        let region = find_exact(&roles.categorical, "region");
        if let Some(reg) = region {
            let spec = GroupBySpec::new("time_x_region")
                .group(time.label.clone(), time.expr.clone())
                .group("region", Expr::column(reg))
                .measures(measures.clone())
                .limit(max_rows);
            groupbys.push(match self.options.apply_topn_to {
                TopNScope::CatRegion => spec.windowed(windowed()),
                TopNScope::CatOnly => spec,
            });
        }

        if find_exact(&roles.numeric, "profit").is_some() {
            let group_col = region
                .or(category)
                .or_else(|| roles.categorical.first().map(String::as_str));
            if let Some(col) = group_col {
                groupbys.push(
                    GroupBySpec::new("anomaly_negative_profit")
                        .group("group", Expr::column(col))
                        .measures(self.negative_profit_measures(roles))
                        .order_by(OrderTerm::asc(Expr::alias("sum_profit")))
                        .limit(NEGATIVE_PROFIT_LIMIT),
                );
            }
        }

        (groupbys, warnings)
    }
}
