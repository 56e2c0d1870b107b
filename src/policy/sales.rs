//! Sales policy (`sales_v1`)
//!
//! Domain policy for retail sales summaries (category/product with sales over
//! time and geography). Optional roles switch on their sections: profit
//! totals, unit totals and unit revenue, monthly series, region breakdown.

use crate::planner::{Expr, OrderTerm, SelectQuery, TopNPerPartition};
use crate::roles::{ResolvedRoles, Role, RoleHints, SynonymTable};
use crate::store::Store;

use super::descriptor::{thresholds, Capabilities, PolicyDescriptor};
use super::errors::PolicyResult;
use super::traits::{resolve_against_store, Policy, PolicyDefinition, QueryListPolicy, SectionQuery};

/// Registered name of the sales policy
pub const SALES_POLICY_NAME: &str = "sales_v1";

const TOP_N: u64 = 10;
const TOP_N_PER_MONTH: u64 = 5;

fn sales_capabilities() -> Capabilities {
    Capabilities::new(
        &[Role::Product, Role::Amount],
        &[Role::Date, Role::Region, Role::Units, Role::Profit],
        &["top_n", "time_buckets"],
    )
}

fn sales_synonyms() -> SynonymTable {
    SynonymTable::new()
        .with(
            Role::Product,
            &["sub_category", "subcategory", "category", "product", "item", "sku"],
        )
        .with(Role::Amount, &["sales", "revenue", "amount", "total"])
        .with(Role::Date, &["order_date", "date", "created_at", "timestamp"])
        .with(Role::Region, &["region", "province", "state", "market"])
        .with(Role::Units, &["units", "quantity", "qty"])
        .with(Role::Profit, &["profit", "margin"])
}

/// `SUM(CAST(col AS REAL))`
fn real_sum(column: &str) -> Expr {
    Expr::sum(Expr::cast_real(Expr::column(column)))
}

/// Registry entry for `sales_v1`
#[derive(Debug, Clone, Copy, Default)]
pub struct SalesDefinition;

impl PolicyDefinition for SalesDefinition {
    fn name(&self) -> &str {
        SALES_POLICY_NAME
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn capabilities(&self) -> Capabilities {
        sales_capabilities()
    }

    fn describe(&self) -> PolicyDescriptor {
        let caps = self.capabilities();
        PolicyDescriptor {
            name: SALES_POLICY_NAME.to_string(),
            version: self.version().to_string(),
            description:
                "Domain policy for retail sales summary datasets (category/product + sales over time/geo)."
                    .to_string(),
            required_roles: caps.requires,
            optional_roles: caps.optional,
            supports: caps.supports,
            expected_metrics: [
                "sales.total_sales",
                "sales.total_profit (if profit)",
                "sales.total_units (if units)",
                "sales.avg_unit_revenue (if units)",
                "sales.top_products_by_sales_top10",
                "sales.top_products_by_units_top10 (if units)",
                "sales.sales_by_month (if date)",
                "sales.top_products_by_sales_by_month_top5 (if date)",
                "sales.sales_by_region (if region)",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            coverage_behavior:
                "Requires product and amount; optional roles enrich time/region/unit/profit metrics."
                    .to_string(),
            anomalies_emitted: [
                "Revenue concentration share (>= 30% warning; >= 50% critical)",
                "Profit margin (<= 10% warning; <= 5% critical)",
                "Sales trend change (<= -10% warning; <= -25% critical)",
                "Avg unit revenue too low (<= 1.0 warning; <= 0.1 critical)",
                "Avg unit revenue too high (>= 10,000 warning; >= 50,000 critical)",
                "Unit concentration share (>= 70% warning; >= 90% critical)",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            severity_thresholds: thresholds(&[
                ("revenue_concentration_share", 0.30, 0.50),
                ("unit_concentration_share", 0.70, 0.90),
                ("unit_revenue_high", 10_000.0, 50_000.0),
                ("profit_margin", 0.10, 0.05),
                ("sales_trend_change", -0.10, -0.25),
                ("unit_revenue_low", 1.0, 0.1),
            ]),
            emits_anomalies: true,
            emits_anomalies_normalized: true,
        }
    }

    fn synonyms(&self) -> SynonymTable {
        sales_synonyms()
    }

    fn instantiate(&self, hints: &RoleHints) -> Policy {
        Policy::QueryList(Box::new(SalesPolicyV1::new(hints.clone())))
    }
}

/// Single-run sales policy
#[derive(Debug, Clone)]
pub struct SalesPolicyV1 {
    hints: RoleHints,
    synonyms: SynonymTable,
    resolved_roles: ResolvedRoles,
}

impl SalesPolicyV1 {
    pub fn new(hints: RoleHints) -> Self {
        Self {
            hints,
            synonyms: sales_synonyms(),
            resolved_roles: ResolvedRoles::new(),
        }
    }
}

impl QueryListPolicy for SalesPolicyV1 {
    fn name(&self) -> &str {
        SALES_POLICY_NAME
    }

    fn build_queries(&mut self, store: &dyn Store) -> PolicyResult<Vec<SectionQuery>> {
        let table = resolve_against_store(
            SALES_POLICY_NAME,
            store,
            &self.synonyms,
            &self.hints,
            &sales_capabilities(),
            &mut self.resolved_roles,
        )?;
        let roles = &self.resolved_roles;

        let (Some(product), Some(amount)) = (roles.get(Role::Product), roles.get(Role::Amount))
        else {
            return Ok(Vec::new());
        };

        let mut queries = vec![SectionQuery::new(
            "sales.total_sales",
            SelectQuery::from(&table).select(real_sum(amount), "total_sales"),
        )];

        if let Some(profit) = roles.get(Role::Profit) {
            queries.push(SectionQuery::new(
                "sales.total_profit",
                SelectQuery::from(&table).select(real_sum(profit), "total_profit"),
            ));
        }

        let units = roles.get(Role::Units);
        if let Some(units) = units {
            queries.push(SectionQuery::new(
                "sales.total_units",
                SelectQuery::from(&table).select(real_sum(units), "total_units"),
            ));
            queries.push(SectionQuery::new(
                "sales.avg_unit_revenue",
                SelectQuery::from(&table)
                    .select(Expr::ratio(real_sum(amount), real_sum(units)), "avg_unit_revenue"),
            ));
        }

        queries.push(SectionQuery::new(
            "sales.top_products_by_sales_top10",
            SelectQuery::from(&table)
                .select(Expr::column(product), "product")
                .select(real_sum(amount), "sales")
                .group_by(Expr::column(product))
                .order_by(OrderTerm::desc(Expr::alias("sales")))
                .order_by(OrderTerm::asc(Expr::alias("product")))
                .limit(TOP_N),
        ));

        if let Some(units) = units {
            queries.push(SectionQuery::new(
                "sales.top_products_by_units_top10",
                SelectQuery::from(&table)
                    .select(Expr::column(product), "product")
                    .select(real_sum(units), "units")
                    .group_by(Expr::column(product))
                    .order_by(OrderTerm::desc(Expr::alias("units")))
                    .order_by(OrderTerm::asc(Expr::alias("product")))
                    .limit(TOP_N),
            ));
        }

        if let Some(date) = roles.get(Role::Date) {
            let month = Expr::month_bucket(Expr::column(date));
            queries.push(SectionQuery::new(
                "sales.sales_by_month",
                SelectQuery::from(&table)
                    .select(month.clone(), "month")
                    .select(real_sum(amount), "sales")
                    .group_by(month.clone())
                    .order_by(OrderTerm::asc(Expr::alias("month"))),
            ));

            let grouped = SelectQuery::from(&table)
                .select(month.clone(), "month")
                .select(Expr::column(product), "product")
                .select(real_sum(amount), "sales")
                .group_by(month)
                .group_by(Expr::column(product));
            queries.push(SectionQuery::new(
                "sales.top_products_by_sales_by_month_top5",
                TopNPerPartition {
                    grouped,
                    partition_by: "month".to_string(),
                    rank_by: "sales".to_string(),
                    tie_break: vec!["product".to_string()],
                    n: TOP_N_PER_MONTH,
                    limit: None,
                },
            ));
        }

        if let Some(region) = roles.get(Role::Region) {
            queries.push(SectionQuery::new(
                "sales.sales_by_region",
                SelectQuery::from(&table)
                    .select(Expr::column(region), "region")
                    .select(real_sum(amount), "sales")
                    .group_by(Expr::column(region))
                    .order_by(OrderTerm::desc(Expr::alias("sales")))
                    .order_by(OrderTerm::asc(Expr::alias("region"))),
            ));
        }

        Ok(queries)
    }

    fn resolved_roles(&self) -> &ResolvedRoles {
        &self.resolved_roles
    }
}
