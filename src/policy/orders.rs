//! Orders policy (`orders_v1`)
//!
//! Domain policy for e-commerce order tables: order and revenue totals,
//! average order value, top customers and products, and monthly series when a
//! date column resolves.

use crate::planner::{Expr, OrderTerm, SelectQuery, TopNPerPartition};
use crate::roles::{ResolvedRoles, Role, RoleHints, SynonymTable};
use crate::store::Store;

use super::descriptor::{thresholds, Capabilities, PolicyDescriptor};
use super::errors::PolicyResult;
use super::traits::{resolve_against_store, Policy, PolicyDefinition, QueryListPolicy, SectionQuery};

/// Registered name of the orders policy
pub const ORDERS_POLICY_NAME: &str = "orders_v1";

const TOP_N: u64 = 10;
const TOP_N_PER_MONTH: u64 = 5;

fn orders_capabilities() -> Capabilities {
    Capabilities::new(
        &[Role::Customer, Role::Product, Role::Amount],
        &[Role::Date, Role::OrderId],
        &["top_n", "time_buckets"],
    )
}

fn orders_synonyms() -> SynonymTable {
    SynonymTable::new()
        .with(
            Role::Date,
            &["order_date", "date", "created_at", "purchased_at", "timestamp", "ts", "datetime"],
        )
        .with(Role::OrderId, &["order_id", "id", "order_number", "order_no"])
        .with(
            Role::Customer,
            &["customer_id", "customer", "user_id", "buyer_id", "client_id"],
        )
        .with(
            Role::Product,
            &["product_id", "product", "sku", "item_id", "item", "product_sku"],
        )
        .with(
            Role::Amount,
            &["amount", "total", "revenue", "price", "order_total", "sales"],
        )
}

/// Registry entry for `orders_v1`
#[derive(Debug, Clone, Copy, Default)]
pub struct OrdersDefinition;

impl PolicyDefinition for OrdersDefinition {
    fn name(&self) -> &str {
        ORDERS_POLICY_NAME
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn capabilities(&self) -> Capabilities {
        orders_capabilities()
    }

    fn describe(&self) -> PolicyDescriptor {
        let caps = self.capabilities();
        PolicyDescriptor {
            name: ORDERS_POLICY_NAME.to_string(),
            version: self.version().to_string(),
            description: "Domain policy for e-commerce style orders datasets.".to_string(),
            required_roles: caps.requires,
            optional_roles: caps.optional,
            supports: caps.supports,
            expected_metrics: [
                "orders.total_orders",
                "orders.total_revenue",
                "orders.avg_order_value",
                "orders.top_customers_by_revenue_top10",
                "orders.top_products_by_revenue_top10",
                "orders.revenue_by_month (if date)",
                "orders.orders_by_month (if date)",
                "orders.top_customers_by_revenue_by_month_top5 (if date)",
                "orders.top_products_by_revenue_by_month_top5 (if date)",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            coverage_behavior:
                "Requires product, customer and amount; optional date/order_id improve coverage."
                    .to_string(),
            anomalies_emitted: [
                "Top customer revenue concentration (>= 25% warning; >= 40% critical)",
                "Average order value outlier (low/high thresholds)",
                "Recent order count drop (>= 30% warning; >= 50% critical)",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            severity_thresholds: thresholds(&[
                ("customer_revenue_share_top1", 0.25, 0.40),
                ("aov_high", 500.0, 1000.0),
                ("aov_low", 20.0, 10.0),
                ("order_count_drop_recent", 0.30, 0.50),
            ]),
            emits_anomalies: true,
            emits_anomalies_normalized: true,
        }
    }

    fn synonyms(&self) -> SynonymTable {
        orders_synonyms()
    }

    fn instantiate(&self, hints: &RoleHints) -> Policy {
        Policy::QueryList(Box::new(OrdersPolicyV1::new(hints.clone())))
    }
}

/// Single-run orders policy
#[derive(Debug, Clone)]
pub struct OrdersPolicyV1 {
    hints: RoleHints,
    synonyms: SynonymTable,
    resolved_roles: ResolvedRoles,
}

impl OrdersPolicyV1 {
    pub fn new(hints: RoleHints) -> Self {
        Self {
            hints,
            synonyms: orders_synonyms(),
            resolved_roles: ResolvedRoles::new(),
        }
    }
}

/// Revenue per entity, best first, ties broken on the entity
fn top_by_revenue(table: &str, column: &str, alias: &str, amount: &str) -> SelectQuery {
    SelectQuery::from(table)
        .select(Expr::column(column), alias)
        .select(Expr::real_total(amount), "revenue")
        .group_by(Expr::column(column))
        .order_by(OrderTerm::desc(Expr::alias("revenue")))
        .order_by(OrderTerm::asc(Expr::alias(alias)))
        .limit(TOP_N)
}

/// Top entities by revenue within each month
fn top_by_revenue_per_month(
    table: &str,
    month: &Expr,
    column: &str,
    alias: &str,
    amount: &str,
) -> TopNPerPartition {
    let grouped = SelectQuery::from(table)
        .select(month.clone(), "month")
        .select(Expr::column(column), alias)
        .select(Expr::real_total(amount), "revenue")
        .group_by(month.clone())
        .group_by(Expr::column(column));
    TopNPerPartition {
        grouped,
        partition_by: "month".to_string(),
        rank_by: "revenue".to_string(),
        tie_break: vec![alias.to_string()],
        n: TOP_N_PER_MONTH,
        limit: None,
    }
}

impl QueryListPolicy for OrdersPolicyV1 {
    fn name(&self) -> &str {
        ORDERS_POLICY_NAME
    }

    fn build_queries(&mut self, store: &dyn Store) -> PolicyResult<Vec<SectionQuery>> {
        let table = resolve_against_store(
            ORDERS_POLICY_NAME,
            store,
            &self.synonyms,
            &self.hints,
            &orders_capabilities(),
            &mut self.resolved_roles,
        )?;
        let roles = &self.resolved_roles;

        // Required roles are present past resolve_against_store
        let (Some(customer), Some(product), Some(amount)) = (
            roles.get(Role::Customer),
            roles.get(Role::Product),
            roles.get(Role::Amount),
        ) else {
            return Ok(Vec::new());
        };

        let total_orders = match roles.get(Role::OrderId) {
            Some(id) => Expr::count_distinct(Expr::column(id)),
            None => Expr::CountStar,
        };

        let mut queries = vec![
            SectionQuery::new(
                "orders.total_orders",
                SelectQuery::from(&table).select(total_orders.clone(), "total_orders"),
            ),
            SectionQuery::new(
                "orders.total_revenue",
                SelectQuery::from(&table).select(Expr::real_total(amount), "total_revenue"),
            ),
            SectionQuery::new(
                "orders.avg_order_value",
                SelectQuery::from(&table).select(
                    Expr::coalesce(Expr::ratio(Expr::real_total(amount), total_orders.clone()), 0.0),
                    "avg_order_value",
                ),
            ),
            SectionQuery::new(
                "orders.top_customers_by_revenue_top10",
                top_by_revenue(&table, customer, "customer", amount),
            ),
            SectionQuery::new(
                "orders.top_products_by_revenue_top10",
                top_by_revenue(&table, product, "product", amount),
            ),
        ];

        if let Some(date) = roles.get(Role::Date) {
            let month = Expr::month_bucket(Expr::column(date));
            queries.push(SectionQuery::new(
                "orders.revenue_by_month",
                SelectQuery::from(&table)
                    .select(month.clone(), "month")
                    .select(Expr::real_total(amount), "revenue")
                    .group_by(month.clone())
                    .order_by(OrderTerm::asc(Expr::alias("month"))),
            ));
            queries.push(SectionQuery::new(
                "orders.orders_by_month",
                SelectQuery::from(&table)
                    .select(month.clone(), "month")
                    .select(total_orders, "orders")
                    .group_by(month.clone())
                    .order_by(OrderTerm::asc(Expr::alias("month"))),
            ));
            queries.push(SectionQuery::new(
                "orders.top_customers_by_revenue_by_month_top5",
                top_by_revenue_per_month(&table, &month, customer, "customer", amount),
            ));
            queries.push(SectionQuery::new(
                "orders.top_products_by_revenue_by_month_top5",
                top_by_revenue_per_month(&table, &month, product, "product", amount),
            ));
        }

        Ok(queries)
    }

    fn resolved_roles(&self) -> &ResolvedRoles {
        &self.resolved_roles
    }
}
