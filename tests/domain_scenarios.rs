//! Domain Scenario Tests
//!
//! End-to-end runs of the domain policies over small in-memory tables:
//! - Customer revenue concentration on orders
//! - Recent order count drop on monthly orders
//! - Low profit margin on sales
//! - Healthy data emits no anomalies

use rusqlite::Connection;
use tabsight::anomaly::{AnomalySeverity, Direction, NormalizedAnomaly};
use tabsight::engine::AnalysisRequest;
use tabsight::pipeline::{run_pipeline, RunReport};
use tabsight::policy::PolicyRegistry;
use tabsight::store::SqliteStore;

// =============================================================================
// Helper Functions
// =============================================================================

fn conn(ddl: &str) -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(ddl).unwrap();
    conn
}

fn run(conn: &Connection, request: &AnalysisRequest) -> RunReport {
    let store = SqliteStore::new(conn);
    let registry = PolicyRegistry::with_builtins();
    run_pipeline(&store, &registry, request, false).unwrap()
}

fn anomaly<'r>(report: &'r RunReport, id: &str) -> &'r NormalizedAnomaly {
    report
        .anomalies
        .anomalies()
        .iter()
        .find(|a| a.id() == id)
        .unwrap_or_else(|| panic!("anomaly {} not emitted", id))
}

/// Ten orders; c1 holds 450 of 1000 revenue
fn concentrated_orders() -> Connection {
    let c = conn("CREATE TABLE orders (order_id TEXT, customer_id TEXT, product TEXT, amount TEXT);");
    let rows = [
        ("o1", "c1", "p1", "200"),
        ("o2", "c1", "p2", "250"),
        ("o3", "c2", "p3", "100"),
        ("o4", "c3", "p1", "90"),
        ("o5", "c4", "p2", "80"),
        ("o6", "c5", "p3", "70"),
        ("o7", "c6", "p4", "60"),
        ("o8", "c7", "p5", "50"),
        ("o9", "c8", "p4", "50"),
        ("o10", "c9", "p5", "50"),
    ];
    for (id, customer, product, amount) in rows {
        c.execute(
            "INSERT INTO orders VALUES (?1, ?2, ?3, ?4)",
            [id, customer, product, amount],
        )
        .unwrap();
    }
    c
}

/// 100 orders in January, 40 in February, spread over 20 customers
fn dropping_orders() -> Connection {
    let c = conn("CREATE TABLE orders (order_id TEXT, customer_id TEXT, product TEXT, amount TEXT, created_at TEXT);");
    for i in 0..140 {
        let date = if i < 100 { "2024-01-15" } else { "2024-02-15" };
        c.execute(
            "INSERT INTO orders VALUES (?1, ?2, ?3, '50', ?4)",
            [
                format!("o{}", i),
                format!("c{}", i % 20),
                format!("p{}", i % 5),
                date.to_string(),
            ],
        )
        .unwrap();
    }
    c
}

// =============================================================================
// Orders Tests
// =============================================================================

/// Top customer share of 45% is critical.
#[test]
fn test_customer_concentration_critical() {
    let c = concentrated_orders();
    let report = run(&c, &AnalysisRequest::auto());

    assert_eq!(report.outcome.policy_name(), "orders_v1");
    assert_eq!(report.anomalies.len(), 1);

    let a = anomaly(&report, "orders.customer_revenue_concentration_top1");
    assert_eq!(a.severity(), AnomalySeverity::Critical);
    assert_eq!(a.direction(), Direction::High);
    assert!((a.value() - 0.45).abs() < 1e-9);
    assert_eq!(a.threshold().warning, 0.25);
    assert_eq!(a.threshold().critical, 0.40);
    assert_eq!(
        report.interpretation.metadata.anomalies_max_severity,
        AnomalySeverity::Critical
    );
}

/// Average order value of 100 sits between the AOV thresholds.
#[test]
fn test_aov_in_band_not_flagged() {
    let c = concentrated_orders();
    let report = run(&c, &AnalysisRequest::auto());
    assert!(report
        .anomalies
        .anomalies()
        .iter()
        .all(|a| a.id() != "orders.aov_outlier"));

    let aov = report
        .metric_rows()
        .iter()
        .find(|r| r.section == "orders.avg_order_value")
        .unwrap();
    assert_eq!(aov.numeric(), Some(100.0));
}

/// A 60% month-over-month drop in orders is critical.
#[test]
fn test_recent_order_drop() {
    let c = dropping_orders();
    let report = run(&c, &AnalysisRequest::with_policy("orders_v1"));

    let a = anomaly(&report, "orders.order_count_drop_recent");
    assert_eq!(a.severity(), AnomalySeverity::Critical);
    assert_eq!(a.direction(), Direction::High);
    assert!((a.value() - 0.6).abs() < 1e-9);
    assert_eq!(
        a.evidence_keys(),
        &[
            "orders.orders_by_month.row0:orders".to_string(),
            "orders.orders_by_month.row1:orders".to_string(),
        ]
    );
    assert!(a.summary().contains("2024-01"));
    assert!(a.summary().contains("2024-02"));
}

/// Monthly series are emitted in month order once a date resolves.
#[test]
fn test_monthly_sections_present() {
    let c = dropping_orders();
    let report = run(&c, &AnalysisRequest::with_policy("orders_v1"));

    let months: Vec<&str> = report
        .metric_rows()
        .iter()
        .filter(|r| r.section == "orders.orders_by_month" && r.key.ends_with(":month"))
        .map(|r| r.value.as_str())
        .collect();
    assert_eq!(months, vec!["2024-01", "2024-02"]);
    assert_eq!(
        report.analysis_log().policy.resolved_roles.get(tabsight::roles::Role::Date),
        Some("created_at")
    );
}

// =============================================================================
// Sales Tests
// =============================================================================

/// A 1% margin is critically low.
#[test]
fn test_low_profit_margin() {
    let c = conn(
        "CREATE TABLE sales (category TEXT, sales TEXT, profit TEXT);
         INSERT INTO sales VALUES ('A', '100', '1');
         INSERT INTO sales VALUES ('B', '100', '1');
         INSERT INTO sales VALUES ('C', '100', '1');
         INSERT INTO sales VALUES ('D', '100', '1');",
    );
    let report = run(&c, &AnalysisRequest::auto());
    assert_eq!(report.outcome.policy_name(), "sales_v1");

    let a = anomaly(&report, "profit_margin");
    assert_eq!(a.severity(), AnomalySeverity::Critical);
    assert_eq!(a.direction(), Direction::Low);
    assert_eq!(a.metric(), "sales.total_profit");
    assert!((a.value() - 0.01).abs() < 1e-9);
    assert_eq!(
        a.evidence_keys(),
        &[
            "sales.total_profit.row0:total_profit".to_string(),
            "sales.total_sales.row0:total_sales".to_string(),
        ]
    );

    // Four equal products: 25% share stays under the concentration warning
    assert!(report
        .anomalies
        .anomalies()
        .iter()
        .all(|a| a.id() != "revenue_concentration_share"));
}

/// Healthy sales produce findings but no anomalies.
#[test]
fn test_healthy_sales_no_anomalies() {
    let c = conn(
        "CREATE TABLE sales (category TEXT, sales TEXT, profit TEXT);
         INSERT INTO sales VALUES ('A', '100', '30');
         INSERT INTO sales VALUES ('B', '100', '30');
         INSERT INTO sales VALUES ('C', '100', '30');
         INSERT INTO sales VALUES ('D', '100', '30');",
    );
    let report = run(&c, &AnalysisRequest::auto());

    assert!(report.anomalies.is_empty());
    assert_eq!(report.anomalies.max_severity(), None);
    assert!(report
        .interpretation
        .findings
        .iter()
        .any(|f| f.title == "Profit margin"));
}
