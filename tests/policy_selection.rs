//! Policy Selection Tests
//!
//! Tests for auto-selection invariants:
//! - Every registered policy appears in the trace, in registration order
//! - Highest eligible score wins; ties go to the earlier registration
//! - The generic policy is the fallback when no domain policy is eligible
//! - Explicit choices skip scoring and fail on unknown names

use rusqlite::Connection;
use tabsight::engine::{AnalysisEngine, AnalysisRequest, EngineError};
use tabsight::policy::{PolicyChoice, PolicyError, PolicyRegistry};
use tabsight::roles::{Role, RoleHints};
use tabsight::store::SqliteStore;

// =============================================================================
// Helper Functions
// =============================================================================

fn cols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn conn(ddl: &str) -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(ddl).unwrap();
    conn
}

// =============================================================================
// Auto Selection Tests
// =============================================================================

/// Candidates are listed in registration order with their scores.
#[test]
fn test_trace_lists_every_policy_in_order() {
    let registry = PolicyRegistry::with_builtins();
    let trace = registry.auto_select_policy(
        &cols(&["customer_id", "product", "amount", "region", "units", "profit"]),
        &RoleHints::new(),
    );

    let scores: Vec<(&str, u32)> = trace
        .candidates
        .iter()
        .map(|c| (c.name.as_str(), c.score))
        .collect();
    assert_eq!(
        scores,
        vec![("generic_tabular", 0), ("orders_v1", 9), ("sales_v1", 9)]
    );
    assert_eq!(trace.mode, "auto");
}

/// Equal scores resolve to the policy registered first.
#[test]
fn test_tie_goes_to_earlier_registration() {
    let registry = PolicyRegistry::with_builtins();
    let trace = registry.auto_select_policy(
        &cols(&["customer_id", "product", "amount", "region", "units", "profit"]),
        &RoleHints::new(),
    );
    assert_eq!(trace.selected, "orders_v1");
}

/// Without a customer column the orders policy is ineligible.
#[test]
fn test_sales_selected_without_customer() {
    let registry = PolicyRegistry::with_builtins();
    let trace = registry.auto_select_policy(
        &cols(&["category", "sales", "profit"]),
        &RoleHints::new(),
    );
    assert_eq!(trace.selected, "sales_v1");

    let orders = trace
        .candidates
        .iter()
        .find(|c| c.name == "orders_v1")
        .unwrap();
    assert!(!orders.eligible);
    assert!(orders.missing_required_roles.contains(&Role::Customer));
}

/// Unknown columns fall back to the generic policy.
#[test]
fn test_generic_fallback() {
    let registry = PolicyRegistry::with_builtins();
    let trace = registry.auto_select_policy(&cols(&["foo", "bar"]), &RoleHints::new());
    assert_eq!(trace.selected, "generic_tabular");
}

/// A hint can make a policy eligible that name matching alone would not.
#[test]
fn test_hint_makes_policy_eligible() {
    let registry = PolicyRegistry::with_builtins();
    let mut hints = RoleHints::new();
    hints.insert("customer".to_string(), vec!["buyer_ref".to_string()]);

    let trace = registry.auto_select_policy(&cols(&["buyer_ref", "product", "amount"]), &hints);
    assert_eq!(trace.selected, "orders_v1");
}

// =============================================================================
// Explicit Selection Tests
// =============================================================================

/// Explicit choice records no candidates.
#[test]
fn test_explicit_choice() {
    let registry = PolicyRegistry::with_builtins();
    let trace = registry
        .select(&PolicyChoice::parse("sales_v1"), &cols(&["x"]), &RoleHints::new())
        .unwrap();
    assert_eq!(trace.mode, "explicit");
    assert_eq!(trace.selected, "sales_v1");
    assert!(trace.candidates.is_empty());
}

/// Unknown explicit names fail before any query runs.
#[test]
fn test_unknown_policy_fails_run() {
    let c = conn("CREATE TABLE t (a TEXT); INSERT INTO t VALUES ('1');");
    let store = SqliteStore::new(&c);
    let registry = PolicyRegistry::with_builtins();

    let err = AnalysisEngine::new(&registry)
        .run(&store, &AnalysisRequest::with_policy("nope_v9"))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Policy(PolicyError::UnknownPolicy { .. })
    ));
}

/// Auto-selected orders run counts every row as an order without an id column.
#[test]
fn test_auto_orders_run_counts_rows() {
    let c = conn(
        "CREATE TABLE orders (customer_id TEXT, product TEXT, amount TEXT);
         INSERT INTO orders VALUES ('c1', 'p1', '10');
         INSERT INTO orders VALUES ('c1', 'p2', '20');
         INSERT INTO orders VALUES ('c2', 'p1', '30');",
    );
    let store = SqliteStore::new(&c);
    let registry = PolicyRegistry::with_builtins();

    let outcome = AnalysisEngine::new(&registry)
        .run(&store, &AnalysisRequest::auto())
        .unwrap();
    assert_eq!(outcome.policy_name(), "orders_v1");

    let total = outcome
        .metric_rows
        .iter()
        .find(|r| r.section == "orders.total_orders")
        .unwrap();
    assert_eq!(total.value, "3");
}
