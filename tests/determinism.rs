//! Determinism Tests
//!
//! Tests for run invariants:
//! - Same data, policy and hints yield identical metric rows and queries
//! - The run fingerprint is stable across runs and insertion order
//! - Profiling does not change the fingerprint

use rusqlite::Connection;
use tabsight::engine::{AnalysisEngine, AnalysisRequest};
use tabsight::pipeline::{run_pipeline, RunReport};
use tabsight::policy::PolicyRegistry;
use tabsight::store::SqliteStore;

// =============================================================================
// Helper Functions
// =============================================================================

const ROWS: [(&str, &str, &str, &str, &str); 6] = [
    ("o1", "c1", "p1", "10.5", "2024-01-03"),
    ("o2", "c2", "p1", "20", "2024-01-09"),
    ("o3", "c1", "p2", "7.25", "2024-02-01"),
    ("o4", "c3", "p3", "40", "2024-02-11"),
    ("o5", "c2", "p2", "15", "2024-03-05"),
    ("o6", "c4", "p1", "30", "2024-03-20"),
];

fn orders(reversed: bool) -> Connection {
    let c = Connection::open_in_memory().unwrap();
    c.execute_batch(
        "CREATE TABLE orders (order_id TEXT, customer_id TEXT, product TEXT, amount TEXT, order_date TEXT);",
    )
    .unwrap();
    let mut rows = ROWS.to_vec();
    if reversed {
        rows.reverse();
    }
    for (id, customer, product, amount, date) in rows {
        c.execute(
            "INSERT INTO orders VALUES (?1, ?2, ?3, ?4, ?5)",
            [id, customer, product, amount, date],
        )
        .unwrap();
    }
    c
}

fn run(conn: &Connection, profile: bool) -> RunReport {
    let store = SqliteStore::new(conn);
    let registry = PolicyRegistry::with_builtins();
    run_pipeline(&store, &registry, &AnalysisRequest::auto(), profile).unwrap()
}

// =============================================================================
// Determinism Tests
// =============================================================================

/// Two runs over the same store are identical.
#[test]
fn test_repeated_runs_identical() {
    let c = orders(false);
    let first = run(&c, false);
    let second = run(&c, false);

    assert_eq!(first.metric_rows(), second.metric_rows());
    assert_eq!(
        first.analysis_log().queries_executed,
        second.analysis_log().queries_executed
    );
    assert_eq!(first.anomalies, second.anomalies);
    assert_eq!(first.fingerprint, second.fingerprint);
}

/// Insertion order does not leak into the results.
#[test]
fn test_insertion_order_irrelevant() {
    let forward = run(&orders(false), false);
    let backward = run(&orders(true), false);
    assert_eq!(forward.metric_rows(), backward.metric_rows());
    assert_eq!(forward.fingerprint, backward.fingerprint);
}

/// Attaching a data profile leaves the fingerprint unchanged.
#[test]
fn test_profile_does_not_change_fingerprint() {
    let c = orders(false);
    let plain = run(&c, false);
    let profiled = run(&c, true);

    assert!(plain.analysis_log().data_profile.is_none());
    assert!(profiled.analysis_log().data_profile.is_some());
    assert_eq!(plain.fingerprint, profiled.fingerprint);
}

/// The fingerprint is a SHA-256 hex digest.
#[test]
fn test_fingerprint_format() {
    let report = run(&orders(false), false);
    assert_eq!(report.fingerprint.len(), 64);
    assert!(report.fingerprint.chars().all(|c| c.is_ascii_hexdigit()));
}

/// The row count query runs first and its row leads the output.
#[test]
fn test_row_count_first() {
    let c = orders(false);
    let store = SqliteStore::new(&c);
    let registry = PolicyRegistry::with_builtins();
    let outcome = AnalysisEngine::new(&registry)
        .run(&store, &AnalysisRequest::auto())
        .unwrap();

    let first = &outcome.metric_rows[0];
    assert_eq!((first.section.as_str(), first.key.as_str(), first.value.as_str()), ("overall", "row_count", "6"));
    assert!(outcome.queries_executed()[0].contains("COUNT(*)"));
}
