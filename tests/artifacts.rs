//! Artifact Tests
//!
//! Tests for run artifact invariants:
//! - Every artifact is written into the chosen directory
//! - Equal runs write byte-identical files
//! - The anomalies document keeps its shape when empty
//! - reproduce.sql replays the executed queries

use std::fs;
use std::path::Path;

use rusqlite::Connection;
use serde_json::Value;
use tabsight::engine::AnalysisRequest;
use tabsight::pipeline::{
    run_pipeline, ArtifactWriter, RunReport, ANALYSIS_LOG_JSON, ANOMALIES_JSON, DATA_PROFILE_JSON,
    INTERPRETATION_JSON, METRICS_CSV, REPRODUCE_SQL,
};
use tabsight::policy::PolicyRegistry;
use tabsight::store::SqliteStore;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn orders() -> Connection {
    let c = Connection::open_in_memory().unwrap();
    c.execute_batch(
        "CREATE TABLE orders (customer_id TEXT, product TEXT, amount TEXT, order_date TEXT);
         INSERT INTO orders VALUES ('c1', 'p1', '100', '2024-01-02');
         INSERT INTO orders VALUES ('c2', 'p2', '110', '2024-01-20');
         INSERT INTO orders VALUES ('c3', 'p1', '90', '2024-02-03');
         INSERT INTO orders VALUES ('c4', 'p3', '105', '2024-02-14');
         INSERT INTO orders VALUES ('c5', 'p2', '95', '2024-03-01');
         INSERT INTO orders VALUES ('c6', 'p3', '100', '2024-03-07');",
    )
    .unwrap();
    c
}

fn run(conn: &Connection, profile: bool) -> RunReport {
    let store = SqliteStore::new(conn);
    let registry = PolicyRegistry::with_builtins();
    run_pipeline(&store, &registry, &AnalysisRequest::auto(), profile).unwrap()
}

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap()
}

fn read_json(dir: &Path, name: &str) -> Value {
    serde_json::from_str(&read(dir, name)).unwrap()
}

// =============================================================================
// Artifact Tests
// =============================================================================

/// All artifacts land in the output directory, created on demand.
#[test]
fn test_all_artifacts_written() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("nested").join("out");
    let report = run(&orders(), true);

    let files = ArtifactWriter::new(&out).write_report(&report).unwrap();
    assert_eq!(
        files,
        vec![
            METRICS_CSV,
            ANALYSIS_LOG_JSON,
            ANOMALIES_JSON,
            INTERPRETATION_JSON,
            REPRODUCE_SQL,
            DATA_PROFILE_JSON
        ]
    );
    for name in &files {
        assert!(out.join(name).is_file(), "{} missing", name);
    }
}

/// No profile means no data_profile.json.
#[test]
fn test_profile_only_when_computed() {
    let tmp = TempDir::new().unwrap();
    let report = run(&orders(), false);
    let files = ArtifactWriter::new(tmp.path()).write_report(&report).unwrap();
    assert!(!files.iter().any(|f| f == DATA_PROFILE_JSON));
    assert!(!tmp.path().join(DATA_PROFILE_JSON).exists());
}

/// Two runs write byte-identical artifacts.
#[test]
fn test_artifacts_byte_identical() {
    let conn = orders();
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    ArtifactWriter::new(a.path()).write_report(&run(&conn, true)).unwrap();
    ArtifactWriter::new(b.path()).write_report(&run(&conn, true)).unwrap();

    for name in [
        METRICS_CSV,
        ANALYSIS_LOG_JSON,
        ANOMALIES_JSON,
        INTERPRETATION_JSON,
        REPRODUCE_SQL,
        DATA_PROFILE_JSON,
    ] {
        assert_eq!(read(a.path(), name), read(b.path(), name), "{} differs", name);
    }
}

/// A run without anomalies still writes the wrapping object.
#[test]
fn test_empty_anomalies_document() {
    let tmp = TempDir::new().unwrap();
    let report = run(&orders(), false);
    assert!(report.anomalies.is_empty());

    ArtifactWriter::new(tmp.path()).write_report(&report).unwrap();
    let doc = read_json(tmp.path(), ANOMALIES_JSON);
    assert_eq!(doc, serde_json::json!({ "anomalies": [] }));
}

/// metrics.csv has a header and one line per metric row.
#[test]
fn test_metrics_csv_rows() {
    let tmp = TempDir::new().unwrap();
    let report = run(&orders(), false);
    ArtifactWriter::new(tmp.path()).write_report(&report).unwrap();

    let mut reader = csv::Reader::from_path(tmp.path().join(METRICS_CSV)).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
    assert_eq!(headers, vec!["section", "key", "value"]);
    let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), report.metric_rows().len());
    assert_eq!(&records[0][0], "overall");
    assert_eq!(&records[0][1], "row_count");
    assert_eq!(&records[0][2], "6");
}

/// reproduce.sql holds each executed query once, in order.
#[test]
fn test_reproduce_sql_replays() {
    let tmp = TempDir::new().unwrap();
    let report = run(&orders(), false);
    ArtifactWriter::new(tmp.path()).write_report(&report).unwrap();

    let sql = read(tmp.path(), REPRODUCE_SQL);
    let statements: Vec<&str> = sql
        .split(";\n")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let executed = &report.analysis_log().queries_executed;
    assert_eq!(statements.len(), executed.len());
    for (statement, query) in statements.iter().zip(executed) {
        assert_eq!(statement.trim_end_matches(';'), query.trim());
    }

    // Every statement runs against the source data
    let conn = orders();
    for statement in statements {
        let mut stmt = conn.prepare(statement.trim_end_matches(';')).unwrap();
        let mut rows = stmt.query([]).unwrap();
        while rows.next().unwrap().is_some() {}
    }
}

/// The analysis log records the selection and the resolved roles.
#[test]
fn test_analysis_log_contents() {
    let tmp = TempDir::new().unwrap();
    let report = run(&orders(), false);
    ArtifactWriter::new(tmp.path()).write_report(&report).unwrap();

    let log = read_json(tmp.path(), ANALYSIS_LOG_JSON);
    assert_eq!(log["policy"]["name"], "orders_v1");
    assert_eq!(log["selection"]["mode"], "auto");
    assert_eq!(log["policy"]["resolved_roles"]["date"], "order_date");
    assert_eq!(
        log["queries_executed"].as_array().unwrap().len(),
        report.analysis_log().queries_executed.len()
    );
}
