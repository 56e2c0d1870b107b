//! CLI command implementations
//!
//! Each command loads its configuration, does its work through the library
//! and returns one JSON value. Only `run` and `profile` write files, and only
//! into the configured output directory. The database is opened read-only.

use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use serde_json::{json, Value};

use crate::engine::AnalysisEngine;
use crate::observability::Logger;
use crate::pipeline::{run_pipeline, ArtifactWriter};
use crate::policy::{PolicyError, PolicyRegistry};
use crate::profile::profile_store;
use crate::store::SqliteStore;

use super::args::{Cli, Command};
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Main CLI entry point
///
/// Parses arguments, dispatches the command and prints exactly one response
/// object. This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    Logger::set_min_severity(cli.log_level);

    match execute(cli.command) {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(&e)?;
            Err(e)
        }
    }
}

/// Runs a command and returns its response payload
pub fn execute(cmd: Command) -> CliResult<Value> {
    match cmd {
        Command::Run { config } => run_analysis(&config),
        Command::Profile { config } => profile(&config),
        Command::Explain { config } => explain(&config),
        Command::Describe { policy } => describe(&policy),
        Command::Policies => policies(),
    }
}

fn open_database(config: &Config) -> CliResult<Connection> {
    let path = config.db_path();
    if !path.is_file() {
        return Err(CliError::database_error(format!(
            "Database not found: {}",
            path.display()
        )));
    }
    Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(|e| {
        CliError::database_error(format!("Failed to open {}: {}", path.display(), e))
    })
}

fn store<'c>(conn: &'c Connection, config: &Config) -> SqliteStore<'c> {
    match &config.table {
        Some(table) => SqliteStore::with_table(conn, table.trim()),
        None => SqliteStore::new(conn),
    }
}

fn registry(config: &Config) -> PolicyRegistry {
    PolicyRegistry::with_generic_options(config.generic.clone())
}

fn policy_error(e: PolicyError) -> CliError {
    match e {
        PolicyError::UnknownPolicy { .. } => CliError::unknown_policy(e.to_string()),
        other => CliError::run_failed(other.category(), other.to_string()),
    }
}

/// Analyze the configured table and write every artifact
pub fn run_analysis(config_path: &Path) -> CliResult<Value> {
    let config = Config::load(config_path)?;
    let conn = open_database(&config)?;
    let store = store(&conn, &config);
    let registry = registry(&config);

    let report = run_pipeline(&store, &registry, &config.analysis_request(), config.profile)?;
    let files = ArtifactWriter::new(config.output_path()).write_report(&report)?;

    let log = report.analysis_log();
    Ok(json!({
        "policy": log.policy.name,
        "selection_mode": log.selection.mode,
        "metric_rows": report.metric_rows().len(),
        "queries_executed": log.queries_executed.len(),
        "warnings": log.warnings,
        "anomalies": report.anomalies.len(),
        "max_severity": report.anomalies.max_severity(),
        "fingerprint": report.fingerprint,
        "output_dir": config.output_dir,
        "files": files,
    }))
}

/// Profile the configured table and write `data_profile.json`
pub fn profile(config_path: &Path) -> CliResult<Value> {
    let config = Config::load(config_path)?;
    let conn = open_database(&config)?;
    let store = store(&conn, &config);

    let profile = profile_store(&store)
        .map_err(|e| CliError::run_failed(e.category(), e.to_string()))?;
    let file = ArtifactWriter::new(config.output_path()).write_profile(&profile)?;

    Ok(json!({
        "table": profile.table,
        "row_count": profile.row_count,
        "column_count": profile.column_count,
        "sampled": profile.sampled,
        "time_candidates": profile.time_candidates,
        "output_dir": config.output_dir,
        "files": [file],
    }))
}

/// Show the selected policy and the queries it would run
pub fn explain(config_path: &Path) -> CliResult<Value> {
    let config = Config::load(config_path)?;
    let conn = open_database(&config)?;
    let store = store(&conn, &config);
    let registry = registry(&config);

    let explanation = AnalysisEngine::new(&registry)
        .explain(&store, &config.analysis_request())
        .map_err(|e| CliError::run_failed(e.category(), e.to_string()))?;
    Ok(serde_json::to_value(&explanation)?)
}

/// Print the descriptor of one registered policy
pub fn describe(policy: &str) -> CliResult<Value> {
    let descriptor = PolicyRegistry::with_builtins()
        .describe_policy(policy.trim())
        .map_err(policy_error)?;
    Ok(serde_json::to_value(&descriptor)?)
}

/// List registered policies in registration order
pub fn policies() -> CliResult<Value> {
    let registry = PolicyRegistry::with_builtins();
    let mut entries = Vec::new();
    for name in registry.registration_order() {
        let descriptor = registry.describe_policy(name).map_err(policy_error)?;
        entries.push(json!({
            "name": descriptor.name,
            "version": descriptor.version,
            "description": descriptor.description,
            "emits_anomalies": descriptor.emits_anomalies,
        }));
    }
    Ok(json!({ "policies": entries }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::errors::CliErrorCode;
    use std::fs;
    use tempfile::TempDir;

    fn setup(policy: &str) -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("data.sqlite");
        let conn = Connection::open(&db).unwrap();
        conn.execute_batch(
            "CREATE TABLE orders (order_id TEXT, customer_id TEXT, product TEXT, amount TEXT);
             INSERT INTO orders VALUES ('o1', 'c1', 'p1', '10');
             INSERT INTO orders VALUES ('o2', 'c2', 'p2', '20');",
        )
        .unwrap();
        drop(conn);

        let config = dir.path().join("tabsight.json");
        fs::write(
            &config,
            json!({
                "db_path": db,
                "output_dir": dir.path().join("out"),
                "policy": policy,
            })
            .to_string(),
        )
        .unwrap();
        (dir, config)
    }

    #[test]
    fn test_run_writes_artifacts() {
        let (dir, config) = setup("auto");
        let data = run_analysis(&config).unwrap();
        assert_eq!(data["policy"], "orders_v1");
        assert_eq!(data["selection_mode"], "auto");
        assert!(dir.path().join("out").join("metrics.csv").is_file());
        assert!(dir.path().join("out").join("data_profile.json").is_file());
    }

    #[test]
    fn test_explain_writes_nothing() {
        let (dir, config) = setup("orders_v1");
        let data = explain(&config).unwrap();
        assert_eq!(data["shape"], "query_list");
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_missing_database() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("tabsight.json");
        fs::write(&config, r#"{"db_path": "/nonexistent/x.sqlite", "output_dir": "out"}"#).unwrap();
        let err = run_analysis(&config).unwrap_err();
        assert_eq!(err.code(), CliErrorCode::DatabaseError);
    }

    #[test]
    fn test_describe_and_policies() {
        let data = describe("sales_v1").unwrap();
        assert_eq!(data["name"], "sales_v1");

        let err = describe("nope").unwrap_err();
        assert_eq!(err.code(), CliErrorCode::UnknownPolicy);

        let data = policies().unwrap();
        let names: Vec<&str> = data["policies"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["generic_tabular", "orders_v1", "sales_v1"]);
    }
}
