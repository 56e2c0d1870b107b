//! One end-to-end run: profile, analyze, interpret

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::anomaly::AnomaliesDocument;
use crate::engine::{AnalysisEngine, AnalysisLog, AnalysisOutcome, AnalysisRequest, MetricRow};
use crate::interpret::{interpret, Interpretation};
use crate::observability::{log_event_with_fields, Event, ObservationScope};
use crate::policy::PolicyRegistry;
use crate::profile::profile_store;
use crate::store::Store;

use super::errors::{ArtifactError, PipelineError, PipelineResult};

/// Everything one run produced
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcome: AnalysisOutcome,
    pub interpretation: Interpretation,
    pub anomalies: AnomaliesDocument,
    /// SHA-256 (hex) of the metric rows, executed queries and anomalies
    pub fingerprint: String,
}

impl RunReport {
    pub fn analysis_log(&self) -> &AnalysisLog {
        &self.outcome.log
    }

    pub fn metric_rows(&self) -> &[MetricRow] {
        &self.outcome.metric_rows
    }
}

/// Runs the analysis over `store` and interprets the result.
///
/// With `profile` set, the store-backed data profile is computed first and
/// attached to the analysis log. Nothing is written to disk.
pub fn run_pipeline(
    store: &dyn Store,
    registry: &PolicyRegistry,
    request: &AnalysisRequest,
    profile: bool,
) -> PipelineResult<RunReport> {
    let scope = ObservationScope::with_fields("RUN", &[("policy", request.policy.name())]);

    let result = run_inner(store, registry, request, profile);
    match &result {
        Ok(report) => {
            let rows = report.outcome.metric_rows.len().to_string();
            let anomalies = report.anomalies.len().to_string();
            scope.complete_with_fields(&[
                ("anomalies", anomalies.as_str()),
                ("fingerprint", report.fingerprint.as_str()),
                ("metric_rows", rows.as_str()),
                ("selected", report.outcome.policy_name()),
            ]);
        }
        Err(e) => {
            let reason = e.to_string();
            log_event_with_fields(
                Event::RunAborted,
                &[("category", e.category().as_str()), ("reason", reason.as_str())],
            );
            scope.fail(&reason);
        }
    }
    result
}

fn run_inner(
    store: &dyn Store,
    registry: &PolicyRegistry,
    request: &AnalysisRequest,
    profile: bool,
) -> PipelineResult<RunReport> {
    let data_profile = if profile {
        Some(profile_store(store)?)
    } else {
        None
    };

    let mut outcome = AnalysisEngine::new(registry).run(store, request)?;
    outcome.log = outcome.log.with_profile(data_profile);

    let interpretation = interpret(&outcome.metric_rows, &outcome.log)?;
    let anomalies = interpretation.anomalies_document();
    let fingerprint = fingerprint(&outcome.metric_rows, &outcome.log.queries_executed, &anomalies)?;

    Ok(RunReport {
        outcome,
        interpretation,
        anomalies,
        fingerprint,
    })
}

#[derive(Serialize)]
struct FingerprintInput<'a> {
    metric_rows: &'a [MetricRow],
    queries_executed: &'a [String],
    anomalies: &'a AnomaliesDocument,
}

/// Hash over the deterministic outputs of a run. Equal inputs produce equal
/// fingerprints across processes.
pub fn fingerprint(
    metric_rows: &[MetricRow],
    queries_executed: &[String],
    anomalies: &AnomaliesDocument,
) -> PipelineResult<String> {
    let input = FingerprintInput {
        metric_rows,
        queries_executed,
        anomalies,
    };
    let bytes = serde_json::to_vec(&input).map_err(|source| {
        PipelineError::Artifact(ArtifactError::Serialize {
            artifact: "fingerprint",
            source,
        })
    })?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use rusqlite::Connection;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE orders (order_id TEXT, customer_id TEXT, product TEXT, amount TEXT);
             INSERT INTO orders VALUES ('o1', 'c1', 'p1', '10');
             INSERT INTO orders VALUES ('o2', 'c2', 'p2', '20');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let rows = vec![MetricRow::new("overall", "row_count", "2")];
        let queries = vec!["SELECT 1".to_string()];
        let doc = AnomaliesDocument::default();
        let a = fingerprint(&rows, &queries, &doc).unwrap();
        let b = fingerprint(&rows, &queries, &doc).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let other = vec![MetricRow::new("overall", "row_count", "3")];
        assert_ne!(a, fingerprint(&other, &queries, &doc).unwrap());
    }

    #[test]
    fn test_run_attaches_profile() {
        let conn = conn();
        let store = SqliteStore::new(&conn);
        let registry = PolicyRegistry::with_builtins();

        let report = run_pipeline(&store, &registry, &AnalysisRequest::auto(), true).unwrap();
        assert_eq!(report.outcome.policy_name(), "orders_v1");
        let profile = report.analysis_log().data_profile.as_ref().unwrap();
        assert_eq!(profile.row_count, 2);

        let bare = run_pipeline(&store, &registry, &AnalysisRequest::auto(), false).unwrap();
        assert!(bare.analysis_log().data_profile.is_none());
        assert_eq!(bare.fingerprint, report.fingerprint);
    }

    #[test]
    fn test_run_aborts_on_unknown_policy() {
        let conn = conn();
        let store = SqliteStore::new(&conn);
        let registry = PolicyRegistry::with_builtins();
        let err = run_pipeline(&store, &registry, &AnalysisRequest::with_policy("nope"), false).unwrap_err();
        assert!(matches!(err, PipelineError::Engine(_)));
        assert!(err.category().aborts_run());
    }
}
