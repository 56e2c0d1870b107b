//! Run artifacts
//!
//! Written into one caller-chosen directory:
//!
//! | File                        | Content                                  |
//! |-----------------------------|------------------------------------------|
//! | `metrics.csv`               | `section,key,value`, emission order      |
//! | `analysis_log.json`         | policy, selection, queries, warnings     |
//! | `anomalies_normalized.json` | always `{"anomalies": [...]}`            |
//! | `interpretation.json`       | findings, caveats, metadata              |
//! | `reproduce.sql`             | executed queries, one statement each     |
//! | `data_profile.json`         | only when a profile was computed         |
//!
//! JSON is pretty-printed with map keys sorted, so equal runs write
//! byte-identical files.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::engine::MetricRow;
use crate::observability::{log_event_with_fields, Event};
use crate::profile::DataProfile;

use super::errors::{ArtifactError, ArtifactResult};
use super::run::RunReport;

pub const METRICS_CSV: &str = "metrics.csv";
pub const ANALYSIS_LOG_JSON: &str = "analysis_log.json";
pub const ANOMALIES_JSON: &str = "anomalies_normalized.json";
pub const INTERPRETATION_JSON: &str = "interpretation.json";
pub const REPRODUCE_SQL: &str = "reproduce.sql";
pub const DATA_PROFILE_JSON: &str = "data_profile.json";

/// Writes run artifacts into one directory
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes every artifact of `report`. Returns the written file names in
    /// write order.
    pub fn write_report(&self, report: &RunReport) -> ArtifactResult<Vec<String>> {
        self.ensure_dir()?;

        let mut written = vec![
            self.write_metrics(report.metric_rows())?,
            self.write_json(ANALYSIS_LOG_JSON, report.analysis_log())?,
            self.write_json(ANOMALIES_JSON, &report.anomalies)?,
            self.write_json(INTERPRETATION_JSON, &report.interpretation)?,
            self.write_reproduce_sql(&report.analysis_log().queries_executed)?,
        ];
        if let Some(profile) = &report.analysis_log().data_profile {
            written.push(self.write_json(DATA_PROFILE_JSON, profile)?);
        }

        self.log_written(&written);
        Ok(written)
    }

    /// Writes `data_profile.json` alone
    pub fn write_profile(&self, profile: &DataProfile) -> ArtifactResult<String> {
        self.ensure_dir()?;
        let name = self.write_json(DATA_PROFILE_JSON, profile)?;
        self.log_written(std::slice::from_ref(&name));
        Ok(name)
    }

    fn ensure_dir(&self) -> ArtifactResult<()> {
        fs::create_dir_all(&self.dir).map_err(|source| ArtifactError::CreateDir {
            path: self.dir.clone(),
            source,
        })
    }

    fn write_metrics(&self, rows: &[MetricRow]) -> ArtifactResult<String> {
        let path = self.dir.join(METRICS_CSV);
        let csv_err = |source| ArtifactError::Csv {
            path: path.clone(),
            source,
        };

        let mut writer = csv::Writer::from_path(&path).map_err(csv_err)?;
        writer
            .write_record(["section", "key", "value"])
            .map_err(csv_err)?;
        for row in rows {
            writer
                .write_record([row.section.as_str(), row.key.as_str(), row.value.as_str()])
                .map_err(csv_err)?;
        }
        writer.flush().map_err(|source| ArtifactError::Write {
            path: path.clone(),
            source,
        })?;

        Ok(METRICS_CSV.to_string())
    }

    fn write_json<T: Serialize>(&self, name: &'static str, value: &T) -> ArtifactResult<String> {
        let text = to_sorted_json(name, value)?;
        self.write_text(name, &text)
    }

    fn write_reproduce_sql(&self, queries: &[String]) -> ArtifactResult<String> {
        self.write_text(REPRODUCE_SQL, &reproduce_sql(queries))
    }

    fn write_text(&self, name: &str, text: &str) -> ArtifactResult<String> {
        let path = self.dir.join(name);
        fs::write(&path, text).map_err(|source| ArtifactError::Write { path, source })?;
        Ok(name.to_string())
    }

    fn log_written(&self, written: &[String]) {
        let dir = self.dir.display().to_string();
        let files = written.join(",");
        log_event_with_fields(
            Event::ArtifactsWritten,
            &[("dir", dir.as_str()), ("files", files.as_str())],
        );
    }
}

/// Pretty JSON with every object's keys sorted, newline-terminated
pub fn to_sorted_json<T: Serialize>(artifact: &'static str, value: &T) -> ArtifactResult<String> {
    let serialize = |source| ArtifactError::Serialize { artifact, source };
    let value = serde_json::to_value(value).map_err(serialize)?;
    let mut text = serde_json::to_string_pretty(&value).map_err(serialize)?;
    text.push('\n');
    Ok(text)
}

/// Executed queries as a runnable script: one `;`-terminated statement per
/// query, separated by blank lines
pub fn reproduce_sql(queries: &[String]) -> String {
    let statements: Vec<String> = queries
        .iter()
        .map(|q| q.trim().trim_end_matches(';').trim_end())
        .filter(|q| !q.is_empty())
        .map(|q| format!("{};", q))
        .collect();
    let mut script = statements.join("\n\n");
    script.push('\n');
    script
}
