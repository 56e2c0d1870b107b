//! Interpretation output types

use serde::Serialize;

use crate::anomaly::{AnomaliesDocument, AnomalySeverity, NormalizedAnomaly};

use super::rules::{Confidence, Coverage};

/// One explanatory statement, citing the metric rows it rests on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub severity: AnomalySeverity,
    pub title: String,
    pub text: String,
    /// `<section>.<key>` of each cited metric row
    pub evidence_keys: Vec<String>,
}

impl Finding {
    pub fn info(title: impl Into<String>, text: impl Into<String>, evidence_keys: Vec<String>) -> Self {
        Self {
            severity: AnomalySeverity::Info,
            title: title.into(),
            text: text.into(),
            evidence_keys,
        }
    }

    pub fn with_severity(mut self, severity: AnomalySeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// Several anomalies of one base column and period, explained together
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mechanism {
    pub base: String,
    pub period: String,
    /// Symptom metrics, sorted
    pub metrics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leverage_ratio: Option<f64>,
    pub confidence: String,
    /// Union of the symptoms' evidence keys, sorted
    pub evidence_keys: Vec<String>,
}

/// Interpretation metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterpretationMetadata {
    /// One-line summary per anomaly, in output order
    pub anomalies: Vec<String>,
    /// Normalized anomalies, in output order
    pub anomalies_normalized: Vec<NormalizedAnomaly>,
    pub anomalies_max_severity: AnomalySeverity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<Coverage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mechanisms: Vec<Mechanism>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub supporting_evidence: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub negative_evidence: Vec<String>,
}

impl InterpretationMetadata {
    /// Sorts anomalies into output order and derives the summaries
    pub fn from_anomalies(anomalies: Vec<NormalizedAnomaly>) -> Self {
        let document = AnomaliesDocument::new(anomalies);
        let max_severity = document.max_severity().unwrap_or(AnomalySeverity::Info);
        let anomalies_normalized = document.into_anomalies();
        Self {
            anomalies: anomalies_normalized
                .iter()
                .map(|a| format!("[{}] {}", a.severity().as_str().to_uppercase(), a.summary()))
                .collect(),
            anomalies_normalized,
            anomalies_max_severity: max_severity,
            coverage: None,
            confidence: None,
            mechanisms: Vec::new(),
            supporting_evidence: Vec::new(),
            negative_evidence: Vec::new(),
        }
    }
}

/// Result of interpreting one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interpretation {
    /// Never empty: a sentinel finding stands in when nothing qualifies
    pub findings: Vec<Finding>,
    /// Engine warnings, verbatim
    pub caveats: Vec<String>,
    pub metadata: InterpretationMetadata,
}

impl Interpretation {
    /// Adds the sentinel finding if `findings` is empty
    pub fn new(
        mut findings: Vec<Finding>,
        caveats: Vec<String>,
        metadata: InterpretationMetadata,
        sentinel: Finding,
    ) -> Self {
        if findings.is_empty() {
            findings.push(sentinel);
        }
        Self {
            findings,
            caveats,
            metadata,
        }
    }

    /// The `{"anomalies": [...]}` document
    pub fn anomalies_document(&self) -> AnomaliesDocument {
        AnomaliesDocument::new(self.metadata.anomalies_normalized.clone())
    }
}
