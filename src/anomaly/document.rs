//! `{"anomalies": [...]}` document

use serde::{Deserialize, Serialize};

use super::normalized::{AnomalySeverity, NormalizedAnomaly};

/// Ordered anomaly list. Always serializes the `anomalies` key, even when
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomaliesDocument {
    anomalies: Vec<NormalizedAnomaly>,
}

impl AnomaliesDocument {
    /// Builds a document in output order
    pub fn new(mut anomalies: Vec<NormalizedAnomaly>) -> Self {
        anomalies.sort_by(|a, b| a.output_order(b));
        Self { anomalies }
    }

    pub fn anomalies(&self) -> &[NormalizedAnomaly] {
        &self.anomalies
    }

    pub fn into_anomalies(self) -> Vec<NormalizedAnomaly> {
        self.anomalies
    }

    pub fn len(&self) -> usize {
        self.anomalies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anomalies.is_empty()
    }

    /// Highest severity present, if any
    pub fn max_severity(&self) -> Option<AnomalySeverity> {
        self.anomalies.iter().map(|a| a.severity()).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::{make_normalized_anomaly, AnomalyDraft, Direction};
    use crate::policy::Threshold;

    fn anomaly(id: &str, metric: &str, severity: AnomalySeverity) -> NormalizedAnomaly {
        make_normalized_anomaly(
            AnomalyDraft::new(id, "sales_v1", metric)
                .severity(severity)
                .direction(Direction::Low)
                .value(0.04)
                .threshold(Threshold::new(0.10, 0.05))
                .unit("ratio")
                .evidence(vec!["sales.total_profit.row0:total_profit".to_string()]),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_document_shape() {
        let doc = AnomaliesDocument::default();
        assert_eq!(serde_json::to_string(&doc).unwrap(), "{\"anomalies\":[]}");
        assert_eq!(doc.max_severity(), None);
    }

    #[test]
    fn test_sorted_on_construction() {
        let doc = AnomaliesDocument::new(vec![
            anomaly("b", "profit_margin", AnomalySeverity::Warning),
            anomaly("a", "profit_margin", AnomalySeverity::Warning),
            anomaly("z", "zeta", AnomalySeverity::Critical),
        ]);
        let ids: Vec<&str> = doc.anomalies().iter().map(|a| a.id()).collect();
        assert_eq!(ids, vec!["z", "a", "b"]);
        assert_eq!(doc.max_severity(), Some(AnomalySeverity::Critical));
    }
}
