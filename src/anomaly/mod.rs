//! Normalized anomalies
//!
//! Every anomaly an interpreter emits has one fixed shape:
//!
//! ```text
//! {id, policy, metric, severity, direction, value,
//!  threshold: {warning, critical}, unit, evidence_keys, summary}
//! ```
//!
//! Records are built only through `make_normalized_anomaly`. An invalid
//! record is a hard error; nothing is emitted partially valid.

mod document;
mod errors;
mod normalized;

pub use document::AnomaliesDocument;
pub use errors::{AnomalyError, AnomalyErrorCode, AnomalyResult, Severity};
pub use normalized::{
    make_normalized_anomaly, AnomalyDraft, AnomalySeverity, Direction, NormalizedAnomaly,
};
