//! Run pipeline
//!
//! Ties the subsystems together for one run:
//!
//! ```text
//! profile (optional) -> engine -> interpreter -> RunReport -> ArtifactWriter
//! ```
//!
//! `run_pipeline` never touches the filesystem; artifacts are written only
//! through `ArtifactWriter`.

mod artifacts;
mod errors;
mod run;

pub use artifacts::{
    reproduce_sql, to_sorted_json, ArtifactWriter, ANALYSIS_LOG_JSON, ANOMALIES_JSON,
    DATA_PROFILE_JSON, INTERPRETATION_JSON, METRICS_CSV, REPRODUCE_SQL,
};
pub use errors::{ArtifactError, ArtifactResult, PipelineError, PipelineResult};
pub use run::{fingerprint, run_pipeline, RunReport};
