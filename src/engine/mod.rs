//! Analysis engine subsystem
//!
//! Runs one policy over the primary table of a store and produces flat metric
//! rows plus an analysis log. The engine is deterministic and read-only: it
//! issues only the queries the policy plans, in plan order.

mod engine;
mod errors;
mod log;
mod metrics;

pub use engine::{AnalysisEngine, AnalysisOutcome, AnalysisRequest, Explanation};
pub use errors::{EngineError, EngineResult};
pub use log::{AnalysisLog, PolicyBlock};
pub use metrics::{
    emit_grouped, emit_query_rows, MetricKey, MetricRow, MAX_METRIC_ROWS_PER_QUERY,
};
