//! Interpretation subsystem
//!
//! Turns the metric rows and analysis log of one run into findings, caveats
//! and normalized anomalies. Interpreters are keyed by policy name; a policy
//! without a dedicated interpreter falls back to the generic one.
//!
//! # Rules
//!
//! 1. Interpreters are pure: same rows and log, same interpretation
//! 2. Every evidence key names an emitted metric row (`<section>.<key>`)
//! 3. Severity cutoffs come only from the policy's declared thresholds
//! 4. Findings are never empty; a sentinel stands in when nothing qualifies

mod errors;
mod generic;
mod interpretation;
mod orders;
mod rules;
mod sales;
mod table;

pub use errors::{InterpretError, InterpretResult};
pub use generic::{GenericInterpreter, DEFAULT_MEDIAN_RATIO, MIN_PERIODS, WATCHED_METRICS};
pub use interpretation::{Finding, Interpretation, InterpretationMetadata, Mechanism};
pub use orders::{OrdersInterpreter, MIN_ORDERS_FOR_ANOMALIES};
pub use rules::{
    classify_high, classify_low, percent, Confidence, Coverage, CoverageGate, LeverageCutoffs,
    ThresholdLookup,
};
pub use sales::SalesInterpreter;
pub use table::{row_evidence, MetricTable, Record};

use crate::engine::{AnalysisLog, MetricRow};
use crate::observability::{log_event_with_fields, trace_event_with_fields, Event};
use crate::policy::{ORDERS_POLICY_NAME, SALES_POLICY_NAME};

/// Policy-specific interpretation of metric rows
pub trait Interpreter {
    /// Name of the policy this interpreter reads
    fn policy(&self) -> &str;

    fn interpret(&self, rows: &[MetricRow], log: &AnalysisLog) -> InterpretResult<Interpretation>;
}

/// Interpreter for `policy`, falling back to the generic interpreter
pub fn interpreter_for(policy: &str) -> Box<dyn Interpreter> {
    match policy {
        ORDERS_POLICY_NAME => Box::new(OrdersInterpreter::new()),
        SALES_POLICY_NAME => Box::new(SalesInterpreter::new()),
        _ => Box::new(GenericInterpreter::new()),
    }
}

/// Interprets one run with the interpreter of the policy that produced it
pub fn interpret(rows: &[MetricRow], log: &AnalysisLog) -> InterpretResult<Interpretation> {
    let interpreter = interpreter_for(&log.policy.name);
    let interpretation = interpreter.interpret(rows, log)?;

    for anomaly in &interpretation.metadata.anomalies_normalized {
        trace_event_with_fields(
            Event::AnomalyEmitted,
            &[
                ("id", anomaly.id()),
                ("severity", anomaly.severity().as_str()),
            ],
        );
    }

    let findings = interpretation.findings.len().to_string();
    let anomalies = interpretation.metadata.anomalies_normalized.len().to_string();
    log_event_with_fields(
        Event::InterpretComplete,
        &[
            ("anomalies", anomalies.as_str()),
            ("findings", findings.as_str()),
            ("interpreter", interpreter.policy()),
            ("policy", log.policy.name.as_str()),
        ],
    );

    Ok(interpretation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{PolicyDefinition, SelectionTrace, GENERIC_POLICY_NAME};
    use crate::policy::{OrdersDefinition, SalesDefinition};
    use crate::engine::PolicyBlock;

    #[test]
    fn test_interpreter_lookup() {
        assert_eq!(interpreter_for("orders_v1").policy(), ORDERS_POLICY_NAME);
        assert_eq!(interpreter_for("sales_v1").policy(), SALES_POLICY_NAME);
        assert_eq!(interpreter_for("generic_tabular").policy(), GENERIC_POLICY_NAME);
        assert_eq!(interpreter_for("custom_v2").policy(), GENERIC_POLICY_NAME);
    }

    #[test]
    fn test_interpret_dispatches_on_log_policy() {
        let block = PolicyBlock::from_descriptor(&OrdersDefinition::default().describe(), "query_list");
        let log = AnalysisLog::new(block, SelectionTrace::explicit("orders_v1"));
        let out = interpret(&[], &log).unwrap();
        assert!(!out.findings.is_empty());
        assert!(out.metadata.anomalies_normalized.is_empty());

        let block = PolicyBlock::from_descriptor(&SalesDefinition::default().describe(), "query_list");
        let log = AnalysisLog::new(block, SelectionTrace::explicit("sales_v1"));
        assert!(interpret(&[], &log).is_ok());
    }
}
