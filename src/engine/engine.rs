//! Analysis engine
//!
//! Execution flow (strict order):
//! 1. `COUNT(*)` over the primary table -> `overall.row_count`
//! 2. Select the policy (explicit name or auto-selection)
//! 3. Instantiate it with the caller's role hints
//! 4. Grouping plan: plan and run each group-by. Query list: run each query.
//! 5. Flatten every result row into metric rows
//!
//! A failing group-by or query becomes a warning and the run continues. Only
//! selection failures and unresolved required roles abort.

use serde::Serialize;

use crate::observability::{log_event_with_fields, trace_event_with_fields, Event};
use crate::planner::{ExplainPlan, Expr, GroupByPlanner, SelectQuery};
use crate::policy::{
    GroupingPlanPolicy, Policy, PolicyChoice, PolicyError, PolicyRegistry, QueryListPolicy,
    SelectionTrace,
};
use crate::roles::{ResolvedRoles, RoleHints};
use crate::store::Store;

use super::errors::{EngineError, EngineResult};
use super::log::{AnalysisLog, PolicyBlock};
use super::metrics::{emit_grouped, emit_query_rows, MetricRow, MAX_METRIC_ROWS_PER_QUERY};

/// What to analyze and with which policy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisRequest {
    pub policy: PolicyChoice,
    pub hints: RoleHints,
}

impl AnalysisRequest {
    /// Auto-selection without hints
    pub fn auto() -> Self {
        Self::default()
    }

    /// Explicit policy, or auto-selection for `"auto"`
    pub fn with_policy(name: &str) -> Self {
        Self {
            policy: PolicyChoice::parse(name),
            hints: RoleHints::new(),
        }
    }

    pub fn hints(mut self, hints: RoleHints) -> Self {
        self.hints = hints;
        self
    }
}

/// Result of one analysis run
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    /// Metric rows in emission order
    pub metric_rows: Vec<MetricRow>,
    /// Policy, selection, executed queries and warnings
    pub log: AnalysisLog,
}

impl AnalysisOutcome {
    /// Name of the policy that ran
    pub fn policy_name(&self) -> &str {
        &self.log.policy.name
    }

    pub fn queries_executed(&self) -> &[String] {
        &self.log.queries_executed
    }

    pub fn warnings(&self) -> &[String] {
        &self.log.warnings
    }

    pub fn resolved_roles(&self) -> &ResolvedRoles {
        &self.log.policy.resolved_roles
    }

    pub fn selection(&self) -> &SelectionTrace {
        &self.log.selection
    }
}

/// Planned queries of a policy, rendered but not executed
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub table: String,
    pub shape: String,
    pub selection: SelectionTrace,
    pub resolved_roles: ResolvedRoles,
    pub plans: Vec<ExplainPlan>,
    pub warnings: Vec<String>,
}

/// Drives one analysis run over a store
pub struct AnalysisEngine<'a> {
    registry: &'a PolicyRegistry,
}

impl<'a> AnalysisEngine<'a> {
    pub fn new(registry: &'a PolicyRegistry) -> Self {
        Self { registry }
    }

    /// Runs the analysis. Deterministic: same data, policy and hints yield the
    /// same metric rows and queries.
    pub fn run(&self, store: &dyn Store, request: &AnalysisRequest) -> EngineResult<AnalysisOutcome> {
        let table = store.primary_table()?;
        let columns: Vec<String> = store
            .columns(&table)?
            .into_iter()
            .map(|c| c.name)
            .collect();

        let mut metric_rows = Vec::new();
        let mut queries_executed = Vec::new();

        let count_sql = SelectQuery::from(&table)
            .select(Expr::CountStar, "row_count")
            .render(store.dialect());
        let count = store.query(&count_sql, 1)?;
        let row_count = count.scalar().map(|c| c.render()).unwrap_or_else(|| "0".to_string());
        queries_executed.push(count_sql);
        metric_rows.push(MetricRow::new("overall", "row_count", row_count));

        let selection = self
            .registry
            .select(&request.policy, &columns, &request.hints)?;
        let definition = self.registry.get(&selection.selected)?;
        let descriptor = definition.describe();
        let policy = definition.instantiate(&request.hints);

        log_event_with_fields(
            Event::PolicySelected,
            &[
                ("mode", selection.mode.as_str()),
                ("policy", selection.selected.as_str()),
                ("shape", policy.shape()),
            ],
        );

        let mut log = AnalysisLog::new(PolicyBlock::from_descriptor(&descriptor, policy.shape()), selection);
        log.queries_executed = queries_executed;

        match policy {
            Policy::GroupingPlan(p) => {
                self.run_grouping_plan(p.as_ref(), store, &table, &columns, &mut metric_rows, &mut log)
            }
            Policy::QueryList(mut p) => {
                self.run_query_list(p.as_mut(), store, &mut metric_rows, &mut log)?
            }
        }

        Ok(AnalysisOutcome { metric_rows, log })
    }

    /// Selects and plans the policy without running its aggregate queries.
    /// Query-list policies still inspect the schema to resolve roles.
    pub fn explain(&self, store: &dyn Store, request: &AnalysisRequest) -> EngineResult<Explanation> {
        let table = store.primary_table()?;
        let columns = store.column_names()?;

        let selection = self
            .registry
            .select(&request.policy, &columns, &request.hints)?;
        let definition = self.registry.get(&selection.selected)?;
        let policy = definition.instantiate(&request.hints);
        let shape = policy.shape().to_string();

        let mut warnings = Vec::new();
        let mut resolved_roles = ResolvedRoles::new();
        let plans = match policy {
            Policy::GroupingPlan(p) => {
                let plan = p.build_plan(&columns);
                warnings = plan.warnings;
                plan.groupbys
                    .iter()
                    .map(|spec| ExplainPlan::for_group_by(spec, &table, store.dialect()))
                    .collect()
            }
            Policy::QueryList(mut p) => {
                let queries = p
                    .build_queries(store)
                    .map_err(|e| resolution_error(p.as_ref(), e))?;
                resolved_roles = p.resolved_roles().clone();
                queries
                    .iter()
                    .map(|q| ExplainPlan::from_query(&q.section, &q.query.render(store.dialect())))
                    .collect()
            }
        };

        Ok(Explanation {
            table,
            shape,
            selection,
            resolved_roles,
            plans,
            warnings,
        })
    }

    fn run_grouping_plan(
        &self,
        policy: &dyn GroupingPlanPolicy,
        store: &dyn Store,
        table: &str,
        columns: &[String],
        rows: &mut Vec<MetricRow>,
        log: &mut AnalysisLog,
    ) {
        let plan = policy.build_plan(columns);
        log.warnings.extend(plan.warnings.iter().cloned());

        let groupbys = plan.groupbys.len().to_string();
        log_event_with_fields(
            Event::PlanBuilt,
            &[("groupbys", groupbys.as_str()), ("policy", policy.name())],
        );

        let planner = GroupByPlanner::new(table);
        for spec in &plan.groupbys {
            let result = planner
                .plan(spec)
                .map_err(|e| e.to_string())
                .and_then(|query| {
                    let sql = query.render(store.dialect());
                    store
                        .query(&sql, MAX_METRIC_ROWS_PER_QUERY)
                        .map(|out| (sql, out))
                        .map_err(|e| e.to_string())
                });

            match result {
                Ok((sql, output)) => {
                    let n = output.len().to_string();
                    trace_event_with_fields(
                        Event::QueryExecuted,
                        &[("rows", n.as_str()), ("section", spec.section.as_str())],
                    );
                    log.queries_executed.push(sql);
                    emit_grouped(rows, spec, &output);
                }
                Err(e) => {
                    log_event_with_fields(
                        Event::QueryFailed,
                        &[("reason", e.as_str()), ("section", spec.section.as_str())],
                    );
                    log.warnings
                        .push(format!("Failed groupby '{}': {}", spec.section, e));
                }
            }
        }
    }

    fn run_query_list(
        &self,
        policy: &mut dyn QueryListPolicy,
        store: &dyn Store,
        rows: &mut Vec<MetricRow>,
        log: &mut AnalysisLog,
    ) -> EngineResult<()> {
        let queries = policy
            .build_queries(store)
            .map_err(|e| resolution_error(policy, e))?;
        log.policy.resolved_roles = policy.resolved_roles().clone();

        let n_queries = queries.len().to_string();
        log_event_with_fields(
            Event::PlanBuilt,
            &[("policy", policy.name()), ("queries", n_queries.as_str())],
        );

        for q in &queries {
            let sql = q.query.render(store.dialect());
            match store.query(&sql, MAX_METRIC_ROWS_PER_QUERY) {
                Ok(output) => {
                    let n = output.len().to_string();
                    trace_event_with_fields(
                        Event::QueryExecuted,
                        &[("rows", n.as_str()), ("section", q.section.as_str())],
                    );
                    log.queries_executed.push(sql);
                    emit_query_rows(rows, &q.section, &output);
                }
                Err(e) => {
                    let reason = e.to_string();
                    log_event_with_fields(
                        Event::QueryFailed,
                        &[("reason", reason.as_str()), ("section", q.section.as_str())],
                    );
                    log.warnings
                        .push(format!("Failed query '{}': {}", q.section, reason));
                }
            }
        }

        Ok(())
    }
}

/// Logs a failed role resolution and wraps it with the partial roles
fn resolution_error(policy: &dyn QueryListPolicy, e: PolicyError) -> EngineError {
    let reason = e.to_string();
    log_event_with_fields(
        Event::PolicyResolutionFailed,
        &[("policy", policy.name()), ("reason", reason.as_str())],
    );
    match EngineError::from(e) {
        EngineError::Policy(source) => EngineError::Resolution {
            policy: policy.name().to_string(),
            source,
            resolved_roles: policy.resolved_roles().clone(),
        },
        other => other,
    }
}
