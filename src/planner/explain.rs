//! Explain output for planned queries
//!
//! Produces deterministic, human-readable explain output without executing
//! anything.

use std::fmt;

use serde::Serialize;

use super::dialect::Dialect;
use super::errors::PlannerError;
use super::planner::{GroupByPlanner, GroupBySpec};
use super::query::QuerySpec;

/// Explain plan output
#[derive(Debug, Clone, Serialize)]
pub struct ExplainPlan {
    /// Metric section
    pub section: String,
    /// Whether planning succeeded
    pub accepted: bool,
    /// `grouped`, `windowed_top_n` or `query`
    pub mode: Option<String>,
    /// `label = expression` per group
    pub groups: Vec<String>,
    /// `name = expression` per measure
    pub measures: Vec<String>,
    /// Rows kept per time bucket (windowed mode)
    pub top_n: Option<u64>,
    /// Rank measure (windowed mode)
    pub rank_by: Option<String>,
    /// Overall row limit
    pub limit: Option<u64>,
    /// Rendered query text
    pub sql: Option<String>,
    /// Rejection reason (if rejected)
    pub rejection_reason: Option<String>,
    /// Rejection error code (if rejected)
    pub rejection_code: Option<String>,
}

impl ExplainPlan {
    /// Explains a group-by spec, planning it against `table`
    pub fn for_group_by(spec: &GroupBySpec, table: &str, dialect: &dyn Dialect) -> Self {
        match GroupByPlanner::new(table).plan(spec) {
            Ok(query) => Self::from_plan(spec, &query, dialect),
            Err(err) => Self::from_error(&spec.section, &err),
        }
    }

    /// Creates an explain plan from a successful group-by plan
    pub fn from_plan(spec: &GroupBySpec, query: &QuerySpec, dialect: &dyn Dialect) -> Self {
        let groups = spec
            .group_exprs
            .iter()
            .enumerate()
            .map(|(i, e)| format!("{} = {}", spec.label(i), e.render(dialect)))
            .collect();
        let measures = spec
            .measures
            .iter()
            .map(|m| format!("{} = {}", m.name, m.expr.render(dialect)))
            .collect();
        let mode = match query {
            QuerySpec::Select(_) => "grouped",
            QuerySpec::TopN(_) => "windowed_top_n",
        };

        Self {
            section: spec.section.clone(),
            accepted: true,
            mode: Some(mode.to_string()),
            groups,
            measures,
            top_n: spec.windowed.as_ref().map(|w| w.top_n),
            rank_by: spec.windowed.as_ref().map(|w| w.rank_measure.clone()),
            limit: spec.limit,
            sql: Some(query.render(dialect)),
            rejection_reason: None,
            rejection_code: None,
        }
    }

    /// Explains a raw section query from a query-list policy
    pub fn from_query(section: &str, sql: &str) -> Self {
        Self {
            section: section.to_string(),
            accepted: true,
            mode: Some("query".to_string()),
            groups: Vec::new(),
            measures: Vec::new(),
            top_n: None,
            rank_by: None,
            limit: None,
            sql: Some(sql.to_string()),
            rejection_reason: None,
            rejection_code: None,
        }
    }

    /// Creates an explain plan from a planning error
    pub fn from_error(section: &str, err: &PlannerError) -> Self {
        Self {
            section: section.to_string(),
            accepted: false,
            mode: None,
            groups: Vec::new(),
            measures: Vec::new(),
            top_n: None,
            rank_by: None,
            limit: None,
            sql: None,
            rejection_reason: Some(err.message().to_string()),
            rejection_code: Some(err.code().code().to_string()),
        }
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN {} ===", self.section)?;

        if self.accepted {
            writeln!(f, "Status: ACCEPTED")?;
            if let Some(mode) = &self.mode {
                writeln!(f, "Mode: {}", mode)?;
            }
            if !self.groups.is_empty() {
                writeln!(f, "Groups:")?;
                for g in &self.groups {
                    writeln!(f, "  - {}", g)?;
                }
            }
            if !self.measures.is_empty() {
                writeln!(f, "Measures:")?;
                for m in &self.measures {
                    writeln!(f, "  - {}", m)?;
                }
            }
            if let (Some(n), Some(rank)) = (self.top_n, &self.rank_by) {
                writeln!(f, "Top-N: {} per bucket by {}", n, rank)?;
            }
            if let Some(limit) = self.limit {
                writeln!(f, "Limit: {}", limit)?;
            }
            if let Some(sql) = &self.sql {
                writeln!(f, "SQL: {}", sql)?;
            }
        } else {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
        }

        Ok(())
    }
}
