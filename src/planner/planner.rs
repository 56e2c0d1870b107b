//! Group-by planning
//!
//! A `GroupBySpec` describes one grouped query. The planner validates it and
//! lowers it to an immutable `QuerySpec`. Group expressions are aliased
//! `g0`, `g1`, ... and measures keep their own names.

use super::ast::{Expr, Measure, OrderTerm};
use super::errors::{PlannerError, PlannerResult};
use super::query::{QuerySpec, SelectQuery, TopNPerPartition, RANK_COLUMN};

/// Windowed top-N mode of a group-by
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedTopN {
    /// Rows kept per time bucket
    pub top_n: u64,
    /// Time bucket expression. Must equal the first group expression.
    pub time_bucket: Expr,
    /// Measure the rows are ranked by, descending
    pub rank_measure: String,
}

/// One grouped query
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBySpec {
    /// Metric section the results are emitted under
    pub section: String,
    /// Human labels for the group expressions, in order
    pub group_labels: Vec<String>,
    /// Group expressions, in order
    pub group_exprs: Vec<Expr>,
    /// Aggregates computed per group
    pub measures: Vec<Measure>,
    /// Explicit ordering. Group aliases are appended as a tie-break.
    pub order_by: Vec<OrderTerm>,
    /// Overall row limit
    pub limit: Option<u64>,
    /// Windowed top-N per time bucket
    pub windowed: Option<WindowedTopN>,
}

impl GroupBySpec {
    /// Creates a spec with no measures, ordering, limit or window
    pub fn new(section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            group_labels: Vec::new(),
            group_exprs: Vec::new(),
            measures: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            windowed: None,
        }
    }

    pub fn group(mut self, label: impl Into<String>, expr: Expr) -> Self {
        self.group_labels.push(label.into());
        self.group_exprs.push(expr);
        self
    }

    pub fn measures(mut self, measures: Vec<Measure>) -> Self {
        self.measures = measures;
        self
    }

    pub fn order_by(mut self, term: OrderTerm) -> Self {
        self.order_by.push(term);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn windowed(mut self, window: WindowedTopN) -> Self {
        self.windowed = Some(window);
        self
    }

    /// Alias of the i-th group expression
    pub fn group_alias(i: usize) -> String {
        format!("g{}", i)
    }

    /// Label of the i-th group expression, falling back to its alias
    pub fn label(&self, i: usize) -> String {
        self.group_labels
            .get(i)
            .cloned()
            .unwrap_or_else(|| Self::group_alias(i))
    }

    /// Names of the measures, in order
    pub fn measure_names(&self) -> Vec<&str> {
        self.measures.iter().map(|m| m.name.as_str()).collect()
    }

    /// Validates the spec without rendering it
    pub fn validate(&self) -> PlannerResult<()> {
        let in_section = |e: PlannerError| e.in_section(self.section.clone());

        if self.group_exprs.is_empty() {
            return Err(in_section(PlannerError::plan_invalid(
                "Group-by needs at least one group expression",
            )));
        }
        if self.group_labels.len() != self.group_exprs.len() {
            return Err(in_section(PlannerError::plan_invalid(format!(
                "{} group labels for {} group expressions",
                self.group_labels.len(),
                self.group_exprs.len()
            ))));
        }
        if self.measures.is_empty() {
            return Err(PlannerError::no_measures(self.section.clone()));
        }
        if self.limit == Some(0) {
            return Err(PlannerError::limit_required(self.section.clone()));
        }

        let mut names: Vec<&str> = Vec::new();
        for m in &self.measures {
            if m.name.is_empty() || m.name == RANK_COLUMN || is_group_alias(&m.name) {
                return Err(in_section(PlannerError::plan_invalid(format!(
                    "Measure name '{}' is reserved",
                    m.name
                ))));
            }
            if names.contains(&m.name.as_str()) {
                return Err(in_section(PlannerError::plan_invalid(format!(
                    "Duplicate measure '{}'",
                    m.name
                ))));
            }
            names.push(&m.name);
        }

        if let Some(window) = &self.windowed {
            if window.top_n == 0 {
                return Err(PlannerError::limit_required(self.section.clone()));
            }
            if self.group_exprs.first() != Some(&window.time_bucket) {
                return Err(in_section(PlannerError::plan_invalid(
                    "Windowed top-N time bucket must be the first group expression",
                )));
            }
            if !names.contains(&window.rank_measure.as_str()) {
                return Err(in_section(PlannerError::plan_invalid(format!(
                    "Rank measure '{}' is not a measure of this group-by",
                    window.rank_measure
                ))));
            }
        }

        Ok(())
    }
}

fn is_group_alias(name: &str) -> bool {
    name.strip_prefix('g')
        .map(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

/// Lowers group-by specs over one table into queries
pub struct GroupByPlanner {
    table: String,
}

impl GroupByPlanner {
    /// Creates a planner for `table`
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    /// Plans a group-by, returning an immutable query or error.
    ///
    /// Deterministic: the same spec always yields the same query.
    pub fn plan(&self, spec: &GroupBySpec) -> PlannerResult<QuerySpec> {
        spec.validate()?;

        let mut grouped = SelectQuery::from(self.table.clone());
        for (i, expr) in spec.group_exprs.iter().enumerate() {
            grouped = grouped.select(expr.clone(), GroupBySpec::group_alias(i));
        }
        for m in &spec.measures {
            grouped = grouped.select(m.expr.clone(), m.name.clone());
        }
        for expr in &spec.group_exprs {
            grouped = grouped.group_by(expr.clone());
        }

        if let Some(window) = &spec.windowed {
            let tie_break = (1..spec.group_exprs.len())
                .map(GroupBySpec::group_alias)
                .collect();
            return Ok(QuerySpec::TopN(TopNPerPartition {
                grouped,
                partition_by: GroupBySpec::group_alias(0),
                rank_by: window.rank_measure.clone(),
                tie_break,
                n: window.top_n,
                limit: spec.limit,
            }));
        }

        for term in &spec.order_by {
            grouped = grouped.order_by(term.clone());
        }
        for (i, expr) in spec.group_exprs.iter().enumerate() {
            let alias = Expr::Alias(GroupBySpec::group_alias(i));
            let already_ordered = spec
                .order_by
                .iter()
                .any(|t| t.expr == alias || &t.expr == expr);
            if !already_ordered {
                grouped = grouped.order_by(OrderTerm::asc(alias));
            }
        }
        if let Some(limit) = spec.limit {
            grouped = grouped.limit(limit);
        }

        Ok(QuerySpec::Select(grouped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{PlannerErrorCode, SqliteDialect};

    fn time_spec() -> GroupBySpec {
        GroupBySpec::new("time")
            .group("year", Expr::column("year"))
            .measures(vec![Measure::count(), Measure::new("sum_sales", Expr::sum(Expr::column("sales")))])
            .limit(250)
    }

    #[test]
    fn test_plan_grouped_adds_tie_break() {
        let spec = GroupBySpec::new("categorical")
            .group("category", Expr::column("category"))
            .measures(vec![Measure::count()])
            .order_by(OrderTerm::desc(Expr::alias("n")))
            .limit(250);
        let sql = GroupByPlanner::new("data").plan(&spec).unwrap().render(&SqliteDialect);
        assert_eq!(
            sql,
            "SELECT \"category\" AS \"g0\", COUNT(*) AS \"n\" FROM \"data\" GROUP BY \"category\" ORDER BY \"n\" DESC, \"g0\" ASC LIMIT 250"
        );
    }

    #[test]
    fn test_plan_does_not_repeat_ordered_group() {
        let spec = time_spec().order_by(OrderTerm::asc(Expr::column("year")));
        let sql = GroupByPlanner::new("data").plan(&spec).unwrap().render(&SqliteDialect);
        assert!(sql.ends_with("ORDER BY \"year\" ASC LIMIT 250"));
    }

    #[test]
    fn test_plan_windowed() {
        let year = Expr::column("year");
        let spec = GroupBySpec::new("time_x_category")
            .group("year", year.clone())
            .group("category", Expr::column("category"))
            .measures(vec![Measure::count(), Measure::new("sum_sales", Expr::sum(Expr::column("sales")))])
            .limit(250)
            .windowed(WindowedTopN {
                top_n: 10,
                time_bucket: year,
                rank_measure: "sum_sales".into(),
            });
        let query = GroupByPlanner::new("data").plan(&spec).unwrap();
        assert!(matches!(query, QuerySpec::TopN(_)));
        let sql = query.render(&SqliteDialect);
        assert!(sql.contains("PARTITION BY \"g0\" ORDER BY \"sum_sales\" DESC, \"g1\" ASC"));
        assert!(sql.contains("WHERE \"_rn\" <= 10"));
    }

    #[test]
    fn test_windowed_bucket_must_lead() {
        let spec = GroupBySpec::new("bad")
            .group("category", Expr::column("category"))
            .group("year", Expr::column("year"))
            .measures(vec![Measure::count()])
            .windowed(WindowedTopN {
                top_n: 10,
                time_bucket: Expr::column("year"),
                rank_measure: "n".into(),
            });
        let err = spec.validate().unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::TabsightPlanInvalid);
    }

    #[test]
    fn test_unknown_rank_measure() {
        let year = Expr::column("year");
        let spec = time_spec().windowed(WindowedTopN {
            top_n: 3,
            time_bucket: year,
            rank_measure: "sum_profit".into(),
        });
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_no_measures() {
        let spec = GroupBySpec::new("empty").group("year", Expr::column("year"));
        assert_eq!(
            spec.validate().unwrap_err().code(),
            PlannerErrorCode::TabsightPlanNoMeasures
        );
    }

    #[test]
    fn test_zero_limit() {
        let spec = time_spec().limit(0);
        assert_eq!(
            spec.validate().unwrap_err().code(),
            PlannerErrorCode::TabsightPlanLimitRequired
        );
    }

    #[test]
    fn test_reserved_measure_names() {
        let spec = GroupBySpec::new("x")
            .group("year", Expr::column("year"))
            .measures(vec![Measure::new("g0", Expr::CountStar)]);
        assert!(spec.validate().is_err());
        assert!(is_group_alias("g12"));
        assert!(!is_group_alias("gross"));
    }

    #[test]
    fn test_planning_is_deterministic() {
        let planner = GroupByPlanner::new("data");
        let a = planner.plan(&time_spec()).unwrap().render(&SqliteDialect);
        let b = planner.plan(&time_spec()).unwrap().render(&SqliteDialect);
        assert_eq!(a, b);
    }
}
