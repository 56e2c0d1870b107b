//! Renderable query shapes
//!
//! Rendering is a pure function of the query and the dialect: the same
//! query always produces the same text.

use super::ast::{Expr, OrderTerm, SelectItem};
use super::dialect::Dialect;

/// Name of the row-number column inside a windowed top-N query
pub const RANK_COLUMN: &str = "_rn";

/// A single `SELECT ... FROM ... [GROUP BY] [ORDER BY] [LIMIT]` statement
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub projections: Vec<SelectItem>,
    pub from: String,
    pub group_by: Vec<Expr>,
    pub order_by: Vec<OrderTerm>,
    pub limit: Option<u64>,
}

impl SelectQuery {
    /// Starts a query over `from`
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            projections: Vec::new(),
            from: table.into(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    pub fn select(mut self, expr: Expr, alias: impl Into<String>) -> Self {
        self.projections.push(SelectItem::new(expr, alias));
        self
    }

    pub fn group_by(mut self, expr: Expr) -> Self {
        self.group_by.push(expr);
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

    /// Output column names in select order
    pub fn output_columns(&self) -> Vec<String> {
        self.projections.iter().map(|p| p.alias.clone()).collect()
    }

    pub fn render(&self, dialect: &dyn Dialect) -> String {
        let projections: Vec<String> = self.projections.iter().map(|p| p.render(dialect)).collect();
        let mut sql = format!(
            "SELECT {} FROM {}",
            projections.join(", "),
            dialect.quote_ident(&self.from)
        );

        if !self.group_by.is_empty() {
            let groups: Vec<String> = self.group_by.iter().map(|g| g.render(dialect)).collect();
            sql.push_str(" GROUP BY ");
            sql.push_str(&groups.join(", "));
        }

        if !self.order_by.is_empty() {
            let terms: Vec<String> = self.order_by.iter().map(|o| o.render(dialect)).collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        sql
    }
}

/// Windowed top-N: aggregate, rank within each partition, keep the top N.
///
/// Rendered as a common table expression. The rank uses the aggregate's
/// alias, with the tie-break columns ordered ascending so equal ranks
/// resolve the same way on every run.
#[derive(Debug, Clone, PartialEq)]
pub struct TopNPerPartition {
    /// Grouped aggregate without ORDER BY or LIMIT
    pub grouped: SelectQuery,
    /// Alias partitioning the ranking (the time bucket)
    pub partition_by: String,
    /// Alias of the measure ranked descending
    pub rank_by: String,
    /// Aliases breaking rank ties, ascending
    pub tie_break: Vec<String>,
    /// Rows kept per partition
    pub n: u64,
    /// Overall row limit
    pub limit: Option<u64>,
}

impl TopNPerPartition {
    /// Output column names (the grouped query's columns, rank column excluded)
    pub fn output_columns(&self) -> Vec<String> {
        self.grouped.output_columns()
    }

    pub fn render(&self, dialect: &dyn Dialect) -> String {
        let q = |s: &str| dialect.quote_ident(s);

        let mut window_order = vec![format!("{} DESC", q(&self.rank_by))];
        window_order.extend(self.tie_break.iter().map(|t| format!("{} ASC", q(t))));

        let columns: Vec<String> = self.output_columns().iter().map(|c| q(c)).collect();

        let mut final_order = vec![
            format!("{} ASC", q(&self.partition_by)),
            format!("{} DESC", q(&self.rank_by)),
        ];
        final_order.extend(self.tie_break.iter().map(|t| format!("{} ASC", q(t))));

        let mut sql = format!(
            "WITH grouped AS ({}), ranked AS (SELECT *, ROW_NUMBER() OVER (PARTITION BY {} ORDER BY {}) AS {} FROM grouped) SELECT {} FROM ranked WHERE {} <= {} ORDER BY {}",
            self.grouped.render(dialect),
            q(&self.partition_by),
            window_order.join(", "),
            q(RANK_COLUMN),
            columns.join(", "),
            q(RANK_COLUMN),
            self.n,
            final_order.join(", "),
        );

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        sql
    }
}

/// Any query the planner can emit
#[derive(Debug, Clone, PartialEq)]
pub enum QuerySpec {
    Select(SelectQuery),
    TopN(TopNPerPartition),
}

impl QuerySpec {
    pub fn render(&self, dialect: &dyn Dialect) -> String {
        match self {
            QuerySpec::Select(q) => q.render(dialect),
            QuerySpec::TopN(q) => q.render(dialect),
        }
    }

    pub fn output_columns(&self) -> Vec<String> {
        match self {
            QuerySpec::Select(q) => q.output_columns(),
            QuerySpec::TopN(q) => q.output_columns(),
        }
    }
}

impl From<SelectQuery> for QuerySpec {
    fn from(q: SelectQuery) -> Self {
        QuerySpec::Select(q)
    }
}

impl From<TopNPerPartition> for QuerySpec {
    fn from(q: TopNPerPartition) -> Self {
        QuerySpec::TopN(q)
    }
}
