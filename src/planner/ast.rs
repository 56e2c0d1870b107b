//! Typed expression AST
//!
//! Every query the engine runs is built from these nodes. Identifiers are
//! quoted by the dialect at render time and no string literal is ever built
//! from dataset or caller data.

use std::fmt;

use super::dialect::Dialect;
use crate::store::format_real;

/// A typed scalar or aggregate expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Physical column reference
    Column(String),
    /// `COUNT(*)`
    CountStar,
    /// `COUNT(DISTINCT x)`
    CountDistinct(Box<Expr>),
    /// `SUM(x)`
    Sum(Box<Expr>),
    /// `AVG(x)`
    Avg(Box<Expr>),
    /// `CAST(x AS REAL)`
    CastReal(Box<Expr>),
    /// `COALESCE(x, default)`
    Coalesce(Box<Expr>, f64),
    /// `num / den`, NULL when `den = 0`
    Ratio {
        numerator: Box<Expr>,
        denominator: Box<Expr>,
    },
    /// Calendar year of a date-like value
    YearBucket(Box<Expr>),
    /// Calendar month (`YYYY-MM`) of a date-like value
    MonthBucket(Box<Expr>),
    /// Reference to a select-list alias
    Alias(String),
    /// Numeric literal
    Number(f64),
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    pub fn alias(name: impl Into<String>) -> Self {
        Expr::Alias(name.into())
    }

    pub fn count_distinct(inner: Expr) -> Self {
        Expr::CountDistinct(Box::new(inner))
    }

    pub fn sum(inner: Expr) -> Self {
        Expr::Sum(Box::new(inner))
    }

    pub fn avg(inner: Expr) -> Self {
        Expr::Avg(Box::new(inner))
    }

    pub fn cast_real(inner: Expr) -> Self {
        Expr::CastReal(Box::new(inner))
    }

    pub fn coalesce(inner: Expr, default: f64) -> Self {
        Expr::Coalesce(Box::new(inner), default)
    }

    pub fn ratio(numerator: Expr, denominator: Expr) -> Self {
        Expr::Ratio {
            numerator: Box::new(numerator),
            denominator: Box::new(denominator),
        }
    }

    pub fn year_bucket(inner: Expr) -> Self {
        Expr::YearBucket(Box::new(inner))
    }

    pub fn month_bucket(inner: Expr) -> Self {
        Expr::MonthBucket(Box::new(inner))
    }

    /// `COALESCE(SUM(CAST(col AS REAL)), 0.0)`: a numeric total that is never NULL
    pub fn real_total(column: impl Into<String>) -> Self {
        Expr::coalesce(Expr::sum(Expr::cast_real(Expr::column(column))), 0.0)
    }

    /// Returns true if the expression contains an aggregate
    pub fn is_aggregate(&self) -> bool {
        match self {
            Expr::CountStar | Expr::CountDistinct(_) | Expr::Sum(_) | Expr::Avg(_) => true,
            Expr::CastReal(e) | Expr::Coalesce(e, _) | Expr::YearBucket(e) | Expr::MonthBucket(e) => {
                e.is_aggregate()
            }
            Expr::Ratio {
                numerator,
                denominator,
            } => numerator.is_aggregate() || denominator.is_aggregate(),
            Expr::Column(_) | Expr::Alias(_) | Expr::Number(_) => false,
        }
    }

    /// Renders the expression in the given dialect
    pub fn render(&self, dialect: &dyn Dialect) -> String {
        match self {
            Expr::Column(name) | Expr::Alias(name) => dialect.quote_ident(name),
            Expr::CountStar => "COUNT(*)".to_string(),
            Expr::CountDistinct(e) => format!("COUNT(DISTINCT {})", e.render(dialect)),
            Expr::Sum(e) => format!("SUM({})", e.render(dialect)),
            Expr::Avg(e) => format!("AVG({})", e.render(dialect)),
            Expr::CastReal(e) => format!("CAST({} AS REAL)", e.render(dialect)),
            Expr::Coalesce(e, default) => {
                format!("COALESCE({}, {})", e.render(dialect), render_number(*default))
            }
            Expr::Ratio {
                numerator,
                denominator,
            } => {
                let den = denominator.render(dialect);
                format!(
                    "CASE WHEN {} = 0 THEN NULL ELSE {} * 1.0 / {} END",
                    den,
                    numerator.render(dialect),
                    den
                )
            }
            Expr::YearBucket(e) => dialect.year_bucket(&e.render(dialect)),
            Expr::MonthBucket(e) => dialect.month_bucket(&e.render(dialect)),
            Expr::Number(v) => render_number(*v),
        }
    }
}

fn render_number(v: f64) -> String {
    if v.is_finite() {
        format_real(v)
    } else {
        "NULL".to_string()
    }
}

/// A named aggregate: `{name, expression}`
#[derive(Debug, Clone, PartialEq)]
pub struct Measure {
    /// Output column name
    pub name: String,
    /// Aggregate expression
    pub expr: Expr,
}

impl Measure {
    pub fn new(name: impl Into<String>, expr: Expr) -> Self {
        Self {
            name: name.into(),
            expr,
        }
    }

    /// `n = COUNT(*)`
    pub fn count() -> Self {
        Self::new("n", Expr::CountStar)
    }
}

/// One select-list entry: `expr AS alias`
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: String,
}

impl SelectItem {
    pub fn new(expr: Expr, alias: impl Into<String>) -> Self {
        Self {
            expr,
            alias: alias.into(),
        }
    }

    pub fn render(&self, dialect: &dyn Dialect) -> String {
        format!("{} AS {}", self.expr.render(dialect), dialect.quote_ident(&self.alias))
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One ORDER BY term
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerm {
    pub expr: Expr,
    pub direction: SortDirection,
}

impl OrderTerm {
    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            direction: SortDirection::Desc,
        }
    }

    pub fn render(&self, dialect: &dyn Dialect) -> String {
        format!("{} {}", self.expr.render(dialect), self.direction)
    }
}
