//! Query planning subsystem for tabsight
//!
//! Every query the engine runs is built here from typed expressions and
//! rendered through a `Dialect`.
//!
//! # Design Principles
//!
//! - Deterministic: same spec, same query text
//! - Quoted: identifiers always pass through `Dialect::quote_ident`
//! - Bounded: grouped queries carry a limit, windowed queries keep N rows
//!   per time bucket
//! - Tie-broken: every ORDER BY ends on the group keys

mod ast;
mod dialect;
mod errors;
mod explain;
mod planner;
mod query;

pub use ast::{Expr, Measure, OrderTerm, SelectItem, SortDirection};
pub use dialect::{Dialect, SqliteDialect};
pub use errors::{PlannerError, PlannerErrorCode, PlannerResult};
pub use explain::ExplainPlan;
pub use planner::{GroupByPlanner, GroupBySpec, WindowedTopN};
pub use query::{QuerySpec, SelectQuery, TopNPerPartition, RANK_COLUMN};
