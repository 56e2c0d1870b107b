//! Data profiling subsystem
//!
//! A `DataProfile` is a per-column summary of the primary table: type,
//! missingness, cardinality and, for numeric columns, distribution
//! statistics. Interpreters use it only as summary statistics and never see
//! row-level data.

mod profiler;
mod summary;

pub use profiler::{numeric_stats, profile_column, profile_store, PROFILE_MAX_ROWS, SKEW_FLAG_THRESHOLD};
pub use summary::{round_stat, ColumnProfile, ColumnType, DataProfile, NumericStats, PROFILE_PRECISION};
