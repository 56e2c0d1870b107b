//! Store-backed profiler
//!
//! Reads at most `PROFILE_MAX_ROWS` rows of the primary table in storage
//! order and summarizes every column. Cells are typed the way a CSV ingest
//! would type them: text that parses as a number counts as a number.

use std::collections::BTreeSet;

use regex::Regex;

use crate::observability::{log_event_with_fields, Event, ObservationScope};
use crate::planner::{Expr, SelectQuery};
use crate::store::{Cell, Store, StoreResult};

use super::summary::{round_stat, ColumnProfile, ColumnType, DataProfile, NumericStats};

/// Rows read for statistics
pub const PROFILE_MAX_ROWS: usize = 200_000;

/// Values sampled when testing whether a column holds dates
const TIME_SAMPLE_SIZE: usize = 200;

/// Share of sampled values that must look like dates
const TIME_MATCH_RATE: f64 = 0.9;

/// `|skew|` at or above this sets `skew_flag`
pub const SKEW_FLAG_THRESHOLD: f64 = 1.0;

const TIME_NAME_PATTERN: &str = r"(?i)(date|time|dt|timestamp|created|updated)";
const ISO_DATE_PATTERN: &str =
    r"^\d{4}[-/]\d{1,2}[-/]\d{1,2}([ T]\d{1,2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:?\d{2})?)?$";

/// Profiles the primary table of `store`
pub fn profile_store(store: &dyn Store) -> StoreResult<DataProfile> {
    let table = store.primary_table()?;
    let scope = ObservationScope::with_fields("PROFILE", &[("table", table.as_str())]);

    let columns = store.columns(&table)?;
    let count_sql = SelectQuery::from(&table)
        .select(Expr::CountStar, "row_count")
        .render(store.dialect());
    let row_count = store
        .query(&count_sql, 1)?
        .scalar()
        .and_then(|c| c.as_f64())
        .map(|v| v as u64)
        .unwrap_or(0);

    let select = columns
        .iter()
        .fold(SelectQuery::from(&table), |q, c| {
            q.select(Expr::column(&c.name), c.name.clone())
        })
        .render(store.dialect());
    let output = store.query(&select, PROFILE_MAX_ROWS)?;

    let time_name = Regex::new(TIME_NAME_PATTERN).ok();
    let iso_date = Regex::new(ISO_DATE_PATTERN).ok();

    let mut profile = DataProfile {
        table,
        row_count,
        column_count: columns.len() as u64,
        sampled: output.truncated,
        time_candidates: Vec::new(),
        columns: Default::default(),
    };

    for (i, column) in columns.iter().enumerate() {
        let cells: Vec<&Cell> = output.rows.iter().filter_map(|r| r.get(i)).collect();
        profile
            .columns
            .insert(column.name.clone(), profile_column(&cells));

        let name_match = time_name
            .as_ref()
            .map_or(false, |re| re.is_match(&column.name));
        if name_match || looks_like_dates(&cells, iso_date.as_ref()) {
            profile.time_candidates.push(column.name.clone());
        }
    }
    profile.time_candidates.sort();
    profile.time_candidates.dedup();

    let rows = profile.row_count.to_string();
    let cols = profile.column_count.to_string();
    log_event_with_fields(
        Event::ProfileComplete,
        &[("columns", cols.as_str()), ("rows", rows.as_str())],
    );
    scope.complete();

    Ok(profile)
}

/// Summarizes one column's cells
pub fn profile_column(cells: &[&Cell]) -> ColumnProfile {
    let total = cells.len();
    let present: Vec<&Cell> = cells.iter().copied().filter(|c| !c.is_missing()).collect();
    let missing_count = (total - present.len()) as u64;
    let missing_fraction = if total > 0 {
        round_stat(missing_count as f64 / total as f64)
    } else {
        0.0
    };

    let distinct: BTreeSet<String> = present.iter().map(|c| c.render().trim().to_string()).collect();
    let dtype = infer_type(&present);

    let stats = if dtype.is_numeric() {
        let values: Vec<f64> = present.iter().filter_map(|c| c.as_f64()).collect();
        numeric_stats(&values)
    } else {
        None
    };

    ColumnProfile {
        dtype,
        missing_count,
        missing_fraction,
        cardinality: distinct.len() as u64,
        stats,
    }
}

fn infer_type(present: &[&Cell]) -> ColumnType {
    if present.is_empty() {
        return ColumnType::Empty;
    }
    let mut all_int = true;
    for cell in present {
        match cell {
            Cell::Integer(_) => {}
            Cell::Real(_) => all_int = false,
            Cell::Text(s) => {
                let s = s.trim();
                if s.parse::<i64>().is_err() {
                    if s.parse::<f64>().map_or(true, |v| !v.is_finite()) {
                        return ColumnType::String;
                    }
                    all_int = false;
                }
            }
            Cell::Null => {}
        }
    }
    if all_int {
        ColumnType::Int
    } else {
        ColumnType::Float
    }
}

/// Distribution statistics, or `None` for an empty slice
pub fn numeric_stats(values: &[f64]) -> Option<NumericStats> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let m2 = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let m3 = sorted.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / n;

    let skew = if sorted.len() < 3 || m2 == 0.0 {
        0.0
    } else {
        let g1 = m3 / m2.powf(1.5);
        g1 * (n * (n - 1.0)).sqrt() / (n - 2.0)
    };

    let skew = round_stat(skew);
    Some(NumericStats {
        mean: round_stat(mean),
        std: round_stat(m2.sqrt()),
        min: round_stat(sorted[0]),
        max: round_stat(sorted[sorted.len() - 1]),
        p05: round_stat(quantile(&sorted, 0.05)),
        p50: round_stat(quantile(&sorted, 0.50)),
        p95: round_stat(quantile(&sorted, 0.95)),
        skew,
        skew_flag: skew.abs() >= SKEW_FLAG_THRESHOLD,
    })
}

/// Linear-interpolated quantile of sorted, non-empty values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

fn looks_like_dates(cells: &[&Cell], iso_date: Option<&Regex>) -> bool {
    let Some(re) = iso_date else {
        return false;
    };
    let sample: Vec<String> = cells
        .iter()
        .filter(|c| !c.is_missing())
        .take(TIME_SAMPLE_SIZE)
        .map(|c| c.render())
        .collect();
    if sample.is_empty() {
        return false;
    }
    let hits = sample.iter().filter(|v| re.is_match(v.trim())).count();
    hits as f64 / sample.len() as f64 >= TIME_MATCH_RATE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use rusqlite::Connection;

    #[test]
    fn test_quantiles_linear() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(&sorted, 0.5), 3.0);
        assert!((quantile(&sorted, 0.95) - 4.8).abs() < 1e-12);
        assert!((quantile(&sorted, 0.05) - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_stats_population_std_and_skew() {
        let stats = numeric_stats(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(stats.mean, 2.0);
        assert_eq!(stats.std, 0.816497);
        assert_eq!(stats.skew, 0.0);
        assert!(!stats.skew_flag);

        let skewed = numeric_stats(&[1.0, 1.0, 1.0, 1.0, 100.0]).unwrap();
        assert!(skewed.skew > 2.0);
        assert!(skewed.skew_flag);
        assert_eq!(skewed.max, 100.0);
    }

    #[test]
    fn test_short_series_has_zero_skew() {
        let stats = numeric_stats(&[1.0, 50.0]).unwrap();
        assert_eq!(stats.skew, 0.0);
        assert!(numeric_stats(&[]).is_none());
    }

    #[test]
    fn test_type_inference_from_text() {
        let a = Cell::Text("1".into());
        let b = Cell::Text("2.5".into());
        let c = Cell::Text("x".into());
        let empty = Cell::Text(" ".into());
        assert_eq!(infer_type(&[&a]), ColumnType::Int);
        assert_eq!(infer_type(&[&a, &b]), ColumnType::Float);
        assert_eq!(infer_type(&[&a, &c]), ColumnType::String);
        assert_eq!(profile_column(&[&empty]).dtype, ColumnType::Empty);
    }

    #[test]
    fn test_profile_store() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (order_day TEXT, shipped TEXT, amount TEXT, note TEXT);
             INSERT INTO t VALUES ('2024-01-01', '2024-01-03', '10', 'a');
             INSERT INTO t VALUES ('2024-01-02', '2024-01-04', '20', '');
             INSERT INTO t VALUES ('2024-01-02', '2024-01-05', '', 'a');",
        )
        .unwrap();
        let store = SqliteStore::new(&conn);
        let profile = profile_store(&store).unwrap();

        assert_eq!(profile.row_count, 3);
        assert_eq!(profile.column_count, 4);
        assert!(!profile.sampled);
        assert_eq!(profile.time_candidates, vec!["order_day", "shipped"]);

        let amount = profile.column("amount").unwrap();
        assert_eq!(amount.dtype, ColumnType::Int);
        assert_eq!(amount.missing_count, 1);
        assert_eq!(amount.missing_fraction, 0.333333);
        assert_eq!(amount.cardinality, 2);
        assert_eq!(amount.stats.unwrap().mean, 15.0);

        let note = profile.column("note").unwrap();
        assert_eq!(note.dtype, ColumnType::String);
        assert!(note.stats.is_none());
    }
}
