//! Metric rows
//!
//! `MetricRow {section, key, value}` is the stable external contract: three
//! strings per row, in query order, never re-sorted. Keys take one of three
//! forms, modelled by `MetricKey`:
//!
//! ```text
//! row_count                        scalar
//! year=2023|category=Tech:sum_sales grouped
//! row0:revenue                     query-list row
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::planner::GroupBySpec;
use crate::store::QueryOutput;

/// Rows kept per query
pub const MAX_METRIC_ROWS_PER_QUERY: usize = 1000;

/// One `(section, key, value)` record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRow {
    pub section: String,
    pub key: String,
    pub value: String,
}

impl MetricRow {
    pub fn new(section: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parsed key
    pub fn metric_key(&self) -> MetricKey {
        MetricKey::parse(&self.key)
    }

    /// Numeric value, if the value parses as a finite number
    pub fn numeric(&self) -> Option<f64> {
        self.value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// `<section>.<key>`: the form evidence keys cite
    pub fn evidence_key(&self) -> String {
        format!("{}.{}", self.section, self.key)
    }
}

/// Typed form of a metric key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricKey {
    /// Single named value (`row_count`, `group_by`)
    Scalar(String),
    /// Measure of one group: `label=v|label=v:measure`
    Grouped {
        groups: Vec<(String, String)>,
        measure: String,
    },
    /// Column of one query-list row: `row<i>:<column>`
    Row { index: usize, column: String },
}

impl MetricKey {
    /// Parses a key. Measure and column names never contain `:`, so the key
    /// splits on its last `:`. Group values containing `|` or `=` do not
    /// round-trip.
    pub fn parse(key: &str) -> MetricKey {
        let Some((lhs, rhs)) = key.rsplit_once(':') else {
            return MetricKey::Scalar(key.to_string());
        };

        if let Some(index) = lhs.strip_prefix("row").and_then(|i| i.parse::<usize>().ok()) {
            return MetricKey::Row {
                index,
                column: rhs.to_string(),
            };
        }

        let groups: Option<Vec<(String, String)>> = lhs
            .split('|')
            .map(|part| {
                part.split_once('=')
                    .map(|(l, v)| (l.to_string(), v.to_string()))
            })
            .collect();

        match groups {
            Some(groups) => MetricKey::Grouped {
                groups,
                measure: rhs.to_string(),
            },
            None => MetricKey::Scalar(key.to_string()),
        }
    }

    /// Measure or column name; the whole key for scalars
    pub fn name(&self) -> &str {
        match self {
            MetricKey::Scalar(name) => name,
            MetricKey::Grouped { measure, .. } => measure,
            MetricKey::Row { column, .. } => column,
        }
    }

    /// Left-hand side of the key (`label=v|...` or `row<i>`), if any
    pub fn record_id(&self) -> Option<String> {
        match self {
            MetricKey::Scalar(_) => None,
            MetricKey::Grouped { groups, .. } => Some(render_groups(groups)),
            MetricKey::Row { index, .. } => Some(format!("row{}", index)),
        }
    }
}

fn render_groups(groups: &[(String, String)]) -> String {
    groups
        .iter()
        .map(|(l, v)| format!("{}={}", l, v))
        .collect::<Vec<_>>()
        .join("|")
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKey::Scalar(name) => write!(f, "{}", name),
            MetricKey::Grouped { groups, measure } => {
                write!(f, "{}:{}", render_groups(groups), measure)
            }
            MetricKey::Row { index, column } => write!(f, "row{}:{}", index, column),
        }
    }
}

/// Emits a grouped result: a `group_by` row under `section`, then one row per
/// group and measure under `<section>_summary`.
///
/// Result columns are the group aliases followed by the measures.
pub fn emit_grouped(rows: &mut Vec<MetricRow>, spec: &GroupBySpec, output: &QueryOutput) {
    rows.push(MetricRow::new(
        spec.section.clone(),
        "group_by",
        spec.group_labels.join(","),
    ));

    let summary = format!("{}_summary", spec.section);
    let n_groups = spec.group_exprs.len();

    for record in output.rows.iter().take(MAX_METRIC_ROWS_PER_QUERY) {
        let groups: Vec<(String, String)> = record
            .iter()
            .take(n_groups)
            .enumerate()
            .map(|(i, cell)| (spec.label(i), cell.render()))
            .collect();

        for (measure, cell) in spec.measures.iter().zip(record.iter().skip(n_groups)) {
            let key = MetricKey::Grouped {
                groups: groups.clone(),
                measure: measure.name.clone(),
            };
            rows.push(MetricRow::new(summary.clone(), key.to_string(), cell.render()));
        }
    }
}

/// Emits a query-list result as `row<i>:<column>` rows under `section`
pub fn emit_query_rows(rows: &mut Vec<MetricRow>, section: &str, output: &QueryOutput) {
    for (index, record) in output.rows.iter().take(MAX_METRIC_ROWS_PER_QUERY).enumerate() {
        for (column, cell) in output.columns.iter().zip(record.iter()) {
            let key = MetricKey::Row {
                index,
                column: column.clone(),
            };
            rows.push(MetricRow::new(section, key.to_string(), cell.render()));
        }
    }
}
