//! Metric table
//!
//! Re-indexes flat metric rows into `{section: [{column: value}, ...]}`.
//! `row<i>:<column>` keys land in record `i`; any other key is stored in
//! record 0 under the full key. Row indices at or past
//! `MAX_METRIC_ROWS_PER_QUERY` cannot come from the engine and are dropped.

use std::collections::BTreeMap;

use crate::engine::{MetricKey, MetricRow, MAX_METRIC_ROWS_PER_QUERY};

/// One record of a section
pub type Record = BTreeMap<String, String>;

/// Evidence key citing column `column` of record `index` in `section`
pub fn row_evidence(section: &str, index: usize, column: &str) -> String {
    let key = MetricKey::Row {
        index,
        column: column.to_string(),
    };
    format!("{}.{}", section, key)
}

/// Metric rows indexed by section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricTable {
    sections: BTreeMap<String, Vec<Record>>,
}

impl MetricTable {
    pub fn from_rows(rows: &[MetricRow]) -> Self {
        let mut sections: BTreeMap<String, Vec<Record>> = BTreeMap::new();
        for row in rows {
            let records = sections.entry(row.section.clone()).or_default();
            let (index, column) = match row.metric_key() {
                MetricKey::Row { index, column } => (index, column),
                _ => (0, row.key.clone()),
            };
            if index >= MAX_METRIC_ROWS_PER_QUERY {
                continue;
            }
            if records.len() <= index {
                records.resize_with(index + 1, Record::new);
            }
            records[index].insert(column, row.value.clone());
        }
        Self { sections }
    }

    pub fn contains(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// Records of `section`; empty if absent
    pub fn section(&self, section: &str) -> &[Record] {
        self.sections
            .get(section)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn value(&self, section: &str, index: usize, column: &str) -> Option<&str> {
        self.section(section)
            .get(index)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .filter(|v| *v != "null")
    }

    /// Numeric value of one cell, if present and finite
    pub fn number(&self, section: &str, index: usize, column: &str) -> Option<f64> {
        self.value(section, index, column)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    /// First-record shortcut for scalar sections
    pub fn scalar(&self, section: &str, column: &str) -> Option<f64> {
        self.number(section, 0, column)
    }
}
