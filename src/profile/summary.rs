//! Profiling summary types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Decimal places kept for every profile statistic
pub const PROFILE_PRECISION: i32 = 6;

/// Rounds to `PROFILE_PRECISION` decimal places
pub fn round_stat(v: f64) -> f64 {
    let scale = 10f64.powi(PROFILE_PRECISION);
    (v * scale).round() / scale
}

/// Coarse column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Int,
    Float,
    String,
    /// No non-missing values
    Empty,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::String => "string",
            ColumnType::Empty => "empty",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Int | ColumnType::Float)
    }
}

/// Distribution statistics of a numeric column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub p05: f64,
    pub p50: f64,
    pub p95: f64,
    /// Adjusted Fisher-Pearson skewness; 0 below three values
    pub skew: f64,
    pub skew_flag: bool,
}

impl NumericStats {
    /// `max / p95`, when p95 is non-zero
    pub fn leverage_ratio(&self) -> Option<f64> {
        if self.p95 == 0.0 {
            None
        } else {
            Some(self.max / self.p95)
        }
    }
}

/// Summary of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub dtype: ColumnType,
    pub missing_count: u64,
    pub missing_fraction: f64,
    /// Distinct non-missing values
    pub cardinality: u64,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub stats: Option<NumericStats>,
}

/// Summary of the primary table. Consumed only as summary statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataProfile {
    pub table: String,
    pub row_count: u64,
    pub column_count: u64,
    /// True if statistics cover only the first rows of the table
    pub sampled: bool,
    /// Column names that look like dates or timestamps, sorted
    pub time_candidates: Vec<String>,
    pub columns: BTreeMap<String, ColumnProfile>,
}

impl DataProfile {
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.get(name)
    }

    /// Column lookup ignoring ASCII case
    pub fn column_ignore_case(&self, name: &str) -> Option<(&str, &ColumnProfile)> {
        self.columns
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_stat() {
        assert_eq!(round_stat(1.23456789), 1.234568);
        assert_eq!(round_stat(-0.0000004), -0.0);
    }

    #[test]
    fn test_string_column_has_no_stats_keys() {
        let col = ColumnProfile {
            dtype: ColumnType::String,
            missing_count: 1,
            missing_fraction: 0.5,
            cardinality: 1,
            stats: None,
        };
        let json = serde_json::to_value(&col).unwrap();
        assert_eq!(json["dtype"], "string");
        assert!(json.get("p95").is_none());
    }

    #[test]
    fn test_numeric_stats_flatten() {
        let col = ColumnProfile {
            dtype: ColumnType::Int,
            missing_count: 0,
            missing_fraction: 0.0,
            cardinality: 3,
            stats: Some(NumericStats {
                mean: 2.0,
                std: 0.816497,
                min: 1.0,
                max: 3.0,
                p05: 1.1,
                p50: 2.0,
                p95: 2.9,
                skew: 0.0,
                skew_flag: false,
            }),
        };
        let json = serde_json::to_value(&col).unwrap();
        assert_eq!(json["p95"], 2.9);
        assert_eq!(json["skew_flag"], false);
    }

    #[test]
    fn test_leverage_ratio_zero_p95() {
        let stats = NumericStats {
            mean: 0.0,
            std: 0.0,
            min: 0.0,
            max: 5.0,
            p05: 0.0,
            p50: 0.0,
            p95: 0.0,
            skew: 0.0,
            skew_flag: false,
        };
        assert_eq!(stats.leverage_ratio(), None);
    }
}
