//! Data profiling module for dataset analysis.
//!
//! This module provides functionality for profiling datasets, including:
//! - Type inference for columns (numeric, categorical, temporal)
//! - Missing and distinct counts
//! - Quartiles for numeric columns, date ranges for temporal ones and
//!   top values for categorical ones

mod statistics;
mod type_inference;

use std::collections::HashSet;

use tracing::debug;

use crate::config::EngineConfig;
use crate::types::{CellValue, ColumnProfile, ColumnType, Dataset, DatasetProfile, Row};

pub use statistics::{date_range, numeric_stats, quantile, top_values};
pub use type_inference::{NUMERIC_THRESHOLD, TEMPORAL_THRESHOLD, infer_column_type, numeric_ratio};

/// Data profiler for analyzing dataset structure.
#[derive(Debug, Clone)]
pub struct DataProfiler {
    type_window: usize,
    top_values_limit: usize,
}

impl Default for DataProfiler {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl DataProfiler {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            type_window: config.profile_type_window,
            top_values_limit: config.top_values_limit,
        }
    }

    /// Profile every listed column over the full row set.
    ///
    /// Never fails: unparseable cells are left out of the statistics and only
    /// show up in the counts.
    pub fn profile_dataset(&self, rows: &[Row], columns: &[String]) -> DatasetProfile {
        let profiles: Vec<ColumnProfile> = columns
            .iter()
            .map(|name| self.profile_column(rows, name))
            .collect();

        debug!(
            rows = rows.len(),
            columns = profiles.len(),
            numeric = profiles.iter().filter(|c| c.column_type == ColumnType::Numeric).count(),
            temporal = profiles.iter().filter(|c| c.column_type == ColumnType::Temporal).count(),
            "Profiled dataset"
        );

        DatasetProfile {
            row_count: rows.len(),
            columns: profiles,
        }
    }

    /// Convenience wrapper over [`DataProfiler::profile_dataset`].
    pub fn profile(&self, dataset: &Dataset) -> DatasetProfile {
        self.profile_dataset(&dataset.rows, &dataset.columns)
    }

    fn profile_column(&self, rows: &[Row], name: &str) -> ColumnProfile {
        let values: Vec<&CellValue> = rows.iter().map(|row| row.get(name)).collect();
        let present: Vec<&CellValue> = values.iter().copied().filter(|v| !v.is_missing()).collect();
        let missing_count = values.len() - present.len();

        let distinct: HashSet<_> = present.iter().map(|v| v.as_key()).collect();
        let column_type = infer_column_type(present.iter().copied(), self.type_window);

        let mut profile = ColumnProfile {
            name: name.to_string(),
            column_type,
            missing_count,
            distinct_count: distinct.len(),
            stats: None,
            range: None,
            top_values: None,
        };

        match column_type {
            ColumnType::Numeric => profile.stats = numeric_stats(&present),
            ColumnType::Temporal => profile.range = date_range(&present),
            ColumnType::Categorical => {
                profile.top_values = Some(top_values(&present, self.top_values_limit))
            }
        }

        profile
    }
}

/// Profile a row set with default settings.
pub fn build_profile(rows: &[Row], columns: &[String]) -> DatasetProfile {
    DataProfiler::default().profile_dataset(rows, columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> (Vec<Row>, Vec<String>) {
        let columns = vec!["city".to_string(), "sales".to_string(), "date".to_string()];
        let data = [
            ("Paris", "100", "2021-01-01"),
            ("Lyon", "$200", "2021-02-01"),
            ("Paris", "", "2021-03-01"),
            ("Nice", "n/a", ""),
            ("Paris", "400", "2021-05-01"),
        ];
        let rows = data
            .iter()
            .map(|(c, s, d)| Row::from_pairs([("city", *c), ("sales", *s), ("date", *d)]))
            .collect();
        (rows, columns)
    }

    #[test]
    fn test_profile_types_and_counts() {
        let (rows, columns) = dataset();
        let profile = build_profile(&rows, &columns);
        assert_eq!(profile.row_count, 5);

        let city = profile.column("city").unwrap();
        assert_eq!(city.column_type, ColumnType::Categorical);
        assert_eq!(city.distinct_count, 3);
        let top = city.top_values.as_ref().unwrap();
        assert_eq!(top[0].value, "Paris");
        assert_eq!(top[0].count, 3);
        assert!(city.stats.is_none());

        let sales = profile.column("sales").unwrap();
        assert_eq!(sales.column_type, ColumnType::Numeric);
        assert_eq!(sales.missing_count, 1);
        let stats = sales.stats.as_ref().unwrap();
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.max, 400.0);
        assert!((stats.mean - 700.0 / 3.0).abs() < 1e-9);

        let date = profile.column("date").unwrap();
        assert_eq!(date.column_type, ColumnType::Temporal);
        assert_eq!(date.missing_count, 1);
        assert_eq!(date.range.as_ref().unwrap().end, "2021-05-01T00:00:00.000Z");
    }

    #[test]
    fn test_profile_count_invariant() {
        let (rows, columns) = dataset();
        let profile = build_profile(&rows, &columns);
        for column in &profile.columns {
            let present = rows.iter().filter(|r| !r.get(&column.name).is_missing()).count();
            assert_eq!(column.missing_count + present, profile.row_count);
        }
    }

    #[test]
    fn test_profile_absent_column_is_all_missing() {
        let (rows, _) = dataset();
        let profile = build_profile(&rows, &["ghost".to_string()]);
        let ghost = &profile.columns[0];
        assert_eq!(ghost.missing_count, 5);
        assert_eq!(ghost.distinct_count, 0);
        assert_eq!(ghost.column_type, ColumnType::Categorical);
        assert_eq!(ghost.top_values.as_deref(), Some(&[][..]));
    }

    #[test]
    fn test_profile_respects_top_values_limit() {
        let rows: Vec<Row> = (0..30)
            .map(|i| Row::from_pairs([("k", format!("v{i}").as_str())]))
            .collect();
        let config = EngineConfig::builder().top_values_limit(5).build().unwrap();
        let profile = DataProfiler::new(&config).profile_dataset(&rows, &["k".to_string()]);
        assert_eq!(profile.columns[0].top_values.as_ref().unwrap().len(), 5);
    }
}
