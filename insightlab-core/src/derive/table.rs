//! Date-keyed tables: several named series merged into one row per date.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::calendar_day;

/// One row of a merged table. Columns without an observation on this date
/// are absent from `values` (never zero-filled).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRow {
    #[serde(with = "calendar_day")]
    pub date: NaiveDate,
    pub values: BTreeMap<String, f64>,
}

impl DateRow {
    pub fn get(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied()
    }
}

/// Several named series merged by date, rows ascending by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateTable {
    /// Column names in presentation order.
    pub columns: Vec<String>,
    pub rows: Vec<DateRow>,
}

impl DateTable {
    /// Merge named columns of `(date, cell)` pairs.
    ///
    /// Every date seen in any column gets a row. `None` and non-finite cells
    /// are left absent.
    pub fn merge<I>(columns: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<(NaiveDate, Option<f64>)>)>,
    {
        let mut names = Vec::new();
        let mut by_date: BTreeMap<NaiveDate, BTreeMap<String, f64>> = BTreeMap::new();

        for (name, cells) in columns {
            for (date, cell) in cells {
                let row = by_date.entry(date).or_default();
                if let Some(v) = cell.filter(|v| v.is_finite()) {
                    row.insert(name.clone(), v);
                }
            }
            names.push(name);
        }

        Self {
            columns: names,
            rows: by_date
                .into_iter()
                .map(|(date, values)| DateRow { date, values })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All present cells of one column, in date order.
    pub fn column_values(&self, column: &str) -> Vec<f64> {
        self.rows.iter().filter_map(|r| r.get(column)).collect()
    }

    /// Every present cell in the table.
    pub fn all_values(&self) -> Vec<f64> {
        self.rows
            .iter()
            .flat_map(|r| r.values.values().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    #[test]
    fn merges_by_date_and_leaves_gaps_absent() {
        let table = DateTable::merge(vec![
            ("a".to_string(), vec![(day(1), Some(1.0)), (day(2), Some(2.0))]),
            ("b".to_string(), vec![(day(2), Some(20.0)), (day(3), Some(30.0))]),
        ]);
        assert_eq!(table.columns, vec!["a", "b"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0].get("a"), Some(1.0));
        assert_eq!(table.rows[0].get("b"), None);
        assert_eq!(table.rows[1].get("b"), Some(20.0));
        assert_eq!(table.rows[2].get("a"), None);
    }

    #[test]
    fn rows_are_sorted_by_date() {
        let table = DateTable::merge(vec![(
            "a".to_string(),
            vec![(day(5), Some(5.0)), (day(1), Some(1.0))],
        )]);
        assert_eq!(table.rows[0].date, day(1));
        assert_eq!(table.rows[1].date, day(5));
    }

    #[test]
    fn null_and_non_finite_cells_are_absent() {
        let table = DateTable::merge(vec![(
            "a".to_string(),
            vec![(day(1), None), (day(2), Some(f64::NAN))],
        )]);
        assert_eq!(table.rows.len(), 2);
        assert!(table.all_values().is_empty());
    }
}
