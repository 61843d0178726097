//! Rolling-window metric tables.
//!
//! The optimizer returns one series per (statistic, window) pair, keyed like
//! `sharpe_30` or `volatility_90`. Charts show up to three windows of one
//! statistic side by side, so the series are merged into one row per date.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::round_to;
use super::table::DateTable;
use crate::domain::SeriesPoint;

/// Maximum number of windows shown per statistic.
pub const MAX_ROLLING_WINDOWS: usize = 3;

/// Rolling statistic family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollingFamily {
    Sharpe,
    Volatility,
}

impl RollingFamily {
    fn key_prefix(self) -> &'static str {
        match self {
            Self::Sharpe => "sharpe_",
            Self::Volatility => "volatility_",
        }
    }

    /// Window length in days if `key` belongs to this family.
    pub fn window_days(self, key: &str) -> Option<u32> {
        key.strip_prefix(self.key_prefix())?.parse().ok()
    }

    /// Display value of one raw cell. Volatility is a fraction shown in
    /// percent; Sharpe is a plain ratio.
    fn display(self, raw: f64) -> Option<f64> {
        if !raw.is_finite() {
            return None;
        }
        Some(match self {
            Self::Sharpe => round_to(raw, 3),
            Self::Volatility => round_to(raw * 100.0, 2),
        })
    }
}

impl fmt::Display for RollingFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sharpe => write!(f, "sharpe"),
            Self::Volatility => write!(f, "volatility"),
        }
    }
}

/// Merge the shortest `MAX_ROLLING_WINDOWS` windows of `family` into one
/// table with a `"<days>d"` column per window.
///
/// Keys of other families, or with an unparseable window, are ignored. A
/// date missing from one window leaves that cell absent.
pub fn rolling_window_series(
    raw: &BTreeMap<String, Vec<SeriesPoint>>,
    family: RollingFamily,
) -> DateTable {
    let mut windows: Vec<(u32, &Vec<SeriesPoint>)> = raw
        .iter()
        .filter_map(|(key, series)| family.window_days(key).map(|days| (days, series)))
        .collect();
    windows.sort_by_key(|(days, _)| *days);
    windows.dedup_by_key(|(days, _)| *days);
    windows.truncate(MAX_ROLLING_WINDOWS);

    DateTable::merge(windows.into_iter().map(|(days, series)| {
        let cells: Vec<(NaiveDate, Option<f64>)> = series
            .iter()
            .map(|p| (p.date, family.display(p.value)))
            .collect();
        (format!("{days}d"), cells)
    }))
}
