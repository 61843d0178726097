//! Normalized percentage returns and the merged performance table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::round_to;
use super::table::DateTable;
use crate::domain::{calendar_day, PortfolioResult, SeriesPoint};

pub const PORTFOLIO_COLUMN: &str = "Portfolio";
pub const BENCHMARK_COLUMN: &str = "Benchmark";

/// One point of a percent-return series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnPoint {
    #[serde(with = "calendar_day")]
    pub date: NaiveDate,
    /// Return since the first point, in percent, 2 decimals. `None` when the
    /// point could not be normalized.
    pub pct: Option<f64>,
}

/// value[i] / value[0] - 1, in percent, rounded to 2 decimals.
///
/// A zero or non-finite base makes every point `None`; a non-finite value
/// only blanks its own point.
pub fn normalize_to_percent_return(series: &[SeriesPoint]) -> Vec<ReturnPoint> {
    let base = series.first().map(|p| p.value);
    let usable_base = base.filter(|b| b.is_finite() && *b != 0.0);

    series
        .iter()
        .map(|point| ReturnPoint {
            date: point.date,
            pct: usable_base.and_then(|b| {
                let v = point.value;
                if v.is_finite() {
                    Some(round_to((v / b - 1.0) * 100.0, 2))
                } else {
                    None
                }
            }),
        })
        .collect()
}

/// Re-anchor a percent-return series on its own first point.
///
/// Used when a chart window starts later than the optimizer's series. For a
/// series whose first point is already 0% this is the identity up to
/// rounding.
pub fn rebase_percent_returns(points: &[ReturnPoint]) -> Vec<ReturnPoint> {
    let base_growth = points
        .first()
        .and_then(|p| p.pct)
        .map(|b| 1.0 + b / 100.0)
        .filter(|g| g.is_finite() && *g != 0.0);

    points
        .iter()
        .map(|point| ReturnPoint {
            date: point.date,
            pct: match (base_growth, point.pct) {
                (Some(g), Some(p)) if p.is_finite() => {
                    Some(round_to(((1.0 + p / 100.0) / g - 1.0) * 100.0, 2))
                }
                _ => None,
            },
        })
        .collect()
}

fn to_cells(points: Vec<ReturnPoint>) -> Vec<(NaiveDate, Option<f64>)> {
    points.into_iter().map(|p| (p.date, p.pct)).collect()
}

/// Merge every ticker's price history with the portfolio (and benchmark)
/// return series into one table of normalized percent returns.
///
/// Each series is normalized against its own first point. Ticker columns come
/// first in ticker order, then `Portfolio`, then `Benchmark`.
pub fn performance_table(result: &PortfolioResult) -> DateTable {
    let mut columns: Vec<(String, Vec<(NaiveDate, Option<f64>)>)> = Vec::new();

    if let Some(history) = &result.price_history {
        for (ticker, prices) in history {
            columns.push((ticker.clone(), to_cells(normalize_to_percent_return(prices))));
        }
    }
    if let Some(series) = &result.return_series {
        columns.push((
            PORTFOLIO_COLUMN.to_string(),
            to_cells(normalize_to_percent_return(series)),
        ));
    }
    if let Some(series) = &result.benchmark_series {
        columns.push((
            BENCHMARK_COLUMN.to_string(),
            to_cells(normalize_to_percent_return(series)),
        ));
    }

    DateTable::merge(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn series(values: &[f64]) -> Vec<SeriesPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| SeriesPoint::new(day(i as u32 + 1), v))
            .collect()
    }

    #[test]
    fn normalizes_against_first_point() {
        let out = normalize_to_percent_return(&series(&[100.0, 110.0, 95.5]));
        assert_eq!(out[0].pct, Some(0.0));
        assert_eq!(out[1].pct, Some(10.0));
        assert_eq!(out[2].pct, Some(-4.5));
    }

    #[test]
    fn rounds_to_two_decimals() {
        let out = normalize_to_percent_return(&series(&[3.0, 4.0]));
        assert_eq!(out[1].pct, Some(33.33));
    }

    #[test]
    fn zero_base_blanks_every_point() {
        let out = normalize_to_percent_return(&series(&[0.0, 1.0, 2.0]));
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|p| p.pct.is_none()));
    }

    #[test]
    fn non_finite_point_only_blanks_itself() {
        let out = normalize_to_percent_return(&series(&[100.0, f64::NAN, 120.0]));
        assert_eq!(out[1].pct, None);
        assert_eq!(out[2].pct, Some(20.0));
    }

    #[test]
    fn rebase_of_zero_anchored_series_is_identity() {
        let normalized = normalize_to_percent_return(&series(&[50.0, 55.0, 47.3, 61.2]));
        assert_eq!(rebase_percent_returns(&normalized), normalized);
    }

    #[test]
    fn rebase_moves_anchor_to_first_point() {
        let points = vec![
            ReturnPoint { date: day(1), pct: Some(10.0) },
            ReturnPoint { date: day(2), pct: Some(21.0) },
        ];
        let out = rebase_percent_returns(&points);
        assert_eq!(out[0].pct, Some(0.0));
        assert_eq!(out[1].pct, Some(10.0));
    }

    #[test]
    fn rebase_with_total_loss_base_is_unavailable() {
        let points = vec![
            ReturnPoint { date: day(1), pct: Some(-100.0) },
            ReturnPoint { date: day(2), pct: Some(5.0) },
        ];
        assert!(rebase_percent_returns(&points).iter().all(|p| p.pct.is_none()));
    }

    #[test]
    fn performance_table_merges_tickers_and_portfolio() {
        let mut history = BTreeMap::new();
        history.insert("AAPL".to_string(), series(&[100.0, 110.0]));
        history.insert(
            "MSFT".to_string(),
            vec![SeriesPoint::new(day(2), 200.0), SeriesPoint::new(day(3), 190.0)],
        );
        let result = PortfolioResult {
            price_history: Some(history),
            return_series: Some(series(&[1.0, 1.05, 1.1])),
            ..Default::default()
        };

        let table = performance_table(&result);
        assert_eq!(table.columns, vec!["AAPL", "MSFT", PORTFOLIO_COLUMN]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0].get("MSFT"), None);
        assert_eq!(table.rows[1].get("AAPL"), Some(10.0));
        assert_eq!(table.rows[2].get("MSFT"), Some(-5.0));
        assert_eq!(table.rows[2].get(PORTFOLIO_COLUMN), Some(10.0));
    }

    #[test]
    fn performance_table_without_series_is_empty() {
        assert!(performance_table(&PortfolioResult::default()).is_empty());
    }
}
