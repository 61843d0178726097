//! Drawdown curve: percentage decline from the running peak.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{calendar_day, SeriesPoint};

/// One point of a drawdown curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPoint {
    #[serde(with = "calendar_day")]
    pub date: NaiveDate,
    /// Drawdown in percent (always <= 0). `None` when the input value at this
    /// point is non-finite or non-positive.
    pub drawdown_pct: Option<f64>,
    /// Running peak in effect at this point. `None` until the first usable value.
    pub peak: Option<f64>,
}

/// Compute the drawdown curve of a value series.
///
/// For each index the running peak is the maximum of all usable values up to
/// and including it; drawdown = (value - peak) / peak × 100. The output has
/// the same length and ordering as the input. Unusable values (non-finite or
/// `<= 0`) produce a `None` cell and leave the peak where it was.
pub fn compute_drawdown(series: &[SeriesPoint]) -> Vec<DrawdownPoint> {
    let mut peak: Option<f64> = None;

    series
        .iter()
        .map(|point| {
            let value = point.value;
            if !value.is_finite() || value <= 0.0 {
                return DrawdownPoint {
                    date: point.date,
                    drawdown_pct: None,
                    peak,
                };
            }

            let running = match peak {
                Some(p) if p >= value => p,
                _ => value,
            };
            peak = Some(running);

            DrawdownPoint {
                date: point.date,
                drawdown_pct: Some((value - running) / running * 100.0),
                peak,
            }
        })
        .collect()
}

/// Deepest drawdown of a curve, in percent (e.g. -18.2). `None` if no point
/// carries a value.
pub fn max_drawdown_pct(points: &[DrawdownPoint]) -> Option<f64> {
    points
        .iter()
        .filter_map(|p| p.drawdown_pct)
        .min_by(|a, b| a.total_cmp(b))
}
