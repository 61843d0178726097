//! Metric derivation: pure functions that turn raw optimizer series into
//! display-ready derived series.
//!
//! Nothing here holds state. Malformed input degrades per point (`None`
//! cells, absent table entries) rather than aborting the whole pass, so a
//! single bad observation never blanks an entire chart.

pub mod axis;
pub mod drawdown;
pub mod frontier;
pub mod returns;
pub mod rolling;
pub mod table;

pub use axis::{compute_axis_domain, AxisDomain};
pub use drawdown::{compute_drawdown, max_drawdown_pct, DrawdownPoint};
pub use frontier::{
    extrapolate_frontier, extrapolate_frontier_with, CurvePoint, FrontierCurve, FrontierMarker,
};
pub use returns::{
    normalize_to_percent_return, performance_table, rebase_percent_returns, ReturnPoint,
};
pub use rolling::{rolling_window_series, RollingFamily, MAX_ROLLING_WINDOWS};
pub use table::{DateRow, DateTable};

/// Round to a fixed number of decimal places for display.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}
