//! One-shot insight pass over an optimizer result.

use serde::{Deserialize, Serialize};

use crate::config::InsightConfig;
use crate::derive::{
    compute_axis_domain, compute_drawdown, extrapolate_frontier_with, max_drawdown_pct,
    performance_table, rolling_window_series, AxisDomain, DateTable, DrawdownPoint, FrontierCurve,
    FrontierMarker, RollingFamily,
};
use crate::domain::PortfolioResult;
use crate::mistakes::{Mistake, MistakeDetector, Severity};

/// Everything the dashboard renders for one result, derived in a single
/// one-way pass. Sections whose input the optimizer omitted are empty or
/// `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    pub drawdown: Vec<DrawdownPoint>,
    pub max_drawdown_pct: Option<f64>,
    pub drawdown_axis: Option<AxisDomain>,

    pub performance: DateTable,
    pub return_axis: Option<AxisDomain>,

    pub rolling_sharpe: DateTable,
    pub rolling_volatility: DateTable,
    pub volatility_axis: Option<AxisDomain>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontier: Option<FrontierCurve>,

    pub mistakes: Vec<Mistake>,
}

impl InsightReport {
    pub fn build(result: &PortfolioResult, config: &InsightConfig) -> Self {
        let drawdown = result
            .return_series
            .as_deref()
            .map(compute_drawdown)
            .unwrap_or_default();
        let drawdown_values: Vec<f64> = drawdown.iter().filter_map(|p| p.drawdown_pct).collect();

        let performance = performance_table(result);
        let return_axis = compute_axis_domain(&performance.all_values(), config.axes.return_axis);

        let (rolling_sharpe, rolling_volatility) = match &result.rolling_metrics {
            Some(raw) => (
                rolling_window_series(raw, RollingFamily::Sharpe),
                rolling_window_series(raw, RollingFamily::Volatility),
            ),
            None => (DateTable::default(), DateTable::default()),
        };
        let volatility_axis = compute_axis_domain(
            &rolling_volatility.all_values(),
            config.axes.volatility_axis,
        );

        let frontier = result.efficient_frontier.as_deref().map(|points| {
            extrapolate_frontier_with(
                points,
                FrontierMarker::new(result.volatility, result.expected_return),
                &config.frontier,
            )
        });

        let mistakes = MistakeDetector::new(config.thresholds.clone()).detect(result);

        Self {
            max_drawdown_pct: max_drawdown_pct(&drawdown),
            drawdown_axis: compute_axis_domain(&drawdown_values, config.axes.drawdown_axis),
            drawdown,
            performance,
            return_axis,
            rolling_sharpe,
            rolling_volatility,
            volatility_axis,
            frontier,
            mistakes,
        }
    }

    /// Most severe flagged mistake, if any.
    pub fn highest_severity(&self) -> Option<Severity> {
        self.mistakes.iter().map(|m| m.severity).max()
    }
}
