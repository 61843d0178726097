//! Natural-language rationale for tickers and portfolio metrics.
//!
//! A ticker's explanation is picked from four template families by a first
//! match over its weight and risk contribution. The boundaries come from the
//! same [`Thresholds`] the mistake rules use, so a ticker flagged for
//! concentrated risk is always explained as a risk-concentration case.
//! Verbosity changes the wording, never the family.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Thresholds;
use crate::domain::PortfolioResult;

/// What is being explained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Ticker,
    Metric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// Beginner wording, no technical details.
    #[default]
    Plain,
    /// Precise wording plus a technical details line.
    Technical,
}

/// Portfolio metrics with dedicated templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Volatility,
    SharpeRatio,
    MaxDrawdown,
    SortinoRatio,
    CalmarRatio,
}

impl MetricKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "volatility" => Some(Self::Volatility),
            "sharpe_ratio" => Some(Self::SharpeRatio),
            "max_drawdown" => Some(Self::MaxDrawdown),
            "sortino_ratio" => Some(Self::SortinoRatio),
            "calmar_ratio" => Some(Self::CalmarRatio),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Volatility => "volatility",
            Self::SharpeRatio => "sharpe_ratio",
            Self::MaxDrawdown => "max_drawdown",
            Self::SortinoRatio => "sortino_ratio",
            Self::CalmarRatio => "calmar_ratio",
        }
    }

    /// The metric's value on a result, if the optimizer reported it.
    pub fn value_in(&self, result: &PortfolioResult) -> Option<f64> {
        match self {
            Self::Volatility => Some(result.volatility),
            Self::SharpeRatio => result.sharpe,
            Self::MaxDrawdown => result.max_drawdown,
            Self::SortinoRatio => result.sortino,
            Self::CalmarRatio => result.calmar,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The template family that produced an explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationBranch {
    CappedForRisk,
    HighRiskConcentration,
    LargePosition,
    Allocation,
    Metric(MetricKind),
    GenericMetric,
}

impl ExplanationBranch {
    /// True for the ticker families that explain a dominant risk share.
    pub fn is_risk_concentration(&self) -> bool {
        matches!(self, Self::CappedForRisk | Self::HighRiskConcentration)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_details: Option<String>,
    pub branch: ExplanationBranch,
}

/// First-match branch selection for a ticker.
///
/// 1. capped weight with risk share above the capped threshold
/// 2. risk share above the concentration threshold
/// 3. weight above the concentration threshold
/// 4. plain allocation
pub fn select_ticker_branch(weight: f64, contribution: f64, t: &Thresholds) -> ExplanationBranch {
    let risk = if contribution.is_finite() { contribution.abs() } else { 0.0 };
    if t.is_capped_weight(weight) && risk > t.capped_risk_contribution {
        ExplanationBranch::CappedForRisk
    } else if t.is_risk_concentrated(contribution) {
        ExplanationBranch::HighRiskConcentration
    } else if weight.is_finite() && weight.abs() > t.concentration_weight {
        ExplanationBranch::LargePosition
    } else {
        ExplanationBranch::Allocation
    }
}

/// Builds explanations against one set of thresholds.
#[derive(Debug, Clone, Default)]
pub struct Explainer {
    thresholds: Thresholds,
}

impl Explainer {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// For a ticker, `value` is only a fallback weight: the result's own
    /// weight wins, and `value` is used as the weight when the ticker is
    /// absent from `weights`. For a metric, `value` is the metric value.
    pub fn explain(
        &self,
        kind: EntityKind,
        identifier: &str,
        value: f64,
        result: &PortfolioResult,
        verbosity: Verbosity,
    ) -> Explanation {
        match kind {
            EntityKind::Ticker => self.explain_ticker(identifier, value, result, verbosity),
            EntityKind::Metric => explain_metric(identifier, value, verbosity),
        }
    }

    /// Explain one position. `fallback_weight` is used when the ticker is
    /// not in the result's weights.
    pub fn explain_ticker(
        &self,
        ticker: &str,
        fallback_weight: f64,
        result: &PortfolioResult,
        verbosity: Verbosity,
    ) -> Explanation {
        let weight = result
            .weight(ticker)
            .filter(|w| w.is_finite())
            .unwrap_or(fallback_weight);
        let contribution = result
            .risk_contribution(ticker)
            .filter(|c| c.is_finite())
            .unwrap_or(0.0);
        let branch = select_ticker_branch(weight, contribution, &self.thresholds);
        ticker_template(branch, ticker, weight, contribution, result.volatility, verbosity)
    }
}

/// Explain with default thresholds. See [`Explainer::explain`] for how
/// `value` is read for tickers and metrics.
pub fn explain(
    kind: EntityKind,
    identifier: &str,
    value: f64,
    result: &PortfolioResult,
    verbosity: Verbosity,
) -> Explanation {
    Explainer::default().explain(kind, identifier, value, result, verbosity)
}

// ── Ticker templates ─────────────────────────────────────────────────

fn ticker_template(
    branch: ExplanationBranch,
    ticker: &str,
    weight: f64,
    contribution: f64,
    portfolio_volatility: f64,
    verbosity: Verbosity,
) -> Explanation {
    let w = weight * 100.0;
    let w_abs = weight.abs() * 100.0;
    let rc = contribution.abs() * 100.0;
    let technical = verbosity == Verbosity::Technical;

    let (title, body, details) = match branch {
        ExplanationBranch::CappedForRisk if technical => {
            let divisor = if weight == 0.0 { 0.01 } else { weight.abs() };
            let ticker_vol = contribution.abs() / divisor * 100.0;
            (
                format!("Why {ticker} is capped at {w_abs:.0}%"),
                format!(
                    "{ticker} contributes {rc:.1}% of your portfolio's total volatility despite \
                     being only {w_abs:.0}% of the allocation. This concentration risk is \
                     mitigated by capping the position."
                ),
                Some(format!(
                    "Risk Contribution: {rc:.1}% | Portfolio Volatility: {:.2}% | Ticker Volatility: {ticker_vol:.2}%",
                    portfolio_volatility * 100.0
                )),
            )
        }
        ExplanationBranch::CappedForRisk => (
            format!("Why we limited {ticker}"),
            format!(
                "Even though {ticker} is only {w_abs:.0}% of your portfolio, it's responsible \
                 for {rc:.1}% of your risk. We capped it to protect you if this stock or sector \
                 crashes."
            ),
            None,
        ),
        ExplanationBranch::HighRiskConcentration if technical => (
            format!("High Risk Concentration: {ticker}"),
            format!(
                "{ticker} accounts for {rc:.1}% of portfolio risk. Consider diversifying to \
                 reduce concentration risk."
            ),
            Some(format!("Risk Contribution: {rc:.1}% | Weight: {w:.1}%")),
        ),
        ExplanationBranch::HighRiskConcentration => (
            "This stock adds a lot of risk".to_string(),
            format!(
                "{ticker} makes up {rc:.0}% of your portfolio's risk. That's a lot! Consider \
                 spreading your money across more stocks to be safer."
            ),
            None,
        ),
        ExplanationBranch::LargePosition if technical => (
            format!("Large Position: {ticker}"),
            format!(
                "{ticker} represents {w:.0}% of your portfolio. This is a significant \
                 concentration that increases single-stock risk."
            ),
            Some(format!("Weight: {w:.1}% | Risk Contribution: {rc:.1}%")),
        ),
        ExplanationBranch::LargePosition => (
            format!("Big position in {ticker}"),
            format!(
                "You have {w:.0}% of your portfolio in {ticker}. That's a lot in one stock! \
                 If it goes down, it will affect your portfolio a lot."
            ),
            None,
        ),
        _ if technical => (
            format!("{ticker} Allocation"),
            format!(
                "{ticker} is allocated {w:.1}% of the portfolio, contributing {rc:.1}% to \
                 total risk."
            ),
            Some(format!("Weight: {w:.1}% | Risk: {rc:.1}%")),
        ),
        _ => (
            format!("About {ticker}"),
            format!(
                "This stock makes up {w:.0}% of your portfolio. The optimizer chose this \
                 amount to balance risk and return."
            ),
            None,
        ),
    };

    Explanation {
        title,
        body,
        technical_details: details,
        branch,
    }
}

// ── Metric templates ─────────────────────────────────────────────────

/// Explain a portfolio-level metric by name. Unknown names get a generic
/// template.
pub fn explain_metric(name: &str, value: f64, verbosity: Verbosity) -> Explanation {
    let Some(kind) = MetricKind::from_name(name) else {
        let body = if value.is_finite() {
            format!("This metric is {value:.2}.")
        } else {
            "This metric is not available.".to_string()
        };
        return Explanation {
            title: name.to_string(),
            body,
            technical_details: None,
            branch: ExplanationBranch::GenericMetric,
        };
    };

    let technical = verbosity == Verbosity::Technical;
    let (title, body, details): (&str, String, Option<&str>) = match kind {
        MetricKind::Volatility if technical => (
            "Portfolio Volatility",
            format!(
                "Annualized volatility of {:.2}%. This measures how much your portfolio's value \
                 fluctuates. Lower is generally better for risk-averse investors.",
                value * 100.0
            ),
            Some("Calculated as standard deviation of returns × √252"),
        ),
        MetricKind::Volatility => (
            "How much your portfolio moves",
            format!(
                "Your portfolio moves up and down by about {:.0}% per year on average. Lower \
                 numbers mean less risk.",
                value * 100.0
            ),
            None,
        ),
        MetricKind::SharpeRatio if technical => (
            "Sharpe Ratio",
            format!(
                "Sharpe ratio of {value:.2}. This measures risk-adjusted returns. Higher values \
                 indicate better risk-adjusted performance."
            ),
            Some("(Expected Return - Risk-Free Rate) / Volatility"),
        ),
        MetricKind::SharpeRatio => (
            "Risk-adjusted performance score",
            format!(
                "Your portfolio scores {value:.1} on risk-adjusted returns. Higher is better: it \
                 means you're getting good returns for the risk you're taking."
            ),
            None,
        ),
        MetricKind::MaxDrawdown if technical => (
            "Maximum Drawdown",
            format!(
                "Maximum drawdown of {:.2}%. This is the largest peak-to-trough decline during \
                 the backtest period.",
                value.abs() * 100.0
            ),
            Some("(Peak value - Trough value) / Peak value"),
        ),
        MetricKind::MaxDrawdown => (
            "Worst drop",
            format!(
                "At its worst point, your portfolio dropped {:.0}% from its highest value. This \
                 shows how much you could lose in a bad market.",
                value.abs() * 100.0
            ),
            None,
        ),
        MetricKind::SortinoRatio if technical => (
            "Sortino Ratio",
            format!(
                "Sortino ratio of {value:.2}. Like the Sharpe ratio, but only downside \
                 volatility counts as risk."
            ),
            Some("(Expected Return - Risk-Free Rate) / Downside Deviation"),
        ),
        MetricKind::SortinoRatio => (
            "Downside-adjusted performance score",
            format!(
                "Your portfolio scores {value:.1} when only the drops count as risk. Higher is \
                 better."
            ),
            None,
        ),
        MetricKind::CalmarRatio if technical => (
            "Calmar Ratio",
            format!(
                "Calmar ratio of {value:.2}. Annualized return earned per unit of maximum \
                 drawdown."
            ),
            Some("Annualized Return / |Maximum Drawdown|"),
        ),
        MetricKind::CalmarRatio => (
            "Return per worst drop",
            format!(
                "Your portfolio earns {value:.1} times its worst drop each year. Higher means \
                 you are paid more for the pain."
            ),
            None,
        ),
    };

    let body = if value.is_finite() {
        body
    } else {
        format!("{title} is not available for this portfolio.")
    };

    Explanation {
        title: title.to_string(),
        body,
        technical_details: details.map(str::to_string),
        branch: ExplanationBranch::Metric(kind),
    }
}
