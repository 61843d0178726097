//! The optimizer's solved portfolio, consumed read-only by the engine.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::series::{FrontierPoint, SeriesPoint};

/// Errors raised when reading or validating an optimizer result.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("non-finite value {value} in field '{field}'")]
    NonFinite { field: String, value: f64 },

    #[error("failed to parse optimizer result: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read optimizer result: {0}")]
    Io(#[from] std::io::Error),
}

/// A solved portfolio as returned by the optimization service.
///
/// Field names on the wire follow the optimizer's JSON (`sharpe_ratio`,
/// `portfolio_returns`, ...). Every optional field is a genuine absence case:
/// a missing Sharpe ratio is `None`, not zero.
///
/// Maps are `BTreeMap` so that iteration (and therefore tie-breaking between
/// equally weighted tickers) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioResult {
    pub weights: BTreeMap<String, f64>,
    pub expected_return: f64,
    pub volatility: f64,

    #[serde(default, rename = "sharpe_ratio", skip_serializing_if = "Option::is_none")]
    pub sharpe: Option<f64>,
    #[serde(default, rename = "sortino_ratio", skip_serializing_if = "Option::is_none")]
    pub sortino: Option<f64>,
    #[serde(default, rename = "calmar_ratio", skip_serializing_if = "Option::is_none")]
    pub calmar: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_drawdown: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_leverage: Option<f64>,

    #[serde(default, rename = "portfolio_returns", skip_serializing_if = "Option::is_none")]
    pub return_series: Option<Vec<SeriesPoint>>,
    #[serde(default, rename = "benchmark_returns", skip_serializing_if = "Option::is_none")]
    pub benchmark_series: Option<Vec<SeriesPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_history: Option<BTreeMap<String, Vec<SeriesPoint>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_decomposition: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolling_metrics: Option<BTreeMap<String, Vec<SeriesPoint>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efficient_frontier: Option<Vec<FrontierPoint>>,
}

impl PortfolioResult {
    pub fn from_json(json: &str) -> Result<Self, InputError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, InputError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Reject non-finite required scalars and weights.
    ///
    /// Derivations never call this; they degrade per point instead. Callers
    /// that want a hard gate (the CLI) use it up front.
    pub fn validate(&self) -> Result<(), InputError> {
        check_finite("volatility", self.volatility)?;
        check_finite("expected_return", self.expected_return)?;
        for (ticker, &w) in &self.weights {
            check_finite(&format!("weights.{ticker}"), w)?;
        }
        if let Some(decomp) = &self.risk_decomposition {
            for (ticker, &r) in decomp {
                check_finite(&format!("risk_decomposition.{ticker}"), r)?;
            }
        }
        Ok(())
    }

    pub fn weight(&self, ticker: &str) -> Option<f64> {
        self.weights.get(ticker).copied()
    }

    pub fn risk_contribution(&self, ticker: &str) -> Option<f64> {
        self.risk_decomposition
            .as_ref()
            .and_then(|d| d.get(ticker))
            .copied()
    }

    /// Number of tickers whose absolute weight exceeds `epsilon`.
    pub fn nonzero_holdings(&self, epsilon: f64) -> usize {
        self.weights
            .values()
            .filter(|w| w.is_finite() && w.abs() > epsilon)
            .count()
    }

    /// Largest absolute weight and its ticker. Non-finite weights are skipped;
    /// ties keep the alphabetically first ticker.
    pub fn max_abs_weight(&self) -> Option<(&str, f64)> {
        max_abs_entry(&self.weights)
    }

    /// Largest absolute risk contribution and its ticker.
    pub fn max_abs_risk_contribution(&self) -> Option<(&str, f64)> {
        self.risk_decomposition.as_ref().and_then(max_abs_entry)
    }
}

fn check_finite(field: &str, value: f64) -> Result<(), InputError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(InputError::NonFinite {
            field: field.to_string(),
            value,
        })
    }
}

fn max_abs_entry(map: &BTreeMap<String, f64>) -> Option<(&str, f64)> {
    let mut best: Option<(&str, f64)> = None;
    for (ticker, value) in map {
        if !value.is_finite() {
            continue;
        }
        let abs = value.abs();
        match best {
            Some((_, current)) if abs <= current => {}
            _ => best = Some((ticker.as_str(), abs)),
        }
    }
    best
}
