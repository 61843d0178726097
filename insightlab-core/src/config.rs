//! Engine configuration: rule thresholds, axis padding, frontier heuristics.
//!
//! The same `Thresholds` value feeds both the mistake rules and the
//! explanation generator, so a flagged mistake and its "why" text are always
//! computed against identical boundaries. Loadable from TOML; every section
//! falls back to its defaults when omitted.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or validating an `InsightConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Boundaries shared by the mistake rules and the explanation generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Absolute weight above which a single position is over-concentrated
    /// (and, for explanations, a "large position").
    pub concentration_weight: f64,
    /// Absolute weight above which over-concentration becomes high severity.
    pub high_concentration_weight: f64,
    pub high_volatility: f64,
    pub low_sharpe: f64,
    /// Fewer nonzero holdings than this is under-diversified.
    pub min_holdings: usize,
    /// Weights at or below this magnitude count as zero.
    pub zero_weight_epsilon: f64,
    pub sector_weight: f64,
    pub sector_tickers: Vec<String>,
    /// Risk contribution above which a ticker dominates portfolio risk.
    pub risk_contribution: f64,
    /// Risk contribution above which a capped ticker gets the "why capped" text.
    pub capped_risk_contribution: f64,
    /// Canonical weight levels that suggest the optimizer hit a position cap.
    pub cap_values: Vec<f64>,
    pub cap_tolerance: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            concentration_weight: 0.30,
            high_concentration_weight: 0.50,
            high_volatility: 0.25,
            low_sharpe: 0.5,
            min_holdings: 5,
            zero_weight_epsilon: 1e-6,
            sector_weight: 0.60,
            sector_tickers: ["AAPL", "MSFT", "GOOGL", "AMZN", "META", "NVDA", "AMD", "TSLA"]
                .into_iter()
                .map(String::from)
                .collect(),
            risk_contribution: 0.40,
            capped_risk_contribution: 0.30,
            cap_values: vec![0.05, 0.10, 0.15, 0.20, 0.25, 0.30],
            cap_tolerance: 0.01,
        }
    }
}

impl Thresholds {
    /// Tolerance-based membership in the canonical cap set.
    ///
    /// Shorts are matched on magnitude: a -20% position sits at the same
    /// bound as a +20% one.
    pub fn is_capped_weight(&self, weight: f64) -> bool {
        if !weight.is_finite() {
            return false;
        }
        let magnitude = weight.abs();
        self.cap_values
            .iter()
            .any(|cap| (magnitude - cap).abs() < self.cap_tolerance)
    }

    pub fn is_sector_ticker(&self, ticker: &str) -> bool {
        self.sector_tickers.iter().any(|t| t == ticker)
    }

    /// True when a risk contribution dominates portfolio risk.
    pub fn is_risk_concentrated(&self, contribution: f64) -> bool {
        contribution.is_finite() && contribution.abs() > self.risk_contribution
    }
}

/// Padding rule for one chart axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisPadding {
    /// Fraction of the data range added on each side.
    pub fraction: f64,
    /// Minimum padding, in the axis' display unit (percentage points).
    pub minimum: f64,
    /// Optional hard lower bound on the padded domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<f64>,
}

impl AxisPadding {
    pub const fn new(fraction: f64, minimum: f64) -> Self {
        Self {
            fraction,
            minimum,
            floor: None,
        }
    }

    pub const fn with_floor(self, floor: f64) -> Self {
        Self {
            floor: Some(floor),
            ..self
        }
    }
}

/// Per-chart axis padding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisConfig {
    pub return_axis: AxisPadding,
    pub drawdown_axis: AxisPadding,
    pub volatility_axis: AxisPadding,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            return_axis: AxisPadding::new(0.10, 5.0),
            drawdown_axis: AxisPadding::new(0.10, 2.0),
            volatility_axis: AxisPadding::new(0.10, 5.0).with_floor(0.0),
        }
    }
}

/// Frontier presentation heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontierConfig {
    /// Positions of synthetic points past the last frontier point, as
    /// fractions of the distance to the realized portfolio's risk. Values
    /// above 1.0 land beyond the realized point.
    pub extrapolation_fractions: Vec<f64>,
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            extrapolation_fractions: vec![0.2, 0.4, 0.6, 1.2],
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    pub thresholds: Thresholds,
    pub axes: AxisConfig,
    pub frontier: FrontierConfig,
}

impl InsightConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.thresholds;
        let named = [
            ("concentration_weight", t.concentration_weight),
            ("high_concentration_weight", t.high_concentration_weight),
            ("high_volatility", t.high_volatility),
            ("low_sharpe", t.low_sharpe),
            ("zero_weight_epsilon", t.zero_weight_epsilon),
            ("sector_weight", t.sector_weight),
            ("risk_contribution", t.risk_contribution),
            ("capped_risk_contribution", t.capped_risk_contribution),
            ("cap_tolerance", t.cap_tolerance),
        ];
        for (name, value) in named {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!("{name} must be finite")));
            }
        }
        for (name, value) in named.iter().filter(|(n, _)| *n != "low_sharpe") {
            if *value < 0.0 {
                return Err(ConfigError::Invalid(format!("{name} must be >= 0")));
            }
        }
        if t.high_concentration_weight < t.concentration_weight {
            return Err(ConfigError::Invalid(
                "high_concentration_weight must be >= concentration_weight".into(),
            ));
        }
        if t.cap_values.is_empty() {
            return Err(ConfigError::Invalid("cap_values must not be empty".into()));
        }
        if t.cap_values.iter().any(|c| !c.is_finite() || *c <= 0.0) {
            return Err(ConfigError::Invalid(
                "cap_values must be finite and positive".into(),
            ));
        }

        for (name, axis) in [
            ("return_axis", self.axes.return_axis),
            ("drawdown_axis", self.axes.drawdown_axis),
            ("volatility_axis", self.axes.volatility_axis),
        ] {
            if !axis.fraction.is_finite() || axis.fraction < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name}.fraction must be finite and >= 0"
                )));
            }
            if !axis.minimum.is_finite() || axis.minimum < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name}.minimum must be finite and >= 0"
                )));
            }
        }

        if self
            .frontier
            .extrapolation_fractions
            .iter()
            .any(|f| !f.is_finite() || *f <= 0.0)
        {
            return Err(ConfigError::Invalid(
                "extrapolation_fractions must be finite and positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(InsightConfig::default().validate().is_ok());
    }

    #[test]
    fn default_axis_constants() {
        let axes = AxisConfig::default();
        assert_eq!(axes.return_axis, AxisPadding::new(0.10, 5.0));
        assert_eq!(axes.drawdown_axis, AxisPadding::new(0.10, 2.0));
        assert_eq!(axes.volatility_axis.minimum, 5.0);
        assert_eq!(axes.volatility_axis.floor, Some(0.0));
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config = InsightConfig::from_toml("").unwrap();
        assert_eq!(config, InsightConfig::default());
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config = InsightConfig::from_toml(
            r#"
            [thresholds]
            min_holdings = 8
            sector_tickers = ["XOM", "CVX"]

            [axes.return_axis]
            fraction = 0.2
            minimum = 3.0
            "#,
        )
        .unwrap();
        assert_eq!(config.thresholds.min_holdings, 8);
        assert!(config.thresholds.is_sector_ticker("XOM"));
        assert!(!config.thresholds.is_sector_ticker("AAPL"));
        assert_eq!(config.thresholds.risk_contribution, 0.40);
        assert_eq!(config.axes.return_axis, AxisPadding::new(0.2, 3.0));
        assert_eq!(config.axes.drawdown_axis, AxisPadding::new(0.10, 2.0));
    }

    #[test]
    fn rejects_empty_cap_set() {
        let err = InsightConfig::from_toml("[thresholds]\ncap_values = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_inverted_concentration_thresholds() {
        let mut config = InsightConfig::default();
        config.thresholds.high_concentration_weight = 0.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = InsightConfig::from_toml("[thresholds\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn cap_matching_uses_tolerance() {
        let t = Thresholds::default();
        assert!(t.is_capped_weight(0.20));
        assert!(t.is_capped_weight(0.205));
        assert!(t.is_capped_weight(-0.25));
        assert!(!t.is_capped_weight(0.22));
        assert!(!t.is_capped_weight(0.40));
        assert!(!t.is_capped_weight(f64::NAN));
    }
}
