//! Rule-based detection of structurally risky portfolios.
//!
//! A fixed, ordered set of independent rules is evaluated against a
//! completed optimizer result. Each rule fires at most once and reads only
//! the result's computed scalars and mappings, never the derived series.
//! Rules share their boundaries with the explanation generator through
//! [`Thresholds`].

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Thresholds;
use crate::domain::PortfolioResult;

// ── Severity / category ──────────────────────────────────────────────

/// Ordered from lowest to highest: Low < Medium < High.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MistakeCategory {
    /// Weight or risk piled into a single position.
    Concentration,
    /// Risk taken without matching return.
    RiskAdjustedReturn,
    /// Too few holdings.
    Diversification,
    /// Too much weight in one sector.
    SectorExposure,
}

impl MistakeCategory {
    pub fn label(&self) -> &'static str {
        match self {
            MistakeCategory::Concentration => "Concentration",
            MistakeCategory::RiskAdjustedReturn => "Risk-Adjusted Return",
            MistakeCategory::Diversification => "Diversification",
            MistakeCategory::SectorExposure => "Sector Exposure",
        }
    }
}

impl fmt::Display for MistakeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ── Mistake ──────────────────────────────────────────────────────────

/// One flagged structural problem. Built fresh per evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mistake {
    /// Stable rule identifier, e.g. `over_concentration`.
    pub id: String,
    pub category: MistakeCategory,
    pub severity: Severity,
    pub message: String,
    pub explanation: String,
    pub suggestion: String,
    /// Tickers the mistake is about. Empty for portfolio-wide findings.
    #[serde(default)]
    pub tickers: Vec<String>,
}

// ── Rules ────────────────────────────────────────────────────────────

/// A single mistake rule.
///
/// Rules are pure: the same result and thresholds always produce the same
/// answer, and no rule depends on another having fired.
pub trait MistakeRule: Send + Sync {
    fn id(&self) -> &'static str;

    fn category(&self) -> MistakeCategory;

    fn evaluate(&self, result: &PortfolioResult, thresholds: &Thresholds) -> Option<Mistake>;
}

fn pct0(fraction: f64) -> String {
    format!("{:.0}", fraction * 100.0)
}

/// Largest single position above the concentration threshold.
pub struct OverConcentration;

impl MistakeRule for OverConcentration {
    fn id(&self) -> &'static str {
        "over_concentration"
    }

    fn category(&self) -> MistakeCategory {
        MistakeCategory::Concentration
    }

    fn evaluate(&self, result: &PortfolioResult, t: &Thresholds) -> Option<Mistake> {
        let (ticker, weight) = result.max_abs_weight()?;
        if weight <= t.concentration_weight {
            return None;
        }
        let severity = if weight > t.high_concentration_weight {
            Severity::High
        } else {
            Severity::Medium
        };
        Some(Mistake {
            id: self.id().into(),
            category: self.category(),
            severity,
            message: format!(
                "Your portfolio is {}% concentrated in {ticker}",
                pct0(weight)
            ),
            explanation: format!(
                "Having more than {}% in a single stock increases your risk. If {ticker} \
                 drops significantly, your entire portfolio will be heavily impacted.",
                pct0(t.concentration_weight)
            ),
            suggestion: format!(
                "Consider reducing {ticker} to 20% or less and spreading the allocation \
                 across other stocks to reduce risk."
            ),
            tickers: vec![ticker.to_string()],
        })
    }
}

/// High volatility that the Sharpe ratio shows is not being paid for.
pub struct HighVolatilityLowReturn;

impl MistakeRule for HighVolatilityLowReturn {
    fn id(&self) -> &'static str {
        "high_volatility_low_return"
    }

    fn category(&self) -> MistakeCategory {
        MistakeCategory::RiskAdjustedReturn
    }

    fn evaluate(&self, result: &PortfolioResult, t: &Thresholds) -> Option<Mistake> {
        let volatility = result.volatility;
        // Without a Sharpe ratio a low return cannot be confirmed.
        let sharpe = result.sharpe.filter(|s| s.is_finite())?;
        if !volatility.is_finite() || volatility <= t.high_volatility || sharpe >= t.low_sharpe {
            return None;
        }
        Some(Mistake {
            id: self.id().into(),
            category: self.category(),
            severity: Severity::High,
            message: "High volatility with low risk-adjusted returns".into(),
            explanation: format!(
                "Your portfolio has {}% volatility but only a {sharpe:.2} Sharpe ratio. \
                 This means you're taking on a lot of risk without getting proportional returns.",
                pct0(volatility)
            ),
            suggestion: "Consider adding more stable, defensive stocks (like consumer staples \
                         or utilities) to reduce volatility while maintaining returns."
                .into(),
            tickers: Vec::new(),
        })
    }
}

/// Too few nonzero holdings.
pub struct UnderDiversification;

impl MistakeRule for UnderDiversification {
    fn id(&self) -> &'static str {
        "under_diversification"
    }

    fn category(&self) -> MistakeCategory {
        MistakeCategory::Diversification
    }

    fn evaluate(&self, result: &PortfolioResult, t: &Thresholds) -> Option<Mistake> {
        let held: Vec<String> = result
            .weights
            .iter()
            .filter(|(_, w)| w.is_finite() && w.abs() > t.zero_weight_epsilon)
            .map(|(ticker, _)| ticker.clone())
            .collect();
        if held.len() >= t.min_holdings {
            return None;
        }
        let count = held.len();
        let noun = if count == 1 { "stock" } else { "stocks" };
        Some(Mistake {
            id: self.id().into(),
            category: self.category(),
            severity: Severity::Medium,
            message: format!("Only {count} {noun} in your portfolio"),
            explanation: format!(
                "A portfolio with fewer than {} stocks lacks diversification. If one stock \
                 performs poorly, it will significantly impact your overall returns.",
                t.min_holdings
            ),
            suggestion: format!(
                "Add at least {}-{} stocks from different sectors to improve diversification \
                 and reduce risk.",
                t.min_holdings,
                t.min_holdings * 2
            ),
            tickers: held,
        })
    }
}

/// Combined weight in the configured sector above the sector threshold.
pub struct SectorBias;

impl MistakeRule for SectorBias {
    fn id(&self) -> &'static str {
        "sector_bias"
    }

    fn category(&self) -> MistakeCategory {
        MistakeCategory::SectorExposure
    }

    fn evaluate(&self, result: &PortfolioResult, t: &Thresholds) -> Option<Mistake> {
        let mut exposure = 0.0;
        let mut tickers = Vec::new();
        for (ticker, w) in &result.weights {
            if !w.is_finite() || !t.is_sector_ticker(ticker) {
                continue;
            }
            exposure += w.abs();
            if w.abs() > t.zero_weight_epsilon {
                tickers.push(ticker.clone());
            }
        }
        if exposure <= t.sector_weight {
            return None;
        }
        Some(Mistake {
            id: self.id().into(),
            category: self.category(),
            severity: Severity::High,
            message: format!(
                "Your portfolio is {}% concentrated in tech stocks ({})",
                pct0(exposure),
                tickers.join(", ")
            ),
            explanation: format!(
                "Having more than {}% in a single sector (tech) exposes you to sector-specific \
                 risks. If the tech sector crashes, your entire portfolio will suffer.",
                pct0(t.sector_weight)
            ),
            suggestion: "Diversify across sectors by adding stocks from healthcare, finance, \
                         consumer goods, or utilities to balance your portfolio."
                .into(),
            tickers,
        })
    }
}

/// One ticker dominating the risk decomposition.
pub struct ConcentratedRiskContribution;

impl MistakeRule for ConcentratedRiskContribution {
    fn id(&self) -> &'static str {
        "concentrated_risk_contribution"
    }

    fn category(&self) -> MistakeCategory {
        MistakeCategory::Concentration
    }

    fn evaluate(&self, result: &PortfolioResult, t: &Thresholds) -> Option<Mistake> {
        let (ticker, contribution) = result.max_abs_risk_contribution()?;
        if !t.is_risk_concentrated(contribution) {
            return None;
        }
        Some(Mistake {
            id: self.id().into(),
            category: self.category(),
            severity: Severity::High,
            message: format!(
                "{ticker} contributes {}% of your portfolio's risk",
                pct0(contribution)
            ),
            explanation: format!(
                "Even if {ticker} isn't your largest holding, it's contributing a \
                 disproportionate amount of risk to your portfolio."
            ),
            suggestion: format!(
                "Consider reducing your position in {ticker} or adding lower-volatility \
                 stocks to balance the risk."
            ),
            tickers: vec![ticker.to_string()],
        })
    }
}

/// The rule set in evaluation order.
pub fn default_rules() -> Vec<Box<dyn MistakeRule>> {
    vec![
        Box::new(OverConcentration),
        Box::new(HighVolatilityLowReturn),
        Box::new(UnderDiversification),
        Box::new(SectorBias),
        Box::new(ConcentratedRiskContribution),
    ]
}

// ── Detector ─────────────────────────────────────────────────────────

/// Runs the rule set against results with one set of thresholds.
pub struct MistakeDetector {
    thresholds: Thresholds,
    rules: Vec<Box<dyn MistakeRule>>,
}

impl MistakeDetector {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            rules: default_rules(),
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Every firing rule's mistake, in rule order. Empty means no advisory.
    pub fn detect(&self, result: &PortfolioResult) -> Vec<Mistake> {
        self.rules
            .iter()
            .filter_map(|rule| {
                let mistake = rule.evaluate(result, &self.thresholds)?;
                debug!(
                    rule = rule.id(),
                    severity = %mistake.severity,
                    tickers = ?mistake.tickers,
                    "mistake rule fired"
                );
                Some(mistake)
            })
            .collect()
    }
}

impl Default for MistakeDetector {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}

/// Evaluate the default rules with default thresholds.
pub fn detect_mistakes(result: &PortfolioResult) -> Vec<Mistake> {
    MistakeDetector::default().detect(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn weights(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries.iter().map(|(t, w)| (t.to_string(), *w)).collect()
    }

    fn calm_result(entries: &[(&str, f64)]) -> PortfolioResult {
        PortfolioResult {
            weights: weights(entries),
            expected_return: 0.08,
            volatility: 0.12,
            sharpe: Some(1.1),
            ..Default::default()
        }
    }

    const BALANCED: &[(&str, f64)] = &[
        ("JNJ", 0.2),
        ("XOM", 0.2),
        ("PG", 0.2),
        ("JPM", 0.2),
        ("KO", 0.2),
    ];

    #[test]
    fn severity_is_ordered() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert_eq!(Severity::High.to_string(), "high");
    }

    #[test]
    fn balanced_portfolio_needs_no_advisory() {
        assert!(detect_mistakes(&calm_result(BALANCED)).is_empty());
    }

    #[test]
    fn over_concentration_severity_boundary() {
        let medium = calm_result(&[("JNJ", 0.45), ("XOM", 0.15), ("PG", 0.15), ("JPM", 0.15), ("KO", 0.10)]);
        let found = detect_mistakes(&medium);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "over_concentration");
        assert_eq!(found[0].severity, Severity::Medium);
        assert_eq!(found[0].tickers, vec!["JNJ"]);
        assert!(found[0].message.contains("45%"));

        let high = calm_result(&[("JNJ", -0.55), ("XOM", 0.15), ("PG", 0.15), ("JPM", 0.15), ("KO", 0.10)]);
        let found = detect_mistakes(&high);
        assert_eq!(found[0].severity, Severity::High);
    }

    #[test]
    fn exactly_at_threshold_does_not_fire() {
        let result = calm_result(&[("JNJ", 0.30), ("XOM", 0.20), ("PG", 0.20), ("JPM", 0.15), ("KO", 0.15)]);
        assert!(detect_mistakes(&result).is_empty());
    }

    #[test]
    fn missing_sharpe_does_not_fire_volatility_rule() {
        let mut result = calm_result(BALANCED);
        result.volatility = 0.40;
        result.sharpe = None;
        assert!(detect_mistakes(&result).is_empty());

        result.sharpe = Some(0.2);
        let found = detect_mistakes(&result);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "high_volatility_low_return");
        assert!(found[0].explanation.contains("40% volatility"));
        assert!(found[0].explanation.contains("0.20 Sharpe"));
    }

    #[test]
    fn zero_weights_do_not_count_as_holdings() {
        let result = calm_result(&[
            ("JNJ", 0.25),
            ("XOM", 0.25),
            ("PG", 0.25),
            ("JPM", 0.25),
            ("KO", 0.0),
            ("PEP", 1e-9),
        ]);
        let found = detect_mistakes(&result);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "under_diversification");
        assert_eq!(found[0].message, "Only 4 stocks in your portfolio");
        assert_eq!(found[0].tickers.len(), 4);
    }

    #[test]
    fn sector_bias_sums_absolute_weights() {
        let result = calm_result(&[
            ("AAPL", 0.25),
            ("MSFT", 0.25),
            ("NVDA", -0.15),
            ("JNJ", 0.2),
            ("XOM", 0.15),
            ("PG", 0.3),
        ]);
        let found = detect_mistakes(&result);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "sector_bias");
        assert_eq!(found[0].tickers, vec!["AAPL", "MSFT", "NVDA"]);
        assert!(found[0].message.contains("65%"));
    }

    #[test]
    fn risk_contribution_rule_names_ticker() {
        let mut result = calm_result(BALANCED);
        result.risk_decomposition = Some(weights(&[("JNJ", 0.1), ("XOM", -0.48), ("PG", 0.2)]));
        let found = detect_mistakes(&result);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "concentrated_risk_contribution");
        assert_eq!(found[0].tickers, vec!["XOM"]);
        assert!(found[0].message.starts_with("XOM contributes 48%"));
    }

    #[test]
    fn non_finite_entries_are_skipped() {
        let mut result = calm_result(&[
            ("JNJ", f64::NAN),
            ("XOM", 0.2),
            ("PG", 0.2),
            ("JPM", 0.2),
            ("KO", 0.2),
            ("PEP", 0.2),
        ]);
        result.risk_decomposition = Some(weights(&[("JNJ", f64::INFINITY), ("XOM", 0.2)]));
        assert!(detect_mistakes(&result).is_empty());
    }

    #[test]
    fn fired_rules_keep_rule_order() {
        let result = PortfolioResult {
            weights: weights(&[("AAPL", 0.7), ("MSFT", 0.3)]),
            expected_return: 0.05,
            volatility: 0.35,
            sharpe: Some(0.1),
            risk_decomposition: Some(weights(&[("AAPL", 0.8), ("MSFT", 0.2)])),
            ..Default::default()
        };
        let ids: Vec<String> = detect_mistakes(&result).into_iter().map(|m| m.id).collect();
        assert_eq!(
            ids,
            vec![
                "over_concentration",
                "high_volatility_low_return",
                "under_diversification",
                "sector_bias",
                "concentrated_risk_contribution",
            ]
        );
    }

    #[test]
    fn custom_thresholds_move_boundaries() {
        let thresholds = Thresholds {
            min_holdings: 3,
            ..Thresholds::default()
        };
        let detector = MistakeDetector::new(thresholds);
        let result = calm_result(&[("JNJ", 0.3), ("XOM", 0.3), ("PG", 0.3), ("KO", 0.1)]);
        assert!(detector.detect(&result).is_empty());
    }
}
