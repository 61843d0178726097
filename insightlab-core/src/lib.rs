//! InsightLab Core: derived series, mistake rules, explanations.
//!
//! This crate turns a solved portfolio from the optimization service into
//! the things a dashboard shows next to it:
//! - Domain types for the optimizer's JSON result
//! - Pure metric derivation (drawdown, normalized returns, axis domains,
//!   rolling-window tables, frontier curve preparation)
//! - An ordered set of independent mistake rules
//! - Plain and technical explanations for tickers and metrics
//! - TOML-loadable thresholds shared by rules and explanations

pub mod config;
pub mod derive;
pub mod domain;
pub mod explain;
pub mod mistakes;
pub mod report;

pub use config::{AxisConfig, AxisPadding, ConfigError, FrontierConfig, InsightConfig, Thresholds};
pub use domain::{FrontierPoint, InputError, PortfolioResult, SeriesPoint};
pub use explain::{
    explain, explain_metric, select_ticker_branch, EntityKind, Explainer, Explanation,
    ExplanationBranch, MetricKind, Verbosity,
};
pub use mistakes::{
    default_rules, detect_mistakes, Mistake, MistakeCategory, MistakeDetector, MistakeRule,
    Severity,
};
pub use report::InsightReport;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn portfolio_result_is_send_sync() {
        assert_send::<PortfolioResult>();
        assert_sync::<PortfolioResult>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<InsightConfig>();
        assert_sync::<InsightConfig>();
        assert_send::<Thresholds>();
        assert_sync::<Thresholds>();
    }

    #[test]
    fn derived_types_are_send_sync() {
        assert_send::<derive::DateTable>();
        assert_sync::<derive::DateTable>();
        assert_send::<derive::FrontierCurve>();
        assert_sync::<derive::FrontierCurve>();
        assert_send::<InsightReport>();
        assert_sync::<InsightReport>();
    }

    #[test]
    fn detector_is_send_sync() {
        assert_send::<MistakeDetector>();
        assert_sync::<MistakeDetector>();
        assert_send::<Explainer>();
        assert_sync::<Explainer>();
    }
}
