//! Property tests for derivation and rule invariants.
//!
//! Uses proptest to verify:
//! 1. Drawdown is never positive and is zero at a running peak
//! 2. The running peak never decreases
//! 3. Re-anchoring a normalized series is a no-op
//! 4. Frontier output stays sorted and keeps every usable input point
//! 5. Padded axis domains contain every finite input
//! 6. Explanations and mistake rules agree on risk concentration

use chrono::NaiveDate;
use proptest::prelude::*;
use std::collections::BTreeMap;

use insightlab_core::derive::{
    compute_axis_domain, compute_drawdown, extrapolate_frontier, normalize_to_percent_return,
    rebase_percent_returns, FrontierMarker,
};
use insightlab_core::{
    AxisPadding, EntityKind, Explainer, FrontierPoint, MistakeDetector, PortfolioResult,
    SeriesPoint, Thresholds, Verbosity,
};

// ── Strategies (proptest) ────────────────────────────────────────────

fn to_series(values: Vec<f64>) -> Vec<SeriesPoint> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| SeriesPoint::new(start + chrono::Duration::days(i as i64), v))
        .collect()
}

fn arb_positive_series() -> impl Strategy<Value = Vec<SeriesPoint>> {
    prop::collection::vec(1.0..1000.0_f64, 1..120).prop_map(to_series)
}

fn arb_frontier_point() -> impl Strategy<Value = FrontierPoint> {
    (0.0..40.0_f64, -10.0..30.0_f64).prop_map(|(r, e)| FrontierPoint::new(r, e))
}

const TICKERS: [&str; 6] = ["AAPL", "JNJ", "XOM", "KO", "NVDA", "JPM"];

fn arb_result() -> impl Strategy<Value = PortfolioResult> {
    (
        prop::collection::vec(-0.6..0.6_f64, TICKERS.len()),
        prop::collection::vec(-0.8..0.8_f64, TICKERS.len()),
    )
        .prop_map(|(weights, risk)| {
            let weights: BTreeMap<String, f64> = TICKERS
                .iter()
                .zip(weights)
                .map(|(t, w)| (t.to_string(), w))
                .collect();
            let risk: BTreeMap<String, f64> = TICKERS
                .iter()
                .zip(risk)
                .map(|(t, r)| (t.to_string(), r))
                .collect();
            PortfolioResult {
                weights,
                expected_return: 0.1,
                volatility: 0.2,
                sharpe: Some(0.8),
                risk_decomposition: Some(risk),
                ..Default::default()
            }
        })
}

// ── 1-2. Drawdown ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn drawdown_is_never_positive(series in arb_positive_series()) {
        let dd = compute_drawdown(&series);
        prop_assert_eq!(dd.len(), series.len());
        prop_assert_eq!(dd[0].drawdown_pct, Some(0.0));
        for (point, input) in dd.iter().zip(&series) {
            let pct = point.drawdown_pct.unwrap();
            prop_assert!(pct <= 0.0);
            if Some(input.value) == point.peak {
                prop_assert_eq!(pct, 0.0);
            }
        }
    }

    #[test]
    fn running_peak_is_monotonic(series in arb_positive_series()) {
        let dd = compute_drawdown(&series);
        for pair in dd.windows(2) {
            prop_assert!(pair[1].peak.unwrap() >= pair[0].peak.unwrap());
        }
        let max = series.iter().map(|p| p.value).fold(f64::MIN, f64::max);
        prop_assert_eq!(dd.last().unwrap().peak, Some(max));
    }
}

// ── 3. Normalization ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn rebase_of_normalized_series_is_identity(series in arb_positive_series()) {
        let normalized = normalize_to_percent_return(&series);
        let rebased = rebase_percent_returns(&normalized);
        prop_assert_eq!(rebased.len(), normalized.len());
        for (a, b) in normalized.iter().zip(&rebased) {
            prop_assert_eq!(a.date, b.date);
            prop_assert!((a.pct.unwrap() - b.pct.unwrap()).abs() < 1e-9);
        }
    }
}

// ── 4. Frontier ──────────────────────────────────────────────────────

proptest! {
    #[test]
    fn frontier_stays_sorted(
        points in prop::collection::vec(arb_frontier_point(), 0..30),
        current_risk in 0.0..60.0_f64,
    ) {
        let curve = extrapolate_frontier(&points, FrontierMarker::new(current_risk, 10.0));
        let out = curve.points();
        for pair in out.windows(2) {
            prop_assert!(pair[0].risk <= pair[1].risk);
        }
        if curve.is_available() {
            prop_assert_eq!(out.iter().filter(|p| !p.synthetic).count(), points.len());
        }
    }

    #[test]
    fn extension_continues_past_last_point(
        points in prop::collection::vec(arb_frontier_point(), 2..20),
        beyond in 1.0..20.0_f64,
    ) {
        let last_risk = points.iter().map(|p| p.risk).fold(f64::MIN, f64::max);
        let curve = extrapolate_frontier(&points, FrontierMarker::new(last_risk + beyond, 0.0));
        for p in curve.points().iter().filter(|p| p.synthetic) {
            prop_assert!(p.risk > last_risk);
        }
        if curve.is_available() {
            let max_out = curve.points().last().unwrap().risk;
            prop_assert!(max_out > last_risk + beyond);
        }
    }
}

// ── 5. Axis domain ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn axis_domain_contains_inputs(
        values in prop::collection::vec(-500.0..500.0_f64, 1..50),
        fraction in 0.0..0.5_f64,
        minimum in 0.0..10.0_f64,
    ) {
        let domain = compute_axis_domain(&values, AxisPadding::new(fraction, minimum)).unwrap();
        prop_assert!(values.iter().all(|&v| domain.contains(v)));
        prop_assert!(domain.span() >= 2.0 * minimum - 1e-9);
    }
}

// ── 6. Threshold agreement ───────────────────────────────────────────

proptest! {
    #[test]
    fn explanation_agrees_with_risk_rule(result in arb_result()) {
        let thresholds = Thresholds::default();
        let explainer = Explainer::new(thresholds.clone());
        let mistakes = MistakeDetector::new(thresholds.clone()).detect(&result);
        let rule_fired = mistakes.iter().any(|m| m.id == "concentrated_risk_contribution");

        let decomposition = result.risk_decomposition.as_ref().unwrap();
        for (ticker, &rc) in decomposition {
            if rc.abs() <= thresholds.risk_contribution {
                continue;
            }
            let explanation = explainer.explain(
                EntityKind::Ticker,
                ticker,
                0.0,
                &result,
                Verbosity::Plain,
            );
            prop_assert!(explanation.branch.is_risk_concentration());
            prop_assert!(rule_fired);
        }

        for mistake in mistakes.iter().filter(|m| m.id == "concentrated_risk_contribution") {
            for ticker in &mistake.tickers {
                let explanation = explainer.explain(
                    EntityKind::Ticker,
                    ticker,
                    0.0,
                    &result,
                    Verbosity::Technical,
                );
                prop_assert!(explanation.branch.is_risk_concentration());
            }
        }
    }
}
