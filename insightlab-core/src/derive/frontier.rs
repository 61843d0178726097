//! Efficient-frontier curve preparation.
//!
//! The optimizer samples the frontier and may stop short of the risk level
//! the chosen portfolio actually sits at. An abruptly truncated curve reads as
//! "the portfolio is off-frontier", so the curve is continued along its last
//! segment past the realized point, and a point is interpolated when the
//! realized risk falls inside a sampling gap.
//!
//! This is a presentation heuristic only. Every point it invents is flagged
//! `synthetic`, and the realized-portfolio marker is passed through untouched.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::FrontierConfig;
use crate::domain::FrontierPoint;

/// Risks closer than this are treated as the same risk level.
const RISK_EPSILON: f64 = 1e-12;

/// A point of the rendered frontier curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub risk: f64,
    #[serde(rename = "return")]
    pub expected_return: f64,
    /// True when the point was extrapolated or interpolated, not returned by
    /// the optimizer.
    pub synthetic: bool,
}

impl CurvePoint {
    fn observed(p: &FrontierPoint) -> Self {
        Self {
            risk: p.risk,
            expected_return: p.expected_return,
            synthetic: false,
        }
    }

    fn synthetic(risk: f64, expected_return: f64) -> Self {
        Self {
            risk,
            expected_return,
            synthetic: true,
        }
    }
}

/// The realized portfolio's own (risk, return).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrontierMarker {
    pub risk: f64,
    #[serde(rename = "return")]
    pub expected_return: f64,
}

impl FrontierMarker {
    pub fn new(risk: f64, expected_return: f64) -> Self {
        Self {
            risk,
            expected_return,
        }
    }

    fn is_finite(&self) -> bool {
        self.risk.is_finite() && self.expected_return.is_finite()
    }
}

/// Outcome of frontier preparation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FrontierCurve {
    /// Curve ready to draw, sorted ascending by risk.
    Available {
        points: Vec<CurvePoint>,
        current: FrontierMarker,
        /// Input points dropped as non-finite or negative-risk.
        discarded: usize,
    },
    /// Too few usable points to draw or extend a curve.
    InsufficientData { usable: usize, discarded: usize },
}

impl FrontierCurve {
    pub fn points(&self) -> &[CurvePoint] {
        match self {
            Self::Available { points, .. } => points,
            Self::InsufficientData { .. } => &[],
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }
}

/// Prepare the frontier curve with the default heuristics.
pub fn extrapolate_frontier(points: &[FrontierPoint], current: FrontierMarker) -> FrontierCurve {
    extrapolate_frontier_with(points, current, &FrontierConfig::default())
}

/// Prepare the frontier curve.
///
/// 1. Drop non-finite and negative-risk points, sort the rest by risk.
/// 2. Fewer than two points (or two distinct risk levels) is `InsufficientData`.
/// 3. If the realized risk lies beyond the last point, append synthetic points
///    along the last segment's slope at the configured fractions of the
///    remaining distance.
/// 4. Otherwise, if the realized risk falls strictly between two neighbours,
///    insert one interpolated point at that risk.
pub fn extrapolate_frontier_with(
    points: &[FrontierPoint],
    current: FrontierMarker,
    config: &FrontierConfig,
) -> FrontierCurve {
    let mut curve: Vec<CurvePoint> = points
        .iter()
        .filter(|p| p.is_finite() && p.risk >= 0.0)
        .map(CurvePoint::observed)
        .collect();
    let discarded = points.len() - curve.len();
    if discarded > 0 {
        debug!(discarded, "dropped unusable frontier points");
    }

    curve.sort_by(|a, b| a.risk.total_cmp(&b.risk));

    let slope = match last_segment_slope(&curve) {
        Some(s) if curve.len() >= 2 => s,
        _ => {
            return FrontierCurve::InsufficientData {
                usable: curve.len(),
                discarded,
            }
        }
    };

    if current.is_finite() {
        let last = curve[curve.len() - 1];
        if current.risk > last.risk + RISK_EPSILON {
            extend_past_last(&mut curve, last, slope, current.risk, config);
        } else {
            interpolate_gap(&mut curve, current.risk);
        }
    }

    FrontierCurve::Available {
        points: curve,
        current,
        discarded,
    }
}

/// Slope of the last segment whose endpoints have distinct risk.
fn last_segment_slope(curve: &[CurvePoint]) -> Option<f64> {
    curve.windows(2).rev().find_map(|w| {
        let dr = w[1].risk - w[0].risk;
        if dr > RISK_EPSILON {
            Some((w[1].expected_return - w[0].expected_return) / dr)
        } else {
            None
        }
    })
}

fn extend_past_last(
    curve: &mut Vec<CurvePoint>,
    last: CurvePoint,
    slope: f64,
    target_risk: f64,
    config: &FrontierConfig,
) {
    let remaining = target_risk - last.risk;
    let mut fractions: Vec<f64> = config
        .extrapolation_fractions
        .iter()
        .copied()
        .filter(|f| f.is_finite() && *f > 0.0)
        .collect();
    fractions.sort_by(|a, b| a.total_cmp(b));
    fractions.dedup();

    for f in fractions {
        let risk = last.risk + remaining * f;
        let expected_return = last.expected_return + slope * (risk - last.risk);
        curve.push(CurvePoint::synthetic(risk, expected_return));
    }
}

fn interpolate_gap(curve: &mut Vec<CurvePoint>, risk: f64) {
    let idx = curve.partition_point(|p| p.risk < risk);
    if idx == 0 || idx >= curve.len() {
        return;
    }
    let (a, b) = (curve[idx - 1], curve[idx]);
    if risk - a.risk <= RISK_EPSILON || b.risk - risk <= RISK_EPSILON {
        return;
    }
    let t = (risk - a.risk) / (b.risk - a.risk);
    let expected_return = a.expected_return + t * (b.expected_return - a.expected_return);
    curve.insert(idx, CurvePoint::synthetic(risk, expected_return));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: &[(f64, f64)]) -> Vec<FrontierPoint> {
        raw.iter().map(|&(r, e)| FrontierPoint::new(r, e)).collect()
    }

    fn is_sorted(curve: &[CurvePoint]) -> bool {
        curve.windows(2).all(|w| w[0].risk <= w[1].risk)
    }

    #[test]
    fn extends_beyond_last_point_along_slope() {
        let curve = extrapolate_frontier(&pts(&[(5.0, 8.0), (10.0, 12.0)]), FrontierMarker::new(15.0, 14.0));
        let points = curve.points();
        assert_eq!(points.len(), 6);
        assert!(is_sorted(points));

        let appended: Vec<&CurvePoint> = points.iter().filter(|p| p.synthetic).collect();
        assert_eq!(appended.len(), 4);
        for p in &appended {
            assert!(p.risk > 10.0);
            let expected = 12.0 + 0.8 * (p.risk - 10.0);
            assert!((p.expected_return - expected).abs() < 1e-10);
        }
        assert!((appended[0].risk - 11.0).abs() < 1e-10);
        assert!(appended.last().unwrap().risk > 15.0);
    }

    #[test]
    fn current_marker_is_untouched() {
        let current = FrontierMarker::new(15.0, 14.0);
        match extrapolate_frontier(&pts(&[(5.0, 8.0), (10.0, 12.0)]), current) {
            FrontierCurve::Available { current: c, .. } => assert_eq!(c, current),
            other => panic!("expected curve, got {other:?}"),
        }
    }

    #[test]
    fn interpolates_inside_a_gap() {
        let curve = extrapolate_frontier(
            &pts(&[(10.0, 12.0), (5.0, 8.0), (20.0, 15.0)]),
            FrontierMarker::new(15.0, 13.0),
        );
        let points = curve.points();
        assert_eq!(points.len(), 4);
        assert!(is_sorted(points));
        let inserted = points.iter().find(|p| p.synthetic).unwrap();
        assert_eq!(inserted.risk, 15.0);
        assert!((inserted.expected_return - 13.5).abs() < 1e-10);
    }

    #[test]
    fn no_insertion_when_current_sits_on_a_point() {
        let curve = extrapolate_frontier(
            &pts(&[(5.0, 8.0), (10.0, 12.0), (20.0, 15.0)]),
            FrontierMarker::new(10.0, 12.0),
        );
        assert_eq!(curve.points().len(), 3);
        assert!(curve.points().iter().all(|p| !p.synthetic));
    }

    #[test]
    fn no_insertion_below_first_point() {
        let curve = extrapolate_frontier(
            &pts(&[(5.0, 8.0), (10.0, 12.0)]),
            FrontierMarker::new(2.0, 3.0),
        );
        assert_eq!(curve.points().len(), 2);
    }

    #[test]
    fn discards_non_finite_and_negative_risk() {
        let raw = pts(&[(f64::NAN, 1.0), (-1.0, 2.0), (5.0, f64::INFINITY), (5.0, 8.0), (10.0, 12.0)]);
        match extrapolate_frontier(&raw, FrontierMarker::new(7.5, 10.0)) {
            FrontierCurve::Available { points, discarded, .. } => {
                assert_eq!(discarded, 3);
                assert_eq!(points.len(), 3);
            }
            other => panic!("expected curve, got {other:?}"),
        }
    }

    #[test]
    fn fewer_than_two_points_is_insufficient() {
        let curve = extrapolate_frontier(&pts(&[(5.0, 8.0)]), FrontierMarker::new(6.0, 9.0));
        assert_eq!(curve, FrontierCurve::InsufficientData { usable: 1, discarded: 0 });
        assert!(curve.points().is_empty());
    }

    #[test]
    fn single_risk_level_is_insufficient() {
        let curve = extrapolate_frontier(&pts(&[(5.0, 8.0), (5.0, 9.0)]), FrontierMarker::new(6.0, 9.0));
        assert!(!curve.is_available());
    }

    #[test]
    fn non_finite_current_skips_extension() {
        let curve = extrapolate_frontier(
            &pts(&[(5.0, 8.0), (10.0, 12.0)]),
            FrontierMarker::new(f64::NAN, 1.0),
        );
        assert_eq!(curve.points().len(), 2);
    }

    #[test]
    fn serializes_with_status_tag() {
        let curve = extrapolate_frontier(&[], FrontierMarker::new(1.0, 1.0));
        let json = serde_json::to_value(&curve).unwrap();
        assert_eq!(json["status"], "insufficient_data");
    }
}
