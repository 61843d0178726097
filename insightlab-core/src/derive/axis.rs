//! Padded axis domains for chart rendering.

use serde::{Deserialize, Serialize};

use crate::config::AxisPadding;

/// Inclusive `[min, max]` bounds of a chart axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisDomain {
    pub min: f64,
    pub max: f64,
}

impl AxisDomain {
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// `[min - pad, max + pad]` with `pad = max(range × fraction, minimum)`.
///
/// Non-finite values are ignored. Returns `None` when nothing finite is left.
/// A configured floor caps how far the lower bound may drop (volatility axes
/// never go below zero).
pub fn compute_axis_domain(values: &[f64], padding: AxisPadding) -> Option<AxisDomain> {
    let mut finite = values.iter().copied().filter(|v| v.is_finite());
    let first = finite.next()?;
    let (lo, hi) = finite.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));

    let pad = ((hi - lo) * padding.fraction).max(padding.minimum);
    let mut min = lo - pad;
    if let Some(floor) = padding.floor {
        min = min.max(floor);
    }

    Some(AxisDomain { min, max: hi + pad })
}
