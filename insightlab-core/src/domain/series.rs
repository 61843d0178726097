use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::dates::calendar_day;

/// JSON has no NaN: producers write non-finite numbers as `null`. Read them
/// back as NaN so the per-point degradation in `derive` handles them.
fn nan_if_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// One dated observation of a value series (cumulative value, price, or
/// rolling statistic).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    #[serde(with = "calendar_day")]
    pub date: NaiveDate,
    /// Price histories name this field `price`; everything else uses `value`.
    #[serde(alias = "price", deserialize_with = "nan_if_null")]
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// A candidate (risk, return) pair on the efficient frontier, as returned by
/// the optimizer. Not guaranteed sorted or finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrontierPoint {
    #[serde(deserialize_with = "nan_if_null")]
    pub risk: f64,
    #[serde(rename = "return", deserialize_with = "nan_if_null")]
    pub expected_return: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharpe: Option<f64>,
}

impl FrontierPoint {
    pub fn new(risk: f64, expected_return: f64) -> Self {
        Self {
            risk,
            expected_return,
            sharpe: None,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.risk.is_finite() && self.expected_return.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_series_value_reads_as_nan() {
        let point: SeriesPoint =
            serde_json::from_str(r#"{"date": "2024-01-02", "value": null}"#).unwrap();
        assert!(point.value.is_nan());

        let priced: SeriesPoint =
            serde_json::from_str(r#"{"date": "2024-01-02", "price": 101.5}"#).unwrap();
        assert_eq!(priced.value, 101.5);
    }

    #[test]
    fn null_frontier_coordinates_read_as_nan() {
        let point: FrontierPoint =
            serde_json::from_str(r#"{"risk": null, "return": 0.08}"#).unwrap();
        assert!(point.risk.is_nan());
        assert_eq!(point.expected_return, 0.08);
        assert!(!point.is_finite());
    }
}
