//! Calendar-day (de)serialization for optimizer and persisted dates.
//!
//! The optimizer emits `2024-01-02`, `2024-01-02 00:00:00` or full RFC 3339
//! timestamps depending on the endpoint. Only the calendar day matters to the
//! engine, so everything is collapsed to a `NaiveDate` and written back as
//! `YYYY-MM-DD`.

use chrono::NaiveDate;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse the calendar-day prefix of a date or timestamp string.
pub fn parse_calendar_day(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    let day = raw.trim().split([' ', 'T']).next().unwrap_or_default();
    NaiveDate::parse_from_str(day, DATE_FORMAT)
}

/// `#[serde(with = "calendar_day")]` for `NaiveDate` fields.
pub mod calendar_day {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(super::DATE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_calendar_day(&raw).map_err(serde::de::Error::custom)
    }
}

/// `#[serde(with = "calendar_day_opt")]` for `Option<NaiveDate>` fields.
pub mod calendar_day_opt {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => serializer.collect_str(&d.format(super::DATE_FORMAT)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            Some(s) if !s.trim().is_empty() => super::parse_calendar_day(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_plain_date() {
        assert_eq!(parse_calendar_day("2024-03-05").unwrap(), day(2024, 3, 5));
    }

    #[test]
    fn parses_date_with_time_component() {
        assert_eq!(
            parse_calendar_day("2024-03-05 00:00:00").unwrap(),
            day(2024, 3, 5)
        );
    }

    #[test]
    fn parses_rfc3339_timestamp() {
        assert_eq!(
            parse_calendar_day("2024-03-05T14:30:00.000Z").unwrap(),
            day(2024, 3, 5)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_calendar_day("yesterday").is_err());
        assert!(parse_calendar_day("").is_err());
    }
}
