use std::fmt;

use chrono::{
    DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc,
};
use serde::{
    de::{self, Visitor},
    Deserializer,
};

use crate::error::Error;

const NAIVE_DATE_TIME_FORMATS: &[&str] =
    &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses the timestamp shapes the dashboard API emits.
///
/// RFC 3339 values keep their offset. A bare `YYYY-MM-DD` date is midnight
/// UTC and a date-time without offset is read as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, Error> {
    let value = value.trim();

    if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
        return Ok(date_time.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&midnight));
        }
    }

    for format in NAIVE_DATE_TIME_FORMATS {
        if let Ok(date_time) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Utc.from_utc_datetime(&date_time));
        }
    }

    Err(Error::DecodeDateTimeError(value.to_owned()))
}

pub fn from_timestamp_millis(millis: i64) -> Result<DateTime<Utc>, Error> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| Error::DecodeDateTimeError(millis.to_string()))
}

/// ISO-8601 with millisecond precision and a `Z` suffix, the form query
/// parameters are sent in.
pub fn to_iso_string(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serde adapter for timestamps sent either as strings or epoch millis.
pub fn deserialize_timestamp<'de, D>(
    deserializer: D,
) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(TimestampVisitor)
}

struct TimestampVisitor;

impl<'de> Visitor<'de> for TimestampVisitor {
    type Value = DateTime<Utc>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an ISO-8601 string or epoch milliseconds")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        parse_timestamp(value).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        from_timestamp_millis(value).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        let value = i64::try_from(value).map_err(E::custom)?;
        from_timestamp_millis(value).map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
        if !value.is_finite() {
            return Err(E::custom(Error::DecodeDateTimeError(
                value.to_string(),
            )));
        }
        from_timestamp_millis(value.trunc() as i64).map_err(E::custom)
    }
}
