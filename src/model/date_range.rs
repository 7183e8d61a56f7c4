use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::{error::Error, helpers::to_iso_string};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, Error> {
        if start > end {
            return Err(Error::InvalidDateRange {
                start: to_iso_string(&start),
                end: to_iso_string(&end),
            });
        }

        Ok(Self { start, end })
    }

    /// The `days` days leading up to `now`.
    pub fn last_days(now: DateTime<Utc>, days: i64) -> Self {
        let start = Duration::try_days(days.max(0))
            .and_then(|days| now.checked_sub_signed(days))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end: now }
    }

    pub fn query_params(&self) -> Vec<(String, String)> {
        vec![
            (String::from("startDate"), to_iso_string(&self.start)),
            (String::from("endDate"), to_iso_string(&self.end)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_last_days() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let range = DateRange::last_days(now, 14);

        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(range.end, now);
        assert_eq!(
            range.query_params(),
            vec![
                (String::from("startDate"), String::from("2024-01-01T00:00:00.000Z")),
                (String::from("endDate"), String::from("2024-01-15T00:00:00.000Z")),
            ]
        );
    }

    #[test]
    fn test_new_rejects_inverted_range() {
        let start = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        assert!(matches!(
            DateRange::new(start, end),
            Err(Error::InvalidDateRange { .. })
        ));
        assert!(DateRange::new(end, start).is_ok());
    }
}
