use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::helpers::{deserialize_decimal, deserialize_timestamp};

/// One TVL sample of a lending pool or vault.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TvlPoint {
    #[serde(default)]
    pub id: String,
    pub symbol: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_decimal")]
    pub tvl: BigDecimal,
    #[serde(
        rename = "_timestamp",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp_ms: Option<i64>,
}

impl TvlPoint {
    /// Calendar date of the sample in UTC.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Body of `GET dashboard/tvl`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TvlChartResponse {
    #[serde(default)]
    pub lending: Vec<TvlPoint>,
    #[serde(default)]
    pub vault: Vec<TvlPoint>,
}

impl TvlChartResponse {
    pub fn is_empty(&self) -> bool {
        self.lending.is_empty() && self.vault.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn test_deserialize_mixed_tvl_encodings() {
        let body = json!({
            "lending": [
                { "id": "1", "symbol": "USDC", "timestamp": "2024-01-01T00:00:00.000Z", "tvl": "10.5" },
                { "id": "2", "symbol": "ETH", "timestamp": "2024-01-02", "tvl": 3, "_timestamp": 1704153600000_i64 }
            ]
        });

        let response: TvlChartResponse = serde_json::from_value(body).unwrap();

        assert!(response.vault.is_empty());
        assert_eq!(response.lending.len(), 2);
        assert_eq!(
            response.lending[0].tvl,
            BigDecimal::from_str("10.5").unwrap()
        );
        assert_eq!(response.lending[1].tvl, BigDecimal::from(3));
        assert_eq!(response.lending[1].date().to_string(), "2024-01-02");
        assert_eq!(response.lending[1].timestamp_ms, Some(1704153600000));
    }

    #[test]
    fn test_deserialize_loose_tvl_values() {
        let body = json!({
            "lending": [
                { "symbol": "A", "timestamp": "2024-01-01", "tvl": null },
                { "symbol": "B", "timestamp": "2024-01-01", "tvl": "" },
                { "symbol": "C", "timestamp": "2024-01-01", "tvl": " 12 " },
                { "symbol": "D", "timestamp": "2024-01-01", "tvl": "abc" },
                { "symbol": "E", "timestamp": "2024-01-01" }
            ]
        });

        let response: TvlChartResponse = serde_json::from_value(body).unwrap();
        let tvl: Vec<BigDecimal> =
            response.lending.into_iter().map(|point| point.tvl).collect();

        assert_eq!(
            tvl,
            vec![
                BigDecimal::from(0),
                BigDecimal::from(0),
                BigDecimal::from(12),
                BigDecimal::from(0),
                BigDecimal::from(0),
            ]
        );
    }

    #[test]
    fn test_deserialize_rejects_bad_timestamp() {
        let body = json!({
            "vault": [{ "symbol": "A", "timestamp": "not a date", "tvl": "1" }]
        });

        assert!(serde_json::from_value::<TvlChartResponse>(body).is_err());
    }
}
