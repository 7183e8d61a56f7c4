use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::{error::Error, helpers::AsNumber};

/// Strict decimal parse of a trimmed string. Empty means zero.
pub fn parse_decimal(value: &str) -> Result<BigDecimal, Error> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(BigDecimal::from(0));
    }

    Ok(BigDecimal::from_str(value)?)
}

/// Loose numeric coercion of an amount sent by the API.
///
/// `null`, `""` and `false` are zero, numeric strings are trimmed and parsed,
/// anything that is not a finite number counts as zero.
pub fn coerce_decimal(value: &Value) -> BigDecimal {
    let parsed = match value {
        Value::Number(number) => parse_decimal(&number.to_string()),
        Value::String(text) => parse_decimal(text),
        _ => Err(Error::FetchError(value.to_string())),
    };

    match parsed {
        Ok(decimal) => decimal,
        Err(_) => {
            let number = AsNumber::as_number(value);
            if !number.is_finite() {
                debug!("Non numeric amount {} counted as zero", value);
                return BigDecimal::from(0);
            }
            parse_decimal(&number.to_string())
                .unwrap_or_else(|_| BigDecimal::from(0))
        },
    }
}

/// Serde adapter for amounts that may arrive as numbers, numeric strings,
/// empty strings or `null`.
pub fn deserialize_decimal<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_decimal(&value))
}
