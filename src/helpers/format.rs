//! `en-US` number formatting for display values.
//!
//! Any value is coerced to a number first (strings are parsed, empty means
//! zero, garbage means NaN) and then rendered with the resolved style.

use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use serde_json::Value;

pub const MAX_FRACTION_DIGITS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberStyle {
    #[default]
    Decimal,
    Currency,
    Percent,
}

/// Overrides layered on top of the `decimal` style defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFormatOptions {
    pub style: NumberStyle,
    pub currency: String,
    pub minimum_fraction_digits: Option<u32>,
    pub maximum_fraction_digits: Option<u32>,
    pub use_grouping: bool,
}

impl Default for NumberFormatOptions {
    fn default() -> Self {
        Self {
            style: NumberStyle::Decimal,
            currency: String::from("USD"),
            minimum_fraction_digits: None,
            maximum_fraction_digits: None,
            use_grouping: true,
        }
    }
}

impl NumberFormatOptions {
    pub fn currency(currency: &str) -> Self {
        Self {
            style: NumberStyle::Currency,
            currency: currency.to_owned(),
            ..Self::default()
        }
    }

    pub fn percent() -> Self {
        Self {
            style: NumberStyle::Percent,
            ..Self::default()
        }
    }

    pub fn with_fraction_digits(mut self, min: u32, max: u32) -> Self {
        self.minimum_fraction_digits = Some(min);
        self.maximum_fraction_digits = Some(max);
        self
    }

    pub fn without_grouping(mut self) -> Self {
        self.use_grouping = false;
        self
    }

    fn fraction_digits(&self) -> (u32, u32) {
        let (default_min, default_max) = match self.style {
            NumberStyle::Decimal => (0, 3),
            NumberStyle::Currency => (2, 2),
            NumberStyle::Percent => (0, 0),
        };

        let min = self
            .minimum_fraction_digits
            .unwrap_or(default_min)
            .min(MAX_FRACTION_DIGITS);
        let max = self
            .maximum_fraction_digits
            .unwrap_or_else(|| default_max.max(min))
            .min(MAX_FRACTION_DIGITS);

        (min, max.max(min))
    }

    fn currency_symbol(&self) -> String {
        match self.currency.to_uppercase().as_str() {
            "USD" => String::from("$"),
            "EUR" => String::from("€"),
            "GBP" => String::from("£"),
            "JPY" => String::from("¥"),
            other => format!("{}\u{a0}", other),
        }
    }
}

/// Numeric coercion of loosely typed values.
pub trait AsNumber {
    fn as_number(&self) -> f64;
}

impl AsNumber for f64 {
    fn as_number(&self) -> f64 {
        *self
    }
}

impl AsNumber for f32 {
    fn as_number(&self) -> f64 {
        f64::from(*self)
    }
}

impl AsNumber for i64 {
    fn as_number(&self) -> f64 {
        *self as f64
    }
}

impl AsNumber for u64 {
    fn as_number(&self) -> f64 {
        *self as f64
    }
}

impl AsNumber for i32 {
    fn as_number(&self) -> f64 {
        f64::from(*self)
    }
}

impl AsNumber for bool {
    fn as_number(&self) -> f64 {
        if *self {
            1.0
        } else {
            0.0
        }
    }
}

impl AsNumber for str {
    fn as_number(&self) -> f64 {
        let value = self.trim();
        if value.is_empty() {
            return 0.0;
        }
        match value {
            "Infinity" | "+Infinity" => f64::INFINITY,
            "-Infinity" => f64::NEG_INFINITY,
            _ if value
                .chars()
                .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') =>
            {
                f64::NAN
            },
            _ => value.parse().unwrap_or(f64::NAN),
        }
    }
}

impl AsNumber for String {
    fn as_number(&self) -> f64 {
        self.as_str().as_number()
    }
}

impl AsNumber for BigDecimal {
    fn as_number(&self) -> f64 {
        self.to_f64().unwrap_or(f64::NAN)
    }
}

impl AsNumber for Value {
    fn as_number(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(b) => b.as_number(),
            Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
            Value::String(s) => s.as_number(),
            Value::Array(_) | Value::Object(_) => f64::NAN,
        }
    }
}

impl<T: AsNumber + ?Sized> AsNumber for &T {
    fn as_number(&self) -> f64 {
        (**self).as_number()
    }
}

pub fn format_number<V>(value: &V, options: &NumberFormatOptions) -> String
where
    V: AsNumber + ?Sized,
{
    let mut number = value.as_number();
    if options.style == NumberStyle::Percent {
        number *= 100.0;
    }

    if number.is_nan() {
        return String::from("NaN");
    }

    let body = if number.is_infinite() {
        String::from("∞")
    } else {
        let (min, max) = options.fraction_digits();
        format_finite(number.abs(), min, max, options.use_grouping)
    };

    // No sign when the value rounds to zero
    let negative = number.is_sign_negative()
        && body.chars().any(|c| matches!(c, '1'..='9' | '∞'));
    let sign = if negative { "-" } else { "" };

    match options.style {
        NumberStyle::Decimal => format!("{}{}", sign, body),
        NumberStyle::Currency => {
            format!("{}{}{}", sign, options.currency_symbol(), body)
        },
        NumberStyle::Percent => format!("{}{}%", sign, body),
    }
}

/// Formats a value as US dollars with two decimals, e.g. `$1,234.50`.
pub fn format_usd<V: AsNumber + ?Sized>(value: &V) -> String {
    format_number(value, &NumberFormatOptions::currency("USD"))
}

fn format_finite(number: f64, min: u32, max: u32, use_grouping: bool) -> String {
    // Shortest round-trip representation, so 1.005 rounds like the literal
    let decimal = match BigDecimal::from_str(&number.to_string()) {
        Ok(decimal) => decimal,
        Err(_) => return String::from("NaN"),
    };

    let rounded = decimal.with_scale_round(i64::from(max), RoundingMode::HalfUp);
    let plain = rounded.to_plain_string();

    let (integer, fraction) = match plain.split_once('.') {
        Some((integer, fraction)) => (integer.to_owned(), fraction.to_owned()),
        None => (plain, String::new()),
    };

    let mut fraction = fraction.trim_end_matches('0').to_owned();
    while fraction.len() < min as usize {
        fraction.push('0');
    }

    let integer = if use_grouping {
        group_thousands(&integer)
    } else {
        integer
    };

    if fraction.is_empty() {
        integer
    } else {
        format!("{}.{}", integer, fraction)
    }
}

fn group_thousands(integer: &str) -> String {
    let digits: Vec<char> = integer.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (index, digit) in digits.iter().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*digit);
    }

    grouped
}
