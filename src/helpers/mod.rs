pub use self::{
    aggregate::{
        aggregate, daily_totals, total_for_date, unique_dates,
        unique_in_order, unique_symbols,
    },
    decimal::{coerce_decimal, deserialize_decimal, parse_decimal},
    format::{format_number, format_usd, AsNumber, NumberFormatOptions, NumberStyle},
    time::{
        deserialize_timestamp, from_timestamp_millis, parse_timestamp,
        to_iso_string,
    },
};

mod aggregate;
mod decimal;
mod format;
mod time;
