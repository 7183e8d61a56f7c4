use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::{
    helpers::format_usd,
    model::{DailyTvl, TvlAggregates},
    types::{TvlChartResponse, TvlPoint},
};

/// Removes duplicates while keeping the first occurrence of each item.
pub fn unique_in_order<T, I>(items: I) -> Vec<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Calendar dates present in either sequence, lending first.
pub fn unique_dates(lending: &[TvlPoint], vault: &[TvlPoint]) -> Vec<NaiveDate> {
    unique_in_order(lending.iter().chain(vault.iter()).map(TvlPoint::date))
}

pub fn unique_symbols(points: &[TvlPoint]) -> Vec<String> {
    unique_in_order(points.iter().map(|point| point.symbol.to_owned()))
}

/// Sum of every lending and vault sample per calendar date, oldest first.
pub fn daily_totals(lending: &[TvlPoint], vault: &[TvlPoint]) -> Vec<DailyTvl> {
    let mut totals: BTreeMap<NaiveDate, BigDecimal> = BTreeMap::new();

    for point in lending.iter().chain(vault.iter()) {
        let total = totals.entry(point.date()).or_default();
        *total += &point.tvl;
    }

    totals
        .into_iter()
        .map(|(date, tvl)| DailyTvl { date, tvl })
        .collect()
}

pub fn total_for_date(
    lending: &[TvlPoint],
    vault: &[TvlPoint],
    date: NaiveDate,
) -> BigDecimal {
    lending
        .iter()
        .chain(vault.iter())
        .filter(|point| point.date() == date)
        .fold(BigDecimal::from(0), |total, point| total + &point.tvl)
}

/// Derives everything the dashboard shows from one TVL response.
pub fn aggregate(response: &TvlChartResponse) -> TvlAggregates {
    let lending = response.lending.as_slice();
    let vault = response.vault.as_slice();

    let dates = unique_dates(lending, vault);
    let latest_date = dates.iter().max().copied();

    let total_tvl = match latest_date {
        Some(date) => total_for_date(lending, vault, date),
        None => BigDecimal::from(0),
    };
    let total_tvl_formatted = format_usd(&total_tvl);

    TvlAggregates {
        dates,
        lending_symbols: unique_symbols(lending),
        vault_symbols: unique_symbols(vault),
        daily_totals: daily_totals(lending, vault),
        latest_date,
        total_tvl,
        total_tvl_formatted,
    }
}
