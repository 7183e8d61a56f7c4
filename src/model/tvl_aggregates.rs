use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTvl {
    pub date: NaiveDate,
    pub tvl: BigDecimal,
}

/// Values derived from one TVL response. Always rebuilt as a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TvlAggregates {
    pub dates: Vec<NaiveDate>,
    pub lending_symbols: Vec<String>,
    pub vault_symbols: Vec<String>,
    pub daily_totals: Vec<DailyTvl>,
    pub latest_date: Option<NaiveDate>,
    pub total_tvl: BigDecimal,
    pub total_tvl_formatted: String,
}

impl Default for TvlAggregates {
    fn default() -> Self {
        Self {
            dates: vec![],
            lending_symbols: vec![],
            vault_symbols: vec![],
            daily_totals: vec![],
            latest_date: None,
            total_tvl: BigDecimal::from(0),
            total_tvl_formatted: String::from("$0.00"),
        }
    }
}
