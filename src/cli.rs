//! CLI module for the dashboard client
//!
//! Drives the dashboard store from a terminal: one-off TVL and user
//! queries, or a sequence of ranges fed through the range refresher.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tokio::time::{sleep, timeout};

use crate::{
    configuration::{get_configuration, set_configuration, AppState, Config},
    error::Error,
    handler::{Dashboard, RangeRefresher},
    helpers::parse_timestamp,
    model::{DateRange, LoadStatus},
    provider::HTTP,
};

/// DeFi dashboard client
#[derive(Parser)]
#[command(name = "dashboard")]
#[command(about = "DeFi dashboard data client", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch TVL history and print the aggregates (default if no command specified)
    Tvl {
        /// Range start, RFC 3339 or YYYY-MM-DD
        #[arg(long)]
        start: Option<String>,

        /// Range end, RFC 3339 or YYYY-MM-DD. Defaults to now
        #[arg(long)]
        end: Option<String>,
    },

    /// Count unique users across the subgraphs listed in USER_SUBGRAPH_URLS
    /// (comma separated, required for this command)
    Users,

    /// Switch through ranges of the last N days and print the final snapshot.
    /// Example: --days 7 --days 30 fetches only the 30 day range.
    Watch {
        #[arg(long, required = true)]
        days: Vec<i64>,
    },
}

/// Initialize configuration and return Config
pub fn init_config() -> Result<Config, Error> {
    set_configuration()?;
    get_configuration()
}

pub fn init_dashboard(config: Config) -> Result<AppState<Dashboard>, Error> {
    let http = HTTP::new(config)?;
    Ok(AppState::new(Dashboard::new(Arc::new(http))))
}

pub async fn run(
    dashboard: AppState<Dashboard>,
    command: Option<Commands>,
) -> Result<(), Error> {
    match command {
        None => run_tvl(dashboard, None, None).await,
        Some(Commands::Tvl { start, end }) => {
            run_tvl(dashboard, start, end).await
        },
        Some(Commands::Users) => run_users(dashboard).await,
        Some(Commands::Watch { days }) => run_watch(dashboard, days).await,
    }
}

pub async fn run_tvl(
    dashboard: AppState<Dashboard>,
    start: Option<String>,
    end: Option<String>,
) -> Result<(), Error> {
    let range = parse_range(
        start.as_deref(),
        end.as_deref(),
        Utc::now(),
        dashboard.config().default_range_days,
    )?;

    tracing::info!(
        "Fetching TVL history from {} to {}",
        range.start,
        range.end
    );
    let aggregates = dashboard.fetch_tvl_chart_history_for(range).await?;
    println!("{}", serde_json::to_string_pretty(&*aggregates)?);

    Ok(())
}

pub async fn run_users(dashboard: AppState<Dashboard>) -> Result<(), Error> {
    let users = dashboard.fetch_total_users().await?;
    println!("{}", users.len());

    Ok(())
}

pub async fn run_watch(
    dashboard: AppState<Dashboard>,
    days: Vec<i64>,
) -> Result<(), Error> {
    if let Some(value) = days.iter().find(|value| **value <= 0) {
        return Err(Error::InvalidOption {
            option: format!("--days {}", value),
        });
    }

    let refresher = RangeRefresher::spawn(dashboard.clone());
    let debounce = dashboard.config().range_debounce;

    for value in days {
        let range = DateRange::last_days(Utc::now(), value);
        tracing::info!("Range set to last {} days", value);
        dashboard.set_date_range(range);
    }

    let limit = debounce + Duration::from_secs(dashboard.config().timeout);
    let settled = timeout(limit, async {
        sleep(debounce + Duration::from_millis(50)).await;
        while dashboard.is_fetching() {
            sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    refresher.shutdown();

    if settled.is_err() {
        return Err(Error::FetchError(String::from(
            "timed out waiting for range refresh",
        )));
    }

    let snapshot = dashboard.snapshot();
    if let LoadStatus::Failed { message, .. } = &snapshot.status {
        return Err(Error::FetchError(message.to_owned()));
    }
    println!("{}", serde_json::to_string_pretty(&*snapshot.aggregates)?);

    Ok(())
}

/// Missing bounds fall back to `now` for the end and `default_days` before
/// the end for the start.
pub fn parse_range(
    start: Option<&str>,
    end: Option<&str>,
    now: DateTime<Utc>,
    default_days: i64,
) -> Result<DateRange, Error> {
    let end = match end {
        Some(value) => parse_timestamp(value)?,
        None => now,
    };
    let start = match start {
        Some(value) => parse_timestamp(value)?,
        None => DateRange::last_days(end, default_days).start,
    };

    DateRange::new(start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_range_defaults() {
        let range = parse_range(None, None, now(), 14).unwrap();
        assert_eq!(range.end, now());
        assert_eq!(
            range.start,
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_range_explicit() {
        let range =
            parse_range(Some("2024-01-01"), Some("2024-01-31"), now(), 14)
                .unwrap();
        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_range_rejects_inverted() {
        let result = parse_range(Some("2024-02-01"), Some("2024-01-01"), now(), 14);
        assert!(matches!(result, Err(Error::InvalidDateRange { .. })));
    }

    #[test]
    fn test_parse_range_rejects_garbage() {
        let result = parse_range(Some("yesterday"), None, now(), 14);
        assert!(matches!(result, Err(Error::DecodeDateTimeError(_))));
    }

    #[test]
    fn test_cli_parses_watch() {
        let cli = Cli::parse_from(["dashboard", "watch", "--days", "7", "--days", "30"]);
        match cli.command {
            Some(Commands::Watch { days }) => assert_eq!(days, vec![7, 30]),
            _ => panic!("expected watch command"),
        }
    }
}
