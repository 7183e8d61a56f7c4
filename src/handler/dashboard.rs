//! Dashboard state store
//!
//! Fetches the lending and vault TVL history for the selected date range,
//! derives the aggregates shown on the dashboard and keeps the latest
//! consistent snapshot. Also collects unique user ids from the configured
//! subgraphs.

use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc, Mutex, PoisonError,
};

use futures::future::try_join_all;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    cache::{Clock, SystemClock},
    configuration::Config,
    error::Error,
    helpers::{aggregate, unique_in_order},
    model::{DashboardSnapshot, DateRange, LoadStatus, TvlAggregates},
    provider::{FetchParams, HTTP},
    types::{TvlChartResponse, UsersData},
};

pub const TVL_HISTORY_PATH: &str = "dashboard/tvl";
pub const USERS_QUERY: &str = "{ users { id } }";

struct StoreState {
    snapshot: Arc<DashboardSnapshot>,
    /// Ticket of the newest TVL fetch whose outcome was applied
    applied: u64,
}

#[derive(Debug)]
pub struct Dashboard {
    http: Arc<HTTP>,
    clock: Arc<dyn Clock>,
    state: Mutex<StoreState>,
    in_flight: AtomicUsize,
    issued: AtomicU64,
    range: watch::Sender<DateRange>,
}

impl std::fmt::Debug for StoreState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreState")
            .field("status", &self.snapshot.status)
            .field("applied", &self.applied)
            .finish()
    }
}

/// Keeps the fetching counter raised for as long as a fetch future lives,
/// including when it is dropped before completion.
struct FetchingGuard<'a>(&'a AtomicUsize);

impl<'a> FetchingGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        FetchingGuard(counter)
    }
}

impl Drop for FetchingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Dashboard {
    pub fn new(http: Arc<HTTP>) -> Dashboard {
        Dashboard::with_clock(http, Arc::new(SystemClock))
    }

    pub fn with_clock(http: Arc<HTTP>, clock: Arc<dyn Clock>) -> Dashboard {
        let range =
            DateRange::last_days(clock.now(), http.config.default_range_days);
        let (range, _) = watch::channel(range);

        Dashboard {
            http,
            clock,
            state: Mutex::new(StoreState {
                snapshot: Arc::new(DashboardSnapshot::default()),
                applied: 0,
            }),
            in_flight: AtomicUsize::new(0),
            issued: AtomicU64::new(0),
            range,
        }
    }

    pub fn config(&self) -> &Config {
        &self.http.config
    }

    pub fn snapshot(&self) -> Arc<DashboardSnapshot> {
        self.lock().snapshot.clone()
    }

    /// True while at least one TVL fetch is in flight. Advisory only, it
    /// does not prevent overlapping fetches.
    pub fn is_fetching(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn date_range(&self) -> DateRange {
        *self.range.borrow()
    }

    /// Replaces the selected range and notifies range subscribers.
    pub fn set_date_range(&self, range: DateRange) {
        self.range.send_replace(range);
    }

    pub fn subscribe_range(&self) -> watch::Receiver<DateRange> {
        self.range.subscribe()
    }

    pub async fn fetch_tvl_chart_history(
        &self,
    ) -> Result<Arc<TvlAggregates>, Error> {
        let range = self.date_range();
        self.fetch_tvl_chart_history_for(range).await
    }

    /// Fetches TVL history for `range` and replaces the TVL part of the
    /// snapshot. On failure the previous data stays in place and the status
    /// records the error. Outcomes of fetches issued before an already
    /// applied one are dropped.
    pub async fn fetch_tvl_chart_history_for(
        &self,
        range: DateRange,
    ) -> Result<Arc<TvlAggregates>, Error> {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let _fetching = FetchingGuard::new(&self.in_flight);

        let params = FetchParams::get(TVL_HISTORY_PATH)
            .with_query(range.query_params())
            .no_cache();

        match self.http.fetch_data::<TvlChartResponse>(params).await {
            Ok(response) => {
                let aggregates = Arc::new(aggregate(&response));
                let tvl_history = Arc::new(response);
                let at = self.clock.now();

                let applied = self.apply(ticket, |snapshot| DashboardSnapshot {
                    tvl_history: tvl_history.clone(),
                    aggregates: aggregates.clone(),
                    range: Some(range),
                    status: LoadStatus::Loaded { at },
                    users: snapshot.users.clone(),
                });

                if applied {
                    info!(
                        "TVL history loaded: {} lending, {} vault points, total {}",
                        tvl_history.lending.len(),
                        tvl_history.vault.len(),
                        aggregates.total_tvl_formatted
                    );
                } else {
                    debug!("Discarding stale TVL history #{}", ticket);
                }

                Ok(aggregates)
            },
            Err(e) => {
                warn!("Failed to fetch TVL history: {}", e);
                let message = e.to_string();
                let at = self.clock.now();

                self.apply(ticket, |snapshot| DashboardSnapshot {
                    status: LoadStatus::Failed {
                        at,
                        message: message.to_owned(),
                    },
                    ..snapshot.clone()
                });

                Err(e)
            },
        }
    }

    /// Queries every configured subgraph for user ids and stores their
    /// union. Errors from any endpoint propagate unchanged. Without any
    /// configured subgraph the count is unknown, not zero.
    pub async fn fetch_total_users(&self) -> Result<Arc<Vec<String>>, Error> {
        let urls = &self.http.config.user_subgraph_urls;
        if urls.is_empty() {
            return Err(Error::ConfigurationError(String::from(
                "USER_SUBGRAPH_URLS is not set",
            )));
        }

        let requests = urls
            .iter()
            .map(|url| self.http.post_graphql::<UsersData>(url, USERS_QUERY));
        let results = try_join_all(requests).await?;

        let users = Arc::new(unique_in_order(
            results
                .into_iter()
                .flat_map(|data| data.users.into_iter().map(|user| user.id)),
        ));

        {
            let mut state = self.lock();
            state.snapshot = Arc::new(DashboardSnapshot {
                users: users.clone(),
                ..state.snapshot.as_ref().clone()
            });
        }

        info!("Total users: {}", users.len());
        Ok(users)
    }

    fn apply<F>(&self, ticket: u64, update: F) -> bool
    where
        F: FnOnce(&DashboardSnapshot) -> DashboardSnapshot,
    {
        let mut state = self.lock();
        if ticket <= state.applied {
            return false;
        }

        state.applied = ticket;
        state.snapshot = Arc::new(update(&state.snapshot));
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
