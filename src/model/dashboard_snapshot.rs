use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    model::{DateRange, TvlAggregates},
    types::TvlChartResponse,
};

/// Outcome of the most recent TVL fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    NotLoaded,
    Loaded { at: DateTime<Utc> },
    Failed { at: DateTime<Utc>, message: String },
}

/// Everything the dashboard renders, replaced as one value.
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub tvl_history: Arc<TvlChartResponse>,
    pub aggregates: Arc<TvlAggregates>,
    pub range: Option<DateRange>,
    pub status: LoadStatus,
    pub users: Arc<Vec<String>>,
}

impl DashboardSnapshot {
    pub fn total_users(&self) -> usize {
        self.users.len()
    }

    pub fn has_data(&self) -> bool {
        !self.tvl_history.is_empty()
    }
}

impl Default for DashboardSnapshot {
    fn default() -> Self {
        Self {
            tvl_history: Arc::new(TvlChartResponse::default()),
            aggregates: Arc::new(TvlAggregates::default()),
            range: None,
            status: LoadStatus::NotLoaded,
            users: Arc::new(vec![]),
        }
    }
}
