pub use self::{
    dashboard_snapshot::{DashboardSnapshot, LoadStatus},
    date_range::DateRange,
    tvl_aggregates::{DailyTvl, TvlAggregates},
};

mod dashboard_snapshot;
mod date_range;
mod tvl_aggregates;
