pub use self::{
    dashboard::{Dashboard, TVL_HISTORY_PATH, USERS_QUERY},
    range_refresher::RangeRefresher,
};

mod dashboard;
mod range_refresher;
