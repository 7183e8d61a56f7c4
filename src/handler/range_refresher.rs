//! Background refetch on date range changes
//!
//! Waits for the dashboard range to settle for the configured debounce
//! period before fetching. A range change during a fetch drops that fetch
//! and starts over, so only the latest range is ever applied.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use tokio::{sync::watch, task::JoinHandle, time::sleep};
use tracing::{debug, info};

use crate::{configuration::AppState, model::DateRange};

use super::Dashboard;

/// Handle of the refresh task. The task stops when the handle is dropped or
/// when the dashboard itself goes away.
#[derive(Debug)]
pub struct RangeRefresher {
    handle: JoinHandle<()>,
}

impl RangeRefresher {
    pub fn spawn(dashboard: AppState<Dashboard>) -> RangeRefresher {
        let debounce = dashboard.config().range_debounce;
        let receiver = dashboard.subscribe_range();
        let dashboard = Arc::downgrade(&*dashboard);
        let handle =
            tokio::spawn(range_refresh_task(dashboard, receiver, debounce));

        RangeRefresher { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn shutdown(self) {
        self.handle.abort();
    }
}

impl Drop for RangeRefresher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn range_refresh_task(
    dashboard: Weak<Dashboard>,
    mut receiver: watch::Receiver<DateRange>,
    debounce: Duration,
) {
    info!("Starting range refresh task");
    let mut pending = false;

    loop {
        if !pending && receiver.changed().await.is_err() {
            debug!("Dashboard dropped, stopping range refresh task");
            return;
        }
        pending = false;

        if !settle(&mut receiver, debounce).await {
            return;
        }

        let range = *receiver.borrow_and_update();
        let Some(dashboard) = dashboard.upgrade() else {
            return;
        };
        debug!("Fetching TVL history for {:?}", range);

        tokio::select! {
            result = dashboard.fetch_tvl_chart_history_for(range) => {
                if let Err(e) = result {
                    debug!("Range refresh failed: {}", e);
                }
            }
            changed = receiver.changed() => {
                if changed.is_err() {
                    return;
                }
                debug!("Range changed during fetch, cancelling");
                pending = true;
            }
        }
    }
}

/// Returns once no change arrived for `debounce`; false when the range
/// sender is gone.
async fn settle(
    receiver: &mut watch::Receiver<DateRange>,
    debounce: Duration,
) -> bool {
    loop {
        tokio::select! {
            _ = sleep(debounce) => return true,
            changed = receiver.changed() => {
                if changed.is_err() {
                    return false;
                }
            }
        }
    }
}
