//! Stale view session cleanup.
//!
//! A session whose last activity is more than 24 hours old can no longer
//! gate an ad view, so it is deleted on a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use vidpay_store::{RocksStore, Store};

/// Spawn the periodic purge. The first run happens one `interval` after
/// start.
#[must_use]
pub fn spawn_session_gc(store: Arc<RocksStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match purge_once(Arc::clone(&store)).await {
                Ok(0) => tracing::debug!("No stale view sessions"),
                Ok(removed) => tracing::info!(removed, "Purged stale view sessions"),
                Err(e) => tracing::error!(error = %e, "View session purge failed"),
            }
        }
    })
}

/// Run one purge on the blocking pool.
pub async fn purge_once(store: Arc<RocksStore>) -> Result<usize, vidpay_store::StoreError> {
    tokio::task::spawn_blocking(move || store.purge_stale_sessions(chrono::Utc::now()))
        .await
        .map_err(|e| vidpay_store::StoreError::Database(format!("purge task failed: {e}")))?
}
