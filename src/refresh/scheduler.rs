use crate::refresh::{AssetRefreshService, RefreshError};
use std::sync::Arc;
use tokio::sync::watch::Receiver;
use tokio::time::{interval_at, Duration, Instant, Interval};
use tracing::{error, info, trace, warn};

/// Keeps the local cache warm by refreshing every tracked symbol on a fixed
/// interval until shutdown is signalled.
pub struct RefreshScheduler {
    service: Arc<AssetRefreshService>,
    interval: Interval,
    shutdown: Receiver<bool>,
}

impl RefreshScheduler {
    pub fn new(
        service: Arc<AssetRefreshService>,
        period: Duration,
        shutdown: Receiver<bool>,
    ) -> Self {
        // First tick one period from now, not immediately
        let interval = interval_at(Instant::now() + period, period);
        Self {
            service,
            interval,
            shutdown,
        }
    }

    async fn tick(&self) {
        trace!("Tick");
        match self.service.refresh_tracked().await {
            Ok(result) => info!(
                updated = result.updated_count,
                failed = result.error_messages.len(),
                "Scheduled refresh done"
            ),
            Err(RefreshError::NoValidData { error_messages }) => {
                warn!(?error_messages, "Scheduled refresh fetched no valid data")
            }
            Err(e) => error!("Scheduled refresh failed. Error: {}", e),
        }
    }

    pub async fn run(mut self) {
        info!("Starting RefreshScheduler");
        loop {
            tokio::select! {
                _ = self.interval.tick() => self.tick().await,
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        info!("Shutting down RefreshScheduler");
                        return
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::refresh::DEFAULT_HISTORY_LIMIT;
    use crate::store::{DataStore, JsonStore};
    use crate::test_support::FakeMarketData;
    use tokio::sync::watch;

    #[tokio::test]
    async fn test_refreshes_tracked_symbols_until_shutdown() {
        let store = Arc::new(JsonStore::in_memory(&["TSLA", "NOPE"]));
        let market_data = Arc::new(FakeMarketData::with_prices(&[("TSLA", 100)]));
        let service = Arc::new(AssetRefreshService::new(
            store.clone(),
            market_data.clone(),
            DEFAULT_HISTORY_LIMIT,
            Duration::from_millis(200),
        ));
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(
            RefreshScheduler::new(service, Duration::from_millis(20), rx).run(),
        );

        tokio::time::sleep(Duration::from_millis(150)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        let history = store.get_history("TSLA", 100).unwrap();
        assert!(history.len() >= 2);
        assert!(store.get_asset("NOPE").unwrap().is_none());
        assert_eq!(market_data.calls() % 2, 0);
    }
}
