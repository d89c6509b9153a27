/// Cache refresh scheduler
/// Items and conversations are refetched on a fixed interval and whenever the
/// app regains focus or the network comes back.
// region:    --- Imports
use crate::api::SharedMarketApi;
use crate::cache::MarketCache;
use crate::error::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};
// endregion: --- Imports

// region:    --- Cache Poller
/// Out-of-schedule refresh requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTrigger {
    Focus,
    Reconnect,
}

pub struct CachePoller {
    api: SharedMarketApi,
    cache: Arc<MarketCache>,
    period: Duration,
}

impl CachePoller {
    pub fn new(api: SharedMarketApi, cache: Arc<MarketCache>, period: Duration) -> Self {
        Self { api, cache, period }
    }

    /// Refetches items and conversations. Each collection is replaced only when
    /// its own fetch succeeds; the first failure is returned.
    pub async fn refresh_once(&self) -> Result<()> {
        let items = self
            .api
            .fetch_items()
            .await
            .map(|items| self.cache.replace_items(items));
        let conversations = self
            .api
            .fetch_conversations()
            .await
            .map(|conversations| self.cache.replace_conversations(conversations));
        items.and(conversations)
    }

    /// Runs the poller on its own task. The first refresh happens immediately.
    pub fn start(self) -> PollerHandle {
        let (triggers, mut rx) = mpsc::channel(8);
        let task = tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("{:<12} --> polling every {:?}", "Poller", self.period);
            loop {
                let reason = tokio::select! {
                    _ = ticker.tick() => "interval",
                    trigger = rx.recv() => match trigger {
                        Some(PollTrigger::Focus) => "focus",
                        Some(PollTrigger::Reconnect) => "reconnect",
                        None => break,
                    },
                };
                debug!("{:<12} --> refresh ({})", "Poller", reason);
                if let Err(e) = self.refresh_once().await {
                    error!("{:<12} --> refresh failed, keeping cache: {}", "Poller", e);
                }
            }
            info!("{:<12} --> stopped", "Poller");
        });
        PollerHandle { triggers, task }
    }
}

/// Controls a running [`CachePoller`]. Dropping the handle stops the poller.
pub struct PollerHandle {
    triggers: mpsc::Sender<PollTrigger>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Requests an immediate refresh. Ignored when refreshes are already queued.
    pub fn trigger(&self, trigger: PollTrigger) {
        if self.triggers.try_send(trigger).is_err() {
            debug!("{:<12} --> {:?} dropped, refresh already pending", "Poller", trigger);
        }
    }

    /// Stops the poller and waits for an in-flight refresh to finish.
    pub async fn shutdown(self) {
        let PollerHandle { triggers, task } = self;
        drop(triggers);
        if let Err(e) = task.await {
            error!("{:<12} --> poller task failed: {}", "Poller", e);
        }
    }
}
// endregion: --- Cache Poller

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemoryMarketApi;
    use crate::bidding::model::Item;
    use serde_json::json;

    fn item() -> Item {
        serde_json::from_value(json!({
            "_id": "i1",
            "title": "Bike",
            "condition": "Good",
            "startingprice": 20000,
            "startdate": "2025-03-01T09:00:00Z",
            "enddate": "2099-03-08T09:00:00Z",
            "seller": "u9",
            "status": "Active",
            "createdAt": "2025-03-01T08:00:00Z"
        }))
        .unwrap()
    }

    fn poller(service: &Arc<InMemoryMarketApi>, cache: &Arc<MarketCache>) -> CachePoller {
        let api: SharedMarketApi = service.clone();
        CachePoller::new(api, cache.clone(), Duration::from_secs(10))
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_contents() {
        let service = Arc::new(InMemoryMarketApi::new().with_items(vec![item()]));
        let cache = Arc::new(MarketCache::new());
        let poller = poller(&service, &cache);

        poller.refresh_once().await.unwrap();
        service.fail_next("fetch_items", "Server unavailable");
        assert!(poller.refresh_once().await.is_err());

        assert_eq!(cache.items().len(), 1);
        assert_eq!(service.calls("fetch_conversations"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_on_interval_and_on_triggers() {
        let service = Arc::new(InMemoryMarketApi::new().with_items(vec![item()]));
        let cache = Arc::new(MarketCache::new());
        let handle = poller(&service, &cache).start();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(service.calls("fetch_items"), 1);
        assert_eq!(cache.items().len(), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(service.calls("fetch_items"), 2);

        handle.trigger(PollTrigger::Focus);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(service.calls("fetch_items"), 3);

        handle.trigger(PollTrigger::Reconnect);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(service.calls("fetch_items"), 4);

        handle.shutdown().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(service.calls("fetch_items"), 4);
    }
}
