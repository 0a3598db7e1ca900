// src/ticker.rs
use crate::db::MarketStore;
use crate::error::StoreError;
use crate::market::{nudge, quote};
use crate::models::TickMessage;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct MarketFeed {
    tx: broadcast::Sender<Arc<TickMessage>>,
    joined: Arc<Notify>,
    next_id: Arc<AtomicU64>,
}

impl MarketFeed {
    /// `capacity` is how many snapshots a slow subscriber may fall behind
    /// before it starts skipping.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        MarketFeed {
            tx,
            joined: Arc::new(Notify::new()),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// New subscribers wake the ticker so their first snapshot does not
    /// wait out the interval.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        info!("Stream subscriber {} connected", id);
        let inner = BroadcastStream::new(self.tx.subscribe());
        self.joined.notify_one();
        Subscription { id, inner }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Returns how many subscribers the snapshot reached.
    pub fn publish(&self, message: TickMessage) -> usize {
        self.tx.send(Arc::new(message)).unwrap_or(0)
    }
}

pub struct Subscription {
    id: u64,
    inner: BroadcastStream<Arc<TickMessage>>,
}

impl Stream for Subscription {
    type Item = Arc<TickMessage>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match ready!(Pin::new(&mut self.inner).poll_next(cx)) {
                Some(Ok(message)) => return Poll::Ready(Some(message)),
                Some(Err(BroadcastStreamRecvError::Lagged(missed))) => {
                    warn!(
                        "Stream subscriber {} lagged, skipped {} snapshots",
                        self.id, missed
                    );
                }
                None => return Poll::Ready(None),
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        info!("Stream subscriber {} disconnected", self.id);
    }
}

pub struct Ticker {
    store: Arc<dyn MarketStore>,
    feed: MarketFeed,
    interval: Duration,
}

impl Ticker {
    pub fn new(store: Arc<dyn MarketStore>, feed: MarketFeed, interval: Duration) -> Self {
        Ticker {
            store,
            feed,
            interval,
        }
    }

    /// One cycle: nudge every instrument, persist it, and build the snapshot.
    ///
    /// A failed write is logged and the cycle carries on; the snapshot still
    /// reports the computed values.
    pub async fn tick<R: Rng + Send>(&self, rng: &mut R) -> Result<TickMessage, StoreError> {
        let instruments = self.store.list_instruments().await?;
        let mut coins = Vec::with_capacity(instruments.len());
        for mut instrument in instruments {
            let (price, change_24h) = nudge(rng, instrument.price, instrument.change_24h);
            instrument.price = price;
            instrument.change_24h = change_24h;
            if let Err(e) = self
                .store
                .update_instrument(&instrument.symbol, price, change_24h)
                .await
            {
                error!("Failed to persist {}: {}", instrument.symbol, e);
            }
            coins.push(quote(&instrument));
        }
        Ok(TickMessage { coins })
    }

    /// Runs until `shutdown` fires. Cycles with nobody listening are skipped;
    /// a subscriber joining between ticks gets a cycle at once.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut rng = StdRng::from_os_rng();
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("Market ticker started, interval {:?}", self.interval);

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    info!("Market ticker stopped");
                    break;
                }
                () = self.feed.joined.notified() => {
                    interval.reset();
                    self.cycle(&mut rng).await;
                }
                _ = interval.tick() => {
                    self.cycle(&mut rng).await;
                }
            }
        }
    }

    async fn cycle(&self, rng: &mut StdRng) {
        if self.feed.subscriber_count() == 0 {
            debug!("No stream subscribers, market idle");
            return;
        }
        match self.tick(rng).await {
            Ok(message) => {
                let reached = self.feed.publish(message);
                debug!("Published market snapshot to {} subscribers", reached);
            }
            Err(e) => error!("Market tick failed: {}", e),
        }
    }
}
