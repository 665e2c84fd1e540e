use crate::config::DelayRange;
use crate::error::{finish_on_cancel, SimError};
use crate::events::{EventBus, SimEvent};
use crate::pipeline::product::Product;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use sync_primitives::{sleep_or_cancel, BoundedChannel, SyncError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What a producer agent needs from its pipeline.
#[derive(Debug, Clone)]
pub struct ProducerContext {
    pub channel: Arc<BoundedChannel<Product>>,
    /// Shared id source; the first product of a run gets id 1.
    pub ids: Arc<AtomicU64>,
    pub delay: DelayRange,
    pub quota: Option<u64>,
    pub events: EventBus,
}

/// Creates products at randomized intervals and pushes them into the channel.
///
/// `produced` is written only by this producer's own agent.
#[derive(Debug)]
pub struct Producer {
    name: String,
    produced: AtomicU64,
    running: AtomicBool,
}

impl Producer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            produced: AtomicU64::new(0),
            running: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items_produced(&self) -> u64 {
        self.produced.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// The agent loop. Stops after `quota` items, on cancellation, or when the channel is
    /// closed for writing underneath it.
    pub async fn run(&self, ctx: &ProducerContext, cancel: &CancellationToken) -> Result<(), SimError> {
        self.running.store(true, Ordering::Release);
        info!(producer = %self.name, quota = ?ctx.quota, "Producer started");

        let result = finish_on_cancel(self.produce(ctx, cancel).await);

        self.running.store(false, Ordering::Release);
        info!(producer = %self.name, produced = self.items_produced(), "Producer stopped");
        result
    }

    async fn produce(&self, ctx: &ProducerContext, cancel: &CancellationToken) -> Result<(), SimError> {
        while !quota_reached(ctx.quota, self.items_produced()) {
            sleep_or_cancel(ctx.delay.sample(), cancel).await?;

            let id = ctx.ids.fetch_add(1, Ordering::AcqRel) + 1;
            let product = Product::new(id, self.name.as_str());
            debug!(producer = %self.name, item = id, buffered = ctx.channel.len(), "Putting item");

            match ctx.channel.put(product, cancel).await {
                Ok(()) => {}
                Err(SyncError::Closed) => {
                    info!(producer = %self.name, "Channel closed, nothing more to produce");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
            self.produced.fetch_add(1, Ordering::AcqRel);
            ctx.events.publish(SimEvent::ItemProduced {
                producer: self.name.clone(),
                item: id,
                buffered: ctx.channel.len(),
            });
        }
        Ok(())
    }
}

pub(crate) fn quota_reached(quota: Option<u64>, done: u64) -> bool {
    matches!(quota, Some(quota) if done >= quota)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(capacity: usize, quota: Option<u64>) -> ProducerContext {
        ProducerContext {
            channel: Arc::new(BoundedChannel::new(capacity).unwrap()),
            ids: Arc::new(AtomicU64::new(0)),
            delay: DelayRange::fixed(0),
            quota,
            events: EventBus::new(),
        }
    }

    #[tokio::test]
    async fn test_quota_run_produces_exactly_quota() {
        let ctx = context(10, Some(4));
        let producer = Producer::new("Producer-1");

        producer.run(&ctx, &CancellationToken::new()).await.unwrap();

        assert_eq!(producer.items_produced(), 4);
        assert!(!producer.is_running());
        let ids: Vec<_> = std::iter::from_fn(|| ctx.channel.try_take()).map(|p| p.id()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_closed_channel_stops_producer_cleanly() {
        let ctx = context(1, None);
        ctx.channel.close_for_writing();

        let producer = Producer::new("Producer-1");
        producer.run(&ctx, &CancellationToken::new()).await.unwrap();
        assert_eq!(producer.items_produced(), 0);
    }

    #[tokio::test]
    async fn test_cancel_unblocks_producer_on_full_channel() {
        let ctx = context(1, None);
        let producer = Arc::new(Producer::new("Producer-1"));
        let cancel = CancellationToken::new();

        let agent = {
            let (producer, ctx, cancel) = (producer.clone(), ctx.clone(), cancel.clone());
            tokio::spawn(async move { producer.run(&ctx, &cancel).await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        cancel.cancel();
        agent.await.unwrap().unwrap();
        assert_eq!(producer.items_produced(), 1);
        assert!(ctx.channel.is_full());
    }
}
