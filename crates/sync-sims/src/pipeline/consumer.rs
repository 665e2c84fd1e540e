use crate::config::DelayRange;
use crate::error::{finish_on_cancel, SimError};
use crate::events::{EventBus, SimEvent};
use crate::pipeline::producer::quota_reached;
use crate::pipeline::product::Product;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sync_primitives::{sleep_or_cancel, BoundedChannel};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What a consumer agent needs from its pipeline.
#[derive(Debug, Clone)]
pub struct ConsumerContext {
    pub channel: Arc<BoundedChannel<Product>>,
    pub delay: DelayRange,
    pub quota: Option<u64>,
    pub events: EventBus,
}

/// Takes products off the channel and "consumes" each for a randomized time.
#[derive(Debug)]
pub struct Consumer {
    name: String,
    consumed: AtomicU64,
    /// Sum of the lifetimes of consumed products, in microseconds.
    lifetime_total_us: AtomicU64,
    running: AtomicBool,
}

impl Consumer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            consumed: AtomicU64::new(0),
            lifetime_total_us: AtomicU64::new(0),
            running: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items_consumed(&self) -> u64 {
        self.consumed.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Combined creation-to-consumption time of everything this consumer took.
    pub fn total_lifetime(&self) -> Duration {
        Duration::from_micros(self.lifetime_total_us.load(Ordering::Acquire))
    }

    /// The agent loop. Stops after `quota` items, on end-of-stream, or on cancellation.
    pub async fn run(&self, ctx: &ConsumerContext, cancel: &CancellationToken) -> Result<(), SimError> {
        self.running.store(true, Ordering::Release);
        info!(consumer = %self.name, quota = ?ctx.quota, "Consumer started");

        let result = finish_on_cancel(self.consume(ctx, cancel).await);

        self.running.store(false, Ordering::Release);
        info!(consumer = %self.name, consumed = self.items_consumed(), "Consumer stopped");
        result
    }

    async fn consume(&self, ctx: &ConsumerContext, cancel: &CancellationToken) -> Result<(), SimError> {
        while !quota_reached(ctx.quota, self.items_consumed()) {
            let Some(mut product) = ctx.channel.take(cancel).await? else {
                debug!(consumer = %self.name, "End of stream");
                return Ok(());
            };

            product.mark_consumed(self.name.as_str());
            let lifetime = product.lifetime().unwrap_or_default();
            self.lifetime_total_us
                .fetch_add(lifetime.as_micros() as u64, Ordering::AcqRel);
            self.consumed.fetch_add(1, Ordering::AcqRel);

            debug!(consumer = %self.name, item = product.id(), ?lifetime, "Consumed");
            ctx.events.publish(SimEvent::ItemConsumed {
                consumer: self.name.clone(),
                item: product.id(),
                buffered: ctx.channel.len(),
            });

            sleep_or_cancel(ctx.delay.sample(), cancel).await?;
        }
        Ok(())
    }
}
