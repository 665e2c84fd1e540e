use crate::config::PipelineConfig;
use crate::error::SimError;
use crate::events::{EventBus, SimEvent};
use crate::lifecycle::AgentSet;
use crate::pipeline::consumer::{Consumer, ConsumerContext};
use crate::pipeline::producer::{Producer, ProducerContext};
use crate::pipeline::product::Product;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sync_primitives::BoundedChannel;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span};

/// Items handled by one named agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentCount {
    pub name: String,
    pub items: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineStatistics {
    pub capacity: usize,
    pub producers: Vec<AgentCount>,
    pub consumers: Vec<AgentCount>,
    pub total_produced: u64,
    pub total_consumed: u64,
    /// Items still sitting in the channel.
    pub buffered: usize,
    /// Mean creation-to-consumption time; `None` until something is consumed.
    pub average_lifetime_ms: Option<f64>,
}

/// One bounded channel between M producers and K consumers.
///
/// With `items_per_producer` set, the last producer to finish closes the channel for
/// writing, so consumers drain what is left and stop at end-of-stream. Without quotas
/// the agents run until cancelled.
pub struct BufferedPipeline {
    config: PipelineConfig,
    channel: Arc<BoundedChannel<Product>>,
    producers: Vec<Arc<Producer>>,
    consumers: Vec<Arc<Consumer>>,
    ids: Arc<AtomicU64>,
    events: EventBus,
    agents: AgentSet,
}

impl BufferedPipeline {
    /// A pipeline over a channel of `capacity`, with default agents and timings.
    pub fn new(capacity: usize) -> Result<Self, SimError> {
        Self::with_config(PipelineConfig {
            capacity,
            ..PipelineConfig::default()
        })
    }

    pub fn with_config(config: PipelineConfig) -> Result<Self, SimError> {
        config.validate()?;
        let channel = Arc::new(BoundedChannel::new(config.capacity)?);
        let producers = (1..=config.producers)
            .map(|i| Arc::new(Producer::new(format!("Producer-{i}"))))
            .collect();
        let consumers = (1..=config.consumers)
            .map(|i| Arc::new(Consumer::new(format!("Consumer-{i}"))))
            .collect();

        Ok(Self {
            config,
            channel,
            producers,
            consumers,
            ids: Arc::new(AtomicU64::new(0)),
            events: EventBus::new(),
            agents: AgentSet::new(),
        })
    }

    pub fn channel(&self) -> &BoundedChannel<Product> {
        &self.channel
    }

    pub fn producers(&self) -> &[Arc<Producer>] {
        &self.producers
    }

    pub fn consumers(&self) -> &[Arc<Consumer>] {
        &self.consumers
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SimEvent> {
        self.events.subscribe()
    }

    /// Stops production early. Producers finish cleanly; consumers drain and stop.
    pub fn close_for_writing(&self) {
        close_channel(&self.channel, &self.events);
    }

    pub fn start(&mut self, cancel: CancellationToken) -> Result<(), SimError> {
        self.agents.begin()?;
        info!(
            capacity = self.config.capacity,
            producers = self.producers.len(),
            consumers = self.consumers.len(),
            "Starting pipeline"
        );

        let active_producers = Arc::new(AtomicUsize::new(self.producers.len()));
        for producer in &self.producers {
            let producer = producer.clone();
            let ctx = ProducerContext {
                channel: self.channel.clone(),
                ids: self.ids.clone(),
                delay: self.config.produce_delay,
                quota: self.config.items_per_producer,
                events: self.events.clone(),
            };
            let active = active_producers.clone();
            let cancel = cancel.clone();
            let name = producer.name().to_string();

            self.agents.spawn(
                name.clone(),
                info_span!("producer", name = %name),
                async move {
                    let result = producer.run(&ctx, &cancel).await;
                    if active.fetch_sub(1, Ordering::AcqRel) == 1 {
                        close_channel(&ctx.channel, &ctx.events);
                    }
                    result
                },
            );
        }

        for consumer in &self.consumers {
            let consumer = consumer.clone();
            let ctx = ConsumerContext {
                channel: self.channel.clone(),
                delay: self.config.consume_delay,
                quota: self.config.items_per_consumer,
                events: self.events.clone(),
            };
            let cancel = cancel.clone();
            let name = consumer.name().to_string();

            self.agents.spawn(
                name.clone(),
                info_span!("consumer", name = %name),
                async move { consumer.run(&ctx, &cancel).await },
            );
        }
        Ok(())
    }

    pub async fn wait_all(&mut self) -> Result<(), SimError> {
        self.agents.wait_all().await
    }

    pub async fn wait_all_timeout(&mut self, timeout: Duration) -> Result<(), SimError> {
        self.agents.wait_all_timeout(timeout).await
    }

    pub fn statistics(&self) -> PipelineStatistics {
        let producers: Vec<_> = self
            .producers
            .iter()
            .map(|p| AgentCount {
                name: p.name().to_string(),
                items: p.items_produced(),
            })
            .collect();
        let consumers: Vec<_> = self
            .consumers
            .iter()
            .map(|c| AgentCount {
                name: c.name().to_string(),
                items: c.items_consumed(),
            })
            .collect();

        let total_consumed: u64 = consumers.iter().map(|c| c.items).sum();
        let total_lifetime: Duration = self.consumers.iter().map(|c| c.total_lifetime()).sum();
        let average_lifetime_ms =
            (total_consumed > 0).then(|| total_lifetime.as_secs_f64() * 1000.0 / total_consumed as f64);

        PipelineStatistics {
            capacity: self.channel.capacity(),
            total_produced: producers.iter().map(|p| p.items).sum(),
            total_consumed,
            producers,
            consumers,
            buffered: self.channel.len(),
            average_lifetime_ms,
        }
    }
}

fn close_channel(channel: &BoundedChannel<Product>, events: &EventBus) {
    if channel.close_for_writing() {
        info!(buffered = channel.len(), "No more production, channel closed for writing");
        events.publish(SimEvent::ChannelClosed);
    }
}

impl std::fmt::Debug for BufferedPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedPipeline")
            .field("channel", &self.channel)
            .field("producers", &self.producers.len())
            .field("consumers", &self.consumers.len())
            .field("started", &self.agents.is_started())
            .finish()
    }
}
