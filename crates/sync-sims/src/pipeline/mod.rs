//! # Producer / Consumer Pipeline
//!
//! Producers create [`Product`]s at randomized intervals and push them into a
//! [`BoundedChannel`](sync_primitives::BoundedChannel); consumers take them out. A full
//! channel blocks producers (backpressure), an empty one blocks consumers.

pub mod buffered;
pub mod consumer;
pub mod producer;
pub mod product;

pub use buffered::{AgentCount, BufferedPipeline, PipelineStatistics};
pub use consumer::{Consumer, ConsumerContext};
pub use producer::{Producer, ProducerContext};
pub use product::Product;
