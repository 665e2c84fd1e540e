use std::time::Duration;
use tokio::time::Instant;

/// An item travelling through the pipeline.
///
/// Ids come from a counter owned by the pipeline, so each run starts again at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: u64,
    producer: String,
    created_at: Instant,
    consumed_at: Option<Instant>,
    consumer: Option<String>,
}

impl Product {
    pub fn new(id: u64, producer: impl Into<String>) -> Self {
        Self {
            id,
            producer: producer.into(),
            created_at: Instant::now(),
            consumed_at: None,
            consumer: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn producer(&self) -> &str {
        &self.producer
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn consumed_at(&self) -> Option<Instant> {
        self.consumed_at
    }

    pub fn consumer(&self) -> Option<&str> {
        self.consumer.as_deref()
    }

    pub fn mark_consumed(&mut self, consumer: impl Into<String>) {
        self.consumed_at = Some(Instant::now());
        self.consumer = Some(consumer.into());
    }

    /// Time from creation to consumption; `None` while still in flight.
    pub fn lifetime(&self) -> Option<Duration> {
        self.consumed_at.map(|at| at.duration_since(self.created_at))
    }
}

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "product #{} (from {})", self.id, self.producer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lifetime_spans_creation_to_consumption() {
        let mut product = Product::new(3, "Producer-1");
        assert_eq!(product.lifetime(), None);
        assert_eq!(product.consumer(), None);

        tokio::time::sleep(Duration::from_millis(25)).await;
        product.mark_consumed("Consumer-2");

        assert!(product.lifetime().unwrap() >= Duration::from_millis(25));
        assert_eq!(product.consumer(), Some("Consumer-2"));
        assert_eq!(product.to_string(), "product #3 (from Producer-1)");
    }
}
