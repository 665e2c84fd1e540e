//! # Simulation Configuration
//!
//! Plain serde structs with defaults taken from the reference simulations. Every
//! field has a default (`#[serde(default)]`), so a harness can load a partial
//! document and only override what it cares about.
//!
//! Validation happens in the orchestrator constructors, which call the `validate`
//! methods here and fail fast with `InvalidArgument`.

use crate::dining::PolicyKind;
use crate::error::SimError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// An inclusive `[min_ms, max_ms]` range for randomized delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub const fn fixed(ms: u64) -> Self {
        Self::new(ms, ms)
    }

    pub fn validate(&self, what: &str) -> Result<(), SimError> {
        if self.min_ms > self.max_ms {
            return Err(SimError::invalid(format!(
                "{what}: min {}ms exceeds max {}ms",
                self.min_ms, self.max_ms
            )));
        }
        Ok(())
    }

    /// Draws a uniformly random delay from the range.
    pub fn sample(&self) -> Duration {
        if self.min_ms >= self.max_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rand::rng().random_range(self.min_ms..=self.max_ms))
    }
}

/// Sampling window for the deadlock probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub samples: u32,
    pub interval_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            samples: 5,
            interval_ms: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiningConfig {
    pub philosophers: usize,
    pub policy: PolicyKind,
    pub think: DelayRange,
    pub eat: DelayRange,
    /// How long the naive policy holds its left token before reaching for the right one.
    pub pickup_delay_ms: u64,
    /// Per-token wait of the timeout-retry policy.
    pub try_timeout_ms: u64,
    /// Pause of the timeout-retry policy after a failed attempt.
    pub retry_backoff_ms: u64,
    pub probe: ProbeConfig,
}

impl Default for DiningConfig {
    fn default() -> Self {
        Self {
            philosophers: 5,
            policy: PolicyKind::Ordered,
            think: DelayRange::new(50, 150),
            eat: DelayRange::new(50, 100),
            pickup_delay_ms: 50,
            try_timeout_ms: 100,
            retry_backoff_ms: 10,
            probe: ProbeConfig::default(),
        }
    }
}

impl DiningConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        // A ring of one would need the same token as both left and right.
        if self.philosophers < 2 {
            return Err(SimError::invalid(format!(
                "dining arena needs at least 2 philosophers, got {}",
                self.philosophers
            )));
        }
        if self.probe.samples == 0 {
            return Err(SimError::invalid("deadlock probe needs at least one sample"));
        }
        self.think.validate("think")?;
        self.eat.validate("eat")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub capacity: usize,
    pub producers: usize,
    pub consumers: usize,
    pub produce_delay: DelayRange,
    pub consume_delay: DelayRange,
    /// Each producer stops after this many items; `None` produces until cancelled.
    pub items_per_producer: Option<u64>,
    /// Each consumer stops after this many items; `None` consumes until end-of-stream.
    pub items_per_consumer: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            producers: 2,
            consumers: 2,
            produce_delay: DelayRange::new(100, 300),
            consume_delay: DelayRange::new(200, 400),
            items_per_producer: None,
            items_per_consumer: None,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.capacity == 0 {
            return Err(SimError::invalid("pipeline capacity must be positive"));
        }
        if self.producers == 0 || self.consumers == 0 {
            return Err(SimError::invalid(format!(
                "pipeline needs producers and consumers, got {} and {}",
                self.producers, self.consumers
            )));
        }
        self.produce_delay.validate("produce_delay")?;
        self.consume_delay.validate("consume_delay")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    pub waiting_room_capacity: usize,
    /// Gap between generated customer arrivals.
    pub arrival_interval: DelayRange,
    pub service_time: DelayRange,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            waiting_room_capacity: 3,
            arrival_interval: DelayRange::new(200, 800),
            service_time: DelayRange::new(200, 500),
        }
    }
}

impl ShopConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.waiting_room_capacity == 0 {
            return Err(SimError::invalid("waiting room capacity must be positive"));
        }
        self.arrival_interval.validate("arrival_interval")?;
        self.service_time.validate("service_time")
    }
}
