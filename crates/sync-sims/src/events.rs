//! # Simulation Events
//!
//! Orchestrators publish state transitions on a broadcast channel instead of invoking
//! callbacks. The core never prints anything; a harness that wants a live view calls
//! `subscribe()` on the orchestrator and renders the events however it likes.
//!
//! Publishing never blocks and is a no-op when nobody listens. A listener that falls
//! behind by more than the channel capacity observes `RecvError::Lagged` and skips
//! ahead, so a slow console can never stall the agents.

use crate::barbershop::ServerState;
use crate::dining::PhilosopherState;
use std::time::Duration;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 256;

/// A state transition observed inside a running simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    PhilosopherStateChanged {
        philosopher: usize,
        state: PhilosopherState,
    },
    ItemProduced {
        producer: String,
        item: u64,
        buffered: usize,
    },
    ItemConsumed {
        consumer: String,
        item: u64,
        buffered: usize,
    },
    ChannelClosed,
    CustomerArrived {
        customer: u64,
    },
    CustomerAdmitted {
        customer: u64,
        waiting: usize,
    },
    CustomerRejected {
        customer: u64,
    },
    ServerStateChanged {
        state: ServerState,
    },
    ServiceCompleted {
        customer: u64,
        waited: Duration,
        served_for: Duration,
    },
}

/// Cloneable publishing handle shared by every agent of one orchestrator.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SimEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: SimEvent) {
        // No receivers is the normal case when nobody is watching.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SimEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
