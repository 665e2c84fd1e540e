use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerState {
    Arrived,
    Waiting,
    BeingServed,
    Served,
    Left,
}

/// A visitor of the shop, from arrival to either service or rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    id: u64,
    arrival_time: Instant,
    service_start: Option<Instant>,
    service_end: Option<Instant>,
    state: CustomerState,
}

impl Customer {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            arrival_time: Instant::now(),
            service_start: None,
            service_end: None,
            state: CustomerState::Arrived,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> CustomerState {
        self.state
    }

    pub fn arrival_time(&self) -> Instant {
        self.arrival_time
    }

    pub fn service_start(&self) -> Option<Instant> {
        self.service_start
    }

    pub fn service_end(&self) -> Option<Instant> {
        self.service_end
    }

    pub fn sit_down(&mut self) {
        self.state = CustomerState::Waiting;
    }

    pub fn start_service(&mut self) {
        self.service_start = Some(Instant::now());
        self.state = CustomerState::BeingServed;
    }

    pub fn end_service(&mut self) {
        self.service_end = Some(Instant::now());
        self.state = CustomerState::Served;
    }

    pub fn leave(&mut self) {
        self.state = CustomerState::Left;
    }

    /// Time between arrival and the start of service.
    pub fn wait_time(&self) -> Option<Duration> {
        self.service_start
            .map(|start| start.duration_since(self.arrival_time))
    }

    pub fn service_duration(&self) -> Option<Duration> {
        match (self.service_start, self.service_end) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Customer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "customer #{}", self.id)
    }
}
