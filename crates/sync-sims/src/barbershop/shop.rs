use crate::barbershop::customer::{Customer, CustomerState};
use crate::barbershop::server::{lock_ledger, Ledger, Server, ServerState};
use crate::config::{DelayRange, ShopConfig};
use crate::error::{finish_on_cancel, SimError};
use crate::events::{EventBus, SimEvent};
use crate::lifecycle::AgentSet;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sync_primitives::{sleep_or_cancel, WaitingRoom};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShopStatistics {
    /// Every customer who ever arrived.
    pub total: u64,
    pub served: u64,
    pub rejected: u64,
    /// Still seated in the waiting room.
    pub waiting: usize,
    /// Mean of `service start - arrival` over served customers.
    pub average_wait_ms: Option<f64>,
    pub average_service_ms: Option<f64>,
    pub current_customer: Option<u64>,
}

/// Admission desk shared by [`Shop::add_customer`] and the generator agent.
#[derive(Debug)]
struct FrontDesk {
    room: Arc<WaitingRoom<Customer>>,
    server: Arc<Server>,
    ledger: Ledger,
    ids: AtomicU64,
    rejected: AtomicU64,
    events: EventBus,
}

impl FrontDesk {
    fn admit(&self) -> bool {
        let id = self.ids.fetch_add(1, Ordering::AcqRel) + 1;
        let mut customer = Customer::new(id);
        self.events.publish(SimEvent::CustomerArrived { customer: id });

        customer.sit_down();
        match self.room.try_enter(customer) {
            Ok(()) => {
                let waiting = self.room.current_count();
                debug!(customer = id, waiting, capacity = self.room.capacity(), "Customer seated");
                self.events
                    .publish(SimEvent::CustomerAdmitted { customer: id, waiting });
                if self.server.state() == ServerState::Sleeping {
                    self.server.wake_up();
                }
                true
            }
            Err(mut customer) => {
                customer.leave();
                self.rejected.fetch_add(1, Ordering::AcqRel);
                info!(customer = id, "No free seat, customer left");
                self.events.publish(SimEvent::CustomerRejected { customer: id });
                lock_ledger(&self.ledger).push(customer);
                false
            }
        }
    }

    async fn generate(&self, arrivals: DelayRange, cancel: &CancellationToken) -> Result<(), SimError> {
        loop {
            sleep_or_cancel(arrivals.sample(), cancel).await?;
            self.admit();
        }
    }
}

/// The sleeping-server shop: one waiting room, one server, one customer generator.
///
/// A generated customer either takes a free seat, waking the server if it sleeps, or
/// leaves at once. The server works through the room in arrival order.
pub struct Shop {
    config: ShopConfig,
    desk: Arc<FrontDesk>,
    agents: AgentSet,
}

impl Shop {
    /// A shop with `waiting_room_capacity` seats and default timings.
    pub fn new(waiting_room_capacity: usize) -> Result<Self, SimError> {
        Self::with_config(ShopConfig {
            waiting_room_capacity,
            ..ShopConfig::default()
        })
    }

    pub fn with_config(config: ShopConfig) -> Result<Self, SimError> {
        config.validate()?;
        let room = Arc::new(WaitingRoom::new(config.waiting_room_capacity)?);
        let ledger = Ledger::default();
        let server = Arc::new(Server::new(room.clone(), ledger.clone()));

        Ok(Self {
            config,
            desk: Arc::new(FrontDesk {
                room,
                server,
                ledger,
                ids: AtomicU64::new(0),
                rejected: AtomicU64::new(0),
                events: EventBus::new(),
            }),
            agents: AgentSet::new(),
        })
    }

    pub fn waiting_room(&self) -> &WaitingRoom<Customer> {
        &self.desk.room
    }

    pub fn server(&self) -> &Server {
        &self.desk.server
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SimEvent> {
        self.desk.events.subscribe()
    }

    /// Brings in one customer right now. Returns whether they got a seat.
    pub fn add_customer(&self) -> bool {
        self.desk.admit()
    }

    /// Customers who are done: served, rejected, or interrupted mid-service.
    pub fn customers(&self) -> Vec<Customer> {
        lock_ledger(&self.desk.ledger).clone()
    }

    /// Opens the shop: spawns the server and the customer generator.
    pub fn start(&mut self, cancel: CancellationToken) -> Result<(), SimError> {
        self.agents.begin()?;
        info!(seats = self.config.waiting_room_capacity, "Shop open");

        let desk = self.desk.clone();
        let service_time = self.config.service_time;
        let server_cancel = cancel.clone();
        self.agents.spawn("server", info_span!("server"), async move {
            desk.server.work(service_time, &desk.events, &server_cancel).await
        });

        let desk = self.desk.clone();
        let arrivals = self.config.arrival_interval;
        self.agents.spawn(
            "customer-generator",
            info_span!("customer_generator"),
            async move { finish_on_cancel(desk.generate(arrivals, &cancel).await) },
        );
        Ok(())
    }

    pub async fn wait_all(&mut self) -> Result<(), SimError> {
        self.agents.wait_all().await
    }

    pub async fn wait_all_timeout(&mut self, timeout: Duration) -> Result<(), SimError> {
        self.agents.wait_all_timeout(timeout).await
    }

    pub fn statistics(&self) -> ShopStatistics {
        let ledger = lock_ledger(&self.desk.ledger);
        let served: Vec<_> = ledger
            .iter()
            .filter(|c| c.state() == CustomerState::Served)
            .collect();

        let average_ms = |pick: fn(&Customer) -> Option<Duration>| {
            (!served.is_empty()).then(|| {
                let total: Duration = served.iter().filter_map(|c| pick(c)).sum();
                total.as_secs_f64() * 1000.0 / served.len() as f64
            })
        };

        ShopStatistics {
            total: self.desk.ids.load(Ordering::Acquire),
            served: served.len() as u64,
            rejected: self.desk.rejected.load(Ordering::Acquire),
            waiting: self.desk.room.current_count(),
            average_wait_ms: average_ms(Customer::wait_time),
            average_service_ms: average_ms(Customer::service_duration),
            current_customer: self.desk.server.current_customer(),
        }
    }
}

impl std::fmt::Debug for Shop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shop")
            .field("room", &self.desk.room)
            .field("server", &self.desk.server.state())
            .field("started", &self.agents.is_started())
            .finish()
    }
}
