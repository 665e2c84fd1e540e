use crate::barbershop::customer::Customer;
use crate::config::DelayRange;
use crate::error::{finish_on_cancel, SimError};
use crate::events::{EventBus, SimEvent};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use sync_primitives::{sleep_or_cancel, SyncError, WaitingRoom};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerState {
    Sleeping,
    Ready,
    Serving,
    Finished,
}

impl ServerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ServerState::Ready,
            2 => ServerState::Serving,
            3 => ServerState::Finished,
            _ => ServerState::Sleeping,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ServerState::Sleeping => 0,
            ServerState::Ready => 1,
            ServerState::Serving => 2,
            ServerState::Finished => 3,
        }
    }
}

/// Customers who are done with the shop, in the order they finished.
pub type Ledger = Arc<Mutex<Vec<Customer>>>;

pub(crate) fn lock_ledger(ledger: &Mutex<Vec<Customer>>) -> MutexGuard<'_, Vec<Customer>> {
    ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The single worker of the shop.
///
/// Sleeps while the waiting room is empty, wakes on [`wake_up`](Self::wake_up), and
/// serves one customer at a time in arrival order.
#[derive(Debug)]
pub struct Server {
    room: Arc<WaitingRoom<Customer>>,
    ledger: Ledger,
    state: AtomicU8,
    served: AtomicU64,
    current: Mutex<Option<u64>>,
}

impl Server {
    pub fn new(room: Arc<WaitingRoom<Customer>>, ledger: Ledger) -> Self {
        Self {
            room,
            ledger,
            state: AtomicU8::new(ServerState::Sleeping.as_u8()),
            served: AtomicU64::new(0),
            current: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ServerState {
        ServerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn customers_served(&self) -> u64 {
        self.served.load(Ordering::Acquire)
    }

    /// Id of the customer in the chair, if any.
    pub fn current_customer(&self) -> Option<u64> {
        *self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Releases the server if it is asleep. Extra calls while it is awake leave at most
    /// one pending wake, which costs one empty check of the room.
    pub fn wake_up(&self) {
        self.room.wake_up();
    }

    /// The agent loop. Runs until `cancel` fires, then reports `Finished`.
    ///
    /// A customer whose service is cut short by cancellation goes to the ledger still
    /// `BeingServed`.
    pub async fn work(
        &self,
        service_time: DelayRange,
        events: &EventBus,
        cancel: &CancellationToken,
    ) -> Result<(), SimError> {
        info!(capacity = self.room.capacity(), "Server on duty");
        let result = finish_on_cancel(self.serve_until_cancelled(service_time, events, cancel).await);
        self.set_state(ServerState::Finished, events);
        info!(served = self.customers_served(), "Server off duty");
        result
    }

    async fn serve_until_cancelled(
        &self,
        service_time: DelayRange,
        events: &EventBus,
        cancel: &CancellationToken,
    ) -> Result<(), SimError> {
        loop {
            let Some(customer) = self.next_customer(events) else {
                self.room.wait_for_wake(cancel).await?;
                debug!("Woken up");
                self.set_state(ServerState::Ready, events);
                continue;
            };
            self.serve(customer, service_time, events, cancel).await?;
            self.set_state(ServerState::Ready, events);
        }
    }

    /// Takes the next customer, or goes to sleep when nobody is waiting.
    ///
    /// The room is checked again after the state flips to `Sleeping`: an admission that
    /// raced with the first check either shows up in the second one or sees `Sleeping`
    /// and wakes the server.
    fn next_customer(&self, events: &EventBus) -> Option<Customer> {
        if let Some(customer) = self.room.try_get() {
            return Some(customer);
        }
        self.set_state(ServerState::Sleeping, events);
        let customer = self.room.try_get()?;
        self.set_state(ServerState::Ready, events);
        Some(customer)
    }

    async fn serve(
        &self,
        mut customer: Customer,
        service_time: DelayRange,
        events: &EventBus,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        *self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(customer.id());
        self.set_state(ServerState::Serving, events);
        customer.start_service();
        debug!(customer = customer.id(), waited = ?customer.wait_time(), "Serving");

        let service = sleep_or_cancel(service_time.sample(), cancel).await;
        if service.is_ok() {
            customer.end_service();
            self.served.fetch_add(1, Ordering::AcqRel);
            info!(
                customer = customer.id(),
                took = ?customer.service_duration(),
                served = self.customers_served(),
                "Service completed"
            );
            events.publish(SimEvent::ServiceCompleted {
                customer: customer.id(),
                waited: customer.wait_time().unwrap_or_default(),
                served_for: customer.service_duration().unwrap_or_default(),
            });
        }

        *self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        lock_ledger(&self.ledger).push(customer);
        service
    }

    fn set_state(&self, state: ServerState, events: &EventBus) {
        let previous = self.state.swap(state.as_u8(), Ordering::SeqCst);
        if previous != state.as_u8() {
            debug!(?state, "Server state changed");
            events.publish(SimEvent::ServerStateChanged { state });
        }
    }
}
