use crate::config::DiningConfig;
use crate::dining::policy::AcquisitionPolicy;
use crate::error::{finish_on_cancel, SimError};
use crate::events::{EventBus, SimEvent};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use sync_primitives::{sleep_or_cancel, ResourceToken};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhilosopherState {
    Thinking,
    Hungry,
    Eating,
}

impl PhilosopherState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => PhilosopherState::Hungry,
            2 => PhilosopherState::Eating,
            _ => PhilosopherState::Thinking,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            PhilosopherState::Thinking => 0,
            PhilosopherState::Hungry => 1,
            PhilosopherState::Eating => 2,
        }
    }
}

/// Point-in-time view of one philosopher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhilosopherReport {
    pub id: usize,
    pub state: PhilosopherState,
    pub meals_eaten: u64,
}

/// One seat at the table: a pair of adjacent tokens plus the counters its agent owns.
///
/// State and meal count are written only by the philosopher's own agent loop and read
/// by the arena's probe and statistics, hence the atomics.
///
/// A philosopher reports `Eating` only while it holds both tokens: the state flips to
/// `Eating` after acquisition and back to `Thinking` before release.
#[derive(Debug)]
pub struct Philosopher {
    id: usize,
    left: Arc<ResourceToken>,
    right: Arc<ResourceToken>,
    state: AtomicU8,
    meals: AtomicU64,
}

impl Philosopher {
    pub fn new(id: usize, left: Arc<ResourceToken>, right: Arc<ResourceToken>) -> Self {
        Self {
            id,
            left,
            right,
            state: AtomicU8::new(PhilosopherState::Thinking.as_u8()),
            meals: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn left(&self) -> &ResourceToken {
        &self.left
    }

    pub fn right(&self) -> &ResourceToken {
        &self.right
    }

    pub fn state(&self) -> PhilosopherState {
        PhilosopherState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn meals_eaten(&self) -> u64 {
        self.meals.load(Ordering::Acquire)
    }

    pub fn report(&self) -> PhilosopherReport {
        PhilosopherReport {
            id: self.id,
            state: self.state(),
            meals_eaten: self.meals_eaten(),
        }
    }

    /// The agent loop: think, get hungry, acquire both tokens through `policy`, eat,
    /// release, repeat until `cancel` fires.
    ///
    /// Cancellation ends the loop with `Ok(())`. Any other error (for example a policy
    /// releasing a token it never acquired) is fatal and returned as-is.
    pub async fn dine(
        &self,
        policy: &dyn AcquisitionPolicy,
        config: &DiningConfig,
        events: &EventBus,
        cancel: &CancellationToken,
    ) -> Result<(), SimError> {
        info!(
            philosopher = self.id,
            policy = policy.name(),
            left = self.left.id(),
            right = self.right.id(),
            "Sitting down"
        );
        let result = finish_on_cancel(self.dine_until_cancelled(policy, config, events, cancel).await);
        info!(philosopher = self.id, meals = self.meals_eaten(), "Leaving the table");
        result
    }

    async fn dine_until_cancelled(
        &self,
        policy: &dyn AcquisitionPolicy,
        config: &DiningConfig,
        events: &EventBus,
        cancel: &CancellationToken,
    ) -> Result<(), SimError> {
        loop {
            self.set_state(PhilosopherState::Thinking, events);
            sleep_or_cancel(config.think.sample(), cancel).await?;

            self.set_state(PhilosopherState::Hungry, events);
            policy.acquire(&self.left, &self.right, cancel).await?;

            self.set_state(PhilosopherState::Eating, events);
            let meal = sleep_or_cancel(config.eat.sample(), cancel).await;
            if meal.is_ok() {
                self.meals.fetch_add(1, Ordering::AcqRel);
            }

            self.set_state(PhilosopherState::Thinking, events);
            policy.release(&self.left, &self.right)?;
            meal?;
        }
    }

    fn set_state(&self, state: PhilosopherState, events: &EventBus) {
        let previous = self.state.swap(state.as_u8(), Ordering::AcqRel);
        if previous != state.as_u8() {
            debug!(philosopher = self.id, ?state, meals = self.meals_eaten(), "State changed");
            events.publish(SimEvent::PhilosopherStateChanged {
                philosopher: self.id,
                state,
            });
        }
    }
}
