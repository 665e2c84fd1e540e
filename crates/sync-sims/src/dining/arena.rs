use crate::config::DiningConfig;
use crate::dining::philosopher::{Philosopher, PhilosopherReport, PhilosopherState};
use crate::dining::policy::AcquisitionPolicy;
use crate::error::SimError;
use crate::events::{EventBus, SimEvent};
use crate::lifecycle::AgentSet;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use sync_primitives::ResourceToken;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn};

/// Aggregated meal counts for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArenaStatistics {
    pub policy: String,
    pub philosophers: Vec<PhilosopherReport>,
    pub total_meals: u64,
}

/// N tokens in a ring and N philosophers sharing them.
///
/// Philosopher `i` holds a reference to token `i` (left) and token `(i + 1) % N`
/// (right), so every token is shared by exactly two neighbours.
///
/// # Example
///
/// ```rust,ignore
/// let cancel = CancellationToken::new();
/// let mut arena = DiningArena::new(5, OrderedPolicy)?;
/// arena.start(cancel.clone())?;
///
/// tokio::time::sleep(Duration::from_secs(2)).await;
/// assert!(!arena.is_deadlocked().await);
///
/// cancel.cancel();
/// arena.wait_all_timeout(Duration::from_secs(1)).await?;
/// ```
pub struct DiningArena {
    config: DiningConfig,
    tokens: Vec<Arc<ResourceToken>>,
    philosophers: Vec<Arc<Philosopher>>,
    policy: Arc<dyn AcquisitionPolicy>,
    events: EventBus,
    agents: AgentSet,
}

impl DiningArena {
    /// A ring of `n` philosophers using `policy`, with default timings.
    pub fn new(n: usize, policy: impl AcquisitionPolicy + 'static) -> Result<Self, SimError> {
        let config = DiningConfig {
            philosophers: n,
            ..DiningConfig::default()
        };
        Self::with_policy(config, Arc::new(policy))
    }

    /// Builds the policy named by `config.policy`.
    pub fn with_config(config: DiningConfig) -> Result<Self, SimError> {
        let policy = config.policy.build(&config);
        Self::with_policy(config, policy)
    }

    /// Uses `policy` regardless of `config.policy`.
    pub fn with_policy(config: DiningConfig, policy: Arc<dyn AcquisitionPolicy>) -> Result<Self, SimError> {
        config.validate()?;
        let n = config.philosophers;

        let tokens: Vec<_> = (0..n).map(|id| Arc::new(ResourceToken::new(id))).collect();
        let philosophers = (0..n)
            .map(|i| {
                Arc::new(Philosopher::new(
                    i,
                    tokens[i].clone(),
                    tokens[(i + 1) % n].clone(),
                ))
            })
            .collect();

        Ok(Self {
            config,
            tokens,
            philosophers,
            policy,
            events: EventBus::new(),
            agents: AgentSet::new(),
        })
    }

    pub fn size(&self) -> usize {
        self.philosophers.len()
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub fn tokens(&self) -> &[Arc<ResourceToken>] {
        &self.tokens
    }

    pub fn philosophers(&self) -> &[Arc<Philosopher>] {
        &self.philosophers
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SimEvent> {
        self.events.subscribe()
    }

    /// Spawns one agent per philosopher and returns immediately.
    pub fn start(&mut self, cancel: CancellationToken) -> Result<(), SimError> {
        self.agents.begin()?;
        info!(philosophers = self.size(), policy = self.policy_name(), "Opening the table");

        for philosopher in &self.philosophers {
            let philosopher = philosopher.clone();
            let policy = self.policy.clone();
            let config = self.config.clone();
            let events = self.events.clone();
            let cancel = cancel.clone();
            let id = philosopher.id();

            self.agents.spawn(
                format!("philosopher-{id}"),
                info_span!("philosopher", id),
                async move { philosopher.dine(policy.as_ref(), &config, &events, &cancel).await },
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

    /// Single sample: is every philosopher hungry right now?
    pub fn is_deadlocked_now(&self) -> bool {
        self.philosophers
            .iter()
            .all(|p| p.state() == PhilosopherState::Hungry)
    }

    /// Liveness probe: every philosopher hungry in every sample of the polling window.
    ///
    /// This is a heuristic. A `true` means nobody made progress during the window, which
    /// for the naive policy is the circular wait; a `false` proves nothing about the
    /// future.
    pub async fn is_deadlocked(&self) -> bool {
        let interval = Duration::from_millis(self.config.probe.interval_ms);
        for sample in 0..self.config.probe.samples {
            if sample > 0 {
                tokio::time::sleep(interval).await;
            }
            if !self.is_deadlocked_now() {
                return false;
            }
        }
        warn!(
            philosophers = self.size(),
            policy = self.policy_name(),
            samples = self.config.probe.samples,
            "Every philosopher stayed hungry: deadlock suspected"
        );
        true
    }

    pub fn statistics(&self) -> ArenaStatistics {
        let philosophers: Vec<_> = self.philosophers.iter().map(|p| p.report()).collect();
        let total_meals = philosophers.iter().map(|p| p.meals_eaten).sum();
        ArenaStatistics {
            policy: self.policy_name().to_string(),
            philosophers,
            total_meals,
        }
    }
}

impl std::fmt::Debug for DiningArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiningArena")
            .field("size", &self.size())
            .field("policy", &self.policy_name())
            .field("started", &self.agents.is_started())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dining::policy::{NaivePolicy, OrderedPolicy};

    #[test]
    fn test_ring_wiring() {
        let arena = DiningArena::new(5, OrderedPolicy).unwrap();
        assert_eq!(arena.size(), 5);
        assert_eq!(arena.tokens().len(), 5);

        for (i, p) in arena.philosophers().iter().enumerate() {
            assert_eq!(p.left().id(), i);
            assert_eq!(p.right().id(), (i + 1) % 5);
        }
        // Neighbours share the same token, not copies of it.
        assert!(std::ptr::eq(arena.philosophers()[4].right(), arena.tokens()[0].as_ref()));
        assert!(std::ptr::eq(arena.philosophers()[0].left(), arena.tokens()[0].as_ref()));
    }

    #[test]
    fn test_invalid_size_fails_fast() {
        assert!(matches!(
            DiningArena::new(0, OrderedPolicy),
            Err(SimError::Sync(sync_primitives::SyncError::InvalidArgument(_)))
        ));
        assert!(DiningArena::new(1, NaivePolicy::default()).is_err());
    }

    #[test]
    fn test_fresh_arena_reports_zero() {
        let arena = DiningArena::new(3, OrderedPolicy).unwrap();
        let stats = arena.statistics();
        assert_eq!(stats.policy, "ordered");
        assert_eq!(stats.total_meals, 0);
        assert_eq!(stats.philosophers.len(), 3);
        assert!(!arena.is_deadlocked_now());
    }

    #[tokio::test]
    async fn test_double_start_is_rejected() {
        let mut arena = DiningArena::new(2, OrderedPolicy).unwrap();
        let cancel = CancellationToken::new();
        arena.start(cancel.clone()).unwrap();
        assert_eq!(arena.start(cancel.clone()), Err(SimError::AlreadyStarted));
        cancel.cancel();
        arena.wait_all_timeout(Duration::from_secs(1)).await.unwrap();
    }
}
