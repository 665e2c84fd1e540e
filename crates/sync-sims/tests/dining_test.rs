use std::sync::Arc;
use std::time::Duration;

use sync_primitives::tracing::setup_tracing;
use sync_primitives::SyncError;
use sync_sims::{
    DelayRange, DiningArena, DiningConfig, NaivePolicy, OrderedPolicy, PhilosopherState, PolicyKind,
    SimError, SimEvent, TimeoutRetryPolicy,
};
use tokio::sync::Barrier;
use tokio_util::sync::CancellationToken;

const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

fn quick_config(philosophers: usize, policy: PolicyKind) -> DiningConfig {
    DiningConfig {
        philosophers,
        policy,
        think: DelayRange::new(5, 20),
        eat: DelayRange::new(5, 10),
        pickup_delay_ms: 5,
        try_timeout_ms: 10,
        retry_backoff_ms: 2,
        ..DiningConfig::default()
    }
}

async fn run_for(arena: &mut DiningArena, duration: Duration) {
    let cancel = CancellationToken::new();
    arena.start(cancel.clone()).unwrap();
    tokio::time::sleep(duration).await;
    cancel.cancel();
    arena.wait_all_timeout(JOIN_TIMEOUT).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_ordered_policy_feeds_everyone() {
    setup_tracing();
    let mut arena = DiningArena::with_config(quick_config(5, PolicyKind::Ordered)).unwrap();

    run_for(&mut arena, Duration::from_millis(800)).await;

    let stats = arena.statistics();
    assert_eq!(stats.policy, "ordered");
    for philosopher in &stats.philosophers {
        assert!(philosopher.meals_eaten > 0, "philosopher {} starved", philosopher.id);
    }
    assert_eq!(
        stats.total_meals,
        stats.philosophers.iter().map(|p| p.meals_eaten).sum::<u64>()
    );
    assert!(arena.tokens().iter().all(|t| !t.is_held()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_ordered_table_is_never_reported_deadlocked() {
    setup_tracing();
    let mut arena = DiningArena::with_config(quick_config(5, PolicyKind::Ordered)).unwrap();
    let cancel = CancellationToken::new();
    arena.start(cancel.clone()).unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!arena.is_deadlocked().await);

    cancel.cancel();
    arena.wait_all_timeout(JOIN_TIMEOUT).await.unwrap();
}

/// With every philosopher synchronized right after taking its left token, the circular
/// wait is certain and the probe must see it.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_naive_policy_can_deadlock() {
    setup_tracing();
    let barrier = Arc::new(Barrier::new(5));
    let policy = NaivePolicy::with_barrier(Duration::ZERO, barrier);
    let config = DiningConfig {
        think: DelayRange::fixed(1),
        ..quick_config(5, PolicyKind::Naive)
    };
    let mut arena = DiningArena::with_policy(config, Arc::new(policy)).unwrap();
    let cancel = CancellationToken::new();
    arena.start(cancel.clone()).unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(arena.is_deadlocked().await);
    assert!(arena.tokens().iter().all(|t| t.is_held()));
    assert_eq!(arena.statistics().total_meals, 0);

    // Deadlock is a condition, not an error: cancellation still unwinds everyone.
    cancel.cancel();
    arena.wait_all_timeout(JOIN_TIMEOUT).await.unwrap();
    assert!(arena.tokens().iter().all(|t| !t.is_held()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_naive_run_always_shuts_down() {
    setup_tracing();
    let mut arena = DiningArena::new(5, NaivePolicy::new(Duration::from_millis(5))).unwrap();

    run_for(&mut arena, Duration::from_millis(300)).await;

    assert!(arena
        .philosophers()
        .iter()
        .all(|p| p.state() == PhilosopherState::Thinking || p.state() == PhilosopherState::Hungry));
    assert!(arena.tokens().iter().all(|t| !t.is_held()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_timeout_retry_makes_progress() {
    setup_tracing();
    let config = quick_config(5, PolicyKind::TimeoutRetry);
    let policy = TimeoutRetryPolicy::new(Duration::from_millis(10), Duration::from_millis(2));
    let mut arena = DiningArena::with_policy(config, Arc::new(policy)).unwrap();

    run_for(&mut arena, Duration::from_millis(600)).await;

    let stats = arena.statistics();
    assert_eq!(stats.policy, "timeout_retry");
    assert!(stats.total_meals > 0);
}

#[tokio::test]
async fn test_two_philosophers_share_both_tokens() {
    setup_tracing();
    let mut arena = DiningArena::with_config(quick_config(2, PolicyKind::Ordered)).unwrap();

    run_for(&mut arena, Duration::from_millis(300)).await;

    assert!(arena.statistics().philosophers.iter().all(|p| p.meals_eaten > 0));
}

#[tokio::test]
async fn test_state_changes_are_broadcast() {
    setup_tracing();
    let mut arena = DiningArena::new(3, OrderedPolicy).unwrap();
    let mut events = arena.subscribe();
    let cancel = CancellationToken::new();
    arena.start(cancel.clone()).unwrap();

    let hungry = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            if let Ok(SimEvent::PhilosopherStateChanged {
                philosopher,
                state: PhilosopherState::Hungry,
            }) = events.recv().await
            {
                return philosopher;
            }
        }
    })
    .await
    .unwrap();
    assert!(hungry < 3);

    cancel.cancel();
    arena.wait_all_timeout(JOIN_TIMEOUT).await.unwrap();
}

#[test]
fn test_invalid_table_sizes() {
    for n in [0, 1] {
        assert!(matches!(
            DiningArena::new(n, OrderedPolicy),
            Err(SimError::Sync(SyncError::InvalidArgument(_)))
        ));
    }
}

#[tokio::test]
async fn test_lifecycle_guards() {
    let mut arena = DiningArena::new(5, OrderedPolicy).unwrap();
    assert_eq!(arena.wait_all().await, Err(SimError::NotStarted));

    let cancel = CancellationToken::new();
    arena.start(cancel.clone()).unwrap();
    assert_eq!(arena.start(cancel.clone()), Err(SimError::AlreadyStarted));

    cancel.cancel();
    arena.wait_all().await.unwrap();
}

#[tokio::test]
async fn test_statistics_serialize() {
    let arena = DiningArena::new(2, OrderedPolicy).unwrap();
    let json = serde_json::to_value(arena.statistics()).unwrap();

    assert_eq!(json["policy"], "ordered");
    assert_eq!(json["total_meals"], 0);
    assert_eq!(json["philosophers"][1]["state"], "thinking");
}
