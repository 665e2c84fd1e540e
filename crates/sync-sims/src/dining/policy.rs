//! # Acquisition Policies
//!
//! How a hungry philosopher gets hold of its two tokens. All three policies sit behind
//! [`AcquisitionPolicy`], so the arena and the philosopher loop never know which one
//! they are running.
//!
//! | Policy | Strategy | Deadlock |
//! |--------|----------|----------|
//! | [`NaivePolicy`] | left, then right, holding left while blocked | possible (circular wait) |
//! | [`OrderedPolicy`] | lower id first | impossible: a total order leaves no cycle |
//! | [`TimeoutRetryPolicy`] | bounded waits, back off and retry | no, but livelock is possible |
//!
//! `NaivePolicy` is intentionally unsafe. It exists to demonstrate the hazard and must
//! stay that way: do not "fix" it.

use crate::config::DiningConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use sync_primitives::{sleep_or_cancel, ResourceToken, SyncError};
use tokio::sync::Barrier;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Strategy for taking and returning a philosopher's two tokens.
///
/// `acquire` either returns with both tokens held or returns an error with neither
/// held. `release` is called exactly once after each successful `acquire`.
///
/// Stop an in-flight `acquire` through `cancel`, not by dropping its future: a future
/// dropped between the two acquisitions leaves the first token held.
#[async_trait]
pub trait AcquisitionPolicy: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    async fn acquire(
        &self,
        left: &ResourceToken,
        right: &ResourceToken,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError>;

    fn release(&self, left: &ResourceToken, right: &ResourceToken) -> Result<(), SyncError> {
        right.release()?;
        left.release()
    }
}

/// Selects a policy from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Naive,
    #[default]
    Ordered,
    TimeoutRetry,
}

impl PolicyKind {
    pub fn build(self, config: &DiningConfig) -> Arc<dyn AcquisitionPolicy> {
        match self {
            PolicyKind::Naive => Arc::new(NaivePolicy::new(Duration::from_millis(config.pickup_delay_ms))),
            PolicyKind::Ordered => Arc::new(OrderedPolicy),
            PolicyKind::TimeoutRetry => Arc::new(TimeoutRetryPolicy::new(
                Duration::from_millis(config.try_timeout_ms),
                Duration::from_millis(config.retry_backoff_ms),
            )),
        }
    }
}

// =============================================================================
// Naive
// =============================================================================

/// Left token, pause, right token. Holds the left token while blocking on the right.
///
/// With every philosopher of a ring doing this at once, each can end up holding its
/// left token and waiting forever on a neighbour's. The `pickup_delay` widens that
/// window but does not force it; the outcome depends on scheduling.
///
/// [`with_barrier`](Self::with_barrier) adds a rendezvous right after the left token is
/// taken. With a barrier sized to the ring, every philosopher holds its left token
/// before any reaches for the right one, which makes the circular wait certain. This
/// is meant for reproducing the hazard in tests.
#[derive(Debug, Clone)]
pub struct NaivePolicy {
    pickup_delay: Duration,
    barrier: Option<Arc<Barrier>>,
}

impl NaivePolicy {
    pub fn new(pickup_delay: Duration) -> Self {
        Self {
            pickup_delay,
            barrier: None,
        }
    }

    pub fn with_barrier(pickup_delay: Duration, barrier: Arc<Barrier>) -> Self {
        Self {
            pickup_delay,
            barrier: Some(barrier),
        }
    }

    async fn between_tokens(&self, cancel: &CancellationToken) -> Result<(), SyncError> {
        if let Some(barrier) = &self.barrier {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SyncError::Cancelled),
                _ = barrier.wait() => {}
            }
        }
        if !self.pickup_delay.is_zero() {
            sleep_or_cancel(self.pickup_delay, cancel).await?;
        }
        Ok(())
    }
}

impl Default for NaivePolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(DiningConfig::default().pickup_delay_ms))
    }
}

#[async_trait]
impl AcquisitionPolicy for NaivePolicy {
    fn name(&self) -> &'static str {
        "naive"
    }

    async fn acquire(
        &self,
        left: &ResourceToken,
        right: &ResourceToken,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        left.acquire(cancel).await?;
        trace!(token = left.id(), "Holding left, reaching right");

        let second = match self.between_tokens(cancel).await {
            Ok(()) => right.acquire(cancel).await,
            Err(e) => Err(e),
        };
        if let Err(e) = second {
            left.release()?;
            return Err(e);
        }
        Ok(())
    }
}

// =============================================================================
// Ordered
// =============================================================================

/// Always takes the lower-id token first and returns the higher-id one first.
///
/// Every philosopher acquires along the same total order, so no cycle of waiters can
/// form and the ring cannot deadlock (for two or more distinct tokens). Starvation
/// freedom is not promised; it relies on the scheduler not permanently favouring one
/// acquirer.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderedPolicy;

impl OrderedPolicy {
    fn order<'a>(a: &'a ResourceToken, b: &'a ResourceToken) -> (&'a ResourceToken, &'a ResourceToken) {
        if a.id() <= b.id() {
            (a, b)
        } else {
            (b, a)
        }
    }
}

#[async_trait]
impl AcquisitionPolicy for OrderedPolicy {
    fn name(&self) -> &'static str {
        "ordered"
    }

    async fn acquire(
        &self,
        left: &ResourceToken,
        right: &ResourceToken,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let (first, second) = Self::order(left, right);
        first.acquire(cancel).await?;
        if let Err(e) = second.acquire(cancel).await {
            first.release()?;
            return Err(e);
        }
        Ok(())
    }

    fn release(&self, left: &ResourceToken, right: &ResourceToken) -> Result<(), SyncError> {
        let (first, second) = Self::order(left, right);
        second.release()?;
        first.release()
    }
}

// =============================================================================
// Timeout + retry
// =============================================================================

/// Bounded waits on each token; gives back what it holds on failure and retries after
/// a short backoff.
#[derive(Debug, Clone)]
pub struct TimeoutRetryPolicy {
    attempt_timeout: Duration,
    backoff: Duration,
}

impl TimeoutRetryPolicy {
    pub fn new(attempt_timeout: Duration, backoff: Duration) -> Self {
        Self {
            attempt_timeout,
            backoff,
        }
    }

    async fn attempt(&self, token: &ResourceToken, cancel: &CancellationToken) -> Result<bool, SyncError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SyncError::Cancelled),
            acquired = token.try_acquire(self.attempt_timeout) => Ok(acquired),
        }
    }
}

impl Default for TimeoutRetryPolicy {
    fn default() -> Self {
        let config = DiningConfig::default();
        Self::new(
            Duration::from_millis(config.try_timeout_ms),
            Duration::from_millis(config.retry_backoff_ms),
        )
    }
}

#[async_trait]
impl AcquisitionPolicy for TimeoutRetryPolicy {
    fn name(&self) -> &'static str {
        "timeout_retry"
    }

    async fn acquire(
        &self,
        left: &ResourceToken,
        right: &ResourceToken,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        loop {
            if !self.attempt(left, cancel).await? {
                trace!(token = left.id(), "Left busy, backing off");
                sleep_or_cancel(self.backoff, cancel).await?;
                continue;
            }

            match self.attempt(right, cancel).await {
                Ok(true) => return Ok(()),
                Ok(false) => {
                    trace!(token = right.id(), "Right busy, putting left back");
                    left.release()?;
                    sleep_or_cancel(self.backoff, cancel).await?;
                }
                Err(e) => {
                    left.release()?;
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (ResourceToken, ResourceToken) {
        (ResourceToken::new(4), ResourceToken::new(0))
    }

    #[tokio::test]
    async fn test_ordered_acquires_lower_id_first() {
        let (left, right) = pair();
        let cancel = CancellationToken::new();

        // Token 0 is busy: an ordered philosopher must block on it without taking 4.
        assert!(right.try_acquire_now());
        let attempt = tokio::time::timeout(
            Duration::from_millis(30),
            OrderedPolicy.acquire(&left, &right, &cancel),
        )
        .await;
        assert!(attempt.is_err());
        assert!(!left.is_held());

        right.release().unwrap();
        OrderedPolicy.acquire(&left, &right, &cancel).await.unwrap();
        assert!(left.is_held() && right.is_held());
        OrderedPolicy.release(&left, &right).unwrap();
        assert!(!left.is_held() && !right.is_held());
    }

    #[tokio::test]
    async fn test_naive_gives_back_left_when_cancelled() {
        let (left, right) = pair();
        let cancel = CancellationToken::new();
        assert!(right.try_acquire_now());

        let policy = NaivePolicy::new(Duration::ZERO);
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });

        let result = policy.acquire(&left, &right, &cancel).await;
        assert_eq!(result, Err(SyncError::Cancelled));
        assert!(!left.is_held());
    }

    #[tokio::test]
    async fn test_timeout_retry_gives_back_left_when_cancelled() {
        let (left, right) = pair();
        let cancel = CancellationToken::new();
        assert!(right.try_acquire_now());

        let policy = TimeoutRetryPolicy::new(Duration::from_millis(5), Duration::from_millis(5));
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            trigger.cancel();
        });

        let result = policy.acquire(&left, &right, &cancel).await;
        assert_eq!(result, Err(SyncError::Cancelled));
        assert!(!left.is_held());

        right.release().unwrap();
        let fresh = CancellationToken::new();
        policy.acquire(&left, &right, &fresh).await.unwrap();
        assert!(left.is_held() && right.is_held());
        policy.release(&left, &right).unwrap();
    }

    #[test]
    fn test_kind_builds_matching_policy() {
        let config = DiningConfig::default();
        assert_eq!(PolicyKind::Naive.build(&config).name(), "naive");
        assert_eq!(PolicyKind::Ordered.build(&config).name(), "ordered");
        assert_eq!(PolicyKind::TimeoutRetry.build(&config).name(), "timeout_retry");
    }
}
