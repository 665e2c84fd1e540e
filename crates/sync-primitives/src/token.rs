//! # Resource Token
//!
//! An exclusive, non-reentrant lock with a stable ordinal identity. The ordinal is
//! what lets acquisition policies impose a total order on a set of tokens.
//!
//! Unlike a guard-based mutex, a token is acquired and released explicitly. Acquisition
//! policies hold a token across arbitrary awaits and hand it back on their own
//! schedule, which lets the naive dining policy express "hold left, block on right"
//! exactly as written.

use crate::error::SyncError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// A binary semaphore with an ordinal id.
///
/// Every successful [`acquire`](Self::acquire), [`try_acquire`](Self::try_acquire) or
/// [`try_acquire_now`](Self::try_acquire_now) must be paired with exactly one
/// [`release`](Self::release). The token does not track *who* holds it, so a release
/// from a task other than the holder is undefined; a release while nobody holds it is
/// detected and reported as [`SyncError::NotHeld`].
///
/// No fairness is promised beyond what the Tokio semaphore provides.
#[derive(Debug)]
pub struct ResourceToken {
    id: usize,
    permit: Semaphore,
    held: AtomicBool,
}

impl ResourceToken {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            permit: Semaphore::new(1),
            held: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Whether some agent currently holds the token.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    /// Blocks until the token is free or `cancel` fires.
    ///
    /// Cancellation is checked first, so an already-cancelled signal never acquires.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), SyncError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SyncError::Cancelled),
            permit = self.permit.acquire() => {
                // The semaphore is never closed.
                permit.map_err(|_| SyncError::Closed)?.forget();
                self.mark_held();
                Ok(())
            }
        }
    }

    /// Waits up to `timeout` for the token. Returns whether it was acquired.
    pub async fn try_acquire(&self, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.permit.acquire()).await {
            Ok(Ok(permit)) => {
                permit.forget();
                self.mark_held();
                true
            }
            _ => false,
        }
    }

    /// Takes the token only if it is free right now.
    pub fn try_acquire_now(&self) -> bool {
        match self.permit.try_acquire() {
            Ok(permit) => {
                permit.forget();
                self.mark_held();
                true
            }
            Err(_) => false,
        }
    }

    /// Hands the token back.
    pub fn release(&self) -> Result<(), SyncError> {
        if !self.held.swap(false, Ordering::AcqRel) {
            return Err(SyncError::NotHeld { token: self.id });
        }
        self.permit.add_permits(1);
        trace!(token = self.id, "Released");
        Ok(())
    }

    fn mark_held(&self) {
        self.held.store(true, Ordering::Release);
        trace!(token = self.id, "Acquired");
    }
}
