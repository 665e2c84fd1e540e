//! # Bounded Channel
//!
//! A fixed-capacity FIFO transfer buffer between producers and consumers.
//!
//! ## Blocking Model
//!
//! Both blocking operations follow the same loop:
//!
//! 1. Register interest in the relevant [`Notify`] (`enable()` on the `Notified` future).
//! 2. Lock the queue and re-check the predicate.
//! 3. If the predicate holds, mutate, unlock, and wake one waiter on the opposite side.
//! 4. Otherwise wait for either the notification or the cancellation signal, then loop.
//!
//! Registering *before* the check is what prevents a lost wakeup: a notification sent
//! between the check and the wait is still delivered to the registered future.
//! The queue lock is a plain `std::sync::Mutex` and is never held across an `.await`.

use crate::error::SyncError;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::debug;

struct ChannelState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// A bounded FIFO buffer with blocking `put`/`take` and non-blocking variants.
///
/// Invariant: `0 <= len() <= capacity()` at every instant.
/// Once [`close_for_writing`](Self::close_for_writing) is called no further put
/// succeeds, but `take` keeps draining until the buffer is empty and then reports
/// end-of-stream (`Ok(None)`).
pub struct BoundedChannel<T> {
    capacity: usize,
    state: Mutex<ChannelState<T>>,
    not_empty: Notify,
    not_full: Notify,
}

impl<T> BoundedChannel<T> {
    /// Creates a channel holding at most `capacity` items.
    pub fn new(capacity: usize) -> Result<Self, SyncError> {
        if capacity == 0 {
            return Err(SyncError::InvalidArgument(
                "channel capacity must be positive".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            state: Mutex::new(ChannelState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_empty: Notify::new(),
            not_full: Notify::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.lock().items.len() >= self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Closed for writing and fully drained.
    pub fn is_completed(&self) -> bool {
        let state = self.lock();
        state.closed && state.items.is_empty()
    }

    /// Enqueues `item`, waiting while the buffer is full.
    ///
    /// Fails with [`SyncError::Closed`] if the channel is (or becomes) closed for
    /// writing, and with [`SyncError::Cancelled`] if the signal fires first.
    pub async fn put(&self, item: T, cancel: &CancellationToken) -> Result<(), SyncError> {
        loop {
            let notified = self.not_full.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.closed {
                    return Err(SyncError::Closed);
                }
                if state.items.len() < self.capacity {
                    state.items.push_back(item);
                    drop(state);
                    self.not_empty.notify_one();
                    return Ok(());
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SyncError::Cancelled),
                _ = &mut notified => {}
            }
        }
    }

    /// Dequeues the oldest item, waiting while the buffer is empty.
    ///
    /// Returns `Ok(None)` once the channel is closed and drained.
    pub async fn take(&self, cancel: &CancellationToken) -> Result<Option<T>, SyncError> {
        loop {
            let notified = self.not_empty.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(item) = state.items.pop_front() {
                    drop(state);
                    self.not_full.notify_one();
                    return Ok(Some(item));
                }
                if state.closed {
                    return Ok(None);
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SyncError::Cancelled),
                _ = &mut notified => {}
            }
        }
    }

    /// Enqueues without waiting. Hands the item back if the buffer is full or closed.
    pub fn try_put(&self, item: T) -> Result<(), T> {
        let mut state = self.lock();
        if state.closed || state.items.len() >= self.capacity {
            return Err(item);
        }
        state.items.push_back(item);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Dequeues without waiting.
    pub fn try_take(&self) -> Option<T> {
        let item = self.lock().items.pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Stops accepting new items. Idempotent; returns true only for the call that
    /// actually closed the channel.
    ///
    /// Every blocked `take` is woken so it can drain what is left or observe
    /// end-of-stream, and every blocked `put` is woken so it can fail with `Closed`.
    pub fn close_for_writing(&self) -> bool {
        let newly_closed = {
            let mut state = self.lock();
            !std::mem::replace(&mut state.closed, true)
        };
        if newly_closed {
            debug!(capacity = self.capacity, "Channel closed for writing");
            self.not_empty.notify_waiters();
            self.not_full.notify_waiters();
        }
        newly_closed
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState<T>> {
        // No code path panics while holding the lock; recover the data regardless.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T> std::fmt::Debug for BoundedChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("BoundedChannel")
            .field("capacity", &self.capacity)
            .field("len", &state.items.len())
            .field("closed", &state.closed)
            .finish()
    }
}
