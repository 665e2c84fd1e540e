//! # Waiting Room
//!
//! A fixed-capacity FIFO admission queue with a rendezvous signal.
//!
//! Admission never blocks: an entry either gets a seat immediately or is handed back
//! to the caller. The server side dequeues without blocking as well and, when it finds
//! the room empty, parks on [`WaitingRoom::wait_for_wake`] until an admitter calls
//! [`WaitingRoom::wake_up`].
//!
//! The wake signal has semaphore semantics capped at one stored permit: a signal sent
//! while nobody waits is remembered once, and each signal releases at most one sleeper.

use crate::error::SyncError;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Bounded FIFO queue of `T` plus a one-sleeper wake signal.
///
/// Invariant: `current_count() == number of queued entries <= capacity()`. The count
/// is the queue length read under the same lock that guards every mutation.
pub struct WaitingRoom<T> {
    capacity: usize,
    queue: Mutex<VecDeque<T>>,
    wake: Notify,
}

impl<T> WaitingRoom<T> {
    pub fn new(capacity: usize) -> Result<Self, SyncError> {
        if capacity == 0 {
            return Err(SyncError::InvalidArgument(
                "waiting room capacity must be positive".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            wake: Notify::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn current_count(&self) -> usize {
        self.lock().len()
    }

    pub fn is_full(&self) -> bool {
        self.lock().len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Seats `entry` if a seat is free; otherwise hands it straight back.
    ///
    /// Rejected entries are never queued.
    pub fn try_enter(&self, entry: T) -> Result<(), T> {
        let mut queue = self.lock();
        if queue.len() >= self.capacity {
            return Err(entry);
        }
        queue.push_back(entry);
        Ok(())
    }

    /// Removes the longest-waiting entry, if any.
    pub fn try_get(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Removes every waiting entry, oldest first.
    pub fn clear(&self) -> Vec<T> {
        self.lock().drain(..).collect()
    }

    /// Signals the server that someone is waiting.
    pub fn wake_up(&self) {
        self.wake.notify_one();
    }

    /// Parks until [`wake_up`](Self::wake_up) is called or `cancel` fires.
    pub async fn wait_for_wake(&self, cancel: &CancellationToken) -> Result<(), SyncError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SyncError::Cancelled),
            _ = self.wake.notified() => Ok(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: Clone> WaitingRoom<T> {
    /// The entries currently waiting, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.lock().iter().cloned().collect()
    }
}

impl<T> std::fmt::Debug for WaitingRoom<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitingRoom")
            .field("capacity", &self.capacity)
            .field("current_count", &self.current_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_admission_control() {
        let room = WaitingRoom::new(2).unwrap();
        assert!(room.try_enter("c1").is_ok());
        assert!(room.try_enter("c2").is_ok());
        assert_eq!(room.try_enter("c3"), Err("c3"));
        assert_eq!(room.current_count(), 2);
        assert!(room.is_full());
    }

    #[test]
    fn test_fifo_dequeue_frees_a_seat() {
        let room = WaitingRoom::new(2).unwrap();
        room.try_enter(1).unwrap();
        room.try_enter(2).unwrap();

        assert_eq!(room.snapshot(), vec![1, 2]);
        assert_eq!(room.try_get(), Some(1));
        assert!(room.try_enter(3).is_ok());
        assert_eq!(room.clear(), vec![2, 3]);
        assert!(room.is_empty());
        assert_eq!(room.try_get(), None);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert!(matches!(
            WaitingRoom::<u8>::new(0),
            Err(SyncError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_wake_before_wait_is_remembered_once() {
        let room = WaitingRoom::<u8>::new(1).unwrap();
        let cancel = CancellationToken::new();

        room.wake_up();
        room.wake_up();
        room.wait_for_wake(&cancel).await.unwrap();

        // Only one permit was stored, so a second wait parks until cancelled.
        let second = tokio::time::timeout(Duration::from_millis(30), room.wait_for_wake(&cancel)).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_wait_unblocks_on_cancel() {
        let room = WaitingRoom::<u8>::new(1).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(room.wait_for_wake(&cancel).await, Err(SyncError::Cancelled));
    }
}
