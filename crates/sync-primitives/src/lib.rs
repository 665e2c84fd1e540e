//! # Sync Primitives
//!
//! Leaf synchronization primitives for in-process concurrency simulations, built on
//! Tokio. None of them depends on another; each owns its internal lock or semaphore
//! exclusively, and callers only touch that state through the public operations.
//!
//! ## The Primitives
//!
//! | Primitive | Shape | Blocking operations |
//! |-----------|-------|---------------------|
//! | [`ResourceToken`] | binary semaphore with an ordinal id | `acquire`, `try_acquire(timeout)` |
//! | [`BoundedChannel`] | fixed-capacity FIFO buffer | `put`, `take` |
//! | [`WaitingRoom`] | fixed-capacity FIFO admission queue + wake signal | `wait_for_wake` |
//!
//! ## Cancellation
//!
//! Every blocking operation takes a [`CancellationToken`](tokio_util::sync::CancellationToken).
//! The operation races its wait against the token and returns
//! [`SyncError::Cancelled`] as soon as the token fires, so one shared token is enough
//! to unblock every agent of a simulation. Cancellation is cooperative: nothing is
//! retried or rolled back on the caller's behalf.
//!
//! ```rust
//! use sync_primitives::{BoundedChannel, SyncError};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let channel = BoundedChannel::<u32>::new(1).unwrap();
//!     let cancel = CancellationToken::new();
//!
//!     channel.put(1, &cancel).await.unwrap();
//!     assert_eq!(channel.take(&cancel).await, Ok(Some(1)));
//!
//!     cancel.cancel();
//!     assert_eq!(channel.take(&cancel).await, Err(SyncError::Cancelled));
//! }
//! ```
//!
//! ## Errors
//!
//! All primitives share [`SyncError`]. Constructors fail fast with
//! [`SyncError::InvalidArgument`] on a zero capacity.

pub mod cancel;
pub mod channel;
pub mod error;
pub mod token;
pub mod tracing;
pub mod waiting_room;

pub use cancel::sleep_or_cancel;
pub use channel::BoundedChannel;
pub use error::SyncError;
pub use token::ResourceToken;
pub use waiting_room::WaitingRoom;
