//! # Primitive Errors
//!
//! The error taxonomy shared by every synchronization primitive. Agents match on the
//! same variants whichever primitive they were blocked on.

/// Errors returned by the synchronization primitives.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SyncError {
    /// A constructor received a non-positive capacity or size.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The cancellation signal fired before the operation could complete.
    ///
    /// This is the expected outcome during shutdown and is never a bug by itself.
    #[error("Operation cancelled")]
    Cancelled,

    /// A `put` was attempted on a channel that is closed for writing.
    #[error("Channel closed for writing")]
    Closed,

    /// A token was released without a matching acquire.
    #[error("Token {token} released while not held")]
    NotHeld { token: usize },
}

impl SyncError {
    /// Returns true for the cooperative-shutdown outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled)
    }
}
