//! Cancellation-aware suspension helpers.

use crate::error::SyncError;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Sleeps for `duration`, returning early with [`SyncError::Cancelled`] if the
/// signal fires first.
///
/// An already-cancelled signal wins even for a zero duration.
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> Result<(), SyncError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SyncError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
