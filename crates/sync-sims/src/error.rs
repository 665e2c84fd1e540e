//! # Simulation Errors
//!
//! Orchestrator-level errors. Primitive failures convert automatically through
//! `#[from]`, so agents can use `?` on any primitive call.

use sync_primitives::SyncError;

/// Errors raised by agents and orchestrators.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SimError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Simulation already started")]
    AlreadyStarted,

    #[error("Simulation not started")]
    NotStarted,

    /// An agent panicked or stopped on a fatal error.
    #[error("Agent {agent} failed: {reason}")]
    AgentFailed { agent: String, reason: String },

    /// `wait_all_timeout` expired; the remaining agents were aborted.
    #[error("{pending} agent(s) still running after join timeout")]
    JoinTimeout { pending: usize },
}

impl SimError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        SimError::Sync(SyncError::InvalidArgument(reason.into()))
    }

    /// True when the error is the cooperative-shutdown outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SimError::Sync(SyncError::Cancelled))
    }
}

/// Folds cancellation into a clean stop for agent loops.
pub(crate) fn finish_on_cancel(result: Result<(), SimError>) -> Result<(), SimError> {
    match result {
        Err(e) if e.is_cancelled() => Ok(()),
        other => other,
    }
}
