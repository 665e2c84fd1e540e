use crate::error::SimError;
use std::future::Future;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{error, info, warn, Instrument, Span};

type AgentResult = Result<(), SimError>;

/// The running agents of one orchestrator.
///
/// `AgentSet` is responsible for:
/// - **Start Guard**: an orchestrator starts at most once
/// - **Spawning**: each agent gets its own Tokio task, instrumented with its span
/// - **Joining**: waiting for every agent, with or without a deadline, and surfacing
///   the first failure
///
/// Agents end with `Ok(())` on cancellation; anything else is a fatal failure.
#[derive(Debug, Default)]
pub struct AgentSet {
    agents: Vec<(String, JoinHandle<AgentResult>)>,
    started: bool,
}

impl AgentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the start guard. Fails if the set was already started.
    pub fn begin(&mut self) -> Result<(), SimError> {
        if self.started {
            return Err(SimError::AlreadyStarted);
        }
        self.started = true;
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Number of agents not yet joined.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Spawns `agent` on the current Tokio runtime inside `span`.
    pub fn spawn<F>(&mut self, name: impl Into<String>, span: Span, agent: F)
    where
        F: Future<Output = AgentResult> + Send + 'static,
    {
        let handle = tokio::spawn(agent.instrument(span));
        self.agents.push((name.into(), handle));
    }

    /// Waits for every agent to finish.
    ///
    /// All agents are joined even if one fails; the first failure is returned.
    pub async fn wait_all(&mut self) -> Result<(), SimError> {
        if !self.started {
            return Err(SimError::NotStarted);
        }
        let mut first_failure = None;
        for (name, handle) in self.agents.drain(..) {
            record(&name, handle.await, &mut first_failure);
        }
        first_failure.map_or(Ok(()), Err)
    }

    /// Like [`wait_all`](Self::wait_all), but gives up at the deadline.
    ///
    /// Agents still running when `timeout` elapses are aborted and counted in
    /// [`SimError::JoinTimeout`]. This is the escape hatch for an agent that does not
    /// honor cancellation.
    pub async fn wait_all_timeout(&mut self, timeout: Duration) -> Result<(), SimError> {
        if !self.started {
            return Err(SimError::NotStarted);
        }
        let deadline = Instant::now() + timeout;
        let mut first_failure = None;
        let mut pending = 0;

        for (name, mut handle) in self.agents.drain(..) {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(joined) => record(&name, joined, &mut first_failure),
                Err(_) => {
                    warn!(agent = %name, "Agent ignored cancellation, aborting");
                    handle.abort();
                    pending += 1;
                }
            }
        }

        if pending > 0 {
            return Err(SimError::JoinTimeout { pending });
        }
        first_failure.map_or(Ok(()), Err)
    }
}

fn record(name: &str, joined: Result<AgentResult, JoinError>, first_failure: &mut Option<SimError>) {
    let failure = match joined {
        Ok(Ok(())) => {
            info!(agent = %name, "Agent stopped");
            return;
        }
        Ok(Err(e)) => SimError::AgentFailed {
            agent: name.to_string(),
            reason: e.to_string(),
        },
        Err(e) => SimError::AgentFailed {
            agent: name.to_string(),
            reason: e.to_string(),
        },
    };
    error!(agent = %name, error = %failure, "Agent failed");
    first_failure.get_or_insert(failure);
}
