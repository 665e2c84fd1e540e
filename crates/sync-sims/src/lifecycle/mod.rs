//! # Simulation Lifecycle
//!
//! Individual agents are simple loops; starting, wiring, and stopping them is where the
//! care goes. Every orchestrator follows the same lifecycle:
//!
//! 1. **Construct** - validate parameters, build primitives and agents. Nothing runs yet.
//! 2. **Start** - `start(cancel)` spawns one Tokio task per agent and returns at once.
//! 3. **Run** - agents loop until the shared `CancellationToken` fires (or, for quota
//!    runs, until their work is done).
//! 4. **Join** - `wait_all()` / `wait_all_timeout(d)` collect the tasks.
//! 5. **Report** - `statistics()` reads the counters the agents left behind.
//!
//! ```rust,ignore
//! let cancel = CancellationToken::new();
//! let mut arena = DiningArena::new(5, OrderedPolicy)?;
//! arena.start(cancel.clone())?;
//!
//! tokio::time::sleep(Duration::from_secs(2)).await;
//! cancel.cancel();
//!
//! arena.wait_all_timeout(Duration::from_secs(1)).await?;
//! println!("{:?}", arena.statistics());
//! ```
//!
//! ## Shutdown
//!
//! Cancellation is cooperative. Each blocking primitive races its wait against the
//! token, so firing it unblocks every parked agent; the agent then finalizes its
//! counters and returns `Ok(())`. A join with a timeout aborts any agent that fails to
//! notice, so a misbehaving agent cannot hang the caller.

pub mod agent_set;

pub use agent_set::*;
