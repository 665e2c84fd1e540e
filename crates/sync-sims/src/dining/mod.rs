//! # Dining Philosophers
//!
//! N philosophers around a table, one token between each pair of neighbours. A
//! philosopher needs both adjacent tokens to eat. The arena runs one agent per
//! philosopher and the acquisition policy decides whether the table can deadlock.
//!
//! ```text
//!        P0
//!    T0      T1
//!  P4          P1
//!    T4      T2
//!     P3  T3  P2
//! ```
//!
//! Philosopher `i` sits between token `i` (left) and token `(i + 1) % N` (right).

pub mod arena;
pub mod philosopher;
pub mod policy;

pub use arena::{ArenaStatistics, DiningArena};
pub use philosopher::{Philosopher, PhilosopherReport, PhilosopherState};
pub use policy::{AcquisitionPolicy, NaivePolicy, OrderedPolicy, PolicyKind, TimeoutRetryPolicy};
