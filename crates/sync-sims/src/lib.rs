//! # Sync Sims
//!
//! Three classic concurrency simulations assembled from the primitives in
//! [`sync_primitives`]:
//!
//! | Simulation | Orchestrator | Agents | Hazard on display |
//! |------------|--------------|--------|-------------------|
//! | Dining philosophers | [`DiningArena`] | one per philosopher | circular wait |
//! | Producer / consumer | [`BufferedPipeline`] | M producers, K consumers | backpressure |
//! | Sleeping server | [`Shop`] | server, customer generator | lost wakeup |
//!
//! Every orchestrator follows the lifecycle described in [`lifecycle`]: construct,
//! `start(cancel)`, let it run, cancel, `wait_all_timeout`, read `statistics()`.
//!
//! Nothing here prints. Agents log through `tracing` and publish state transitions on
//! a broadcast [`EventBus`]; a harness subscribes and renders them however it likes.

pub mod barbershop;
pub mod config;
pub mod dining;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod pipeline;

pub use barbershop::{Customer, CustomerState, Server, ServerState, Shop, ShopStatistics};
pub use config::{DelayRange, DiningConfig, PipelineConfig, ProbeConfig, ShopConfig};
pub use dining::{
    AcquisitionPolicy, ArenaStatistics, DiningArena, NaivePolicy, OrderedPolicy, Philosopher,
    PhilosopherReport, PhilosopherState, PolicyKind, TimeoutRetryPolicy,
};
pub use error::SimError;
pub use events::{EventBus, SimEvent};
pub use pipeline::{BufferedPipeline, PipelineStatistics, Product};
