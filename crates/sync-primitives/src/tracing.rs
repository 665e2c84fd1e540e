//! # Observability & Tracing
//!
//! Every primitive and agent logs through the `tracing` crate with structured fields.
//! Primitives stay quiet (`trace`/`debug` only); agents log lifecycle events at `info`
//! and hazards such as rejections or a detected deadlock at `warn`.
//!
//! ```bash
//! # Lifecycle only
//! RUST_LOG=info cargo test
//!
//! # Every state transition
//! RUST_LOG=debug cargo test
//!
//! # Token acquire/release traffic
//! RUST_LOG=sync_primitives=trace cargo test
//! ```
//!
//! Agents run inside named spans (`philosopher{id=2}`, `producer{name=Producer-1}`,
//! `server`), so the compact format shows which agent emitted each line.

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; only the first call installs the subscriber.
pub fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}
