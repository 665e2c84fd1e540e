//! # Sleeping Server
//!
//! A shop with a bounded waiting room and a single server. Customers who find every
//! seat taken leave immediately; the server sleeps whenever the room is empty and is
//! woken by whoever seats the next customer.

pub mod customer;
pub mod server;
pub mod shop;

pub use customer::{Customer, CustomerState};
pub use server::{Ledger, Server, ServerState};
pub use shop::{Shop, ShopStatistics};
