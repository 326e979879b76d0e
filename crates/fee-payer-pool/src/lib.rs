//! Fee-Payer Pool (spec C1).
//!
//! Owns the relayer's signing keys, answers capacity reservations, and
//! tracks payer health and rotation. Shaped after the teacher's
//! `order-pool` crate: a `Pool` facade (`Arc`-wrapped, cheap to `Clone`) over
//! a single mutex-guarded inner state, because the critical sections here
//! are short and contention is low (spec §5 "coarse-grained locking").

mod admin;
mod config;
mod keyring;
mod pool;
mod state;

pub use admin::{AdminError, AdminOp, RetirementOutcome};
pub use config::PoolConfig;
pub use keyring::Keyring;
pub use pool::{BalanceSnapshot, FeePayerPool, Pool, ReserveOutcome};
pub use state::PoolSnapshot;
