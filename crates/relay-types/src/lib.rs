//! Shared data model, error taxonomy and configuration for the gasless
//! relayer workspace.
//!
//! This crate has no business logic of its own — it is the thing every
//! other crate in the workspace depends on.

pub mod config;
pub mod error;
pub mod fee_payer;
pub mod fingerprint;
pub mod quote;
pub mod reservation;
pub mod tiers;

pub use config::RelayConfig;
pub use error::{RelayError, RelayResult};
pub use fee_payer::{FeePayer, RotationState};
pub use fingerprint::TxFingerprint;
pub use quote::{Quote, QuoteId};
pub use reservation::Reservation;
pub use tiers::HolderTier;
