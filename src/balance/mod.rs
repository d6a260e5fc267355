//! Token balance checks against the publisher backend.
//!
//! Provides:
//! - `GET /check-balance?cost=N` with a configured credential and timeout
//! - Tolerant interpretation of the two response shapes (balance or offers)
//! - Fail-soft (`check_balance`) and typed-error (`try_check_balance`) entry points
//!
//! ## Design
//! - HTTP client (reqwest) built once per `BalanceClient`, configuration
//!   injected at construction
//! - No retry or backoff: a timeout yields the "balance unknown" fallback

pub mod client;
pub mod response;

pub use client::{BalanceClient, BalanceConfig, BalanceError};
pub use response::{BalanceCheck, Offer};
