//! kumotrade core — the trading engine behind an unattended Ichimoku session.
//!
//! This crate contains everything with algorithmic content:
//! - Domain types (position state, trade sides, the activity ledger)
//! - The sliding price window with its displaced coordinate track
//! - The Ichimoku cloud engine (five series, recomputed per round)
//! - The per-instrument trader state machine (flat / long / short)
//! - Quote providers (Yahoo live quotes, synthetic random walk) behind a
//!   common port, with circuit breaker and bounded retry

pub mod domain;
pub mod indicators;
pub mod quotes;
pub mod trader;
pub mod window;
