//! Faucet server library.
//!
//! Architecture:
//! - Block engine: tick-driven epochs over a server-issued seed
//! - Share protocol: PoW-verified submissions into a per-block ledger
//! - Reward application: three-pool distribution, transactional credits
//! - Payout dispatcher: background queue draining via an abstract sender
//!
//! Key invariants:
//! - A share is recorded against the exact block it was verified for
//! - Reward credits and the block-processed marker commit atomically
//! - Balances never go negative; payouts only leave the pending state once

pub mod api;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod state;

pub use config::FaucetConfig;
pub use db::Db;
pub use engine::BlockEngine;
pub use error::ApiError;
pub use state::AppState;
