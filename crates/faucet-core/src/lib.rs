//! Core domain logic for the proof-of-work faucet.
//!
//! Everything in this crate is pure and synchronous: hashing, difficulty
//! checks, address normalization, the weighted lottery, and the three-pool
//! reward calculator. The server crate layers storage, HTTP, and scheduling
//! on top.

pub mod address;
pub mod lottery;
pub mod pow;
pub mod rewards;

pub use address::{is_valid_address, normalize_address};
pub use lottery::{draw_weighted, weighted_index};
pub use pow::{
    canonical_input, generate_seed_hex, leading_zero_bits, meets_difficulty, pow_hash,
};
pub use rewards::{calculate_rewards, calculate_rewards_with_winner, RewardBudgets};

/// Smallest accounting unit: 1 token = 10^6 micro-tokens.
pub const MICRO_PER_TOKEN: u64 = 1_000_000;
