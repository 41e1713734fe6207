//! Configuration: environment-backed CLI arguments and the derived runtime
//! config. Token-denominated knobs convert to micro-tokens once, here.

use clap::Parser;
use faucet_core::{RewardBudgets, MICRO_PER_TOKEN};

#[derive(Parser, Debug, Clone)]
#[command(name = "faucet-server")]
#[command(about = "Proof-of-work faucet: block engine, share protocol, payouts")]
pub struct Args {
    /// Server port
    #[arg(short, long, default_value = "8080", env = "PORT")]
    pub port: u16,

    /// Server host
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    pub host: String,

    /// Path to the SQLite database file
    #[arg(long, default_value = "faucet.db", env = "DATABASE_PATH")]
    pub database_path: String,

    /// Block epoch duration in milliseconds
    #[arg(long, default_value = "400", env = "BLOCK_TIME_MS")]
    pub block_time_ms: u64,

    /// Required leading zero bits for an accepted share
    #[arg(long, default_value = "18", env = "DIFFICULTY_BITS")]
    pub difficulty_bits: u32,

    /// Per-address share cap within one block
    #[arg(long, default_value = "500", env = "MAX_SHARES_PB")]
    pub max_shares_pb: u32,

    /// Withdrawal fee in whole tokens
    #[arg(long, default_value = "1000", env = "WITHDRAW_FEE_TOKENS")]
    pub withdraw_fee_tokens: u64,

    /// Proportional pool budget per block, whole tokens
    #[arg(long, default_value = "50", env = "POOL_A_REWARD_TOKENS")]
    pub pool_a_reward_tokens: u64,

    /// Lottery pool budget per block, whole tokens
    #[arg(long, default_value = "50", env = "POOL_B_REWARD_TOKENS")]
    pub pool_b_reward_tokens: u64,

    /// Compensation pool budget per block, whole tokens (0 disables it)
    #[arg(long, default_value = "0", env = "POOL_C_REWARD_TOKENS")]
    pub pool_c_reward_tokens: u64,

    /// General rate limit: requests per window per client
    #[arg(long, default_value = "300", env = "RATE_LIMIT_MAX")]
    pub rate_limit_max: u32,

    /// General rate limit window in milliseconds
    #[arg(long, default_value = "60000", env = "RATE_LIMIT_WINDOW_MS")]
    pub rate_limit_window_ms: u64,

    /// Submission rate limit: proofs per window per client
    #[arg(long, default_value = "120", env = "SUBMIT_LIMIT_MAX")]
    pub submit_limit_max: u32,

    /// Submission rate limit window in milliseconds
    #[arg(long, default_value = "10000", env = "SUBMIT_LIMIT_WINDOW_MS")]
    pub submit_limit_window_ms: u64,

    /// Webhook URL for the payout sender; dev sender when unset
    #[arg(long, env = "PAYOUT_WEBHOOK_URL")]
    pub payout_webhook_url: Option<String>,

    /// Payout queue poll interval in milliseconds
    #[arg(long, default_value = "5000", env = "PAYOUT_POLL_MS")]
    pub payout_poll_ms: u64,

    /// Send attempts before a payout is marked failed
    #[arg(long, default_value = "5", env = "PAYOUT_MAX_ATTEMPTS")]
    pub payout_max_attempts: u32,
}

/// Runtime configuration shared with handlers and the engine.
#[derive(Clone, Debug)]
pub struct FaucetConfig {
    pub block_time_ms: u64,
    pub difficulty_bits: u32,
    pub max_shares_per_block: u32,
    pub max_nonce_len: usize,
    pub withdraw_fee_micro: u64,
    pub budgets: RewardBudgets,
}

impl FaucetConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            block_time_ms: args.block_time_ms,
            difficulty_bits: args.difficulty_bits,
            max_shares_per_block: args.max_shares_pb,
            max_nonce_len: 256,
            withdraw_fee_micro: args.withdraw_fee_tokens * MICRO_PER_TOKEN,
            budgets: RewardBudgets {
                pool_a_micro: args.pool_a_reward_tokens * MICRO_PER_TOKEN,
                pool_b_micro: args.pool_b_reward_tokens * MICRO_PER_TOKEN,
                pool_c_micro: args.pool_c_reward_tokens * MICRO_PER_TOKEN,
            },
        }
    }
}
