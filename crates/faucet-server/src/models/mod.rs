//! Data models: storage rows and per-endpoint request/response types.
//!
//! Wire types are camelCase to match the browser miner; unknown fields are
//! rejected so malformed submissions fail fast.

use serde::{Deserialize, Serialize};

// ============================================================================
// STORAGE ROWS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRow {
    pub block_number: u64,
    pub seed_hex: String,
    pub created_at: i64,
    pub processed_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareRow {
    pub block_number: u64,
    pub address: String,
    pub nonce: String,
    pub hash_hex: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Sent,
    Failed,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Sent => "sent",
            PayoutStatus::Failed => "failed",
        }
    }
}

impl From<&str> for PayoutStatus {
    fn from(s: &str) -> Self {
        match s {
            "sent" => PayoutStatus::Sent,
            "failed" => PayoutStatus::Failed,
            _ => PayoutStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRow {
    pub id: String,
    pub address: String,
    pub amount_micro: u64,
    pub fee_micro: u64,
    pub status: PayoutStatus,
    pub tx_hash: Option<String>,
    pub attempts: u32,
    pub created_at: i64,
    pub updated_at: i64,
}

// ============================================================================
// CHALLENGE
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    pub ok: bool,
    pub block_number: u64,
    pub seed_hex: String,
    pub difficulty_bits: u32,
    pub block_time_ms: u64,
    pub server_time_ms: i64,
    pub ms_left: u64,
}

// ============================================================================
// SUBMIT PROOF
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubmitProofRequest {
    pub address: Option<String>,
    pub nonce: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProofResponse {
    pub ok: bool,
    pub accepted: bool,
    pub block_number: u64,
    pub leading_zero_bits: u32,
    pub hash: String,
}

// ============================================================================
// STATUS
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct StatusQuery {
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub ok: bool,
    pub block_number: u64,
    pub seed_hex: String,
    pub difficulty_bits: u32,
    pub ms_left: u64,
    pub balance_micro: u64,
    pub pool_a_reward_micro: u64,
    pub pool_b_reward_micro: u64,
}

// ============================================================================
// WITHDRAW
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WithdrawRequest {
    pub address: Option<String>,
    pub amount_micro: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawResponse {
    pub ok: bool,
    pub status: String,
    pub payout_id: String,
    pub net_amount: u64,
    pub fee: u64,
}

// ============================================================================
// PAYOUTS / HEALTH
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutListResponse {
    pub ok: bool,
    pub payouts: Vec<PayoutRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,
    pub block_number: u64,
    pub uptime: u64,
    pub block_processor: BlockProcessorHealth,
    pub config: ConfigSnapshot,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockProcessorHealth {
    pub state: String,
    pub ms_left: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
    pub block_time_ms: u64,
    pub difficulty_bits: u32,
    pub max_shares_per_block: u32,
    pub pool_a_reward_micro: u64,
    pub pool_b_reward_micro: u64,
    pub withdraw_fee_micro: u64,
}
