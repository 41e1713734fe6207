//! Proof submission: verify PoW against the live block and append to the
//! share ledger.

use super::ApiJson;
use crate::db::queries;
use crate::error::ApiError;
use crate::models::{SubmitProofRequest, SubmitProofResponse};
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use faucet_core::{leading_zero_bits, normalize_address, pow_hash};
use std::sync::Arc;
use tracing::{debug, info};

pub async fn submit_proof(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SubmitProofRequest>,
) -> Result<Json<SubmitProofResponse>, ApiError> {
    let (Some(address), Some(nonce)) = (req.address, req.nonce) else {
        return Err(ApiError::validation("Missing required fields"));
    };
    let address = normalize_address(&address)
        .ok_or_else(|| ApiError::validation("Invalid Ethereum address format"))?;
    if nonce.is_empty() || nonce.len() > state.config.max_nonce_len {
        return Err(ApiError::validation("Invalid nonce format"));
    }

    // Hold the epoch read lock from the block snapshot through the insert:
    // the block the proof is verified against is the block the share is
    // recorded in, or the closure's write lock has already moved us past it.
    let epoch = state.engine.epoch().read().await;
    let block_number = epoch.block_number;
    let seed_hex = epoch.seed_hex.clone();

    let count = queries::share_count(&state.db, block_number, &address)
        .await
        .map_err(ApiError::transient)?;
    if count >= state.config.max_shares_per_block {
        debug!(%address, block = block_number, "share quota exhausted");
        return Err(ApiError::Quota);
    }

    let hash = pow_hash(&address, block_number, &seed_hex, &nonce);
    let bits = leading_zero_bits(&hash);
    if bits < state.config.difficulty_bits {
        return Err(ApiError::policy("Insufficient proof-of-work"));
    }

    let inserted = queries::insert_share(
        &state.db,
        block_number,
        &address,
        &nonce,
        &hash,
        Utc::now().timestamp_millis(),
    )
    .await
    .map_err(ApiError::transient)?;
    drop(epoch);

    if !inserted {
        return Err(ApiError::conflict("Duplicate share"));
    }

    info!(%address, block = block_number, bits, "share accepted");
    Ok(Json(SubmitProofResponse {
        ok: true,
        accepted: true,
        block_number,
        leading_zero_bits: bits,
        hash,
    }))
}
