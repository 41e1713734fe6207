//! Miner status: block snapshot plus the caller's balance.

use crate::db::queries;
use crate::error::ApiError;
use crate::models::{StatusQuery, StatusResponse};
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use faucet_core::normalize_address;
use std::sync::Arc;

pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
    let address = query
        .address
        .ok_or_else(|| ApiError::validation("Missing required fields"))?;
    let address = normalize_address(&address)
        .ok_or_else(|| ApiError::validation("Invalid Ethereum address format"))?;

    let snapshot = state.engine.snapshot().await;
    let balance_micro = queries::get_balance(&state.db, &address)
        .await
        .map_err(ApiError::transient)?;

    Ok(Json(StatusResponse {
        ok: true,
        block_number: snapshot.block_number,
        seed_hex: snapshot.seed_hex,
        difficulty_bits: state.config.difficulty_bits,
        ms_left: snapshot.ms_left,
        balance_micro,
        pool_a_reward_micro: state.config.budgets.pool_a_micro,
        pool_b_reward_micro: state.config.budgets.pool_b_micro,
    }))
}
