//! Withdrawal requests: debit the balance and queue a payout atomically.

use super::ApiJson;
use crate::db::queries;
use crate::error::ApiError;
use crate::models::{WithdrawRequest, WithdrawResponse};
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use faucet_core::normalize_address;
use std::sync::Arc;
use tracing::info;

pub async fn withdraw_request(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<WithdrawRequest>,
) -> Result<Json<WithdrawResponse>, ApiError> {
    let (Some(address), Some(amount_micro)) = (req.address, req.amount_micro) else {
        return Err(ApiError::validation("Missing required fields"));
    };
    let address = normalize_address(&address)
        .ok_or_else(|| ApiError::validation("Invalid Ethereum address format"))?;
    if amount_micro == 0 {
        return Err(ApiError::validation("Invalid withdrawal amount"));
    }

    let fee = state.config.withdraw_fee_micro;
    if amount_micro <= fee {
        return Err(ApiError::policy("Withdrawal amount must exceed the fee"));
    }

    // The dispatcher picks the payout up asynchronously; only the debit and
    // queue insert happen on the request path.
    let payout_id = queries::debit_and_create_payout(
        &state.db,
        &address,
        amount_micro,
        fee,
        Utc::now().timestamp_millis(),
    )
    .await
    .map_err(ApiError::transient)?
    .ok_or_else(|| ApiError::policy("Insufficient balance"))?;

    let net_amount = amount_micro - fee;
    info!(%address, amount_micro, net_amount, payout = %payout_id, "withdrawal queued");
    Ok(Json(WithdrawResponse {
        ok: true,
        status: "queued".to_string(),
        payout_id,
        net_amount,
        fee,
    }))
}
