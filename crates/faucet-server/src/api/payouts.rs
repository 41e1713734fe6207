//! Admin view of the pending payout queue.

use crate::db::queries;
use crate::error::ApiError;
use crate::models::PayoutListResponse;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;

pub async fn list_payouts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PayoutListResponse>, ApiError> {
    let payouts = queries::list_pending_payouts(&state.db)
        .await
        .map_err(ApiError::transient)?;
    Ok(Json(PayoutListResponse { ok: true, payouts }))
}
