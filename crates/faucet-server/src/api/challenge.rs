//! Challenge handler: the mining parameters for the current block.

use crate::models::ChallengeResponse;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use std::sync::Arc;

pub async fn get_challenge(State(state): State<Arc<AppState>>) -> Json<ChallengeResponse> {
    let snapshot = state.engine.snapshot().await;
    Json(ChallengeResponse {
        ok: true,
        block_number: snapshot.block_number,
        seed_hex: snapshot.seed_hex,
        difficulty_bits: state.config.difficulty_bits,
        block_time_ms: state.config.block_time_ms,
        server_time_ms: Utc::now().timestamp_millis(),
        ms_left: snapshot.ms_left,
    })
}
