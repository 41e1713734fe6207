//! Health and config snapshot.

use crate::models::{BlockProcessorHealth, ConfigSnapshot, HealthResponse};
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;

pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let snapshot = state.engine.snapshot().await;
    let processor_state = if state.engine.is_closing() {
        "closing"
    } else {
        "open"
    };

    Json(HealthResponse {
        ok: true,
        block_number: snapshot.block_number,
        uptime: state.started_at.elapsed().as_secs(),
        block_processor: BlockProcessorHealth {
            state: processor_state.to_string(),
            ms_left: snapshot.ms_left,
        },
        config: ConfigSnapshot {
            block_time_ms: state.config.block_time_ms,
            difficulty_bits: state.config.difficulty_bits,
            max_shares_per_block: state.config.max_shares_per_block,
            pool_a_reward_micro: state.config.budgets.pool_a_micro,
            pool_b_reward_micro: state.config.budgets.pool_b_micro,
            withdraw_fee_micro: state.config.withdraw_fee_micro,
        },
    })
}
