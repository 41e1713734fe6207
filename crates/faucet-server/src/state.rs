//! Application state shared across handlers.

use crate::config::FaucetConfig;
use crate::db::Db;
use crate::engine::BlockEngine;
use crate::rate_limit::FixedWindowLimiter;
use std::sync::Arc;
use std::time::Instant;

pub struct AppState {
    pub db: Db,
    pub engine: Arc<BlockEngine>,
    pub config: FaucetConfig,
    pub general_limiter: FixedWindowLimiter,
    pub submit_limiter: FixedWindowLimiter,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db: Db, engine: Arc<BlockEngine>, config: FaucetConfig) -> Self {
        use std::time::Duration;
        Self {
            db,
            engine,
            config,
            general_limiter: FixedWindowLimiter::new(300, Duration::from_secs(60)),
            submit_limiter: FixedWindowLimiter::new(120, Duration::from_secs(10)),
            started_at: Instant::now(),
        }
    }

    pub fn with_limiters(
        mut self,
        general: FixedWindowLimiter,
        submit: FixedWindowLimiter,
    ) -> Self {
        self.general_limiter = general;
        self.submit_limiter = submit;
        self
    }
}
