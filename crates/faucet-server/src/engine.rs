//! Block engine: the tick-driven epoch state machine.
//!
//! The engine owns the current block number, seed, and epoch start time.
//! Submissions take the epoch lock in read mode for the window between
//! snapshotting the block and completing the share insert; the tick takes it
//! in write mode to advance, so a share always lands in the exact block it
//! was verified against. Finalization of the closed block happens after the
//! advance, outside the write lock, so handlers never wait on the reward
//! transaction.

use crate::db::{queries, Db};
use anyhow::Result;
use chrono::Utc;
use faucet_core::rewards::{calculate_rewards, RewardBudgets};
use faucet_core::pow::generate_seed_hex;
use rand::rngs::OsRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

const META_BLOCK_NUMBER: &str = "currentBlockNumber";
const META_SEED_HEX: &str = "currentSeedHex";

/// The mutable epoch fields, behind the engine's read/write lock.
pub struct EpochState {
    pub block_number: u64,
    pub seed_hex: String,
    pub started_at: Instant,
}

/// Read-only view handed to handlers that only need a consistent snapshot.
#[derive(Debug, Clone)]
pub struct BlockSnapshot {
    pub block_number: u64,
    pub seed_hex: String,
    pub ms_left: u64,
}

pub struct BlockEngine {
    db: Db,
    block_time: Duration,
    budgets: RewardBudgets,
    epoch: RwLock<EpochState>,
    closing: Mutex<()>,
}

impl BlockEngine {
    /// Load the persisted epoch (or initialize block 1 with a fresh seed) and
    /// start the clock.
    pub async fn boot(db: Db, block_time_ms: u64, budgets: RewardBudgets) -> Result<Arc<Self>> {
        let stored_number = queries::get_meta(&db, META_BLOCK_NUMBER)
            .await?
            .and_then(|v| v.parse::<u64>().ok());
        let stored_seed = queries::get_meta(&db, META_SEED_HEX).await?;

        let (block_number, seed_hex) = match (stored_number, stored_seed) {
            (Some(number), Some(seed)) => {
                info!(block = number, "resuming block epoch from storage");
                (number, seed)
            }
            _ => {
                let seed = generate_seed_hex();
                queries::set_meta(&db, META_BLOCK_NUMBER, "1").await?;
                queries::set_meta(&db, META_SEED_HEX, &seed).await?;
                info!("initialized block epoch at 1");
                (1, seed)
            }
        };
        queries::ensure_block(&db, block_number, &seed_hex, Utc::now().timestamp_millis()).await?;

        Ok(Arc::new(Self {
            db,
            block_time: Duration::from_millis(block_time_ms),
            budgets,
            epoch: RwLock::new(EpochState {
                block_number,
                seed_hex,
                started_at: Instant::now(),
            }),
            closing: Mutex::new(()),
        }))
    }

    /// The epoch lock. Submission handlers hold the read side from block
    /// snapshot through share insert.
    pub fn epoch(&self) -> &RwLock<EpochState> {
        &self.epoch
    }

    pub fn block_time_ms(&self) -> u64 {
        self.block_time.as_millis() as u64
    }

    /// True while a closure is in progress.
    pub fn is_closing(&self) -> bool {
        self.closing.try_lock().is_err()
    }

    pub async fn snapshot(&self) -> BlockSnapshot {
        let epoch = self.epoch.read().await;
        BlockSnapshot {
            block_number: epoch.block_number,
            seed_hex: epoch.seed_hex.clone(),
            ms_left: self.ms_left_of(&epoch),
        }
    }

    fn ms_left_of(&self, epoch: &EpochState) -> u64 {
        self.block_time
            .saturating_sub(epoch.started_at.elapsed())
            .as_millis() as u64
    }

    /// Tick loop. The next deadline is always recomputed from the epoch's
    /// start, which the tick resets to "now", so skew never accumulates.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        info!(block_time_ms = self.block_time_ms(), "block engine started");
        loop {
            let deadline = {
                let epoch = self.epoch.read().await;
                epoch.started_at + self.block_time
            };
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    self.tick().await;
                }
                _ = shutdown.recv() => {
                    info!("block engine stopped");
                    break;
                }
            }
        }
    }

    /// Close the current block and open the next epoch.
    pub async fn tick(&self) {
        let Ok(_closing) = self.closing.try_lock() else {
            warn!("previous block closure still running; dropping tick");
            return;
        };

        let closed_block = self.advance().await;
        if let Err(e) = self.finalize(closed_block).await {
            // not retried; the operator reconciles failed blocks
            error!(block = closed_block, "block finalization failed: {e:#}");
        }
    }

    /// Advance to the next epoch under the write lock and return the block
    /// being closed. Persistence errors are logged but never stall the epoch
    /// clock; the in-memory state is authoritative until the next successful
    /// write.
    async fn advance(&self) -> u64 {
        let mut epoch = self.epoch.write().await;
        let closed = epoch.block_number;
        let next = closed + 1;
        let seed = generate_seed_hex();

        if let Err(e) = self.persist_epoch(next, &seed).await {
            error!(block = next, "failed to persist epoch advance: {e:#}");
        }

        epoch.block_number = next;
        epoch.seed_hex = seed;
        epoch.started_at = Instant::now();
        debug!(block = next, "opened new block epoch");
        closed
    }

    async fn persist_epoch(&self, next: u64, seed: &str) -> Result<()> {
        queries::set_meta(&self.db, META_BLOCK_NUMBER, &next.to_string()).await?;
        queries::set_meta(&self.db, META_SEED_HEX, seed).await?;
        queries::insert_block(&self.db, next, seed, Utc::now().timestamp_millis()).await?;
        Ok(())
    }

    /// Group the closed block's shares, run the three-pool calculation, and
    /// commit credits plus the processed marker in one transaction.
    async fn finalize(&self, block_number: u64) -> Result<()> {
        let counts = queries::share_counts_for_block(&self.db, block_number).await?;
        let now = Utc::now().timestamp_millis();

        if counts.is_empty() {
            queries::mark_block_processed(&self.db, block_number, now).await?;
            debug!(block = block_number, "closed empty block");
            return Ok(());
        }

        let rewards = calculate_rewards(&counts, &self.budgets, &mut OsRng);
        let distributed: u64 = rewards.values().sum();
        queries::apply_block_rewards(&self.db, block_number, &rewards, now).await?;
        info!(
            block = block_number,
            miners = counts.len(),
            distributed_micro = distributed,
            "block finalized"
        );
        Ok(())
    }
}
