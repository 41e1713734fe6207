//! Payout dispatcher: drains the pending payout queue through an abstract
//! sender.
//!
//! The sender is the only integration point with the on-chain world. Send
//! failures retry with capped exponential backoff; once the attempts are
//! exhausted the payout is marked failed and left for manual reconciliation
//! (balances are never refunded automatically).

use crate::db::{queries, Db};
use crate::models::{PayoutRow, PayoutStatus};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// External payout capability: transfer `amount_micro` to `address` and
/// return the transaction hash.
#[async_trait]
pub trait PayoutSender: Send + Sync {
    async fn send(&self, address: &str, amount_micro: u64) -> Result<String>;
}

/// Posts `{address, amountMicro}` to a configured webhook and expects
/// `{txHash}` back.
pub struct WebhookSender {
    client: reqwest::Client,
    url: String,
}

impl WebhookSender {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            url,
        }
    }
}

#[async_trait]
impl PayoutSender for WebhookSender {
    async fn send(&self, address: &str, amount_micro: u64) -> Result<String> {
        #[derive(serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct SendReceipt {
            tx_hash: String,
        }

        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "address": address, "amountMicro": amount_micro }))
            .send()
            .await?
            .error_for_status()?;
        let receipt: SendReceipt = response.json().await?;
        Ok(receipt.tx_hash)
    }
}

/// Stand-in for environments without a payout backend: logs the transfer and
/// fabricates a hash so the queue still drains.
pub struct DevSender;

#[async_trait]
impl PayoutSender for DevSender {
    async fn send(&self, address: &str, amount_micro: u64) -> Result<String> {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        let tx_hash = format!("0x{}", hex::encode(bytes));
        info!(%address, amount_micro, %tx_hash, "dev sender: no on-chain transfer performed");
        Ok(tx_hash)
    }
}

pub struct PayoutDispatcher {
    db: Db,
    sender: Arc<dyn PayoutSender>,
    poll_interval: Duration,
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl PayoutDispatcher {
    pub fn new(
        db: Db,
        sender: Arc<dyn PayoutSender>,
        poll_interval: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            db,
            sender,
            poll_interval,
            max_attempts: max_attempts.max(1),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            poll_ms = self.poll_interval.as_millis() as u64,
            "payout dispatcher started"
        );
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.drain_pending().await {
                        warn!("payout poll failed: {e:#}");
                    }
                }
                _ = shutdown.recv() => {
                    info!("payout dispatcher stopped");
                    break;
                }
            }
        }
    }

    /// One poll cycle: process every currently-pending payout in order.
    pub async fn drain_pending(&self) -> Result<()> {
        for payout in queries::list_pending_payouts(&self.db).await? {
            self.process(&payout).await?;
        }
        Ok(())
    }

    async fn process(&self, payout: &PayoutRow) -> Result<()> {
        let mut backoff = self.initial_backoff;
        for attempt in 1..=self.max_attempts {
            queries::bump_payout_attempts(&self.db, &payout.id, Utc::now().timestamp_millis())
                .await?;
            match self.sender.send(&payout.address, payout.amount_micro).await {
                Ok(tx_hash) => {
                    queries::set_payout_status(
                        &self.db,
                        &payout.id,
                        PayoutStatus::Sent,
                        Some(&tx_hash),
                        Utc::now().timestamp_millis(),
                    )
                    .await?;
                    info!(payout = %payout.id, %tx_hash, "payout sent");
                    return Ok(());
                }
                Err(e) => {
                    warn!(payout = %payout.id, attempt, "payout send failed: {e:#}");
                    if attempt < self.max_attempts {
                        tokio::time::sleep(backoff).await;
                        backoff = (backoff * 2).min(self.max_backoff);
                    }
                }
            }
        }

        queries::set_payout_status(
            &self.db,
            &payout.id,
            PayoutStatus::Failed,
            None,
            Utc::now().timestamp_millis(),
        )
        .await?;
        error!(
            payout = %payout.id,
            attempts = self.max_attempts,
            "payout marked failed; manual reconciliation required"
        );
        Ok(())
    }
}
