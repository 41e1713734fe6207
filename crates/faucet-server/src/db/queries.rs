//! Database queries for the faucet server.

use super::Db;
use crate::models::{BlockRow, PayoutRow, PayoutStatus, ShareRow};
use anyhow::Result;
use rusqlite::{params, OptionalExtension};
use std::collections::BTreeMap;
use uuid::Uuid;

// ============================================================================
// META
// ============================================================================

pub async fn get_meta(db: &Db, key: &str) -> Result<Option<String>> {
    let conn = db.lock().await;
    let value = conn
        .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(value)
}

pub async fn set_meta(db: &Db, key: &str, value: &str) -> Result<()> {
    let conn = db.lock().await;
    conn.execute(
        "INSERT INTO meta (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

// ============================================================================
// BLOCKS
// ============================================================================

/// Plain insert; errors if the block number already exists.
pub async fn insert_block(db: &Db, block_number: u64, seed_hex: &str, ts: i64) -> Result<()> {
    let conn = db.lock().await;
    conn.execute(
        "INSERT INTO blocks (block_number, seed_hex, created_at) VALUES (?1, ?2, ?3)",
        params![block_number as i64, seed_hex, ts],
    )?;
    Ok(())
}

/// Insert-or-ignore variant used at boot, where the row may survive a restart.
pub async fn ensure_block(db: &Db, block_number: u64, seed_hex: &str, ts: i64) -> Result<()> {
    let conn = db.lock().await;
    conn.execute(
        "INSERT OR IGNORE INTO blocks (block_number, seed_hex, created_at) VALUES (?1, ?2, ?3)",
        params![block_number as i64, seed_hex, ts],
    )?;
    Ok(())
}

/// Idempotent: only the first call sets the marker.
pub async fn mark_block_processed(db: &Db, block_number: u64, ts: i64) -> Result<()> {
    let conn = db.lock().await;
    conn.execute(
        "UPDATE blocks SET processed_at = ?1 WHERE block_number = ?2 AND processed_at IS NULL",
        params![ts, block_number as i64],
    )?;
    Ok(())
}

pub async fn get_block(db: &Db, block_number: u64) -> Result<Option<BlockRow>> {
    let conn = db.lock().await;
    let row = conn
        .query_row(
            "SELECT block_number, seed_hex, created_at, processed_at
             FROM blocks WHERE block_number = ?1",
            params![block_number as i64],
            |row| {
                Ok(BlockRow {
                    block_number: row.get::<_, i64>(0)? as u64,
                    seed_hex: row.get(1)?,
                    created_at: row.get(2)?,
                    processed_at: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

// ============================================================================
// SHARES
// ============================================================================

/// Returns `false` on the (block, address, nonce) uniqueness violation; any
/// other failure surfaces as an error.
pub async fn insert_share(
    db: &Db,
    block_number: u64,
    address: &str,
    nonce: &str,
    hash_hex: &str,
    ts: i64,
) -> Result<bool> {
    let conn = db.lock().await;
    match conn.execute(
        "INSERT INTO shares (block_number, address, nonce, hash_hex, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![block_number as i64, address, nonce, hash_hex, ts],
    ) {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn share_count(db: &Db, block_number: u64, address: &str) -> Result<u32> {
    let conn = db.lock().await;
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM shares WHERE block_number = ?1 AND address = ?2",
        params![block_number as i64, address],
        |row| row.get(0),
    )?;
    Ok(count as u32)
}

pub async fn shares_for_block(db: &Db, block_number: u64) -> Result<Vec<ShareRow>> {
    let conn = db.lock().await;
    let mut stmt = conn.prepare(
        "SELECT block_number, address, nonce, hash_hex, created_at
         FROM shares WHERE block_number = ?1 ORDER BY created_at ASC",
    )?;
    let rows = stmt
        .query_map(params![block_number as i64], |row| {
            Ok(ShareRow {
                block_number: row.get::<_, i64>(0)? as u64,
                address: row.get(1)?,
                nonce: row.get(2)?,
                hash_hex: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Share counts grouped by address, as the reward calculator expects.
pub async fn share_counts_for_block(db: &Db, block_number: u64) -> Result<BTreeMap<String, u64>> {
    let conn = db.lock().await;
    let mut stmt = conn.prepare(
        "SELECT address, COUNT(*) FROM shares WHERE block_number = ?1 GROUP BY address",
    )?;
    let rows = stmt
        .query_map(params![block_number as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?
        .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;
    Ok(rows)
}

// ============================================================================
// BALANCES
// ============================================================================

pub async fn get_balance(db: &Db, address: &str) -> Result<u64> {
    let conn = db.lock().await;
    let balance: Option<i64> = conn
        .query_row(
            "SELECT balance_micro FROM balances WHERE address = ?1",
            params![address],
            |row| row.get(0),
        )
        .optional()?;
    Ok(balance.unwrap_or(0) as u64)
}

/// Insert-or-add.
pub async fn credit_balance(db: &Db, address: &str, delta_micro: u64) -> Result<()> {
    let conn = db.lock().await;
    conn.execute(
        "INSERT INTO balances (address, balance_micro) VALUES (?1, ?2)
         ON CONFLICT(address) DO UPDATE SET balance_micro = balance_micro + excluded.balance_micro",
        params![address, delta_micro as i64],
    )?;
    Ok(())
}

/// Guarded debit: `false` when the balance would go negative.
pub async fn debit_balance(db: &Db, address: &str, amount_micro: u64) -> Result<bool> {
    let conn = db.lock().await;
    let changed = conn.execute(
        "UPDATE balances SET balance_micro = balance_micro - ?1
         WHERE address = ?2 AND balance_micro >= ?1",
        params![amount_micro as i64, address],
    )?;
    Ok(changed > 0)
}

// ============================================================================
// FINALIZATION
// ============================================================================

/// Apply a closed block's rewards and its processed marker in a single
/// transaction, so partial reward application never occurs.
pub async fn apply_block_rewards(
    db: &Db,
    block_number: u64,
    rewards: &BTreeMap<String, u64>,
    ts: i64,
) -> Result<()> {
    let mut conn = db.lock().await;
    let tx = conn.transaction()?;
    for (address, delta) in rewards {
        tx.execute(
            "INSERT INTO balances (address, balance_micro) VALUES (?1, ?2)
             ON CONFLICT(address) DO UPDATE SET balance_micro = balance_micro + excluded.balance_micro",
            params![address, *delta as i64],
        )?;
    }
    tx.execute(
        "UPDATE blocks SET processed_at = ?1 WHERE block_number = ?2 AND processed_at IS NULL",
        params![ts, block_number as i64],
    )?;
    tx.commit()?;
    Ok(())
}

// ============================================================================
// PAYOUTS
// ============================================================================

/// Queue a payout without touching balances. Withdrawals go through
/// [`debit_and_create_payout`]; this exists for reconciliation tooling and
/// tests.
pub async fn create_payout(
    db: &Db,
    address: &str,
    amount_micro: u64,
    fee_micro: u64,
    ts: i64,
) -> Result<String> {
    let conn = db.lock().await;
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO payouts (id, address, amount_micro, fee_micro, status, attempts, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 'pending', 0, ?5, ?5)",
        params![id, address, amount_micro as i64, fee_micro as i64, ts],
    )?;
    Ok(id)
}

/// Debit the gross amount and queue the net payout atomically. `None` means
/// insufficient balance; nothing is written.
pub async fn debit_and_create_payout(
    db: &Db,
    address: &str,
    gross_micro: u64,
    fee_micro: u64,
    ts: i64,
) -> Result<Option<String>> {
    let mut conn = db.lock().await;
    let tx = conn.transaction()?;
    let changed = tx.execute(
        "UPDATE balances SET balance_micro = balance_micro - ?1
         WHERE address = ?2 AND balance_micro >= ?1",
        params![gross_micro as i64, address],
    )?;
    if changed == 0 {
        return Ok(None);
    }
    let id = Uuid::new_v4().to_string();
    let net_micro = gross_micro - fee_micro;
    tx.execute(
        "INSERT INTO payouts (id, address, amount_micro, fee_micro, status, attempts, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 'pending', 0, ?5, ?5)",
        params![id, address, net_micro as i64, fee_micro as i64, ts],
    )?;
    tx.commit()?;
    Ok(Some(id))
}

pub async fn list_pending_payouts(db: &Db) -> Result<Vec<PayoutRow>> {
    let conn = db.lock().await;
    let mut stmt = conn.prepare(
        "SELECT id, address, amount_micro, fee_micro, status, tx_hash, attempts, created_at, updated_at
         FROM payouts WHERE status = 'pending' ORDER BY created_at ASC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(PayoutRow {
                id: row.get(0)?,
                address: row.get(1)?,
                amount_micro: row.get::<_, i64>(2)? as u64,
                fee_micro: row.get::<_, i64>(3)? as u64,
                status: PayoutStatus::from(row.get::<_, String>(4)?.as_str()),
                tx_hash: row.get(5)?,
                attempts: row.get::<_, i64>(6)? as u32,
                created_at: row.get(7)?,
                updated_at: row.get(8)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Move a payout out of `pending`. Returns `false` when the payout was not
/// pending (terminal states never transition again).
pub async fn set_payout_status(
    db: &Db,
    id: &str,
    status: PayoutStatus,
    tx_hash: Option<&str>,
    ts: i64,
) -> Result<bool> {
    let conn = db.lock().await;
    let changed = conn.execute(
        "UPDATE payouts SET status = ?1, tx_hash = ?2, updated_at = ?3
         WHERE id = ?4 AND status = 'pending'",
        params![status.as_str(), tx_hash, ts, id],
    )?;
    Ok(changed > 0)
}

pub async fn bump_payout_attempts(db: &Db, id: &str, ts: i64) -> Result<()> {
    let conn = db.lock().await;
    conn.execute(
        "UPDATE payouts SET attempts = attempts + 1, updated_at = ?1 WHERE id = ?2",
        params![ts, id],
    )?;
    Ok(())
}
