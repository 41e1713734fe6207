//! Database schema and migrations.

use anyhow::Result;
use rusqlite::Connection;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Faucet server schema (SQLite, WAL)

-- Engine state surviving restarts (currentBlockNumber, currentSeedHex)
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- One row per block epoch; processed_at set once at finalization
CREATE TABLE IF NOT EXISTS blocks (
    block_number INTEGER PRIMARY KEY,
    seed_hex TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    processed_at INTEGER
);

-- Accepted shares; append-only
CREATE TABLE IF NOT EXISTS shares (
    block_number INTEGER NOT NULL,
    address TEXT NOT NULL,
    nonce TEXT NOT NULL,
    hash_hex TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    UNIQUE(block_number, address, nonce)
);

CREATE INDEX IF NOT EXISTS idx_shares_block ON shares(block_number);
CREATE INDEX IF NOT EXISTS idx_shares_address ON shares(address);

-- Earned balances in micro-tokens
CREATE TABLE IF NOT EXISTS balances (
    address TEXT PRIMARY KEY,
    balance_micro INTEGER NOT NULL DEFAULT 0 CHECK (balance_micro >= 0)
);

-- Withdrawal queue; amount_micro is the net amount to send
CREATE TABLE IF NOT EXISTS payouts (
    id TEXT PRIMARY KEY,
    address TEXT NOT NULL,
    amount_micro INTEGER NOT NULL CHECK (amount_micro > 0),
    fee_micro INTEGER NOT NULL CHECK (fee_micro >= 0),
    status TEXT NOT NULL DEFAULT 'pending',
    tx_hash TEXT,
    attempts INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_payouts_status ON payouts(status);
"#;
