//! Faucet server binary.
//!
//! Wires together the storage layer, the block engine tick loop, the payout
//! dispatcher, and the HTTP API, then serves until Ctrl+C.

use clap::Parser;
use faucet_server::api;
use faucet_server::config::{Args, FaucetConfig};
use faucet_server::dispatcher::{DevSender, PayoutDispatcher, PayoutSender, WebhookSender};
use faucet_server::engine::BlockEngine;
use faucet_server::rate_limit::FixedWindowLimiter;
use faucet_server::state::AppState;
use faucet_server::Db;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("faucet_server=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    let config = FaucetConfig::from_args(&args);

    info!("Faucet server starting");
    info!(
        "  Block time: {} ms, difficulty: {} bits, max shares/block: {}",
        config.block_time_ms, config.difficulty_bits, config.max_shares_per_block
    );
    info!(
        "  Pools (micro): A={} B={} C={}, withdraw fee: {}",
        config.budgets.pool_a_micro,
        config.budgets.pool_b_micro,
        config.budgets.pool_c_micro,
        config.withdraw_fee_micro
    );

    let db = Db::open(&args.database_path)?;
    let engine = BlockEngine::boot(db.clone(), config.block_time_ms, config.budgets).await?;

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    tokio::spawn(engine.clone().run(shutdown_tx.subscribe()));

    let sender: Arc<dyn PayoutSender> = match &args.payout_webhook_url {
        Some(url) => {
            info!("  Payout sender: webhook {url}");
            Arc::new(WebhookSender::new(url.clone()))
        }
        None => {
            warn!("  Payout sender: dev mode (PAYOUT_WEBHOOK_URL not set)");
            Arc::new(DevSender)
        }
    };
    let dispatcher = PayoutDispatcher::new(
        db.clone(),
        sender,
        Duration::from_millis(args.payout_poll_ms),
        args.payout_max_attempts,
    );
    tokio::spawn(dispatcher.run(shutdown_tx.subscribe()));

    let state = Arc::new(
        AppState::new(db, engine, config).with_limiters(
            FixedWindowLimiter::new(
                args.rate_limit_max,
                Duration::from_millis(args.rate_limit_window_ms),
            ),
            FixedWindowLimiter::new(
                args.submit_limit_max,
                Duration::from_millis(args.submit_limit_window_ms),
            ),
        ),
    );

    // periodic sweep of expired rate-limit windows
    {
        let state = state.clone();
        let mut shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(60));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        state.general_limiter.sweep();
                        state.submit_limiter.sweep();
                    }
                    _ = shutdown.recv() => break,
                }
            }
        });
    }

    let app = api::router(state);
    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("  Listening on: {addr}");

    let tx = shutdown_tx.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received; draining in-flight requests");
        let _ = tx.send(());
    })
    .await?;

    info!("stopped");
    Ok(())
}
