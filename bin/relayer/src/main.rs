//! Binary entrypoint: loads `RelayConfig` from the environment, wires every
//! crate in the workspace into one `RelayCore`, spawns the background ticks
//! (spec §5), and serves the `axum` router behind a graceful-shutdown
//! `CancellationToken` — the same signal-driven shutdown shape the teacher's
//! long-running node binaries use.

use std::sync::Arc;

use chain_adapter::{AdapterConfig, RpcChainAdapter};
use fee_payer_pool::{Keyring, Pool, PoolConfig};
use oracle_gateway::{HttpOracleGateway, OracleConfig};
use quote_store::{FileQuoteStore, InMemoryQuoteStore, QuoteStore};
use rate_anomaly::RateAnomalyLayer;
use relay_core::RelayCore;
use relay_types::RelayConfig;
use replay_set::{InFlightSet, ReplaySet};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    relay_metrics::describe_all();

    let config = RelayConfig::from_env()?;
    info!(network = ?config.network, rpc_endpoints = config.rpc_urls.len(), "starting relayer");

    let core = build_core(config).await?;

    let shutdown = CancellationToken::new();
    core.spawn_background_tasks(shutdown.clone());

    let app = relay_http::build_router(core);

    let port: u16 = std::env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(8080);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(%port, "listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>())
        .with_graceful_shutdown(wait_for_shutdown_signal(shutdown))
        .await?;

    info!("relayer shut down cleanly");
    Ok(())
}

/// Wires every collaborator `RelayCore` needs: the signing keyring and
/// fee-payer pool (C1), the quote store (C2, in-memory unless `STORE_URL` is
/// set), the replay and in-flight sets (C3), the RPC-backed chain adapter
/// (C5), the HTTP oracle gateway (C6), and the rate/anomaly layer (C9). The
/// audit log (C10) flushes to `tracing` until an external sink is wired in.
async fn build_core(config: RelayConfig) -> eyre::Result<RelayCore> {
    let config = Arc::new(config);

    let keyring = Keyring::from_base58_keys(&config.fee_payer_private_keys)
        .map_err(|e| eyre::eyre!("failed to load fee payer keys: {e}"))?;
    let pool_config = PoolConfig {
        min_healthy_balance_lamports: config.min_healthy_balance_lamports,
        max_reservations_per_payer: config.max_reservations_per_payer,
        reservation_ttl: config.reservation_ttl,
        ..PoolConfig::default()
    };
    let pool = Arc::new(Pool::new(keyring, pool_config));

    let quote_store: Arc<dyn QuoteStore> = match &config.store_url {
        Some(path) => Arc::new(
            FileQuoteStore::open(path.clone())
                .await
                .map_err(|e| eyre::eyre!("failed to open quote store at {path}: {e}"))?,
        ),
        None => Arc::new(InMemoryQuoteStore::new()),
    };

    let replay_set = Arc::new(ReplaySet::new(RelayConfig::REPLAY_TTL));
    let in_flight = Arc::new(InFlightSet::new(RelayConfig::INFLIGHT_TTL));

    let chain = Arc::new(RpcChainAdapter::new(config.rpc_urls.clone(), AdapterConfig::default()));
    let oracle = Arc::new(HttpOracleGateway::new(config.oracle_url.clone(), OracleConfig::default()));

    let rate_anomaly = Arc::new(RateAnomalyLayer::new(config.rate_limits, config.anomaly));

    let audit = audit_log::AuditLog::new(Arc::new(audit_log::TracingAuditSink));

    Ok(RelayCore::new(
        config.clone(),
        pool,
        quote_store,
        replay_set,
        in_flight,
        chain,
        oracle,
        rate_anomaly,
        audit,
        config.treasury_address,
    ))
}

/// Resolves on SIGTERM or Ctrl-C, cancelling `shutdown` so every background
/// tick and the in-flight request drain see it before `axum::serve` returns.
async fn wait_for_shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received, draining in-flight requests");
    shutdown.cancel();
}
