//! HTTP Server - Probes, Metrics and Command Routes
//!
//! Exposes via axum 0.7:
//! - `/live`: Liveness probe: 200 while the process runs
//! - `/ready`: Readiness probe: 503 during graceful shutdown
//! - `/metrics`: Prometheus text exposition
//! - `/history/:name`: Compressed balance history of a player
//! - `/leaderboard?n=N`: Top balances
//!
//! Command routes always answer 200 with the textual status message.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use serde::Deserialize;
use tokio::sync::{broadcast, watch};
use tracing::{info, instrument};

use crate::adapters::metrics::MetricsRegistry;
use crate::ports::ledger::Ledger;
use crate::ports::name_resolver::NameResolver;
use crate::usecases::commands::BalanceCommands;

/// State shared by all routes.
pub struct ServerState<L: Ledger, N: NameResolver> {
    /// Command handlers.
    pub commands: Arc<BalanceCommands<L, N>>,
    /// Metrics registry.
    pub metrics: Arc<MetricsRegistry>,
    /// Readiness flag; flipped to false on shutdown.
    pub ready: watch::Receiver<bool>,
}

/// Query string of `/leaderboard`.
#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    /// Requested size, validated by the command.
    pub n: Option<String>,
}

/// Build the router for the given state.
pub fn router<L: Ledger, N: NameResolver>(state: Arc<ServerState<L, N>>) -> Router {
    Router::new()
        .route("/live", get(liveness))
        .route("/ready", get(readiness::<L, N>))
        .route("/metrics", get(metrics::<L, N>))
        .route("/history/:name", get(history::<L, N>))
        .route("/leaderboard", get(leaderboard::<L, N>))
        .with_state(state)
}

/// Serve until the shutdown signal fires.
#[instrument(skip(state, shutdown_rx))]
pub async fn serve<L: Ledger, N: NameResolver>(
    bind_address: String,
    state: Arc<ServerState<L, N>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "HTTP server started");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await?;

    Ok(())
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness probe: 503 once shutdown has begun.
async fn readiness<L: Ledger, N: NameResolver>(
    State(state): State<Arc<ServerState<L, N>>>,
) -> impl IntoResponse {
    if *state.ready.borrow() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics<L: Ledger, N: NameResolver>(
    State(state): State<Arc<ServerState<L, N>>>,
) -> impl IntoResponse {
    state.metrics.render()
}

async fn history<L: Ledger, N: NameResolver>(
    State(state): State<Arc<ServerState<L, N>>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    state.commands.history(&[name.as_str()]).await
}

async fn leaderboard<L: Ledger, N: NameResolver>(
    State(state): State<Arc<ServerState<L, N>>>,
    Query(params): Query<LeaderboardParams>,
) -> impl IntoResponse {
    match params.n.as_deref() {
        Some(n) => state.commands.leaderboard(&[n]).await,
        None => state.commands.leaderboard(&[]).await,
    }
}
