//! The optional administrative HTTP endpoint: read-only stats, bound to
//! `config.stats_addr` when set. No authentication of its own — operators
//! are expected to bind it to loopback or a private interface.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{info, warn};

use crate::server::Server;

#[cfg_attr(test, derive(serde::Deserialize))]
#[derive(Debug, Serialize)]
struct Stats {
    name: String,
    session_count: usize,
    pending_transfers: usize,
    flat_news_len: usize,
}

async fn stats(State(server): State<Arc<Server>>) -> Json<Stats> {
    Json(Stats {
        name: server.config.name.clone(),
        session_count: server.registry.session_count().await,
        pending_transfers: server.transfers.len(),
        flat_news_len: server.flat_news_contents().await.len(),
    })
}

/// Build the router for the admin HTTP endpoint.
fn router(server: Arc<Server>) -> Router {
    Router::new()
        .route("/stats", get(stats))
        .with_state(server)
}

/// Serve the admin HTTP endpoint on `config.stats_addr` until the process
/// exits. Does nothing if `stats_addr` is unset; logs and returns if the
/// address cannot be bound (the main server keeps running regardless).
pub async fn run(server: Arc<Server>) {
    let Some(addr) = server.config.stats_addr.clone() else {
        return;
    };

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            warn!(%addr, error = %e, "failed to bind admin HTTP endpoint; stats disabled");
            return;
        }
    };
    info!(%addr, "admin HTTP endpoint listening");

    if let Err(e) = axum::serve(listener, router(server)).await {
        warn!(error = %e, "admin HTTP endpoint stopped unexpectedly");
    }
}
