//! HTTP status endpoint — exposes the current netmap as JSON.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tower_http::cors::{Any, CorsLayer};

use meshmap_core::NetworkMap;
use meshmap_session::MapSession;

#[derive(Clone)]
pub struct StatusState {
    pub session: Arc<MapSession>,
    pub netmap: watch::Receiver<Option<Arc<NetworkMap>>>,
}

// ── /status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub self_name: Option<String>,
    pub domain: String,
    pub peers: usize,
    pub online: usize,
    pub applied: u64,
    pub last_update: StatsInfo,
}

#[derive(Debug, Serialize)]
pub struct StatsInfo {
    pub all_new: bool,
    pub added: usize,
    pub changed: usize,
    pub removed: usize,
}

async fn handle_status(State(state): State<StatusState>) -> Json<StatusResponse> {
    let nm = state.session.netmap();
    let stats = state.session.last_stats();
    Json(StatusResponse {
        self_name: nm.self_name().map(str::to_string),
        domain: nm.domain.clone(),
        peers: nm.peers.len(),
        online: nm.online_peer_count(),
        applied: state.session.applied_count(),
        last_update: StatsInfo {
            all_new: stats.all_new,
            added: stats.added,
            changed: stats.changed,
            removed: stats.removed,
        },
    })
}

// ── /netmap ──────────────────────────────────────────────────────────────────

/// The last published netmap, or `null` before the first response.
async fn handle_netmap(State(state): State<StatusState>) -> Json<Option<Arc<NetworkMap>>> {
    Json(state.netmap.borrow().clone())
}

pub fn router(state: StatusState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/status", get(handle_status))
        .route("/netmap", get(handle_netmap))
        .with_state(state)
        .layer(cors)
}

pub async fn serve(
    state: StatusState,
    addr: &str,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "status endpoint listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;
    Ok(())
}
