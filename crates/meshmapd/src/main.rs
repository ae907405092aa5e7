//! meshmapd — replays map responses through a session and serves the result.
//!
//! Usage: `meshmapd [responses.jsonl]`. Reads stdin when no file is given.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, BufReader};
use tracing_subscriber::EnvFilter;

use meshmap_core::config::MeshmapConfig;
use meshmap_core::NodeKey;
use meshmap_session::{MapSession, SystemClock, WatchUpdater};

mod replay;
mod status;

#[tokio::main]
async fn main() -> Result<()> {
    let written = MeshmapConfig::write_default_if_missing();
    let loaded = MeshmapConfig::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.daemon.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = written {
        tracing::warn!(error = %e, "failed to write default config");
    }
    if let Err(e) = loaded {
        tracing::warn!(error = %e, "failed to load config, using defaults");
    }

    let input = std::env::args().nth(1);
    tracing::info!(
        input = input.as_deref().unwrap_or("-"),
        patchify = config.session.patchify,
        "meshmapd starting"
    );

    let updater = Arc::new(WatchUpdater::new());
    let session = Arc::new(MapSession::new(
        NodeKey::default(),
        Arc::new(SystemClock),
        updater.clone(),
        config.session.clone(),
    ));

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    let status_task = if config.daemon.status_addr.is_empty() {
        None
    } else {
        let state = status::StatusState {
            session: session.clone(),
            netmap: updater.subscribe(),
        };
        let addr = config.daemon.status_addr.clone();
        let shutdown = shutdown_tx.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) = status::serve(state, &addr, shutdown).await {
                tracing::error!(error = %e, "status endpoint failed");
            }
        }))
    };

    let reader: Box<dyn AsyncRead + Unpin + Send> = match &input {
        Some(path) if path != "-" => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {path}"))?,
        ),
        _ => Box::new(tokio::io::stdin()),
    };

    tokio::select! {
        res = replay::replay(&session, BufReader::new(reader)) => {
            let summary = res?;
            tracing::info!(
                applied = summary.applied,
                skipped = summary.skipped,
                summary = %session.netmap().concise_summary(),
                "replay finished"
            );
            if status_task.is_some() {
                tokio::signal::ctrl_c().await.ok();
            }
        }
        _ = tokio::signal::ctrl_c() => {}
    }

    tracing::info!("shutting down");
    let _ = shutdown_tx.send(());
    if let Some(task) = status_task {
        let _ = task.await;
    }
    Ok(())
}
