//! Replays a JSON-lines stream of map responses through a session.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use meshmap_core::MapResponse;
use meshmap_session::MapSession;

/// Outcome of a replay.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub skipped: usize,
}

/// Applies one response per non-empty line. Lines that fail to parse or are
/// rejected by the session are logged and skipped.
pub async fn replay<R>(session: &MapSession, reader: R) -> Result<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = ReplaySummary::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await.context("failed to read input")? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let res = match MapResponse::from_json(line.as_bytes()) {
            Ok(res) => res,
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "skipping unparseable map response");
                summary.skipped += 1;
                continue;
            }
        };

        match session.handle_map_response(res) {
            Ok(nm) => {
                summary.applied += 1;
                tracing::info!(
                    line = line_no,
                    peers = nm.peers.len(),
                    online = nm.online_peer_count(),
                    "applied map response"
                );
            }
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "skipping rejected map response");
                summary.skipped += 1;
            }
        }
    }

    Ok(summary)
}
