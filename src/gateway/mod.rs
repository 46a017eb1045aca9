//! The WebSocket transport layer: accept loop, per-connection lifecycle,
//! the live-session map, and graceful shutdown.

pub mod connection;
pub mod manager;
pub mod shutdown;
pub mod transport;

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::GatewayContext;

/// Periodically evict sessions that have been idle past
/// `client_cleanup_timeout` — a supplementary feature (SPEC_FULL.md) with
/// no direct teacher counterpart, following the same "spawn a background
/// sweep task" shape the teacher uses for its session idle reaper.
pub async fn run_cleanup_sweeper(ctx: Arc<GatewayContext>) {
    let mut interval = tokio::time::interval(fallback_interval(ctx.config.client_cleanup_timeout / 4));
    loop {
        interval.tick().await;
        if !ctx.shutdown.is_running() {
            break;
        }
        let cutoff = Utc::now() - chrono::Duration::from_std(ctx.config.client_cleanup_timeout).unwrap_or_default();
        let idle = ctx.sessions.idle_since(cutoff).await;
        for id in idle {
            if let Some(handle) = ctx.sessions.get(&id).await {
                info!(client_id = %id, "evicting idle session");
                handle.cancel.notify_one();
            }
        }
    }
}

fn fallback_interval(d: std::time::Duration) -> std::time::Duration {
    if d.is_zero() {
        std::time::Duration::from_secs(60)
    } else {
        d
    }
}
