//! Accept loop (§4.1, C1). Grounded on `ipc::mod::run`/`handle_connection`'s
//! accept loop and `ConnectionRateLimiter` in the teacher.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::connection::handle_connection;
use crate::GatewayContext;

/// Per-IP connection-attempt rate limiter, independent of the per-client
/// request rate limiter in `auth`. Grounded on
/// `ipc::mod::ConnectionRateLimiter` (10 connection attempts/minute/IP).
struct ConnectionRateLimiter {
    attempts: HashMap<IpAddr, Vec<Instant>>,
    max_per_window: usize,
    window: Duration,
}

impl ConnectionRateLimiter {
    fn new() -> Self {
        Self {
            attempts: HashMap::new(),
            max_per_window: 10,
            window: Duration::from_secs(60),
        }
    }

    fn check_and_record(&mut self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let entry = self.attempts.entry(ip).or_default();
        entry.retain(|t| now.duration_since(*t) < self.window);
        if entry.len() >= self.max_per_window {
            return false;
        }
        entry.push(now);
        true
    }
}

/// Run the accept loop until shutdown is triggered. Grounded on
/// `ipc::mod::run`'s `tokio::select! { biased; shutdown, accept }` loop.
pub async fn serve(ctx: Arc<GatewayContext>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", ctx.config.host, ctx.config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, path = %ctx.config.websocket_path, "gateway listening");
    run_on(listener, ctx).await
}

/// Like `serve`, but against an already-bound listener — lets callers
/// (tests) bind an ephemeral port and discover it via
/// `TcpListener::local_addr` before the accept loop starts.
pub async fn run_on(listener: TcpListener, ctx: Arc<GatewayContext>) -> anyhow::Result<()> {
    let limiter = Arc::new(Mutex::new(ConnectionRateLimiter::new()));

    loop {
        tokio::select! {
            biased;
            _ = ctx.shutdown.notified() => {
                info!("shutdown signal received, stopping accept loop");
                break;
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        error!(%err, "failed to accept connection");
                        continue;
                    }
                };
                if !ctx.shutdown.is_running() {
                    drop(stream);
                    continue;
                }
                {
                    let mut limiter = limiter.lock().await;
                    if !limiter.check_and_record(peer.ip()) {
                        warn!(%peer, "rejecting connection: per-IP connection rate exceeded");
                        drop(stream);
                        continue;
                    }
                }

                let ctx = ctx.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(stream, peer, ctx).await {
                        warn!(%peer, %err, "connection handling ended with an error");
                    }
                });
            }
        }
    }

    Ok(())
}
