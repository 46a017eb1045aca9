//! Graceful shutdown coordinator (§4.9, C9).
//!
//! Grounded on `ipc::mod::run`'s `make_shutdown_future` +
//! `session_manager.drain()` sequence, extended with the bounded-wait then
//! forced-closure semantics §4.9 specifies.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Notify;
use tracing::{info, warn};

use super::manager::OutboundFrame;
use crate::GatewayContext;

#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("shutdown deadline exceeded with sessions still open")]
    Timeout,
}

pub struct ShutdownCoordinator {
    running: AtomicBool,
    notify: Notify,
    triggered: AtomicBool,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            notify: Notify::new(),
            triggered: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown has been triggered — used as a `select!`
    /// branch in the accept loop to stop admitting new connections.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }

    /// Idempotent: a second call while shutdown is already in flight (or
    /// complete) returns immediately without repeating the drain.
    pub async fn stop(&self, ctx: &GatewayContext, deadline: Duration) -> Result<(), ShutdownError> {
        if self.triggered.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.running.store(false, Ordering::SeqCst);
        self.notify.notify_waiters();

        let ids = ctx.sessions.snapshot_ids().await;
        info!(sessions = ids.len(), "shutdown: closing open sessions");
        for id in &ids {
            if let Some(handle) = ctx.sessions.get(id).await {
                let _ = ctx.sessions.send_to(id, OutboundFrame::Close).await;
                handle.cancel.notify_one();
            }
        }

        let wait = async {
            while ctx.sessions.active_count().await > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };

        match tokio::time::timeout(deadline, wait).await {
            Ok(_) => {
                info!("graceful shutdown complete");
                Ok(())
            }
            Err(_) => {
                // A session whose handler is still awaiting inside the read
                // loop's dispatch call never re-enters `select!` to observe
                // `cancel`, so it would otherwise survive past the deadline.
                // Force it closed directly: abort its writer task (which
                // owns the transport's write half) and drop it from the map.
                let remaining = ctx.sessions.snapshot_ids().await;
                warn!(
                    remaining = remaining.len(),
                    "shutdown deadline exceeded, force-closing remaining sessions"
                );
                for id in &remaining {
                    ctx.sessions.force_close(id).await;
                    ctx.events.remove_client(id).await;
                }
                Err(ShutdownError::Timeout)
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
