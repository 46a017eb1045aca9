//! Live connection bookkeeping: the session map, admission control and
//! drain (§3, §4.2, C9).
//!
//! Grounded on `session::SessionManager`'s `RwLock<HashMap<...>>` +
//! `drain()` shape in the teacher, re-purposed from AI-session bookkeeping
//! to WebSocket-connection bookkeeping.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Notify, RwLock};
use tokio::task::AbortHandle;

use crate::metrics::MetricsRecorder;

/// Messages the connection's writer task knows how to turn into real
/// WebSocket frames — the only channel through which any other part of
/// the gateway may write to a transport (§5, single-writer discipline).
#[derive(Debug, Clone)]
pub enum OutboundFrame {
    Text(String),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

/// Per-connection shared state. Cheap to clone via `Arc`; every field
/// that can change after admission is an atomic or an async `RwLock`
/// guard so handlers, the pipeline, and the connection's own read loop
/// can all hold a reference concurrently.
pub struct ClientHandle {
    pub id: String,
    pub authenticated: AtomicBool,
    pub role: RwLock<Option<String>>,
    pub connected_at: DateTime<Utc>,
    pub last_activity: RwLock<DateTime<Utc>>,
    pub outbound: mpsc::Sender<OutboundFrame>,
    pub cancel: Arc<Notify>,
    torn_down: AtomicBool,
    writer_task: Mutex<Option<AbortHandle>>,
}

impl ClientHandle {
    pub fn new(id: String, outbound: mpsc::Sender<OutboundFrame>) -> Arc<Self> {
        Arc::new(Self {
            id,
            authenticated: AtomicBool::new(false),
            role: RwLock::new(None),
            connected_at: Utc::now(),
            last_activity: RwLock::new(Utc::now()),
            outbound,
            cancel: Arc::new(Notify::new()),
            torn_down: AtomicBool::new(false),
            writer_task: Mutex::new(None),
        })
    }

    /// Marks teardown as claimed. Returns `true` the first time it is
    /// called for this handle — used to make teardown idempotent.
    pub fn claim_teardown(&self) -> bool {
        !self.torn_down.swap(true, Ordering::SeqCst)
    }

    pub async fn touch(&self) {
        *self.last_activity.write().await = Utc::now();
    }

    /// Record the writer task's abort handle so a forced shutdown can kill
    /// the transport directly, even if the reader loop is stuck awaiting a
    /// handler (§4.9 step 4, "force-close any remaining transports").
    pub fn set_writer_task(&self, handle: AbortHandle) {
        *self.writer_task.lock().expect("writer_task lock poisoned") = Some(handle);
    }

    /// Abort the writer task, which owns the transport's write half and
    /// drops (closing the socket) as soon as the task is torn down.
    pub fn abort_transport(&self) {
        if let Some(handle) = self.writer_task.lock().expect("writer_task lock poisoned").as_ref() {
            handle.abort();
        }
    }
}

pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<ClientHandle>>>,
    next_id: AtomicU64,
    reserved: AtomicU64,
    max_connections: usize,
    metrics: Arc<MetricsRecorder>,
}

impl SessionManager {
    pub fn new(max_connections: usize, metrics: Arc<MetricsRecorder>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            reserved: AtomicU64::new(0),
            max_connections,
            metrics,
        }
    }

    /// Atomically reserve one admission slot, before any session state is
    /// allocated (§4.1: "refused before allocating session state"). Callers
    /// that fail to complete the handshake must call `release_reservation`.
    pub fn try_reserve(&self) -> bool {
        loop {
            let current = self.reserved.load(Ordering::SeqCst);
            if current as usize >= self.max_connections {
                return false;
            }
            if self
                .reserved
                .compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return true;
            }
        }
    }

    pub fn release_reservation(&self) {
        self.reserved.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn next_client_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::SeqCst).to_string()
    }

    pub async fn register(&self, handle: Arc<ClientHandle>) {
        self.metrics.inc_active_sessions();
        self.sessions.write().await.insert(handle.id.clone(), handle);
    }

    /// Idempotent: removing an id twice is a no-op the second time.
    pub async fn remove(&self, id: &str) {
        let removed = self.sessions.write().await.remove(id);
        if removed.is_some() {
            self.metrics.dec_active_sessions();
            self.release_reservation();
        }
    }

    /// Force a session's transport closed and drop it from the map
    /// immediately, regardless of whether its read loop is still stuck
    /// awaiting a handler — used when the shutdown deadline expires with
    /// sessions still open (§4.9 step 4).
    pub async fn force_close(&self, id: &str) {
        if let Some(handle) = self.sessions.read().await.get(id) {
            handle.abort_transport();
        }
        self.remove(id).await;
    }

    pub async fn is_authenticated(&self, id: &str) -> bool {
        self.sessions
            .read()
            .await
            .get(id)
            .map(|h| h.authenticated.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Enqueue a frame for the writer task to send. Returns `false` when
    /// the session is unknown or its outbound queue is full/closed — a
    /// slow consumer must never block delivery to anyone else (§5).
    pub async fn send_to(&self, id: &str, frame: OutboundFrame) -> bool {
        let sender = self.sessions.read().await.get(id).map(|h| h.outbound.clone());
        match sender {
            Some(sender) => sender.try_send(frame).is_ok(),
            None => false,
        }
    }

    pub async fn get(&self, id: &str) -> Option<Arc<ClientHandle>> {
        self.sessions.read().await.get(id).cloned()
    }

    pub fn metrics(&self) -> &Arc<MetricsRecorder> {
        &self.metrics
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn snapshot_ids(&self) -> Vec<String> {
        self.sessions.read().await.keys().cloned().collect()
    }

    /// Ids of sessions whose last activity predates `cutoff` — used by the
    /// periodic cleanup sweep.
    pub async fn idle_since(&self, cutoff: DateTime<Utc>) -> Vec<String> {
        let sessions = self.sessions.read().await;
        let mut idle = Vec::new();
        for (id, handle) in sessions.iter() {
            if *handle.last_activity.read().await < cutoff {
                idle.push(id.clone());
            }
        }
        idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_respects_cap() {
        let metrics = Arc::new(MetricsRecorder::new());
        let manager = SessionManager::new(1, metrics);
        assert!(manager.try_reserve());
        assert!(!manager.try_reserve());
        manager.release_reservation();
        assert!(manager.try_reserve());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let metrics = Arc::new(MetricsRecorder::new());
        let manager = SessionManager::new(10, metrics);
        manager.try_reserve();
        let (tx, _rx) = mpsc::channel(8);
        let handle = ClientHandle::new("1".to_string(), tx);
        manager.register(handle).await;
        assert_eq!(manager.active_count().await, 1);
        manager.remove("1").await;
        manager.remove("1").await;
        assert_eq!(manager.active_count().await, 0);
    }
}
