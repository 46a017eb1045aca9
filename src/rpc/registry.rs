//! Method registry: name → handler lookup (§4.4, gate 2).
//!
//! Grounded on `ipc::mod::dispatch`'s match table in the teacher, turned
//! into a runtime table so handlers can be registered at startup instead of
//! hard-coded into a `match`. Registration only happens before the accept
//! loop starts, so a plain `std::sync::RwLock` is enough — it is never held
//! across an `.await`.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::Value;

use super::errors::GatewayError;
use crate::gateway::manager::ClientHandle;
use crate::GatewayContext;

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, GatewayError>> + Send>>;
pub type HandlerFn =
    Arc<dyn Fn(Value, Arc<GatewayContext>, Arc<ClientHandle>) -> HandlerFuture + Send + Sync>;

/// Wrap a plain `async fn(Value, Arc<GatewayContext>, Arc<ClientHandle>) ->
/// Result<Value, GatewayError>` into a boxed `HandlerFn`.
pub fn wrap<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(Value, Arc<GatewayContext>, Arc<ClientHandle>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, GatewayError>> + Send + 'static,
{
    Arc::new(move |params, ctx, client| Box::pin(f(params, ctx, client)))
}

/// Whether a method is reachable directly by a client, or exists purely as
/// a server-generated event name occupying a registry slot so that gate 2
/// (method lookup) succeeds and gate 5 (authorization) can reject it with
/// INSUFFICIENT_PERMISSIONS rather than METHOD_NOT_FOUND (§4.5, S6).
#[derive(Debug, Clone, Copy)]
pub struct MethodMeta {
    pub built_in: bool,
}

struct Entry {
    handler: HandlerFn,
    meta: MethodMeta,
}

pub struct MethodRegistry {
    methods: RwLock<HashMap<&'static str, Entry>>,
    ready: AtomicBool,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self {
            methods: RwLock::new(HashMap::new()),
            ready: AtomicBool::new(false),
        }
    }

    pub fn register(&self, name: &'static str, handler: HandlerFn, meta: MethodMeta) {
        self.methods
            .write()
            .expect("registry lock poisoned")
            .insert(name, Entry { handler, meta });
    }

    pub fn lookup(&self, name: &str) -> Option<(HandlerFn, MethodMeta)> {
        self.methods
            .read()
            .expect("registry lock poisoned")
            .get(name)
            .map(|e| (e.handler.clone(), e.meta))
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}
