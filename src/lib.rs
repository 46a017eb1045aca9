//! `gatewatch` — a WebSocket + JSON-RPC 2.0 API gateway fronting a
//! camera-recording service: connection and session management, an
//! ordered security-gate request pipeline, and topic-based event
//! fan-out.
//!
//! Grounded on the teacher's `AppContext` shape (`daemon::lib`): a single
//! `Clone`-free, `Arc`-wrapped struct gathering every shared collaborator
//! the gateway's tasks need, constructed once at startup and threaded
//! through the accept loop, connection tasks, and method handlers.

pub mod auth;
pub mod config;
pub mod controller;
pub mod events;
pub mod gateway;
pub mod handlers;
pub mod metrics;
pub mod permissions;
pub mod rpc;
pub mod validation;

use std::sync::Arc;

use auth::AuthProvider;
use config::GatewayConfig;
use controller::ControllerFacade;
use events::EventEngine;
use gateway::manager::SessionManager;
use gateway::shutdown::ShutdownCoordinator;
use metrics::MetricsRecorder;
use permissions::PermissionCatalog;
use rpc::registry::MethodRegistry;

/// Every shared collaborator a connection task or method handler needs.
/// Always held behind an `Arc` — never cloned field-by-field.
pub struct GatewayContext {
    pub config: GatewayConfig,
    pub registry: MethodRegistry,
    pub metrics: Arc<MetricsRecorder>,
    pub events: EventEngine,
    pub sessions: SessionManager,
    pub controller: Arc<dyn ControllerFacade>,
    pub auth: Arc<dyn AuthProvider>,
    pub permissions: PermissionCatalog,
    pub shutdown: ShutdownCoordinator,
}

impl GatewayContext {
    pub fn new(
        config: GatewayConfig,
        controller: Arc<dyn ControllerFacade>,
        auth: Arc<dyn AuthProvider>,
    ) -> Arc<Self> {
        let metrics = Arc::new(MetricsRecorder::new());
        let sessions = SessionManager::new(config.max_connections, metrics.clone());
        let registry = MethodRegistry::new();
        handlers::register_all(&registry);

        Arc::new(Self {
            config,
            registry,
            metrics,
            events: EventEngine::new(),
            sessions,
            controller,
            auth,
            permissions: PermissionCatalog::default_catalog(),
            shutdown: ShutdownCoordinator::new(),
        })
    }
}
