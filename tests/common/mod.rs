//! Shared test harness: spins up a real gateway instance on an ephemeral
//! port and exposes a minimal JSON-RPC client over it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gatewatch::auth::StaticTokenAuthProvider;
use gatewatch::config::{GatewayConfigBuilder};
use gatewatch::controller::stub::StubController;
use gatewatch::gateway::transport;
use gatewatch::permissions::{ROLE_ADMIN, ROLE_OPERATOR, ROLE_VIEWER};
use gatewatch::GatewayContext;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub const VIEWER_TOKEN: &str = "viewer-test-token";
pub const OPERATOR_TOKEN: &str = "operator-test-token";
pub const ADMIN_TOKEN: &str = "admin-test-token";

pub struct TestGateway {
    pub ctx: Arc<GatewayContext>,
    pub addr: std::net::SocketAddr,
}

impl TestGateway {
    pub async fn start() -> Self {
        let config = GatewayConfigBuilder::default()
            .host("127.0.0.1")
            .port(0)
            .websocket_path("/ws")
            .max_connections(50)
            .read_timeout_secs(5)
            .write_timeout_secs(5)
            .ping_interval_secs(30)
            .pong_wait_secs(30)
            .max_message_size(1024 * 1024)
            .read_buffer_size(8192)
            .write_buffer_size(8192)
            .cors_origins(vec![])
            .client_cleanup_timeout_secs(300)
            .shutdown_timeout_secs(5)
            .build()
            .expect("test config must build");

        let mut tokens = HashMap::new();
        tokens.insert(VIEWER_TOKEN.to_string(), ROLE_VIEWER.to_string());
        tokens.insert(OPERATOR_TOKEN.to_string(), ROLE_OPERATOR.to_string());
        tokens.insert(ADMIN_TOKEN.to_string(), ROLE_ADMIN.to_string());
        let auth = Arc::new(StaticTokenAuthProvider::new(tokens, 1000, 1000));
        let controller = Arc::new(StubController::new());

        let ctx = GatewayContext::new(config, controller, auth);

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");

        let run_ctx = ctx.clone();
        tokio::spawn(async move {
            let _ = transport::run_on(listener, run_ctx).await;
        });

        // Give the accept loop a moment to start selecting.
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self { ctx, addr }
    }

    pub async fn connect(&self) -> TestClient {
        let url = format!("ws://{}/ws", self.addr);
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .expect("client websocket handshake");
        TestClient { stream }
    }
}

pub struct TestClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    pub async fn send_raw(&mut self, text: &str) {
        self.stream
            .send(Message::Text(text.to_string()))
            .await
            .expect("send frame");
    }

    pub async fn call(&mut self, method: &str, id: i64, params: Value) -> Value {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        self.send_raw(&request.to_string()).await;
        self.next_json().await
    }

    pub async fn notify(&mut self, method: &str, params: Value) {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });
        self.send_raw(&request.to_string()).await;
    }

    pub async fn next_json(&mut self) -> Value {
        let msg = tokio::time::timeout(Duration::from_secs(5), self.stream.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("websocket error");
        match msg {
            Message::Text(text) => serde_json::from_str(&text).expect("response is valid JSON"),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    pub async fn authenticate(&mut self, token: &str) -> Value {
        self.call("authenticate", 0, serde_json::json!({ "auth_token": token }))
            .await
    }
}
