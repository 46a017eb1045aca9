//! Benchmarks for the hot paths of the request pipeline: envelope
//! decoding and end-to-end gate traversal for an authenticated `ping`.

use std::collections::HashMap;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gatewatch::auth::StaticTokenAuthProvider;
use gatewatch::config::GatewayConfigBuilder;
use gatewatch::controller::stub::StubController;
use gatewatch::gateway::manager::ClientHandle;
use gatewatch::permissions::ROLE_OPERATOR;
use gatewatch::rpc::{codec, pipeline};
use gatewatch::GatewayContext;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

fn bench_decode(c: &mut Criterion) {
    let text = r#"{"jsonrpc":"2.0","id":1,"method":"ping","params":{}}"#;
    c.bench_function("codec::decode ping request", |b| {
        b.iter(|| black_box(codec::decode(black_box(text))));
    });
}

fn bench_pipeline_ping(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime for bench");

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
        .expect("bench config must build");

    let mut tokens = HashMap::new();
    tokens.insert("bench-token".to_string(), ROLE_OPERATOR.to_string());
    let auth = Arc::new(StaticTokenAuthProvider::new(tokens, 1_000_000, 1_000_000));
    let controller = Arc::new(StubController::new());
    let ctx = GatewayContext::new(config, controller, auth);

    let (tx, _rx) = mpsc::channel(16);
    let client = ClientHandle::new("bench-client".to_string(), tx);

    c.bench_function("pipeline::process ping", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(pipeline::process(&ctx, &client, r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).await)
            })
        });
    });
}

criterion_group!(benches, bench_decode, bench_pipeline_ping);
criterion_main!(benches);
