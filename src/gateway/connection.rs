//! Per-connection lifecycle: handshake, read loop, heartbeat, the
//! dedicated writer task, and teardown (§4.2, C2).
//!
//! Grounded on `ipc::mod::handle_connection`'s `tokio::select!` read/
//! broadcast loop in the teacher. The teacher writes directly to the
//! sink from the same task that reads from it; this crate splits reader
//! and writer across two tasks connected by a bounded `mpsc` channel so
//! that at most one in-flight write exists on any transport handle at a
//! time (§5), and a slow consumer's full queue never blocks anyone else.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::http::{Response as HttpResponse, StatusCode};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::manager::{ClientHandle, OutboundFrame};
use crate::rpc::pipeline;
use crate::GatewayContext;

/// Peek at the first bytes of a fresh TCP connection to see whether this
/// is a plain `GET /health` or `GET /metrics` HTTP probe sharing the
/// WebSocket listener's port, before committing to a WS upgrade.
/// Grounded on `ipc::mod::handle_health_check`.
async fn peek_http_probe(stream: &TcpStream) -> std::io::Result<Option<&'static str>> {
    let mut buf = [0u8; 16];
    let n = stream.peek(&mut buf).await?;
    let prefix = &buf[..n];
    if prefix.starts_with(b"GET /health") {
        Ok(Some("health"))
    } else if prefix.starts_with(b"GET /metrics") {
        Ok(Some("metrics"))
    } else {
        Ok(None)
    }
}

async fn serve_http_probe(
    mut stream: TcpStream,
    kind: &'static str,
    ctx: &Arc<GatewayContext>,
) -> anyhow::Result<()> {
    // Drain the request line; we don't need to parse it further.
    let mut discard = [0u8; 1024];
    let _ = stream.read(&mut discard).await;

    let body = match kind {
        "health" => {
            let ready = ctx.registry.is_ready() && ctx.controller.is_ready().await;
            format!(
                "{{\"status\":\"{}\",\"active_sessions\":{},\"subscriptions\":{}}}",
                if ready { "ok" } else { "initializing" },
                ctx.sessions.active_count().await,
                ctx.events.subscription_count().await
            )
        }
        _ => ctx.metrics.render_prometheus().await,
    };
    let content_type = if kind == "health" {
        "application/json"
    } else {
        "text/plain; version=0.0.4"
    };
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await.ok();
    Ok(())
}

async fn reject_with_service_unavailable(mut stream: TcpStream) -> anyhow::Result<()> {
    let body = "gateway at capacity";
    let response = format!(
        "HTTP/1.1 503 Service Unavailable\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await.ok();
    Ok(())
}

pub async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    ctx: Arc<GatewayContext>,
) -> anyhow::Result<()> {
    if let Some(kind) = peek_http_probe(&stream).await? {
        return serve_http_probe(stream, kind, &ctx).await;
    }

    // Admission cap is enforced before any session state is allocated
    // (§4.1 invariant #6).
    if !ctx.sessions.try_reserve() {
        warn!(%peer, "rejecting connection: at max_connections");
        return reject_with_service_unavailable(stream).await;
    }

    let cors_origins = ctx.config.cors_origins.clone();
    let origin_check = move |req: &Request, response: Response| {
        if let Some(origin) = req.headers().get("origin").and_then(|v| v.to_str().ok()) {
            let allowed =
                cors_origins.is_empty() || cors_origins.iter().any(|o| o == origin || o == "*");
            if !allowed {
                let rejection = HttpResponse::builder()
                    .status(StatusCode::FORBIDDEN)
                    .body(Some("origin not allowed".to_string()))
                    .expect("static rejection response is well-formed");
                return Err(rejection);
            }
        }
        Ok(response)
    };

    let ws_config = WebSocketConfig {
        max_message_size: Some(ctx.config.max_message_size),
        max_frame_size: Some(ctx.config.max_message_size),
        ..Default::default()
    };

    let ws_stream =
        match tokio_tungstenite::accept_hdr_async_with_config(stream, origin_check, Some(ws_config))
            .await
        {
            Ok(s) => s,
            Err(err) => {
                ctx.sessions.release_reservation();
                warn!(%peer, %err, "websocket handshake failed");
                return Ok(());
            }
        };

    let client_id = ctx.sessions.next_client_id();
    let (outbound_tx, outbound_rx) = mpsc::channel::<OutboundFrame>(256);
    let handle = ClientHandle::new(client_id.clone(), outbound_tx);
    ctx.sessions.register(handle.clone()).await;
    info!(client_id = %client_id, %peer, "session established");

    let (sink, stream) = ws_stream.split();
    let writer_task = tokio::spawn(run_writer(sink, outbound_rx, ctx.config.write_timeout));
    handle.set_writer_task(writer_task.abort_handle());

    run_reader(&ctx, &handle, stream).await;

    writer_task.abort();
    teardown(&ctx, &handle, &peer).await;
    Ok(())
}

type WsSink = futures_util::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<TcpStream>,
    Message,
>;
type WsStream = futures_util::stream::SplitStream<tokio_tungstenite::WebSocketStream<TcpStream>>;

/// The sole writer of this connection's transport handle. Every outbound
/// frame — responses, event notifications, pings, the final close —
/// funnels through this task's channel.
async fn run_writer(mut sink: WsSink, mut rx: mpsc::Receiver<OutboundFrame>, write_timeout: Duration) {
    while let Some(frame) = rx.recv().await {
        let message = match frame {
            OutboundFrame::Text(text) => Message::Text(text),
            OutboundFrame::Ping(payload) => Message::Ping(payload),
            OutboundFrame::Pong(payload) => Message::Pong(payload),
            OutboundFrame::Close => Message::Close(None),
        };
        let is_close = matches!(message, Message::Close(_));
        match tokio::time::timeout(write_timeout, sink.send(message)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                debug!(%err, "write failed, closing writer task");
                break;
            }
            Err(_) => {
                warn!("write timed out, closing writer task");
                break;
            }
        }
        if is_close {
            break;
        }
    }
    let _ = sink.close().await;
}

async fn run_reader(ctx: &Arc<GatewayContext>, handle: &Arc<ClientHandle>, mut stream: WsStream) {
    let mut read_deadline = Box::pin(tokio::time::sleep(ctx.config.read_timeout));
    let mut ping_ticker = tokio::time::interval(ctx.config.ping_interval);
    ping_ticker.tick().await; // first tick fires immediately; discard it

    loop {
        tokio::select! {
            biased;
            _ = handle.cancel.notified() => {
                debug!(client_id = %handle.id, "teardown requested");
                break;
            }
            _ = &mut read_deadline => {
                debug!(client_id = %handle.id, "read timeout elapsed, closing session");
                let _ = ctx.sessions.send_to(&handle.id, OutboundFrame::Close).await;
                break;
            }
            _ = ping_ticker.tick() => {
                if !ctx.sessions.send_to(&handle.id, OutboundFrame::Ping(Vec::new())).await {
                    break;
                }
            }
            message = stream.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        handle.touch().await;
                        read_deadline.as_mut().reset(tokio::time::Instant::now() + ctx.config.read_timeout);
                        if let Some(response) = pipeline::process(ctx, handle, &text).await {
                            match serde_json::to_string(&response) {
                                Ok(encoded) => { let _ = ctx.sessions.send_to(&handle.id, OutboundFrame::Text(encoded)).await; }
                                Err(err) => warn!(%err, "failed to encode response"),
                            }
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        handle.touch().await;
                        let extended = tokio::time::Instant::now() + ctx.config.pong_wait;
                        if extended > read_deadline.deadline() {
                            read_deadline.as_mut().reset(extended);
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        handle.touch().await;
                        let _ = ctx.sessions.send_to(&handle.id, OutboundFrame::Pong(payload)).await;
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!(client_id = %handle.id, "client closed connection");
                        break;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        debug!(client_id = %handle.id, "ignoring binary frame: protocol is text-only JSON-RPC");
                    }
                    Some(Ok(Message::Frame(_))) => {}
                    Some(Err(err)) => {
                        debug!(client_id = %handle.id, %err, "read error, closing session");
                        break;
                    }
                    None => {
                        debug!(client_id = %handle.id, "transport stream ended");
                        break;
                    }
                }
            }
        }
    }
}

async fn teardown(ctx: &Arc<GatewayContext>, handle: &Arc<ClientHandle>, peer: &SocketAddr) {
    if !handle.claim_teardown() {
        return;
    }
    ctx.sessions.remove(&handle.id).await;
    ctx.events.remove_client(&handle.id).await;
    info!(client_id = %handle.id, %peer, "session disconnected");
}
