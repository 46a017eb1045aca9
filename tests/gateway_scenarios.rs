//! Integration scenarios S1–S7 (spec.md §8), driven against a real
//! gateway instance over an actual WebSocket client.

mod common;

use common::{TestGateway, ADMIN_TOKEN, OPERATOR_TOKEN};
use std::time::Duration;

#[tokio::test]
async fn s1_ping_before_auth() {
    let gateway = TestGateway::start().await;
    let mut client = gateway.connect().await;

    let response = client.call("ping", 1, serde_json::json!({})).await;
    assert_eq!(response["result"], "pong");
    assert_eq!(response["id"], 1);
    assert!(response["metadata"]["server_timestamp"].is_string());
}

#[tokio::test]
async fn s2_unauthenticated_protected_method() {
    let gateway = TestGateway::start().await;
    let mut client = gateway.connect().await;

    let response = client.call("get_camera_list", 2, serde_json::json!({})).await;
    assert_eq!(response["error"]["code"], -32001);
}

#[tokio::test]
async fn s3_authenticate_then_list() {
    let gateway = TestGateway::start().await;
    let mut client = gateway.connect().await;

    let auth = client.authenticate(OPERATOR_TOKEN).await;
    assert_eq!(auth["result"]["role"], "operator");

    let list = client.call("get_camera_list", 4, serde_json::json!({})).await;
    assert!(list["result"]["cameras"].is_array());
    assert!(list["result"]["total"].is_number());
    assert!(list["result"]["connected"].is_number());
}

#[tokio::test]
async fn s4_invalid_json() {
    let gateway = TestGateway::start().await;
    let mut client = gateway.connect().await;

    client.send_raw("{not json").await;
    let response = client.next_json().await;
    assert_eq!(response["id"], serde_json::Value::Null);
    assert_eq!(response["error"]["code"], -32600);
}

#[tokio::test]
async fn s5_subscribe_and_receive() {
    let gateway = TestGateway::start().await;
    let mut subscriber = gateway.connect().await;
    subscriber.authenticate(OPERATOR_TOKEN).await;

    let mut bystander = gateway.connect().await;
    bystander.authenticate(OPERATOR_TOKEN).await;

    let sub = subscriber
        .call(
            "subscribe_events",
            5,
            serde_json::json!({ "topics": ["camera.connected"] }),
        )
        .await;
    assert!(sub["result"]["subscribed"]
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t == "camera.connected"));

    let payload = serde_json::json!({"device": "camera0", "status": "connected"});
    let delivered = gateway
        .ctx
        .events
        .publish(
            gatewatch::events::Topic::CameraConnected,
            payload.clone(),
            &gateway.ctx.sessions,
        )
        .await;
    assert_eq!(delivered, 1);

    let notification = subscriber.next_json().await;
    assert_eq!(notification["method"], "camera.connected");
    assert_eq!(notification["params"], payload);

    // The bystander never subscribed and must receive nothing.
    let nothing = tokio::time::timeout(Duration::from_millis(200), bystander.next_json()).await;
    assert!(nothing.is_err(), "bystander should not receive the event");
}

#[tokio::test]
async fn s6_server_generated_blocked() {
    let gateway = TestGateway::start().await;
    let mut client = gateway.connect().await;
    client.authenticate(ADMIN_TOKEN).await;

    let response = client.call("camera_status_update", 6, serde_json::json!({})).await;
    assert_eq!(response["error"]["code"], -32002);
}

#[tokio::test]
async fn s7_graceful_shutdown() {
    let gateway = TestGateway::start().await;
    let mut clients = Vec::new();
    for _ in 0..3 {
        let mut client = gateway.connect().await;
        client.authenticate(OPERATOR_TOKEN).await;
        clients.push(client);
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(gateway.ctx.sessions.active_count().await, 3);

    gateway
        .ctx
        .shutdown
        .stop(&gateway.ctx, Duration::from_secs(5))
        .await
        .expect("graceful shutdown within deadline");

    assert_eq!(gateway.ctx.sessions.active_count().await, 0);

    // Subsequent upgrades must be refused once shutdown has run; the
    // accept loop itself stops selecting new connections.
    assert!(!gateway.ctx.shutdown.is_running());
}
