//! Camera enumeration, status, snapshot and stream-url handlers (§4.8).

use std::sync::Arc;

use serde_json::{json, Value};

use super::{initializing_result, map_controller_err};
use crate::gateway::manager::ClientHandle;
use crate::rpc::errors::GatewayError;
use crate::GatewayContext;

fn device(params: &Value) -> &str {
    params.get("device").and_then(Value::as_str).unwrap_or_default()
}

pub async fn get_camera_list(
    _params: Value,
    ctx: Arc<GatewayContext>,
    _client: Arc<ClientHandle>,
) -> Result<Value, GatewayError> {
    if !ctx.controller.is_ready().await {
        return Ok(initializing_result());
    }
    let cameras = ctx.controller.list_cameras().await.map_err(map_controller_err)?;
    let connected = cameras.iter().filter(|c| c.connected).count();
    Ok(json!({
        "cameras": cameras,
        "total": cameras.len(),
        "connected": connected,
    }))
}

pub async fn get_camera_status(
    params: Value,
    ctx: Arc<GatewayContext>,
    _client: Arc<ClientHandle>,
) -> Result<Value, GatewayError> {
    if !ctx.controller.is_ready().await {
        return Ok(initializing_result());
    }
    let summary = ctx
        .controller
        .camera_status(device(&params))
        .await
        .map_err(map_controller_err)?;
    Ok(serde_json::to_value(summary).expect("CameraSummary always serializes"))
}

pub async fn take_snapshot(
    params: Value,
    ctx: Arc<GatewayContext>,
    _client: Arc<ClientHandle>,
) -> Result<Value, GatewayError> {
    if !ctx.controller.is_ready().await {
        return Ok(initializing_result());
    }
    let result = ctx
        .controller
        .take_snapshot(device(&params))
        .await
        .map_err(map_controller_err)?;
    ctx.events
        .publish(
            crate::events::Topic::SnapshotTaken,
            serde_json::to_value(&result).expect("SnapshotResult always serializes"),
            &ctx.sessions,
        )
        .await;
    Ok(serde_json::to_value(result).expect("SnapshotResult always serializes"))
}

pub async fn get_stream_url(
    params: Value,
    ctx: Arc<GatewayContext>,
    _client: Arc<ClientHandle>,
) -> Result<Value, GatewayError> {
    if !ctx.controller.is_ready().await {
        return Ok(initializing_result());
    }
    let url = ctx
        .controller
        .stream_url(device(&params))
        .await
        .map_err(map_controller_err)?;
    Ok(json!({ "url": url }))
}

pub async fn get_stream_status(
    params: Value,
    ctx: Arc<GatewayContext>,
    _client: Arc<ClientHandle>,
) -> Result<Value, GatewayError> {
    if !ctx.controller.is_ready().await {
        return Ok(initializing_result());
    }
    let status = ctx
        .controller
        .stream_status(device(&params))
        .await
        .map_err(map_controller_err)?;
    Ok(serde_json::to_value(status).expect("StreamStatus always serializes"))
}
