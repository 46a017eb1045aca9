//! Recording lifecycle and file-listing handlers (§4.8).

use std::sync::Arc;

use serde_json::Value;

use super::{initializing_result, map_controller_err};
use crate::events::Topic;
use crate::gateway::manager::ClientHandle;
use crate::rpc::errors::GatewayError;
use crate::GatewayContext;

fn device(params: &Value) -> &str {
    params.get("device").and_then(Value::as_str).unwrap_or_default()
}

pub async fn start_recording(
    params: Value,
    ctx: Arc<GatewayContext>,
    _client: Arc<ClientHandle>,
) -> Result<Value, GatewayError> {
    if !ctx.controller.is_ready().await {
        return Ok(initializing_result());
    }
    let handle = ctx
        .controller
        .start_recording(device(&params))
        .await
        .map_err(map_controller_err)?;
    let payload = serde_json::to_value(&handle).expect("RecordingHandle always serializes");
    ctx.events.publish(Topic::RecordingStart, payload.clone(), &ctx.sessions).await;
    Ok(payload)
}

pub async fn stop_recording(
    params: Value,
    ctx: Arc<GatewayContext>,
    _client: Arc<ClientHandle>,
) -> Result<Value, GatewayError> {
    if !ctx.controller.is_ready().await {
        return Ok(initializing_result());
    }
    let handle = ctx
        .controller
        .stop_recording(device(&params))
        .await
        .map_err(map_controller_err)?;
    let payload = serde_json::to_value(&handle).expect("RecordingHandle always serializes");
    ctx.events.publish(Topic::RecordingStop, payload.clone(), &ctx.sessions).await;
    Ok(payload)
}

pub async fn list_recordings(
    params: Value,
    ctx: Arc<GatewayContext>,
    _client: Arc<ClientHandle>,
) -> Result<Value, GatewayError> {
    if !ctx.controller.is_ready().await {
        return Ok(initializing_result());
    }
    let device_filter = params.get("device").and_then(Value::as_str);
    let limit = params.get("limit").and_then(Value::as_u64).unwrap_or(50) as u32;
    let offset = params.get("offset").and_then(Value::as_u64).unwrap_or(0) as u32;
    let list = ctx
        .controller
        .list_recordings(device_filter, limit, offset)
        .await
        .map_err(map_controller_err)?;
    Ok(serde_json::to_value(list).expect("FileList always serializes"))
}
