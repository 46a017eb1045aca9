//! External (MediaMTX-backed) stream discovery and management handlers
//! (§4.8).

use std::sync::Arc;

use serde_json::{json, Value};

use super::map_controller_err;
use crate::controller::ExternalStream;
use crate::gateway::manager::ClientHandle;
use crate::rpc::errors::GatewayError;
use crate::GatewayContext;

pub async fn discover_external_streams(
    _params: Value,
    ctx: Arc<GatewayContext>,
    _client: Arc<ClientHandle>,
) -> Result<Value, GatewayError> {
    let streams = ctx
        .controller
        .discover_external_streams()
        .await
        .map_err(map_controller_err)?;
    Ok(json!({ "streams": streams }))
}

pub async fn add_external_stream(
    params: Value,
    ctx: Arc<GatewayContext>,
    _client: Arc<ClientHandle>,
) -> Result<Value, GatewayError> {
    let stream: ExternalStream =
        serde_json::from_value(params).map_err(|err| GatewayError::InvalidParams {
            field: "stream".to_string(),
            reason: err.to_string(),
        })?;
    ctx.controller
        .add_external_stream(stream)
        .await
        .map_err(map_controller_err)?;
    Ok(json!({ "ok": true }))
}

pub async fn remove_external_stream(
    params: Value,
    ctx: Arc<GatewayContext>,
    _client: Arc<ClientHandle>,
) -> Result<Value, GatewayError> {
    let id = params.get("id").and_then(Value::as_str).unwrap_or_default();
    ctx.controller
        .remove_external_stream(id)
        .await
        .map_err(map_controller_err)?;
    Ok(json!({ "ok": true }))
}
