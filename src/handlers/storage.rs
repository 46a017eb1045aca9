//! Storage-info, retention-policy, and cleanup handlers (§4.8) — all
//! admin-only per the permission catalog.

use std::sync::Arc;

use serde_json::Value;

use super::map_controller_err;
use crate::controller::RetentionPolicy;
use crate::gateway::manager::ClientHandle;
use crate::rpc::errors::GatewayError;
use crate::GatewayContext;

pub async fn get_storage_info(
    _params: Value,
    ctx: Arc<GatewayContext>,
    _client: Arc<ClientHandle>,
) -> Result<Value, GatewayError> {
    let info = ctx.controller.storage_info().await.map_err(map_controller_err)?;
    Ok(serde_json::to_value(info).expect("StorageInfo always serializes"))
}

pub async fn set_retention_policy(
    params: Value,
    ctx: Arc<GatewayContext>,
    _client: Arc<ClientHandle>,
) -> Result<Value, GatewayError> {
    let policy: RetentionPolicy =
        serde_json::from_value(params).map_err(|err| GatewayError::InvalidParams {
            field: "retention_days".to_string(),
            reason: err.to_string(),
        })?;
    ctx.controller
        .set_retention_policy(policy)
        .await
        .map_err(map_controller_err)?;
    Ok(serde_json::json!({ "ok": true }))
}

pub async fn cleanup_storage(
    _params: Value,
    ctx: Arc<GatewayContext>,
    _client: Arc<ClientHandle>,
) -> Result<Value, GatewayError> {
    let result = ctx.controller.cleanup_storage().await.map_err(map_controller_err)?;
    Ok(serde_json::to_value(result).expect("CleanupResult always serializes"))
}
