//! `ping` and `authenticate` — the two methods reachable before a session
//! is authenticated (§3 invariant, §4.5 gate 3).

use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::gateway::manager::ClientHandle;
use crate::rpc::errors::GatewayError;
use crate::GatewayContext;

pub async fn ping(
    _params: Value,
    _ctx: Arc<GatewayContext>,
    _client: Arc<ClientHandle>,
) -> Result<Value, GatewayError> {
    Ok(json!("pong"))
}

pub async fn authenticate(
    params: Value,
    ctx: Arc<GatewayContext>,
    client: Arc<ClientHandle>,
) -> Result<Value, GatewayError> {
    let token = params
        .get("auth_token")
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::InvalidParams {
            field: "auth_token".to_string(),
            reason: "missing required field".to_string(),
        })?;

    let role = ctx
        .auth
        .verify_token(token)
        .await
        .map_err(|_| GatewayError::AuthenticationRequired)?;

    client.authenticated.store(true, Ordering::SeqCst);
    *client.role.write().await = Some(role.clone());

    Ok(json!({ "authenticated": true, "role": role }))
}

/// Registered only so that gate 2 (method lookup) succeeds for
/// server-generated event names; gate 5 always denies these before this
/// body would ever run.
pub async fn unreachable_server_generated(
    _params: Value,
    _ctx: Arc<GatewayContext>,
    _client: Arc<ClientHandle>,
) -> Result<Value, GatewayError> {
    Err(GatewayError::Internal(
        "server-generated method invoked directly".to_string(),
    ))
}
