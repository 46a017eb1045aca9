//! `subscribe_events` / `unsubscribe_events` (§4.6, C6).

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::events::Topic;
use crate::gateway::manager::ClientHandle;
use crate::rpc::errors::GatewayError;
use crate::GatewayContext;

fn parse_topics(params: &Value) -> Result<HashSet<Topic>, GatewayError> {
    let Some(entries) = params.get("topics").and_then(Value::as_array) else {
        return Ok(HashSet::new());
    };
    let mut topics = HashSet::new();
    for entry in entries {
        let raw = entry.as_str().ok_or_else(|| GatewayError::InvalidParams {
            field: "topics".to_string(),
            reason: "every entry must be a string".to_string(),
        })?;
        let topic = Topic::from_str(raw).map_err(|_| GatewayError::InvalidParams {
            field: "topics".to_string(),
            reason: format!("unknown topic: {raw}"),
        })?;
        topics.insert(topic);
    }
    Ok(topics)
}

pub async fn subscribe_events(
    params: Value,
    ctx: Arc<GatewayContext>,
    client: Arc<ClientHandle>,
) -> Result<Value, GatewayError> {
    let topics = parse_topics(&params)?;
    if topics.is_empty() {
        return Err(GatewayError::InvalidParams {
            field: "topics".to_string(),
            reason: "must list at least one topic".to_string(),
        });
    }
    let filters = params
        .get("filters")
        .and_then(Value::as_object)
        .map(|obj| obj.clone().into_iter().collect())
        .unwrap_or_default();

    let names: Vec<&str> = topics.iter().map(|t| t.as_str()).collect();
    ctx.events.subscribe(&client.id, topics, filters).await;
    Ok(json!({ "subscribed": names }))
}

pub async fn unsubscribe_events(
    params: Value,
    ctx: Arc<GatewayContext>,
    client: Arc<ClientHandle>,
) -> Result<Value, GatewayError> {
    let topics = parse_topics(&params)?;
    ctx.events.unsubscribe(&client.id, &topics).await;
    Ok(json!({ "ok": true }))
}
