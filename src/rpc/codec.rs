//! JSON-RPC 2.0 envelope parsing and response assembly (§3, §4.3).
//!
//! Grounded on `ipc::mod::{RpcRequest, RpcResponse, RpcError}` in the
//! teacher, reshaped around the spec's explicit request/notification split
//! (absent or null `id` is a notification; anything else is a request).

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use super::errors::RpcErrorObject;

/// The outcome of decoding a single inbound text frame.
pub enum DecodedFrame {
    /// A request expecting a response (`id` present and non-null).
    Request {
        id: Value,
        method: String,
        params: Value,
    },
    /// A notification (`id` absent or null) — never produces a response.
    Notification { method: String, params: Value },
    /// Malformed JSON, a non-object top level, a missing/incorrect
    /// protocol tag, or a missing `method` field. Always produces an
    /// INVALID_REQUEST response; `id` is echoed when it could be
    /// recovered, else `Value::Null`.
    Invalid { id: Value },
}

/// Decode one inbound WebSocket text frame into a `DecodedFrame`.
pub fn decode(text: &str) -> DecodedFrame {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => return DecodedFrame::Invalid { id: Value::Null },
    };
    let obj = match value.as_object() {
        Some(o) => o,
        None => return DecodedFrame::Invalid { id: Value::Null },
    };

    let id_field = obj.get("id").cloned();
    let jsonrpc_ok = obj.get("jsonrpc").and_then(Value::as_str) == Some("2.0");
    if !jsonrpc_ok {
        return DecodedFrame::Invalid {
            id: id_field.unwrap_or(Value::Null),
        };
    }

    let method = match obj.get("method").and_then(Value::as_str) {
        Some(m) => m.to_string(),
        None => {
            return DecodedFrame::Invalid {
                id: id_field.unwrap_or(Value::Null),
            }
        }
    };
    let params = obj.get("params").cloned().unwrap_or(Value::Null);

    match id_field {
        None | Some(Value::Null) => DecodedFrame::Notification { method, params },
        Some(id) => DecodedFrame::Request { id, method, params },
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseMetadata {
    pub processing_time_ms: u64,
    pub server_timestamp: String,
    pub request_id: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
    pub metadata: ResponseMetadata,
}

fn metadata(id: &Value, elapsed: std::time::Duration) -> ResponseMetadata {
    ResponseMetadata {
        processing_time_ms: elapsed.as_millis() as u64,
        server_timestamp: Utc::now().to_rfc3339(),
        request_id: id.clone(),
    }
}

pub fn success(id: Value, result: Value, elapsed: std::time::Duration) -> RpcResponse {
    let meta = metadata(&id, elapsed);
    RpcResponse {
        jsonrpc: "2.0",
        id,
        result: Some(result),
        error: None,
        metadata: meta,
    }
}

pub fn failure(id: Value, error: RpcErrorObject, elapsed: std::time::Duration) -> RpcResponse {
    let meta = metadata(&id, elapsed);
    RpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(error),
        metadata: meta,
    }
}

/// A server-originated event notification (§4.6): no `id`, a `method`
/// naming the topic, and a `params` payload.
#[derive(Debug, Clone, Serialize)]
pub struct EventNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: Value,
}

impl EventNotification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_request_with_id() {
        let frame = decode(r#"{"jsonrpc":"2.0","id":1,"method":"ping","params":{}}"#);
        match frame {
            DecodedFrame::Request { id, method, .. } => {
                assert_eq!(id, Value::from(1));
                assert_eq!(method, "ping");
            }
            _ => panic!("expected Request"),
        }
    }

    #[test]
    fn decodes_notification_with_absent_id() {
        let frame = decode(r#"{"jsonrpc":"2.0","method":"ping"}"#);
        assert!(matches!(frame, DecodedFrame::Notification { .. }));
    }

    #[test]
    fn decodes_notification_with_null_id() {
        let frame = decode(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#);
        assert!(matches!(frame, DecodedFrame::Notification { .. }));
    }

    #[test]
    fn rejects_malformed_json() {
        let frame = decode("not json at all {");
        match frame {
            DecodedFrame::Invalid { id } => assert_eq!(id, Value::Null),
            _ => panic!("expected Invalid"),
        }
    }

    #[test]
    fn rejects_wrong_protocol_tag_but_echoes_id() {
        let frame = decode(r#"{"jsonrpc":"1.0","id":5,"method":"ping"}"#);
        match frame {
            DecodedFrame::Invalid { id } => assert_eq!(id, Value::from(5)),
            _ => panic!("expected Invalid"),
        }
    }

    #[test]
    fn rejects_missing_method() {
        let frame = decode(r#"{"jsonrpc":"2.0","id":1}"#);
        assert!(matches!(frame, DecodedFrame::Invalid { .. }));
    }
}
