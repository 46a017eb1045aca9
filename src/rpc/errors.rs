//! Stable JSON-RPC error codes (spec §6) and the structured error object (§3).

use serde::Serialize;
use serde_json::Value;

/// Numeric error codes. Values are part of the wire contract — never
/// renumber once a code has shipped to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    AuthenticationRequired,
    InsufficientPermissions,
    CameraNotFound,
    Unsupported,
    RateLimitExceeded,
}

impl ErrorCode {
    pub fn code(self) -> i32 {
        match self {
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::AuthenticationRequired => -32001,
            ErrorCode::InsufficientPermissions => -32002,
            ErrorCode::CameraNotFound => -32010,
            ErrorCode::Unsupported => -32030,
            // spec.md §6 leaves this as "-32xxx" (a placeholder); -32020 is
            // this crate's concrete pick, documented in DESIGN.md.
            ErrorCode::RateLimitExceeded => -32020,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "Invalid Request",
            ErrorCode::MethodNotFound => "Method not found",
            ErrorCode::InvalidParams => "Invalid params",
            ErrorCode::InternalError => "Internal error",
            ErrorCode::AuthenticationRequired => "Authentication required",
            ErrorCode::InsufficientPermissions => "Insufficient permissions",
            ErrorCode::CameraNotFound => "Camera not found",
            ErrorCode::Unsupported => "Unsupported",
            ErrorCode::RateLimitExceeded => "Rate limit exceeded",
        }
    }
}

/// Structured error sub-fields (§3: "structured data with sub-fields
/// `{reason, details, suggestion}`").
#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorData {
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ErrorData {
    pub fn reason(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            details: None,
            suggestion: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcErrorObject {
    pub code: i32,
    pub message: String,
    pub data: ErrorData,
}

impl RpcErrorObject {
    pub fn new(code: ErrorCode, data: ErrorData) -> Self {
        Self {
            code: code.code(),
            message: code.message().to_string(),
            data,
        }
    }
}

/// Kind of a downstream (controller-facade) failure, carried in the error
/// object's `data` per §4.8 ("Downstream errors propagate as their error
/// kind... carried in the error object's `data`").
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DownstreamErrorKind {
    #[error("camera not found")]
    CameraNotFound,
    #[error("unsupported")]
    Unsupported,
    #[error("media error")]
    MediaError,
}

/// Pipeline-level error, produced by any gate in `rpc::pipeline`.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("rate limit exceeded")]
    RateLimitExceeded,
    #[error("method not found: {0}")]
    MethodNotFound(String),
    #[error("authentication required")]
    AuthenticationRequired,
    #[error("insufficient permissions for method '{method}'")]
    InsufficientPermissions { method: String, role: Option<String> },
    #[error("invalid params: {field}")]
    InvalidParams { field: String, reason: String },
    #[error("downstream error: {kind}")]
    Downstream {
        kind: DownstreamErrorKind,
        message: String,
    },
    #[error("internal error: {0}")]
    Internal(String),
}

/// Map a pipeline error to its wire error code + structured data.
/// Grounded on `ipc::mod::classify_error` in the teacher.
pub fn classify(err: &GatewayError) -> RpcErrorObject {
    match err {
        GatewayError::RateLimitExceeded => RpcErrorObject::new(
            ErrorCode::RateLimitExceeded,
            ErrorData::reason("token bucket emptied for this session")
                .with_suggestion("retry after the rate-limit window resets"),
        ),
        GatewayError::MethodNotFound(method) => RpcErrorObject::new(
            ErrorCode::MethodNotFound,
            ErrorData::reason(format!("no handler registered for '{method}'")),
        ),
        GatewayError::AuthenticationRequired => RpcErrorObject::new(
            ErrorCode::AuthenticationRequired,
            ErrorData::reason("session is not authenticated")
                .with_suggestion("call 'authenticate' with a valid auth_token first"),
        ),
        GatewayError::InsufficientPermissions { method, role } => RpcErrorObject::new(
            ErrorCode::InsufficientPermissions,
            ErrorData::reason(format!(
                "role {:?} may not invoke '{}'",
                role.as_deref().unwrap_or("none"),
                method
            )),
        ),
        GatewayError::InvalidParams { field, reason } => RpcErrorObject::new(
            ErrorCode::InvalidParams,
            ErrorData::reason(reason.clone())
                .with_details(serde_json::json!({ "field": field })),
        ),
        GatewayError::Downstream { kind, message } => {
            let code = match kind {
                DownstreamErrorKind::CameraNotFound => ErrorCode::CameraNotFound,
                DownstreamErrorKind::Unsupported => ErrorCode::Unsupported,
                DownstreamErrorKind::MediaError => ErrorCode::InternalError,
            };
            RpcErrorObject::new(code, ErrorData::reason(message.clone()))
        }
        GatewayError::Internal(reason) => {
            RpcErrorObject::new(ErrorCode::InternalError, ErrorData::reason(reason.clone()))
        }
    }
}

/// Whether this error should increment the global error counter (§4.5 gate 7
/// / §7: "Internal errors increment the global error counter").
pub fn is_internal(err: &GatewayError) -> bool {
    matches!(
        err,
        GatewayError::Internal(_)
            | GatewayError::Downstream {
                kind: DownstreamErrorKind::MediaError,
                ..
            }
    )
}
