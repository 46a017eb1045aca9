//! Built-in RPC method handlers (§4.8). Grounded on
//! `ipc::handlers::daemon`'s thin `async fn(Value, &AppContext) ->
//! Result<Value>` shape — generalized here to also take the invoking
//! `ClientHandle`, since several handlers (`authenticate`, `subscribe_events`)
//! mutate session-local state.

pub mod camera;
pub mod events;
pub mod recording;
pub mod storage;
pub mod streams;
pub mod system;

use serde_json::{json, Value};

/// Uniform partial-result shape returned when the controller facade
/// reports `is_ready() == false` (SPEC_FULL.md "OPEN QUESTION DECISIONS").
pub(crate) fn initializing_result() -> Value {
    json!({ "status": "initializing", "retry_after_ms": 500u32 })
}

pub(crate) fn map_controller_err(err: crate::controller::ControllerError) -> crate::rpc::errors::GatewayError {
    use crate::controller::ControllerError;
    use crate::rpc::errors::{DownstreamErrorKind, GatewayError};
    match err {
        ControllerError::CameraNotFound(device) => GatewayError::Downstream {
            kind: DownstreamErrorKind::CameraNotFound,
            message: format!("camera '{device}' not found"),
        },
        ControllerError::Unsupported(reason) => GatewayError::Downstream {
            kind: DownstreamErrorKind::Unsupported,
            message: reason,
        },
        ControllerError::MediaError(reason) => GatewayError::Downstream {
            kind: DownstreamErrorKind::MediaError,
            message: reason,
        },
    }
}

/// Registers every built-in and server-generated method into `registry`.
/// Called once at startup; marks the registry ready once complete (§4.4).
pub fn register_all(registry: &crate::rpc::registry::MethodRegistry) {
    use crate::rpc::registry::{wrap, MethodMeta};

    let built_in = MethodMeta { built_in: true };
    let server_generated = MethodMeta { built_in: false };

    registry.register("ping", wrap(system::ping), built_in);
    registry.register("authenticate", wrap(system::authenticate), built_in);

    registry.register("get_camera_list", wrap(camera::get_camera_list), built_in);
    registry.register("get_camera_status", wrap(camera::get_camera_status), built_in);
    registry.register("take_snapshot", wrap(camera::take_snapshot), built_in);
    registry.register("start_recording", wrap(recording::start_recording), built_in);
    registry.register("stop_recording", wrap(recording::stop_recording), built_in);
    registry.register("list_recordings", wrap(recording::list_recordings), built_in);
    registry.register("get_stream_url", wrap(camera::get_stream_url), built_in);
    registry.register("get_stream_status", wrap(camera::get_stream_status), built_in);

    registry.register("get_storage_info", wrap(storage::get_storage_info), built_in);
    registry.register("set_retention_policy", wrap(storage::set_retention_policy), built_in);
    registry.register("cleanup_storage", wrap(storage::cleanup_storage), built_in);

    registry.register(
        "discover_external_streams",
        wrap(streams::discover_external_streams),
        built_in,
    );
    registry.register("add_external_stream", wrap(streams::add_external_stream), built_in);
    registry.register(
        "remove_external_stream",
        wrap(streams::remove_external_stream),
        built_in,
    );

    registry.register("subscribe_events", wrap(events::subscribe_events), built_in);
    registry.register("unsubscribe_events", wrap(events::unsubscribe_events), built_in);

    // Server-generated event names: reachable by method lookup (gate 2)
    // so a misdirected client call fails with INSUFFICIENT_PERMISSIONS
    // rather than METHOD_NOT_FOUND (§4.5, S6), never actually dispatched
    // since the permission catalog denies them for every role.
    for name in [
        "camera_status_update",
        "recording_status_update",
        "snapshot_taken_notification",
        "system_health_notification",
    ] {
        registry.register(name, wrap(system::unreachable_server_generated), server_generated);
    }

    registry.mark_ready();
}
